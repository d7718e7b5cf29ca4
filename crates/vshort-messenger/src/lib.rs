//! Telegram messaging for the shorts pipeline.
//!
//! The [`Messenger`] trait is the seam the pipeline talks to; the
//! [`TelegramClient`] also serves attachment downloads and the bot's
//! update loop.

pub mod client;
pub mod error;
pub mod messenger;
pub mod types;

pub use client::{TelegramClient, TelegramConfig, BOT_DOWNLOAD_LIMIT, CAPTION_LIMIT};
pub use error::{MessengerError, MessengerResult};
pub use messenger::{DirectoryMessenger, Messenger, TelegramMessenger};
pub use types::{ChatId, Message, Request, TelegramFile, Update};
