//! Telegram bot loop: long-poll updates, one run per source message.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use vshort_messenger::{Messenger, Request, TelegramClient, TelegramMessenger, Update};
use vshort_models::RunSummary;

use crate::coordinator::RunCoordinator;
use crate::error::WorkerResult;

pub const MSG_GREETING: &str = "👋 Send me a video file or a link to a long video and I'll cut it into vertical shorts with captions.";
pub const MSG_UNSUPPORTED: &str = "❌ No video detected! Send a video file or a link.";

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

pub struct BotPoller {
    client: Arc<TelegramClient>,
    coordinator: Arc<RunCoordinator>,
}

impl BotPoller {
    pub fn new(client: Arc<TelegramClient>, coordinator: Arc<RunCoordinator>) -> Self {
        Self { client, coordinator }
    }

    /// Poll until the token is rejected. Sources are processed one at a time.
    pub async fn run(&self) -> WorkerResult<()> {
        let mut offset: Option<i64> = None;
        let mut backoff = INITIAL_BACKOFF;
        info!("Bot polling started");

        loop {
            match self.client.get_updates(offset).await {
                Ok(updates) => {
                    backoff = INITIAL_BACKOFF;
                    for update in updates {
                        // Acknowledged by the next getUpdates call
                        offset = Some(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) if e.is_unauthorized() => {
                    error!(error = %e, "Bot token rejected, stopping");
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(error = %e, backoff_secs = backoff.as_secs(), "getUpdates failed, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    /// Route one update. Returns the run summary when a run happened.
    pub async fn handle_update(&self, update: Update) -> Option<RunSummary> {
        let message = update.message?;
        let messenger = Arc::new(TelegramMessenger::new(self.client.clone(), message.chat.id));

        match message.request() {
            Request::Start => {
                reply(messenger.as_ref(), MSG_GREETING).await;
                None
            }
            Request::Unsupported => {
                debug!(chat_id = message.chat.id, "Message without a video");
                reply(messenger.as_ref(), MSG_UNSUPPORTED).await;
                None
            }
            Request::Process(source) => {
                info!(chat_id = message.chat.id, source = %source, "Processing request");
                let summary = self.coordinator.process(&source, messenger).await;
                info!(
                    run_id = %summary.run_id,
                    outcome = summary.outcome.as_str(),
                    "Request finished"
                );
                Some(summary)
            }
        }
    }
}

async fn reply(messenger: &dyn Messenger, text: &str) {
    if let Err(e) = messenger.notify(text).await {
        warn!(error = %e, "Failed to reply");
    }
}
