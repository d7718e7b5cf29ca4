//! Telegram Bot API HTTP client.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{MessengerError, MessengerResult};
use crate::types::{ApiResponse, ChatId, SentMessage, TelegramFile, Update};

const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Largest file the Bot API lets a bot download.
pub const BOT_DOWNLOAD_LIMIT: u64 = 20 * 1024 * 1024;

/// Longest caption the Bot API accepts on media messages.
pub const CAPTION_LIMIT: usize = 1024;

/// Longest text message.
pub const MESSAGE_LIMIT: usize = 4096;

/// Configuration for the Telegram client.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    /// API root, overridable for tests and local Bot API servers
    pub api_url: String,
    /// Per-request timeout for ordinary calls and uploads
    pub timeout: Duration,
    /// Long-poll timeout passed to `getUpdates`
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(300),
            poll_timeout_secs: 30,
        }
    }
}

impl TelegramConfig {
    /// Create config from environment variables.
    ///
    /// Returns `None` when `TELEGRAM_TOKEN` is unset or empty.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TELEGRAM_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())?;
        let defaults = Self::default();
        Some(Self {
            token,
            api_url: std::env::var("TELEGRAM_API_URL").unwrap_or(defaults.api_url),
            ..defaults
        })
    }
}

/// Telegram Bot API client.
pub struct TelegramClient {
    http: Client,
    config: TelegramConfig,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> MessengerResult<Self> {
        if config.token.trim().is_empty() {
            return Err(MessengerError::config("TELEGRAM_TOKEN not set"));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MessengerError::Network)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.token,
            method
        )
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.token,
            file_path.trim_start_matches('/')
        )
    }

    /// Send a text message. Returns the message id.
    pub async fn send_message(&self, chat_id: &ChatId, text: &str) -> MessengerResult<i64> {
        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&json!({
                "chat_id": chat_id,
                "text": truncate_chars(text, MESSAGE_LIMIT),
                "disable_web_page_preview": true,
            }))
            .send()
            .await?;

        let sent: SentMessage = parse_response("sendMessage", response).await?;
        debug!(chat_id = %chat_id, message_id = sent.message_id, "Sent message");
        Ok(sent.message_id)
    }

    /// Upload an MP4 as a video message with a caption. Returns the message id.
    pub async fn send_video(
        &self,
        chat_id: &ChatId,
        path: &Path,
        caption: &str,
    ) -> MessengerResult<i64> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "short.mp4".to_string());
        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("video/mp4")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", truncate_chars(caption, CAPTION_LIMIT))
            .text("supports_streaming", "true")
            .part("video", part);

        let response = self
            .http
            .post(self.method_url("sendVideo"))
            .multipart(form)
            .send()
            .await?;

        let sent: SentMessage = parse_response("sendVideo", response).await?;
        info!(
            chat_id = %chat_id,
            message_id = sent.message_id,
            bytes = size,
            "Uploaded video"
        );
        Ok(sent.message_id)
    }

    /// Resolve a file id to a downloadable file path.
    pub async fn get_file(&self, file_id: &str) -> MessengerResult<TelegramFile> {
        let response = self
            .http
            .post(self.method_url("getFile"))
            .json(&json!({ "file_id": file_id }))
            .send()
            .await?;
        parse_response("getFile", response).await
    }

    /// Download a file returned by [`get_file`](Self::get_file) to `dest`.
    ///
    /// Stops with [`MessengerError::FileTooLarge`] once more than `max_bytes`
    /// have been received; the partial file is removed.
    pub async fn download_file(
        &self,
        file: &TelegramFile,
        dest: &Path,
        max_bytes: u64,
    ) -> MessengerResult<u64> {
        let file_path = file.file_path.as_deref().ok_or_else(|| {
            MessengerError::api("getFile", 400, "Bad Request: file is too big to download")
        })?;

        let mut response = self.http.get(self.file_url(file_path)).send().await?;
        if !response.status().is_success() {
            let code = i64::from(response.status().as_u16());
            let body = response.text().await.unwrap_or_default();
            return Err(MessengerError::api("downloadFile", code, body));
        }

        let mut out = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            written += chunk.len() as u64;
            if written > max_bytes {
                drop(out);
                let _ = tokio::fs::remove_file(dest).await;
                return Err(MessengerError::FileTooLarge {
                    size: written,
                    limit: max_bytes,
                });
            }
            out.write_all(&chunk).await?;
        }
        out.flush().await?;

        info!(file_id = %file.file_id, bytes = written, path = ?dest, "Downloaded attachment");
        Ok(written)
    }

    /// Long-poll for updates starting at `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> MessengerResult<Vec<Update>> {
        let timeout = self.config.poll_timeout_secs;
        let response = self
            .http
            .post(self.method_url("getUpdates"))
            // The long-poll may legitimately outlast the default request timeout
            .timeout(Duration::from_secs(timeout + 10))
            .json(&json!({
                "offset": offset,
                "timeout": timeout,
                "allowed_updates": ["message"],
            }))
            .send()
            .await?;
        parse_response("getUpdates", response).await
    }
}

async fn parse_response<T: DeserializeOwned>(
    method: &'static str,
    response: Response,
) -> MessengerResult<T> {
    let status = response.status();
    let body = response.text().await?;
    let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
        if status.is_success() {
            MessengerError::InvalidResponse(format!("{method}: {e}"))
        } else {
            MessengerError::api(method, i64::from(status.as_u16()), body.clone())
        }
    })?;

    if !envelope.ok {
        return Err(MessengerError::api(
            method,
            envelope
                .error_code
                .unwrap_or_else(|| i64::from(status.as_u16())),
            envelope.description.unwrap_or_default(),
        ));
    }
    envelope
        .result
        .ok_or_else(|| MessengerError::InvalidResponse(format!("{method}: missing result")))
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
