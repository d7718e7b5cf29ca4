//! Messaging seam used by the pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::client::TelegramClient;
use crate::error::{MessengerError, MessengerResult};
use crate::types::ChatId;

/// Outbound channel for run status and finished clips.
///
/// Both operations are at-most-once; callers record failures instead of
/// retrying them.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Status-only text message.
    async fn notify(&self, text: &str) -> MessengerResult<()>;

    /// Attach a rendered clip with its caption.
    async fn deliver_clip(&self, path: &Path, caption: &str) -> MessengerResult<()>;
}

/// Messenger bound to one Telegram chat.
#[derive(Clone)]
pub struct TelegramMessenger {
    client: Arc<TelegramClient>,
    chat_id: ChatId,
}

impl TelegramMessenger {
    pub fn new(client: Arc<TelegramClient>, chat_id: impl Into<ChatId>) -> Self {
        Self {
            client,
            chat_id: chat_id.into(),
        }
    }

    pub fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn notify(&self, text: &str) -> MessengerResult<()> {
        self.client.send_message(&self.chat_id, text).await.map(|_| ())
    }

    async fn deliver_clip(&self, path: &Path, caption: &str) -> MessengerResult<()> {
        self.client
            .send_video(&self.chat_id, path, caption)
            .await
            .map(|_| ())
    }
}

/// Messenger for one-shot runs without a chat: clips are copied into
/// `output_dir` with their caption next to them as `<clip>.txt`.
#[derive(Debug, Clone)]
pub struct DirectoryMessenger {
    output_dir: PathBuf,
}

impl DirectoryMessenger {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl Messenger for DirectoryMessenger {
    async fn notify(&self, text: &str) -> MessengerResult<()> {
        info!(text, "Notification");
        Ok(())
    }

    async fn deliver_clip(&self, path: &Path, caption: &str) -> MessengerResult<()> {
        let name = path
            .file_name()
            .ok_or_else(|| MessengerError::config(format!("clip path has no file name: {}", path.display())))?;
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let dest = self.output_dir.join(name);
        let bytes = tokio::fs::copy(path, &dest).await?;
        tokio::fs::write(dest.with_extension("txt"), caption).await?;

        info!(path = %dest.display(), bytes, "Clip saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TelegramConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_telegram_messenger_uses_bound_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botT/sendMessage"))
            .and(wiremock::matchers::body_partial_json(
                serde_json::json!({"chat_id": "@shorts"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"message_id": 1, "chat": {"id": -100}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::new(TelegramConfig {
            token: "T".into(),
            api_url: server.uri(),
            ..Default::default()
        })
        .unwrap();
        let messenger = TelegramMessenger::new(Arc::new(client), "@shorts");
        messenger.notify("Processing").await.unwrap();
    }

    #[tokio::test]
    async fn test_directory_messenger_keeps_clip_and_caption() {
        let scratch = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let clip = scratch.path().join("short_02.mp4");
        std::fs::write(&clip, b"mp4 bytes").unwrap();

        let messenger = DirectoryMessenger::new(out.path().join("run"));
        messenger.notify("hi").await.unwrap();
        messenger.deliver_clip(&clip, "🎬 Title\nShort 2/3").await.unwrap();

        // The scratch copy may go away; the saved clip must not
        drop(scratch);
        let saved = out.path().join("run/short_02.mp4");
        assert_eq!(std::fs::read(&saved).unwrap(), b"mp4 bytes");
        assert_eq!(
            std::fs::read_to_string(out.path().join("run/short_02.txt")).unwrap(),
            "🎬 Title\nShort 2/3"
        );
    }

    #[tokio::test]
    async fn test_directory_messenger_missing_clip_fails() {
        let out = tempfile::tempdir().unwrap();
        let messenger = DirectoryMessenger::new(out.path());
        assert!(messenger
            .deliver_clip(Path::new("/nonexistent/clip.mp4"), "c")
            .await
            .is_err());
    }
}
