//! Bot API wire types.

use serde::{Deserialize, Serialize};
use vshort_models::SourceRef;

/// Envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

/// Chat identifier: numeric id or `@channelusername`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub String);

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ChatId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ChatId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Document {
    pub fn is_video(&self) -> bool {
        self.mime_type
            .as_deref()
            .map(|m| m.starts_with("video/"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub video: Option<Video>,
    #[serde(default)]
    pub document: Option<Document>,
}

/// What a user message asks the bot to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Start,
    Process(SourceRef),
    Unsupported,
}

impl Message {
    /// Video attachment, either sent as a video or as a video document.
    pub fn attachment(&self) -> Option<SourceRef> {
        if let Some(video) = &self.video {
            return Some(SourceRef::attachment(
                video.file_id.clone(),
                video.file_unique_id.clone(),
                video.file_size,
            ));
        }
        self.document.as_ref().filter(|d| d.is_video()).map(|d| {
            SourceRef::attachment(d.file_id.clone(), d.file_unique_id.clone(), d.file_size)
        })
    }

    /// First http(s) link in the text or caption.
    pub fn first_url(&self) -> Option<SourceRef> {
        let text = self.text.as_deref().or(self.caption.as_deref())?;
        text.split_whitespace()
            .filter(|word| word.starts_with("http://") || word.starts_with("https://"))
            .find_map(|word| SourceRef::url(word.trim_end_matches(['.', ',', ')', '>'])).ok())
    }

    pub fn request(&self) -> Request {
        if self
            .text
            .as_deref()
            .map(|t| t.trim_start().starts_with("/start"))
            .unwrap_or(false)
        {
            return Request::Start;
        }
        match self.attachment().or_else(|| self.first_url()) {
            Some(source) => Request::Process(source),
            None => Request::Unsupported,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// Result of `getFile`.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramFile {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Missing when the file is too large for the Bot API to serve
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SentMessage {
    pub message_id: i64,
}
