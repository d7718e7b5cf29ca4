//! Gemini HTTP client: Files API upload, processing poll, generation.

use std::path::Path;
use std::time::Duration;

use futures_util::stream;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Client, Response};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, AnalysisResult};
use crate::poll::{PollPolicy, PollState};
use crate::retry::{retry_async, RetryConfig};
use crate::types::{
    Content, FileData, FileResource, FileState, GenerateRequest, GenerateResponse,
    GenerationConfig, Part, UploadMetadata, UploadMetadataFile, UploadResponse,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";
const UPLOAD_CHUNK_SIZE: usize = 1024 * 1024;

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// API root, overridable for tests
    pub base_url: String,
    /// Per-request timeout (uploads included)
    pub timeout: Duration,
    /// Retries for transient failures
    pub max_retries: u32,
    /// Processing-state poll bounds
    pub poll: PollPolicy,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(900),
            max_retries: 2,
            poll: PollPolicy::default(),
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    ///
    /// Returns `None` when `GEMINI_API_KEY` is unset or empty.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
        let defaults = Self::default();
        let poll = PollPolicy::new(
            std::env::var("GEMINI_POLL_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.poll.max_attempts),
            std::env::var("GEMINI_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll.interval),
        );

        Some(Self {
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("GEMINI_API_URL").unwrap_or(defaults.base_url),
            poll,
            ..defaults
        })
    }
}

/// Gemini API client.
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(config: GeminiConfig) -> AnalysisResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AnalysisError::config("GEMINI_API_KEY not set"));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AnalysisError::Network)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn retry(&self, operation: &str) -> RetryConfig {
        RetryConfig::new(operation).with_max_retries(self.config.max_retries)
    }

    /// Upload a local video with the resumable Files API protocol.
    pub async fn upload_file(&self, path: &Path) -> AnalysisResult<FileResource> {
        let size = tokio::fs::metadata(path).await?.len();
        let mime_type = mime_type_for(path);
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());

        info!(path = %path.display(), size, mime_type, "Uploading video for analysis");

        let start_url = format!("{}/upload/v1beta/files", self.config.base_url);
        let metadata = UploadMetadata {
            file: UploadMetadataFile { display_name },
        };

        let session = retry_async(&self.retry("gemini_upload_start"), || async {
            let response = self
                .http
                .post(&start_url)
                .header(API_KEY_HEADER, &self.config.api_key)
                .header("X-Goog-Upload-Protocol", "resumable")
                .header("X-Goog-Upload-Command", "start")
                .header("X-Goog-Upload-Header-Content-Length", size.to_string())
                .header("X-Goog-Upload-Header-Content-Type", mime_type)
                .json(&metadata)
                .send()
                .await?;
            let response = check_status(response).await?;
            response
                .headers()
                .get(UPLOAD_URL_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| AnalysisError::Upload("missing upload URL in response".to_string()))
        })
        .await?;

        // The body is a one-shot stream, so the transfer itself is not retried.
        let file = tokio::fs::File::open(path).await?;
        let response = self
            .http
            .post(&session)
            .header(CONTENT_LENGTH, size)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(file_body(file))
            .send()
            .await?;
        let uploaded: UploadResponse = check_status(response).await?.json().await?;

        debug!(name = %uploaded.file.name, state = ?uploaded.file.state, "Upload finished");
        Ok(uploaded.file)
    }

    /// Fetch the current state of an uploaded file.
    pub async fn get_file(&self, name: &str) -> AnalysisResult<FileResource> {
        let url = format!("{}/v1beta/{}", self.config.base_url, name);
        retry_async(&self.retry("gemini_get_file"), || async {
            let response = self
                .http
                .get(&url)
                .header(API_KEY_HEADER, &self.config.api_key)
                .send()
                .await?;
            Ok(check_status(response).await?.json::<FileResource>().await?)
        })
        .await
    }

    /// Poll until the file leaves `PROCESSING`.
    pub async fn wait_until_active(&self, file: FileResource) -> AnalysisResult<FileResource> {
        if file.state == FileState::Active {
            return Ok(file);
        }
        let name = file.name.clone();
        self.config
            .poll
            .run(|attempt| {
                let name = name.clone();
                async move {
                    let current = self.get_file(&name).await?;
                    match current.state {
                        FileState::Active => Ok(PollState::Ready(current)),
                        FileState::Failed => Err(AnalysisError::ProcessingFailed(format!(
                            "{} entered FAILED state",
                            current.name
                        ))),
                        FileState::Processing | FileState::StateUnspecified => {
                            debug!(name = %current.name, attempt, "File still processing");
                            Ok(PollState::Pending)
                        }
                    }
                }
            })
            .await
    }

    /// Run `generateContent` against an active file and return the raw text.
    pub async fn generate(&self, file: &FileResource, prompt: &str) -> AnalysisResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::File {
                        file_data: FileData {
                            mime_type: file.mime_type.clone(),
                            file_uri: file.uri.clone(),
                        },
                    },
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.4,
            },
        };

        info!(model = %self.config.model, file = %file.name, "Requesting segment proposals");

        let response: GenerateResponse = retry_async(&self.retry("gemini_generate"), || async {
            let response = self
                .http
                .post(&url)
                .header(API_KEY_HEADER, &self.config.api_key)
                .json(&request)
                .send()
                .await?;
            Ok(check_status(response).await?.json::<GenerateResponse>().await?)
        })
        .await?;

        response
            .text()
            .ok_or_else(|| AnalysisError::invalid_response("No content in Gemini response"))
    }

    /// Delete an uploaded file. Failures are logged, not returned.
    pub async fn delete_file(&self, name: &str) {
        let url = format!("{}/v1beta/{}", self.config.base_url, name);
        let result = self
            .http
            .delete(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await;
        match result {
            Ok(r) if r.status().is_success() => debug!(name, "Deleted uploaded file"),
            Ok(r) => warn!(name, status = %r.status(), "Failed to delete uploaded file"),
            Err(e) => warn!(name, error = %e, "Failed to delete uploaded file"),
        }
    }
}

/// Map non-success responses to [`AnalysisError::Api`].
async fn check_status(response: Response) -> AnalysisResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AnalysisError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Stream a file as a request body in fixed-size chunks.
fn file_body(file: tokio::fs::File) -> Body {
    let chunks = stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok::<_, std::io::Error>(None);
        }
        buf.truncate(n);
        Ok(Some((buf, file)))
    });
    Body::wrap_stream(chunks)
}

fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        _ => "video/mp4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            max_retries: 1,
            poll: PollPolicy::new(3, Duration::from_millis(1)),
            ..Default::default()
        }
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("a.MP4")), "video/mp4");
        assert_eq!(mime_type_for(Path::new("a.webm")), "video/webm");
        assert_eq!(mime_type_for(Path::new("noext")), "video/mp4");
    }

    #[test]
    fn test_new_requires_key() {
        assert!(matches!(
            GeminiClient::new(GeminiConfig::default()),
            Err(AnalysisError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_file_resumable() {
        let server = MockServer::start().await;
        let session_url = format!("{}/upload-session/1", server.uri());

        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .and(header("x-goog-api-key", "test-key"))
            .and(header("X-Goog-Upload-Command", "start"))
            .respond_with(ResponseTemplate::new(200).insert_header("x-goog-upload-url", session_url.as_str()))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/upload-session/1"))
            .and(header("X-Goog-Upload-Offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "file": {"name": "files/abc", "uri": "https://g/files/abc", "mimeType": "video/mp4", "state": "PROCESSING"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("source.mp4");
        tokio::fs::write(&video, vec![7u8; 4096]).await.unwrap();

        let client = GeminiClient::new(config(&server)).unwrap();
        let file = client.upload_file(&video).await.unwrap();
        assert_eq!(file.name, "files/abc");
        assert_eq!(file.state, FileState::Processing);
    }

    #[tokio::test]
    async fn test_wait_until_active_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "files/abc", "state": "PROCESSING"
            })))
            .expect(3)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server)).unwrap();
        let file = FileResource {
            name: "files/abc".into(),
            uri: String::new(),
            mime_type: "video/mp4".into(),
            state: FileState::Processing,
        };
        let err = client.wait_until_active(file).await.unwrap_err();
        assert!(matches!(err, AnalysisError::PollTimeout { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_wait_until_active_failed_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "files/abc", "state": "FAILED"
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server)).unwrap();
        let file = FileResource {
            name: "files/abc".into(),
            uri: String::new(),
            mime_type: "video/mp4".into(),
            state: FileState::Processing,
        };
        let err = client.wait_until_active(file).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ProcessingFailed(_)));
    }

    #[tokio::test]
    async fn test_generate_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "```json\n[]\n```"}]}}]
            })))
            .mount(&server)
            .await;

        let mut cfg = config(&server);
        cfg.max_retries = 2;
        let client = GeminiClient::new(cfg).unwrap();
        let file = FileResource {
            name: "files/abc".into(),
            uri: "https://g/files/abc".into(),
            mime_type: "video/mp4".into(),
            state: FileState::Active,
        };
        let text = client.generate(&file, "prompt").await.unwrap();
        assert_eq!(text, "```json\n[]\n```");
    }

    #[tokio::test]
    async fn test_generate_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad"))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server)).unwrap();
        let file = FileResource {
            name: "files/abc".into(),
            uri: "https://g/files/abc".into(),
            mime_type: "video/mp4".into(),
            state: FileState::Active,
        };
        let err = client.generate(&file, "prompt").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Api { status: 400, .. }));
    }
}
