//! Segment analysis seam.

use async_trait::async_trait;
use tracing::info;
use vshort_models::{SegmentLimits, SourceVideo};

use crate::client::GeminiClient;
use crate::error::AnalysisResult;
use crate::prompt::build_prompt;

/// Produces a raw, serialized list of candidate segments for a video.
///
/// The text is untrusted: callers strip formatting and parse it strictly.
#[async_trait]
pub trait SegmentAnalyzer: Send + Sync {
    async fn analyze(&self, video: &SourceVideo, limits: &SegmentLimits) -> AnalysisResult<String>;
}

#[async_trait]
impl SegmentAnalyzer for GeminiClient {
    async fn analyze(&self, video: &SourceVideo, limits: &SegmentLimits) -> AnalysisResult<String> {
        let uploaded = self.upload_file(&video.path).await?;
        let name = uploaded.name.clone();

        let result = async {
            let active = self.wait_until_active(uploaded).await?;
            self.generate(&active, &build_prompt(limits)).await
        }
        .await;

        self.delete_file(&name).await;

        if let Ok(text) = &result {
            info!(source = %video.id, chars = text.len(), "Received analysis response");
        }
        result
    }
}
