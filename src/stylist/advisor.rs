use async_trait::async_trait;
use thiserror::Error;

use super::outfit::InlineImage;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("AI returned empty content")]
    EmptyContent,
}

/// The generative model behind the stylist.
///
/// `analyze` sends the photo and instruction and returns the model's raw
/// structured (JSON) answer; parsing is the caller's job so that a bad
/// answer can be reported uniformly. `synthesize_image` returns every
/// image part of the answer, possibly none.
#[async_trait]
pub trait StyleAdvisor: Send + Sync {
    async fn analyze(&self, image: &InlineImage, prompt: &str) -> Result<String, AdvisorError>;

    async fn synthesize_image(
        &self,
        image: &InlineImage,
        prompt: &str,
    ) -> Result<Vec<InlineImage>, AdvisorError>;
}
