use async_trait::async_trait;

use crate::gemini::{GeminiClient, GeminiClientError};

/// Text-in/text-out seam between request handlers and the remote model.
///
/// Handlers hold an `Arc<dyn TextGenerator>` so tests can swap in scripted
/// generators without touching the network.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiClientError>;
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiClientError> {
        self.generate_content(prompt).await
    }
}
