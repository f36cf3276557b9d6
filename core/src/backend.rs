use async_trait::async_trait;

use crate::error::Result;

/// Final text produced by a backend for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
    pub text: String,
}

/// Abstract text-generation collaborator.
///
/// Accepts a prompt and asynchronously returns the model's full text or
/// fails with a human-readable reason. Single-shot per call; transport and
/// auth belong to implementor crates. Implementations should make a best
/// effort to stop work when the returned future is dropped, which is how the
/// session cancels an in-flight call.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedText>;
}
