//! Provider client seam.

use async_trait::async_trait;

use crate::conversation::ConversationTurn;
use crate::credentials::Credential;
use crate::provider::error::ProviderError;

/// Everything needed for one "answer this message" call.
#[derive(Clone, Copy, Debug)]
pub struct GenerationRequest<'a> {
    /// System instruction.
    pub system_prompt: &'a str,
    /// Replayed turns, ending with the new user message.
    pub turns: &'a [ConversationTurn],
    /// Model identifier.
    pub model: &'a str,
    /// Sampling temperature.
    pub temperature: f64,
    /// Output token budget.
    pub max_output_tokens: u32,
}

/// A generative-text provider reachable with one credential per call.
///
/// Implementations issue exactly one request per call and always ask for
/// structured (JSON) output.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Generate a reply and return the raw candidate text.
    ///
    /// # Errors
    /// Returns a classified [`ProviderError`] on any failure.
    async fn generate(
        &self,
        credential: &Credential,
        request: GenerationRequest<'_>,
    ) -> Result<String, ProviderError>;
}
