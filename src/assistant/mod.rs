//! One chat exchange, end to end.
//!
//! Context is rebuilt from the store, the user turn is persisted, the
//! provider is invoked through the credential pool, the output is
//! validated, and the assistant turn is persisted. Provider failures are
//! absorbed into a fixed reply; only storage failures reach the caller.

pub mod prompt;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::conversation::ConversationBuilder;
use crate::credentials::CredentialPool;
use crate::provider::{InvocationEngine, InvocationError, ProviderClient};
use crate::reply::{NO_CREDENTIALS_TEXT, ReplyValidator, StructuredReply};
use crate::storage::{SessionId, StoreResult, TranscriptStore, TurnRole};

pub use prompt::{DEFAULT_CITY, system_prompt};

/// Conversational travel assistant.
pub struct TravelAssistant {
    store: Arc<dyn TranscriptStore>,
    client: Arc<dyn ProviderClient>,
    pool: CredentialPool,
    engine: InvocationEngine,
    builder: ConversationBuilder,
    validator: ReplyValidator,
    system_prompt: String,
}

impl TravelAssistant {
    /// Wire an assistant from its collaborators.
    #[must_use]
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn TranscriptStore>,
        client: Arc<dyn ProviderClient>,
        pool: CredentialPool,
    ) -> Self {
        Self {
            store,
            client,
            pool,
            engine: InvocationEngine::new(&config.provider),
            builder: ConversationBuilder::new(config.conversation.window),
            validator: ReplyValidator::new(config.reply.clone()),
            system_prompt: system_prompt(DEFAULT_CITY, &config.reply),
        }
    }

    /// Validator used for replies; shared with the exporter.
    #[must_use]
    pub const fn validator(&self) -> &ReplyValidator {
        &self.validator
    }

    /// Number of configured provider credentials.
    #[must_use]
    pub fn credential_count(&self) -> usize {
        self.pool.len()
    }

    /// Answer `message` within `session_id` and persist both turns.
    ///
    /// # Errors
    /// Returns an error only if the transcript store fails.
    pub async fn respond(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> StoreResult<StructuredReply> {
        let turns = self
            .builder
            .build(self.store.as_ref(), session_id, message)
            .await?;

        self.store
            .append(session_id.clone(), TurnRole::User, message.to_string())
            .await?;

        let reply = match self
            .engine
            .invoke(self.client.as_ref(), &self.system_prompt, &turns, &self.pool)
            .await
        {
            Ok(raw) => {
                let validated = self.validator.validate(&raw);
                if validated.is_fallback() {
                    tracing::warn!(session = %session_id, "Replaced unusable provider output");
                }
                validated.into_reply()
            }
            Err(InvocationError::NoCredentials) => {
                tracing::warn!("No provider credentials configured");
                StructuredReply::text_only(NO_CREDENTIALS_TEXT)
            }
            Err(InvocationError::Exhausted { .. }) => ReplyValidator::fallback(),
        };

        self.store
            .append(session_id.clone(), TurnRole::Assistant, reply.to_stored())
            .await?;

        tracing::info!(
            session = %session_id,
            images = reply.images.len(),
            videos = reply.video_links.len(),
            "Answered chat message"
        );
        Ok(reply)
    }
}
