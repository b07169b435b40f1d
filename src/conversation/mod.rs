//! Rebuilds the bounded turn sequence sent to the provider.

use serde::{Deserialize, Serialize};

use crate::reply::StructuredReply;
use crate::storage::{SessionId, StoreResult, TranscriptStore, Turn, TurnRole};

/// One turn as replayed to the provider: role and plain text only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Author of the turn.
    pub role: TurnRole,
    /// Plain text content.
    pub text: String,
}

impl ConversationTurn {
    /// A user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    /// An assistant turn.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }

    /// Replay form of a stored turn. Structured assistant replies contribute
    /// only their prose; anything undecodable is replayed verbatim.
    #[must_use]
    pub fn from_stored(turn: &Turn) -> Self {
        let text = match turn.role {
            TurnRole::User => turn.content.clone(),
            TurnRole::Assistant => StructuredReply::from_stored(&turn.content)
                .map(|reply| reply.text)
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| turn.content.clone()),
        };
        Self {
            role: turn.role,
            text,
        }
    }
}

/// Builds provider input from the last `window` stored turns plus the new
/// user message.
#[derive(Clone, Copy, Debug)]
pub struct ConversationBuilder {
    window: usize,
}

impl ConversationBuilder {
    /// Create a builder replaying at most `window` stored turns.
    #[must_use]
    pub const fn new(window: usize) -> Self {
        Self { window }
    }

    /// Size of the replay window.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Read the session tail from the store and append `new_message`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn build(
        &self,
        store: &dyn TranscriptStore,
        session_id: &SessionId,
        new_message: &str,
    ) -> StoreResult<Vec<ConversationTurn>> {
        let recent = store.read_recent(session_id.clone(), self.window).await?;
        Ok(self.assemble(&recent, new_message))
    }

    /// Pure form of [`Self::build`] over an already loaded history.
    #[must_use]
    pub fn assemble(&self, history: &[Turn], new_message: &str) -> Vec<ConversationTurn> {
        let start = history.len().saturating_sub(self.window);
        let mut turns: Vec<ConversationTurn> = history[start..]
            .iter()
            .map(ConversationTurn::from_stored)
            .collect();
        turns.push(ConversationTurn::user(new_message));
        turns
    }
}
