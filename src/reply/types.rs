//! Structured reply model shared by the chat API, storage and export.

use serde::{Deserialize, Serialize};

/// An image attached to a reply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Image URL on a trusted media host.
    pub url: String,
    /// Short caption.
    #[serde(default)]
    pub caption: String,
}

/// The assistant's answer: prose plus media and follow-up suggestions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReply {
    /// Prose answer.
    pub text: String,
    /// Images from allow-listed hosts.
    #[serde(default)]
    pub images: Vec<ImageRef>,
    /// Canonical video watch URLs.
    #[serde(default)]
    pub video_links: Vec<String>,
    /// Follow-up questions offered to the user.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl StructuredReply {
    /// A text-only reply with no media or suggestions.
    #[must_use]
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Serialize for storage inside an assistant turn.
    #[must_use]
    pub fn to_stored(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.text.clone())
    }

    /// Decode an assistant turn written by [`Self::to_stored`].
    #[must_use]
    pub fn from_stored(content: &str) -> Option<Self> {
        serde_json::from_str(content).ok()
    }
}
