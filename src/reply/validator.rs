//! Validation and sanitizing of raw provider output.
//!
//! Whatever the provider returns, the result of [`ReplyValidator::validate`]
//! satisfies the reply invariants: only allow-listed HTTPS images, only
//! recognised video links, every list within its cap.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::config::ReplyConfig;
use crate::reply::media::{canonical_video_url, extract_video_id, is_allowed_image_url};
use crate::reply::types::{ImageRef, StructuredReply};

/// Apology shown when the provider output cannot be used.
pub const APOLOGY_TEXT: &str = "Xin lỗi, hiện tôi chưa thể trả lời câu hỏi này. \
     Bạn vui lòng thử lại sau ít phút.";

/// Reply shown when no provider credential is configured.
pub const NO_CREDENTIALS_TEXT: &str = "Hệ thống tư vấn du lịch hiện chưa được cấu hình. \
     Vui lòng liên hệ quản trị viên hoặc thử lại sau.";

/// Suggestions offered when the provider supplies none.
pub const GENERIC_SUGGESTIONS: [&str; 3] = [
    "Món ăn đặc sản nên thử",
    "Lịch trình tham quan 3 ngày",
    "Thời điểm đẹp nhất để du lịch",
];

/// Outcome of validating one provider output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validated {
    /// The output parsed and was sanitized.
    Reply(StructuredReply),
    /// The output was unusable; carries the fixed apology.
    Fallback(StructuredReply),
}

impl Validated {
    /// The reply to send, whichever variant this is.
    #[must_use]
    pub fn into_reply(self) -> StructuredReply {
        match self {
            Self::Reply(reply) | Self::Fallback(reply) => reply,
        }
    }

    /// True when the apology was substituted.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop an info string such as `json` on the opening line.
    match body.find('\n') {
        Some(newline) if !body[..newline].contains('{') => body[newline + 1..].trim(),
        _ => body.trim(),
    }
}

/// Parse raw output as a JSON object, tolerating a code fence.
#[must_use]
pub fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(strip_code_fence(raw)) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Whether raw output is structured enough to be validated.
#[must_use]
pub fn is_structured(raw: &str) -> bool {
    parse_object(raw).is_some_and(|map| text_field(&map).is_some())
}

fn text_field(map: &Map<String, Value>) -> Option<String> {
    map.get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn string_items(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Validator configured with the reply policy.
#[derive(Clone, Debug)]
pub struct ReplyValidator {
    policy: ReplyConfig,
}

impl ReplyValidator {
    /// Create a validator for the given policy.
    #[must_use]
    pub const fn new(policy: ReplyConfig) -> Self {
        Self { policy }
    }

    /// The active policy.
    #[must_use]
    pub const fn policy(&self) -> &ReplyConfig {
        &self.policy
    }

    /// Fixed reply used on unusable output or exhaustion.
    #[must_use]
    pub fn fallback() -> StructuredReply {
        StructuredReply::text_only(APOLOGY_TEXT)
    }

    /// Whether an image URL passes the host allow-list.
    #[must_use]
    pub fn is_allowed_image(&self, url: &str) -> bool {
        is_allowed_image_url(url, &self.policy.allowed_image_hosts)
    }

    /// Parse and sanitize raw provider output. Never fails.
    #[must_use]
    pub fn validate(&self, raw: &str) -> Validated {
        let Some(map) = parse_object(raw) else {
            tracing::warn!(len = raw.len(), "Provider output is not a JSON object");
            return Validated::Fallback(Self::fallback());
        };
        let Some(text) = text_field(&map) else {
            tracing::warn!("Provider output has no usable text field");
            return Validated::Fallback(Self::fallback());
        };

        let images = self.sanitize_images(map.get("images"));
        let video_links = self.sanitize_videos(map.get("video_links"));

        let mut suggestions = string_items(map.get("suggestions"));
        suggestions.truncate(self.policy.max_suggestions);
        if suggestions.is_empty() {
            suggestions = GENERIC_SUGGESTIONS
                .iter()
                .take(self.policy.max_suggestions)
                .map(|s| (*s).to_string())
                .collect();
        }

        Validated::Reply(StructuredReply {
            text,
            images,
            video_links,
            suggestions,
        })
    }

    fn sanitize_images(&self, value: Option<&Value>) -> Vec<ImageRef> {
        let Some(items) = value.and_then(Value::as_array) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut dropped = 0_usize;
        let mut images = Vec::new();

        for item in items {
            let (url, caption) = match item {
                Value::String(url) => (url.trim().to_string(), String::new()),
                Value::Object(obj) => (
                    obj.get("url")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                    obj.get("caption")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                ),
                _ => continue,
            };

            if !self.is_allowed_image(&url) {
                dropped += 1;
                continue;
            }
            if seen.insert(url.clone()) {
                images.push(ImageRef { url, caption });
            }
        }

        if dropped > 0 {
            tracing::debug!(dropped, "Dropped images outside the allow-list");
        }
        images.truncate(self.policy.max_images);
        images
    }

    fn sanitize_videos(&self, value: Option<&Value>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut links: Vec<String> = string_items(value)
            .iter()
            .filter_map(|link| extract_video_id(link))
            .filter(|id| seen.insert(id.clone()))
            .map(|id| canonical_video_url(&id))
            .collect();
        links.truncate(self.policy.max_videos);
        links
    }
}
