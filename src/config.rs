//! Application configuration.
//!
//! Values come from `TRAVEL_GUIDE_*` environment variables layered over
//! defaults. Provider credentials are scanned separately, see
//! [`crate::credentials`].

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable prefix for all settings.
pub const ENV_PREFIX: &str = "TRAVEL_GUIDE_";

/// Largest per-reply cap accepted for images and videos.
const MAX_MEDIA_CAP: usize = 6;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// A URL setting does not parse.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Transcript storage settings.
    pub storage: StorageConfig,
    /// Generative provider settings.
    pub provider: ProviderConfig,
    /// Conversation window settings.
    pub conversation: ConversationConfig,
    /// Structured reply policy.
    pub reply: ReplyConfig,
    /// Document export settings.
    pub export: ExportConfig,
    /// Map and place search settings.
    pub places: PlacesConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Keys are looked up with the [`ENV_PREFIX`] prepended, except for
    /// `SERPAPI_KEY` which keeps its conventional name.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        config.server.port = parse_or(get("PORT"), "PORT", config.server.port);
        if let Some(dir) = get("STATIC_DIR") {
            config.server.static_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("SQLITE_PATH") {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(model) = get("MODEL") {
            config.provider.model = model;
        }
        if let Some(base_url) = get("PROVIDER_URL") {
            config.provider.base_url = base_url;
        }
        config.provider.temperature =
            parse_or(get("TEMPERATURE"), "TEMPERATURE", config.provider.temperature);
        config.provider.traversal =
            parse_or(get("TRAVERSAL"), "TRAVERSAL", config.provider.traversal);
        config.conversation.window = parse_or(
            get("HISTORY_WINDOW"),
            "HISTORY_WINDOW",
            config.conversation.window,
        );
        config.reply.max_images = parse_or(get("MAX_IMAGES"), "MAX_IMAGES", config.reply.max_images);
        config.reply.max_videos = parse_or(get("MAX_VIDEOS"), "MAX_VIDEOS", config.reply.max_videos);
        if let Some(path) = get("FONT_PATH") {
            config.export.font_path = PathBuf::from(path);
        }
        config.places.serpapi_key = lookup("SERPAPI_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        config
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conversation.window == 0 {
            return Err(ConfigError::Invalid(
                "conversation.window must be > 0".to_string(),
            ));
        }

        if !(1..=MAX_MEDIA_CAP).contains(&self.reply.max_images) {
            return Err(ConfigError::Invalid(format!(
                "reply.max_images must be within 1..={MAX_MEDIA_CAP}"
            )));
        }

        if !(1..=MAX_MEDIA_CAP).contains(&self.reply.max_videos) {
            return Err(ConfigError::Invalid(format!(
                "reply.max_videos must be within 1..={MAX_MEDIA_CAP}"
            )));
        }

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::Invalid(
                "provider.temperature must be within 0.0..=2.0".to_string(),
            ));
        }

        if self.provider.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "provider.request_timeout must be > 0".to_string(),
            ));
        }

        if self.reply.allowed_image_hosts.is_empty() {
            return Err(ConfigError::Invalid(
                "reply.allowed_image_hosts must not be empty".to_string(),
            ));
        }

        Url::parse(&self.provider.base_url)?;
        Url::parse(&self.places.base_url)?;

        Ok(())
    }
}

fn parse_or<T: FromStr>(value: Option<String>, name: &str, default: T) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparseable {ENV_PREFIX}{name}={raw:?}, using default");
            default
        }),
        None => default,
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Directory served for static assets.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 10_000,
            static_dir: PathBuf::from("static"),
        }
    }
}

/// Storage configuration for conversation data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Messages table name.
    pub messages_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("chat_history.db"),
            messages_table: "messages".to_string(),
        }
    }
}

/// Order in which credentials are tried for one request.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// Configured order.
    Fixed,
    /// Fresh random permutation per request.
    #[default]
    Shuffled,
}

impl FromStr for Traversal {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "shuffled" | "random" => Ok(Self::Shuffled),
            _ => Err(value.to_string()),
        }
    }
}

/// Generative provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// REST base URL of the provider.
    pub base_url: String,
    /// Model identifier; one value, no runtime fallbacks.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Output token budget.
    pub max_output_tokens: u32,
    /// Upper bound for one provider call.
    #[serde(with = "duration_millis")]
    pub request_timeout: Duration,
    /// Pause after a transient failure before the next credential.
    #[serde(with = "duration_millis")]
    pub transient_backoff: Duration,
    /// Credential traversal order.
    pub traversal: Traversal,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.3,
            max_output_tokens: 2048,
            request_timeout: Duration::from_secs(30),
            transient_backoff: Duration::from_millis(500),
            traversal: Traversal::Shuffled,
        }
    }
}

/// Conversation reconstruction settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Number of stored turns replayed to the provider.
    pub window: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self { window: 6 }
    }
}

/// Structured reply sanitizing policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplyConfig {
    /// Maximum images kept per reply.
    pub max_images: usize,
    /// Maximum video links kept per reply.
    pub max_videos: usize,
    /// Maximum suggestions kept per reply.
    pub max_suggestions: usize,
    /// Hosts (and their subdomains) trusted for images.
    pub allowed_image_hosts: Vec<String>,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            max_images: 4,
            max_videos: 3,
            max_suggestions: 4,
            allowed_image_hosts: vec![
                "upload.wikimedia.org".to_string(),
                "images.unsplash.com".to_string(),
                "cdn.pixabay.com".to_string(),
                "images.pexels.com".to_string(),
            ],
        }
    }
}

/// Document export settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// TTF font able to render Vietnamese.
    pub font_path: PathBuf,
    /// Timeout for one image download.
    #[serde(with = "duration_millis")]
    pub image_timeout: Duration,
    /// Images larger than this are skipped.
    pub max_image_bytes: usize,
    /// Name printed in the page footer.
    pub builder_name: String,
    /// Hotline printed in the page footer.
    pub hotline: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from("static/DejaVuSans.ttf"),
            image_timeout: Duration::from_secs(10),
            max_image_bytes: 5 * 1024 * 1024, // 5 MB
            builder_name: "Vietnam Travel AI – Tours, Cuisine & Culture Guide".to_string(),
            hotline: "+84-908-08-3566".to_string(),
        }
    }
}

/// Map and place search settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlacesConfig {
    /// `SerpAPI` key; place search is disabled without it.
    pub serpapi_key: Option<String>,
    /// `SerpAPI` endpoint.
    pub base_url: String,
    /// Query used when the client sends none.
    pub default_query: String,
    /// Result language.
    pub language: String,
    /// Result region.
    pub region: String,
    /// Request timeout.
    #[serde(with = "duration_millis")]
    pub request_timeout: Duration,
    /// TTL for cached results (seconds).
    pub cache_ttl_seconds: u64,
    /// Maximum cache size (number of entries).
    pub cache_max_entries: usize,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            serpapi_key: None,
            base_url: "https://serpapi.com/search.json".to_string(),
            default_query: crate::assistant::DEFAULT_CITY.to_string(),
            language: "vi".to_string(),
            region: "vn".to_string(),
            request_timeout: Duration::from_secs(15),
            cache_ttl_seconds: 3600, // 1 hour
            cache_max_entries: 500,
        }
    }
}

/// Serde module for millisecond `Duration` fields.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.conversation.window, 6);
        assert_eq!(config.provider.traversal, Traversal::Shuffled);
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TRAVEL_GUIDE_PORT", "8080"),
            ("TRAVEL_GUIDE_HISTORY_WINDOW", "4"),
            ("TRAVEL_GUIDE_TRAVERSAL", "fixed"),
            ("TRAVEL_GUIDE_FONT_PATH", "/fonts/DejaVuSans.ttf"),
            ("SERPAPI_KEY", " serp-key "),
        ]));

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.conversation.window, 4);
        assert_eq!(config.provider.traversal, Traversal::Fixed);
        assert_eq!(config.export.font_path, PathBuf::from("/fonts/DejaVuSans.ttf"));
        assert_eq!(config.places.serpapi_key.as_deref(), Some("serp-key"));
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TRAVEL_GUIDE_PORT", "not-a-port"),
            ("TRAVEL_GUIDE_TRAVERSAL", "sideways"),
        ]));
        assert_eq!(config.server.port, ServerConfig::default().port);
        assert_eq!(config.provider.traversal, Traversal::Shuffled);
    }

    #[test]
    fn test_validate_rejects_oversized_media_cap() {
        let mut config = AppConfig::default();
        config.reply.max_images = 12;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = AppConfig::default();
        config.conversation.window = 0;
        assert!(config.validate().is_err());
    }
}
