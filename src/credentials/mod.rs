//! Provider credential pool.
//!
//! Credentials are gathered once at startup from every environment entry
//! whose key names a provider API key, e.g. `GEMINI_API_KEY`,
//! `GEMINI_API_KEY_2` or a comma-separated `GOOGLE_API_KEYS`. The resulting
//! pool is immutable and shared read-only by all requests.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

/// Prefix every provider API key starts with.
const KEY_PREFIX: &str = "AIza";
/// Exact length of a provider API key.
const KEY_LEN: usize = 39;
/// Separator for multi-value entries.
const VALUE_SEPARATOR: char = ',';

static CREDENTIAL_KEY_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?:GEMINI|GOOGLE)_API_KEYS?(?:_[0-9]+)?$").ok());

/// Whether a configuration key names a credential entry.
#[must_use]
pub fn is_credential_key(name: &str) -> bool {
    CREDENTIAL_KEY_NAME
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(name))
}

/// One provider API key.
///
/// `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(Arc<str>);

impl Credential {
    /// Validate a raw value and wrap it.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim();
        let well_formed = value.len() == KEY_LEN
            && value.starts_with(KEY_PREFIX)
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        well_formed.then(|| Self(Arc::from(value)))
    }

    /// Expose the secret for an outbound request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short masked form for logs.
    #[must_use]
    pub fn hint(&self) -> String {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{KEY_PREFIX}…{tail}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.hint())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hint())
    }
}

/// Ordered, deduplicated, immutable list of credentials.
#[derive(Clone, Debug, Default)]
pub struct CredentialPool {
    credentials: Arc<[Credential]>,
}

impl CredentialPool {
    /// Scan the process environment. Never fails; an empty pool means the
    /// provider is unavailable.
    ///
    /// Entries whose key or value is not valid UTF-8 are skipped.
    #[must_use]
    pub fn load() -> Self {
        let mut skipped = 0_usize;
        let entries: Vec<(String, String)> = std::env::vars_os()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                _ => {
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            tracing::debug!(skipped, "Skipped non-UTF-8 environment entries");
        }
        Self::from_entries(entries)
    }

    /// Build a pool from arbitrary key/value configuration entries.
    ///
    /// Entries are visited in key-name order so the result does not depend
    /// on environment iteration order.
    #[must_use]
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut matching: Vec<(String, String)> = entries
            .into_iter()
            .filter(|(key, _)| is_credential_key(key.as_ref()))
            .map(|(key, value)| (key.as_ref().to_string(), value.as_ref().to_string()))
            .collect();
        matching.sort_by(|a, b| a.0.cmp(&b.0));

        let mut seen = HashSet::new();
        let mut credentials = Vec::new();
        let mut rejected = 0_usize;

        for (_, value) in &matching {
            for raw in value.split(VALUE_SEPARATOR) {
                if raw.trim().is_empty() {
                    continue;
                }
                match Credential::parse(raw) {
                    Some(credential) => {
                        if seen.insert(credential.clone()) {
                            credentials.push(credential);
                        }
                    }
                    None => rejected += 1,
                }
            }
        }

        if rejected > 0 {
            tracing::warn!(rejected, "Ignored malformed provider credentials");
        }
        tracing::info!(
            count = credentials.len(),
            entries = matching.len(),
            "Loaded provider credential pool"
        );

        Self {
            credentials: credentials.into(),
        }
    }

    /// Build a pool from already-validated credentials, dropping duplicates.
    #[must_use]
    pub fn from_credentials(credentials: Vec<Credential>) -> Self {
        let mut seen = HashSet::new();
        let unique: Vec<Credential> = credentials
            .into_iter()
            .filter(|c| seen.insert(c.clone()))
            .collect();
        Self {
            credentials: unique.into(),
        }
    }

    /// Credentials in configured order.
    #[must_use]
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// Number of usable credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// True when no provider access is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(fill: char) -> String {
        format!("{KEY_PREFIX}{}", fill.to_string().repeat(KEY_LEN - KEY_PREFIX.len()))
    }

    #[test]
    fn test_key_name_pattern() {
        assert!(is_credential_key("GEMINI_API_KEY"));
        assert!(is_credential_key("GEMINI_API_KEY_2"));
        assert!(is_credential_key("GOOGLE_API_KEYS"));
        assert!(!is_credential_key("OPENAI_API_KEY"));
        assert!(!is_credential_key("GEMINI_API_KEY_BACKUP"));
        assert!(!is_credential_key("MY_GEMINI_API_KEY"));
    }

    #[test]
    fn test_credential_format() {
        assert!(Credential::parse(&key('a')).is_some());
        assert!(Credential::parse(&format!("  {}  ", key('b'))).is_some());
        assert!(Credential::parse("AIzashort").is_none());
        assert!(Credential::parse(&format!("sk-{}", "a".repeat(36))).is_none());
        assert!(Credential::parse(&key('a').replace('a', "!")).is_none());
    }

    #[test]
    fn test_load_dedupes_and_drops_malformed() {
        let a = key('a');
        let b = key('b');
        let entries = vec![
            ("GEMINI_API_KEY".to_string(), a.clone()),
            ("GEMINI_API_KEY_2".to_string(), format!("{b}, {a} ,,not-a-key")),
            ("GOOGLE_API_KEY".to_string(), "   ".to_string()),
            ("UNRELATED".to_string(), key('c')),
        ];

        let pool = CredentialPool::from_entries(entries);
        let exposed: Vec<&str> = pool.credentials().iter().map(Credential::expose).collect();
        assert_eq!(exposed, [a.as_str(), b.as_str()]);
    }

    #[test]
    fn test_empty_configuration_gives_empty_pool() {
        let pool = CredentialPool::from_entries(Vec::<(String, String)>::new());
        assert!(pool.is_empty());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let raw = key('z');
        let credential = Credential::parse(&raw).unwrap();
        let shown = format!("{credential:?} {credential}");
        assert!(!shown.contains(&raw));
        assert!(shown.contains("zzzz"));
    }
}
