//! Media URL rules: image host allow-list and video identifier extraction.

use url::Url;

/// Length of a video identifier.
pub const VIDEO_ID_LEN: usize = 11;

const YOUTUBE_HOSTS: [&str; 3] = ["youtube.com", "www.youtube.com", "m.youtube.com"];
const SHORT_LINK_HOSTS: [&str; 2] = ["youtu.be", "www.youtu.be"];

fn parse_lenient(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains("://") {
        Url::parse(raw).ok()
    } else {
        Url::parse(&format!("https://{raw}")).ok()
    }
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract the video identifier from a watch, short-link or embed URL.
///
/// Returns `None` unless the URL matches one of the recognised forms and
/// the extracted token has exactly [`VIDEO_ID_LEN`] valid characters.
#[must_use]
pub fn extract_video_id(raw: &str) -> Option<String> {
    let url = parse_lenient(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = if YOUTUBE_HOSTS.contains(&host.as_str()) {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed") => segments.next().map(str::to_string),
            _ => None,
        }
    } else if SHORT_LINK_HOSTS.contains(&host.as_str()) {
        segments.next().map(str::to_string)
    } else {
        None
    }?;

    is_video_id(&candidate).then_some(candidate)
}

/// Canonical watch URL for a video identifier.
#[must_use]
pub fn canonical_video_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Whether an image URL is served over HTTPS by an allow-listed host or
/// one of its subdomains.
#[must_use]
pub fn is_allowed_image_url(raw: &str, allowed_hosts: &[String]) -> bool {
    let Ok(url) = Url::parse(raw.trim()) else {
        return false;
    };
    if url.scheme() != "https" {
        return false;
    }
    let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
        return false;
    };

    allowed_hosts.iter().any(|allowed| {
        let allowed = allowed.to_ascii_lowercase();
        host == allowed || host.ends_with(&format!(".{allowed}"))
    })
}
