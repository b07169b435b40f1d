//! Transcript export to a paginated PDF.

pub mod error;
pub mod fetch;
pub mod layout;

use std::sync::Arc;

use chrono::Utc;

use crate::config::ExportConfig;
use crate::reply::{StructuredReply, is_allowed_image_url};
use crate::storage::{Turn, TurnRole};

pub use error::{ExportError, ExportResult};
pub use fetch::{HttpImageFetcher, ImageFetcher};
pub use layout::{Entry, Frame, compose, wrap};

/// Heading of the exported document.
pub const DOCUMENT_TITLE: &str = "LỊCH SỬ CHAT";
/// Download name of the exported document.
pub const DOWNLOAD_NAME: &str = "Vietnam_Travel_Report.pdf";

const fn role_label(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "Người dùng",
        TurnRole::Assistant => "Trợ lý",
    }
}

/// Renders persisted turns, with embedded images, into PDF bytes.
pub struct DocumentExporter {
    config: ExportConfig,
    allowed_hosts: Vec<String>,
    fetcher: Arc<dyn ImageFetcher>,
    font: Option<Arc<[u8]>>,
}

impl DocumentExporter {
    /// Create an exporter. The font file is read once here; when it is
    /// missing every export uses the built-in fallback font.
    #[must_use]
    pub fn new(
        config: ExportConfig,
        allowed_hosts: Vec<String>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        let font = match std::fs::read(&config.font_path) {
            Ok(bytes) => Some(Arc::from(bytes)),
            Err(err) => {
                tracing::warn!(
                    path = %config.font_path.display(),
                    "Export font unavailable, diacritics will be degraded: {err}"
                );
                None
            }
        };
        Self {
            config,
            allowed_hosts,
            fetcher,
            font,
        }
    }

    /// Whether the full-coverage font was loaded.
    #[must_use]
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Render `turns` in order. Always yields a document, even for an empty
    /// transcript or when every image is unreachable.
    ///
    /// # Errors
    /// Returns an error only if PDF serialization fails.
    pub async fn render(&self, turns: &[Turn]) -> ExportResult<Vec<u8>> {
        let mut entries = Vec::with_capacity(turns.len());
        for turn in turns {
            entries.push(self.entry(turn).await);
        }

        let frame = Frame {
            title: DOCUMENT_TITLE,
            subtitle: Utc::now().format("%d/%m/%Y %H:%M UTC").to_string(),
            footer: format!("{} | {}", self.config.builder_name, self.config.hotline),
        };
        let bytes = compose(&frame, &entries, self.font.as_deref())?;
        tracing::info!(turns = turns.len(), bytes = bytes.len(), "Rendered transcript PDF");
        Ok(bytes)
    }

    async fn entry(&self, turn: &Turn) -> Entry {
        let label = role_label(turn.role);
        let reply = match turn.role {
            TurnRole::User => None,
            TurnRole::Assistant => StructuredReply::from_stored(&turn.content),
        };
        let Some(reply) = reply else {
            return Entry {
                label,
                text: turn.content.clone(),
                ..Entry::default()
            };
        };

        let mut images = Vec::with_capacity(reply.images.len());
        for image in &reply.images {
            match self.load_image(&image.url).await {
                Ok(decoded) => images.push((decoded, image.caption.clone())),
                Err(err) => tracing::warn!(url = %image.url, "Skipping image in export: {err}"),
            }
        }

        Entry {
            label,
            text: reply.text,
            images,
            videos: reply.video_links,
        }
    }

    async fn load_image(&self, url: &str) -> ExportResult<image::DynamicImage> {
        if !is_allowed_image_url(url, &self.allowed_hosts) {
            return Err(ExportError::Disallowed(url.to_string()));
        }
        let bytes = self.fetcher.fetch(url).await?;
        Ok(image::load_from_memory(&bytes)?)
    }
}
