//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::assistant::TravelAssistant;
use crate::config::AppConfig;
use crate::credentials::CredentialPool;
use crate::export::{DocumentExporter, HttpImageFetcher, ImageFetcher};
use crate::places::PlacesService;
use crate::provider::{GeminiClient, ProviderClient};
use crate::storage::{SqliteTranscriptStore, TranscriptStore};

/// Boxed error used while assembling state.
pub type StateError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state.
pub struct AppState {
    /// Active configuration.
    pub config: AppConfig,
    /// Transcript storage.
    pub store: Arc<dyn TranscriptStore>,
    /// Chat orchestrator.
    pub assistant: TravelAssistant,
    /// Transcript exporter.
    pub exporter: DocumentExporter,
    /// Map search and place details.
    pub places: PlacesService,
}

impl AppState {
    /// Create production state: `SQLite` store, environment credentials,
    /// HTTP provider and image clients.
    ///
    /// # Errors
    /// Returns an error if the store or any HTTP client cannot be created.
    pub async fn new(config: AppConfig) -> Result<Arc<Self>, StateError> {
        let store = SqliteTranscriptStore::new(&config.storage)
            .await
            .map_err(|e| format!("Failed to open transcript store: {e}"))?;
        let client = GeminiClient::new(&config.provider)
            .map_err(|e| format!("Failed to create provider client: {e}"))?;
        let fetcher = HttpImageFetcher::new(&config.export)
            .map_err(|e| format!("Failed to create image fetcher: {e}"))?;
        let pool = CredentialPool::load();
        if pool.is_empty() {
            tracing::warn!("No provider credentials found; chat will answer with a fixed notice");
        }

        Self::from_parts(
            config,
            Arc::new(store),
            Arc::new(client),
            pool,
            Arc::new(fetcher),
        )
    }

    /// Assemble state from explicit collaborators.
    ///
    /// # Errors
    /// Returns an error if the places client cannot be created.
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn TranscriptStore>,
        client: Arc<dyn ProviderClient>,
        pool: CredentialPool,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Result<Arc<Self>, StateError> {
        let assistant = TravelAssistant::new(&config, Arc::clone(&store), client, pool);
        let exporter = DocumentExporter::new(
            config.export.clone(),
            config.reply.allowed_image_hosts.clone(),
            fetcher,
        );
        let places = PlacesService::new(config.places.clone())
            .map_err(|e| format!("Failed to create places client: {e}"))?;

        Ok(Arc::new(Self {
            config,
            store,
            assistant,
            exporter,
            places,
        }))
    }
}
