//! Shared application state handed to every service.

use anyhow::Result;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::config::KoibitoConfig;
use crate::db::{self, SharedDb};
use crate::embedding::{self, EmbeddingProvider};
use crate::image::leonardo::{ImageGenerator, LeonardoClient};
use crate::llm::ModelRouter;

#[derive(Clone)]
pub struct AppState {
    pub db: SharedDb,
    pub config: Arc<KoibitoConfig>,
    pub models: ModelRouter,
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// `None` when no Leonardo API key is configured.
    pub images: Option<Arc<dyn ImageGenerator>>,
}

impl AppState {
    /// Open the database and build every outbound client from config.
    pub fn open(config: KoibitoConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path)?;
        tracing::info!(db = %db_path.display(), "database ready");

        let embedder = embedding::create_provider(&config)?;
        if let Ok(Some(stored_model)) = db::migrations::get_embedding_model(&conn) {
            if embedder.model_name() != "none" && stored_model != embedder.model_name() {
                tracing::warn!(
                    stored = %stored_model,
                    configured = %embedder.model_name(),
                    "embedding model changed, run `koibito re-embed` to update all vectors"
                );
            }
        }

        let models = ModelRouter::from_config(&config.chat)?;
        let images = match config.image.leonardo_api_key.as_deref() {
            Some(key) if !key.is_empty() => {
                Some(Arc::new(LeonardoClient::new(&config.image, key)?) as Arc<dyn ImageGenerator>)
            }
            _ => None,
        };

        Ok(Self::new(conn, config, models, embedder, images))
    }

    /// Assemble state from parts. Tests use this with an in-memory database
    /// and scripted providers.
    pub fn new(
        conn: Connection,
        config: KoibitoConfig,
        models: ModelRouter,
        embedder: Arc<dyn EmbeddingProvider>,
        images: Option<Arc<dyn ImageGenerator>>,
    ) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            config: Arc::new(config),
            models,
            embedder,
            images,
        }
    }
}
