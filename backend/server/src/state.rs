use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use super::{
    config::Config,
    database::{ActivityStore, init_store, seed},
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ActivityStore>,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Arc<Self>> {
        let config = Config::load().context("Environment misconfigured")?;

        let store = init_store(&config)
            .await
            .with_context(|| format!("Failed to open {:?} store", config.store))?;

        if config.seed_on_start {
            info!("Seeding store...");
            seed(store.as_ref()).await.context("Failed to seed store")?;
        }

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn ActivityStore>) -> Arc<Self> {
        Arc::new(Self { config, store })
    }
}
