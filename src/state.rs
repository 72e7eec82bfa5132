use sqlx::PgPool;

use crate::config::Config;
use crate::utils::storage::FileStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub store: FileStore,
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self {
            pool,
            store: FileStore::new(&config.uploads_dir),
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}
