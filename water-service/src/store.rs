use std::sync::Arc;

use water_client::{MemoryStore, PgStore, WaterStore};

use crate::config::DatabaseConfig;

/// Connect to PostgreSQL when configured, otherwise fall back to a
/// process-local store whose contents are lost on exit.
pub async fn open_store(database: Option<&DatabaseConfig>) -> anyhow::Result<Arc<dyn WaterStore>> {
    let Some(db) = database else {
        tracing::warn!("no [database] configured, readings are kept in memory only");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let store = PgStore::connect(&db.uri, db.max_connections).await?;
    if db.apply_schema {
        store.apply_schema().await?;
        tracing::info!("database schema applied");
    }

    Ok(Arc::new(store))
}
