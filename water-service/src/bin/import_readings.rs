use anyhow::{bail, Context, Result};
use std::{env, sync::Arc};
use water_client::domain::UserId;
use water_service::{
    config::AppConfig,
    engine::ConsumptionEngine,
    observability,
    pipeline::{ImportRow, Pipeline},
    sinks::EngineSink,
    sources::ReadingCsvFileSource,
    store::open_store,
    transform,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: import_readings <csv_file_path> [owner_id]");
    }
    let file_path = &args[1];
    let default_owner: Option<UserId> = args
        .get(2)
        .map(|raw| raw.parse().with_context(|| format!("invalid owner_id '{raw}'")))
        .transpose()?;

    // Reads the same config file as the service (WATER_CONFIG).
    let cfg = AppConfig::load()?;
    if cfg.database.is_none() {
        tracing::warn!("importing into the in-memory store; rows will not persist");
    }

    let store = open_store(cfg.database.as_ref()).await?;

    let pipeline: Pipeline<_, ImportRow, _> = Pipeline {
        source: ReadingCsvFileSource::new(file_path, default_owner),
        transforms: vec![Arc::new(transform::ReadingValidation)],
        sink: EngineSink::new(store, ConsumptionEngine::new(cfg.spike)),
    };

    let report = pipeline.run().await?;
    tracing::info!(
        written = report.written,
        rejected = report.rejected,
        file = %file_path,
        "import finished"
    );

    Ok(())
}
