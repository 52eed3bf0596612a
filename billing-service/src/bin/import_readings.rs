use std::{env, path::Path, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use billing_client::domain::{ConsumptionReading, GenerationReading};
use billing_service::{
    config::{AppConfig, SinkConfig},
    observability,
    pipeline::{Pipeline, Transform},
    reading::Reading,
    sinks::PgReadingSink,
    sources::ReadingCsvFileSource,
    transform::ReadingValidation,
};
use sqlx::{postgres::PgPoolOptions, PgPool};

async fn import<T: Reading>(path: &Path, pool: PgPool, sink_cfg: &SinkConfig) -> Result<()> {
    let mut source = ReadingCsvFileSource::<T>::new(path);
    if path.extension().is_some_and(|ext| ext == "dat") {
        source = source.with_delimiter(b'|');
    }

    let sink = PgReadingSink::<T>::new(
        pool,
        sink_cfg.batch_size,
        sink_cfg.max_retries,
        Duration::from_millis(sink_cfg.retry_backoff_ms),
    );
    let validation: Arc<dyn Transform<T>> = Arc::new(ReadingValidation::<T>::default());

    let pipeline = Pipeline {
        name: format!("import-{}", T::KIND),
        source,
        transforms: vec![validation],
        sink,
    };

    pipeline.run().await?;
    Ok(())
}

/// Backfill consumption or generation readings from a CSV (or pipe-delimited
/// `.dat`) export.
///
/// Usage:
///   import_readings <consumption|generation> <file_path>
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("usage: import_readings <consumption|generation> <file_path>");
    }
    let path = Path::new(&args[2]);

    // BILLING_CONFIG can point to a backfill-specific file.
    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    match args[1].as_str() {
        "consumption" => import::<ConsumptionReading>(path, pool, &cfg.consumption_readings.sink).await?,
        "generation" => import::<GenerationReading>(path, pool, &cfg.generation_readings.sink).await?,
        other => bail!("unknown reading kind '{other}', expected consumption or generation"),
    }

    tracing::info!(file = %path.display(), kind = %args[1], "import finished");
    Ok(())
}
