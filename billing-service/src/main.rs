use std::{sync::Arc, time::Duration};

use anyhow::Result;
use billing_client::domain::{ConsumptionReading, GenerationReading};
use billing_service::{
    config::{AppConfig, PipelineConfig},
    metrics_server, observability,
    pipeline::{Pipeline, Transform},
    reading::Reading,
    sinks::PgReadingSink,
    sources::HttpReadingSource,
    transform::ReadingValidation,
};
use sqlx::{postgres::PgPoolOptions, PgPool};

async fn reading_pipeline<T: Reading>(
    cfg: &PipelineConfig,
    pool: PgPool,
) -> Result<Pipeline<HttpReadingSource<T>, T, PgReadingSink<T>>> {
    let source = HttpReadingSource::<T>::new(&cfg.source.http_bind_addr, cfg.source.channel_capacity).await?;
    let sink = PgReadingSink::<T>::new(
        pool,
        cfg.sink.batch_size,
        cfg.sink.max_retries,
        Duration::from_millis(cfg.sink.retry_backoff_ms),
    );
    let validation: Arc<dyn Transform<T>> = Arc::new(ReadingValidation::<T>::default());

    Ok(Pipeline {
        name: cfg.name.clone(),
        source,
        transforms: vec![validation],
        sink,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let consumption = reading_pipeline::<ConsumptionReading>(&cfg.consumption_readings, pool.clone()).await?;
    let generation = reading_pipeline::<GenerationReading>(&cfg.generation_readings, pool).await?;

    tracing::info!(
        consumption_route = %HttpReadingSource::<ConsumptionReading>::route(),
        generation_route = %HttpReadingSource::<GenerationReading>::route(),
        "reading ingestion started"
    );

    // Run both pipelines concurrently
    tokio::try_join!(consumption.run(), generation.run())?;

    Ok(())
}
