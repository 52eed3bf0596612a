use std::{marker::PhantomData, time::Duration};

use futures::StreamExt;
use sqlx::{postgres::PgPool, Postgres, QueryBuilder};

use crate::{
    pipeline::{Envelope, PipelineError, Sink},
    reading::Reading,
};

/// Batched multi-row inserts of readings with linear retry backoff.
pub struct PgReadingSink<T> {
    pool: PgPool,
    batch_size: usize,
    max_retries: u32,
    retry_backoff: Duration,
    _marker: PhantomData<fn() -> T>,
}

pub(crate) fn insert_prefix<T: Reading>() -> String {
    format!("INSERT INTO {} ({}) ", T::TABLE, T::COLUMNS.join(", "))
}

impl<T: Reading> PgReadingSink<T> {
    pub fn new(pool: PgPool, batch_size: usize, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
            max_retries,
            retry_backoff,
            _marker: PhantomData,
        }
    }

    async fn flush_batch(&self, batch: &[Envelope<T>]) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut attempt: u32 = 0;
        loop {
            match self.insert_batch(batch).await {
                Ok(()) => {
                    metrics::counter!("readings_ingested_total", "kind" => T::KIND).increment(batch.len() as u64);

                    if let Some(min_received) = batch.iter().map(|e| e.received_at).min() {
                        if let Ok(dur) = std::time::SystemTime::now().duration_since(min_received) {
                            metrics::histogram!("ingest_end_to_end_latency_seconds", "kind" => T::KIND)
                                .record(dur.as_secs_f64());
                        }
                    }

                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        kind = T::KIND,
                        "reading sink flush failed, retrying with backoff"
                    );
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, kind = T::KIND, "reading sink flush failed, giving up");
                    metrics::counter!("reading_sink_errors_total", "kind" => T::KIND).increment(1);
                    return Err(PipelineError::Sink(e.to_string()));
                }
            }
        }
    }

    async fn insert_batch(&self, batch: &[Envelope<T>]) -> Result<(), sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(insert_prefix::<T>());
        builder.push_values(batch, |mut row, env| {
            env.payload.bind_row(&mut row);
        });

        builder.build().execute(&self.pool).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl<T: Reading> Sink<T> for PgReadingSink<T> {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut buffer: Vec<Envelope<T>> = Vec::with_capacity(self.batch_size);
        let mut skipped: u64 = 0;

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(error = %e, kind = T::KIND, "skipping reading rejected upstream");
                    continue;
                }
            };

            buffer.push(env);
            if buffer.len() >= self.batch_size {
                self.flush_batch(&buffer).await?;
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            self.flush_batch(&buffer).await?;
        }

        if skipped > 0 {
            tracing::warn!(skipped, kind = T::KIND, "readings skipped during import");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billing_client::domain::{ConsumptionReading, GenerationReading};

    #[test]
    fn insert_prefix_lists_table_and_columns() {
        assert_eq!(
            insert_prefix::<ConsumptionReading>(),
            "INSERT INTO consumption_readings (ts, occupant_id, building_id, consumption_kwh) "
        );
        assert_eq!(
            insert_prefix::<GenerationReading>(),
            "INSERT INTO generation_readings (ts, device_id, building_id, generation_kwh) "
        );
    }
}
