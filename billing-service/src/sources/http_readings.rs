use std::{net::SocketAddr, sync::Arc};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    pipeline::{Envelope, EnvelopeStream, PipelineError, Source},
    reading::Reading,
};

struct SharedSender<T> {
    tx: mpsc::Sender<Envelope<T>>,
}

impl<T> Clone for SharedSender<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

/// Accepts JSON arrays of readings on `POST /ingest/<kind>_readings` and
/// hands them to the pipeline through a bounded channel.
pub struct HttpReadingSource<T> {
    receiver: Arc<tokio::sync::Mutex<Option<mpsc::Receiver<Envelope<T>>>>>,
}

impl<T: Reading> HttpReadingSource<T> {
    pub fn route() -> String {
        format!("/ingest/{}_readings", T::KIND)
    }

    pub async fn new(bind_addr: &str, channel_capacity: usize) -> Result<Self, PipelineError> {
        let (tx, rx) = mpsc::channel(channel_capacity);
        let app = router(SharedSender { tx });

        let addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| PipelineError::Source(format!("invalid bind addr: {e}")))?;

        tokio::spawn(async move {
            match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => {
                    tracing::info!(%addr, kind = T::KIND, "reading ingest endpoint listening");
                    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                        tracing::error!(error = %e, kind = T::KIND, "HTTP reading source server error");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, kind = T::KIND, "failed to bind HTTP reading source listener");
                }
            }
        });

        Ok(Self {
            receiver: Arc::new(tokio::sync::Mutex::new(Some(rx))),
        })
    }
}

fn router<T: Reading>(sender: SharedSender<T>) -> Router {
    Router::new()
        .route(&HttpReadingSource::<T>::route(), post(ingest_readings::<T>))
        .with_state(sender)
}

#[async_trait::async_trait]
impl<T: Reading> Source<T> for HttpReadingSource<T> {
    async fn stream(&self) -> EnvelopeStream<T> {
        let mut guard = self.receiver.lock().await;
        let Some(rx) = guard.take() else {
            return Box::pin(futures::stream::once(async {
                Err(PipelineError::Source(
                    "HTTP reading source stream already taken; only one consumer supported".to_string(),
                ))
            }));
        };

        Box::pin(ReceiverStream::new(rx).map(Ok))
    }
}

async fn ingest_readings<T: Reading>(
    State(sender): State<SharedSender<T>>,
    Json(payload): Json<Vec<T>>,
) -> Result<StatusCode, StatusCode> {
    metrics::counter!("http_ingest_requests_total", "kind" => T::KIND).increment(1);

    for reading in payload {
        if sender.tx.send(Envelope::now(reading)).await.is_err() {
            // Channel closed; treat as server error
            metrics::counter!("http_ingest_failed_total", "kind" => T::KIND).increment(1);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    Ok(StatusCode::ACCEPTED)
}
