use std::net::SocketAddr;

use axum::{extract::State, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global Prometheus recorder once and return its handle.
fn recorder_handle() -> anyhow::Result<PrometheusHandle> {
    PROM_HANDLE
        .get_or_try_init(|| PrometheusBuilder::new().install_recorder())
        .cloned()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus metrics recorder: {e}"))
}

/// Install the Prometheus recorder and serve `/metrics` on `bind_addr`.
///
/// Must be called from within a tokio runtime. Calling it twice reuses the
/// recorder installed first.
pub fn init(bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics bind address '{bind_addr}': {e}"))?;

    let handle = recorder_handle()?;

    tokio::spawn(async move {
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(handle);

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(%addr, "metrics endpoint listening");
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    tracing::error!(error = %e, "metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to bind metrics listener");
            }
        }
    });

    Ok(())
}

async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
