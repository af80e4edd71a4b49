use crate::exporter::{Connector, Exporter};
use anyhow::Result;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// HTTP server for the Prometheus scrape endpoint
pub struct MetricsServer<K: Connector> {
    exporter: Arc<Exporter<K>>,
    addr: SocketAddr,
}

impl<K: Connector> MetricsServer<K> {
    pub fn new(exporter: Exporter<K>, addr: SocketAddr) -> Self {
        Self {
            exporter: Arc::new(exporter),
            addr,
        }
    }

    pub fn router(&self) -> Router {
        let exporter = self.exporter.clone();

        Router::new()
            .route(
                "/metrics",
                get(move || {
                    let exporter = exporter.clone();
                    async move { metrics_response::<K>(&exporter).await }
                }),
            )
            .route("/healthz", get(|| async { "ok" }))
    }

    /// Start the metrics HTTP server
    pub async fn serve(self) -> Result<()> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(
            addr = %self.addr,
            devices = self.exporter.devices().len(),
            "metrics server listening"
        );
        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn metrics_response<K: Connector>(exporter: &Exporter<K>) -> Response {
    match exporter.render().await {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "error rendering metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("# Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}
