//! ---
//! devreg_section: "05-networking-external-interfaces"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Networking API surface for device registration and topology."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---

use std::fmt;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use devreg_core::{DeviceRegistration, RegistryService};
use prometheus::{Registry, TextEncoder};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

mod dto;
mod error;
mod metrics;

pub use dto::DeviceResponse;
pub use error::{ApiError, ErrorResponse};
pub use metrics::ApiMetrics;

/// Shared API state exposed to handlers.
pub struct ApiState {
    service: RegistryService,
    registry: Option<Arc<Registry>>,
    metrics: Option<ApiMetrics>,
}

impl ApiState {
    pub fn new(service: RegistryService) -> Self {
        Self {
            service,
            registry: None,
            metrics: None,
        }
    }

    /// Count requests in `registry` and expose it at `/metrics`.
    pub fn with_metrics_registry(mut self, registry: Arc<Registry>) -> Result<Self> {
        let metrics = ApiMetrics::new(&registry).context("failed to register api metrics")?;
        self.metrics = Some(metrics);
        self.registry = Some(registry);
        Ok(self)
    }

    fn finish<T: Serialize>(
        &self,
        route: &'static str,
        outcome: Result<T, ApiError>,
    ) -> Result<Json<T>, ApiError> {
        let status = match &outcome {
            Ok(_) => StatusCode::OK,
            Err(err) => err.status(),
        };
        if let Some(metrics) = &self.metrics {
            metrics.record(route, status);
        }
        outcome.map(Json)
    }
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("service", &self.service)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ApiServer {
    /// The bound address, with the actual port when `:0` was requested.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

/// Build the registry routes over `state`.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/devices", get(list_devices).post(register_device))
        .route("/devices/topology", get(full_topology))
        .route("/devices/topology/:mac", get(topology_from))
        .route("/devices/:mac", get(get_device))
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(get_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the REST API on `addr`. Must be called from within a tokio runtime.
pub fn spawn_api_server(state: Arc<ApiState>, addr: SocketAddr) -> Result<ApiServer> {
    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind API listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure API listener as non-blocking")?;
    let local_addr = listener
        .local_addr()
        .context("failed to read API listener address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let app = router(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %local_addr, "api server listening");
        if let Err(err) = axum::serve(tcp_listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %local_addr, error = %err, "api server exited with error");
            return Err(err.into());
        }
        Ok(())
    });

    Ok(ApiServer {
        addr: local_addr,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

async fn register_device(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<DeviceRegistration>, JsonRejection>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let outcome = match payload {
        Ok(Json(registration)) => {
            // File-backed stores write the snapshot synchronously.
            let service = state.service.clone();
            match tokio::task::spawn_blocking(move || service.register(registration)).await {
                Ok(result) => result.map(DeviceResponse::from).map_err(ApiError::from),
                Err(err) => {
                    error!(error = %err, "registration task failed");
                    Err(ApiError::internal("registration task failed"))
                }
            }
        }
        Err(rejection) => Err(ApiError::malformed(rejection.body_text())),
    };
    state.finish("register", outcome)
}

async fn list_devices(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<DeviceResponse>>, ApiError> {
    let outcome = state
        .service
        .list_sorted()
        .map(|devices| devices.into_iter().map(DeviceResponse::from).collect())
        .map_err(ApiError::from);
    state.finish("list", outcome)
}

async fn get_device(
    State(state): State<Arc<ApiState>>,
    Path(mac): Path<String>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let outcome = state
        .service
        .get_by_mac(&mac)
        .map(DeviceResponse::from)
        .map_err(ApiError::from);
    state.finish("get", outcome)
}

async fn full_topology(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<devreg_core::TopologyNode>>, ApiError> {
    let outcome = state.service.full_topology().map_err(ApiError::from);
    state.finish("topology", outcome)
}

async fn topology_from(
    State(state): State<Arc<ApiState>>,
    Path(mac): Path<String>,
) -> Result<Json<devreg_core::TopologyNode>, ApiError> {
    let outcome = state.service.topology_from(&mac).map_err(ApiError::from);
    state.finish("topology_from", outcome)
}

async fn get_metrics(State(state): State<Arc<ApiState>>) -> Response {
    let Some(registry) = &state.registry else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics registry unavailable",
        )
            .into_response();
    };

    let encoder = TextEncoder::new();
    let families = registry.gather();
    match encoder.encode_to_string(&families) {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => {
            warn!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
