//! HTTP gateway
//!
//! `route_table()` → `build_router()` → `dispatch()` → [`Operation::execute`].
//! Handlers hold no state of their own; the store handle is injected
//! through [`AppState`].

pub mod error;
pub mod operation;
pub mod payload;
pub mod response;
pub mod routes;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    routing::{MethodRouter, on},
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::store::Store;
use error::ApiError;
use operation::{Operation, OperationInput};
use payload::Payload;
use routes::{Route, route_table};
use state::AppState;

/// Run one operation and log its failure. This is the only place where
/// handler errors are observed before becoming the error envelope.
pub async fn dispatch(
    state: &AppState,
    operation: &Operation,
    input: OperationInput,
) -> Result<Json<Value>, ApiError> {
    match operation.execute(state.store.as_ref(), input).await {
        Ok(body) => Ok(Json(body)),
        Err(err) => {
            tracing::warn!(operation = ?operation, error = %err, "request failed");
            Err(err)
        }
    }
}

fn method_router(route: Route) -> MethodRouter<Arc<AppState>> {
    let operation = Arc::new(route.operation);

    if operation.takes_path_id() {
        on(
            route.method,
            move |State(state): State<Arc<AppState>>,
                  path: Result<Path<String>, PathRejection>,
                  Payload(payload): Payload| {
                let operation = operation.clone();
                async move {
                    let Path(id) = path.map_err(|rejection| {
                        tracing::warn!(error = %rejection.body_text(), "bad path parameter");
                        ApiError::OperationFailed(rejection.body_text())
                    })?;
                    let input = OperationInput {
                        path_id: Some(id),
                        payload,
                    };
                    dispatch(&state, &operation, input).await
                }
            },
        )
    } else {
        on(
            route.method,
            move |State(state): State<Arc<AppState>>, Payload(payload): Payload| {
                let operation = operation.clone();
                async move {
                    let input = OperationInput {
                        path_id: None,
                        payload,
                    };
                    dispatch(&state, &operation, input).await
                }
            },
        )
    }
}

/// Build the full application router over `store`
pub fn build_router(store: Arc<dyn Store>) -> Router {
    let state = Arc::new(AppState::new(store));

    let router = route_table()
        .into_iter()
        .fold(Router::new(), |router, route| {
            let path = route.path;
            router.route(path, method_router(route))
        });

    router.with_state(state).layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl+C / SIGTERM, then release the store
pub async fn run_server(config: &ServerConfig, store: Arc<dyn Store>) -> anyhow::Result<()> {
    let app = build_router(store.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server is running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    store.close().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
