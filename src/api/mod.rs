//! HTTP API server for voicechat
//!
//! A thin adapter that maps requests onto [`Session`] command handlers.
//! One session per process. Commands run one at a time under `commands`;
//! the session lock itself is only held for short reads and writes, never
//! across a generation or synthesis call.

pub mod health;
pub mod session;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::pipeline::TurnSynthesisPipeline;
use crate::session::Session;

/// Shared state for API handlers
pub struct ApiState {
    pub session: RwLock<Session>,
    /// Serializes mutating commands, including in-flight submissions
    pub commands: Mutex<()>,
    pub pipeline: TurnSynthesisPipeline,
    /// Where uploaded reference samples are written
    pub reference_path: PathBuf,
    /// Render `<audio>` players in turn views
    pub show_audio: bool,
}

impl ApiState {
    #[must_use]
    pub fn new(
        session: Session,
        pipeline: TurnSynthesisPipeline,
        reference_path: PathBuf,
        show_audio: bool,
    ) -> Self {
        Self {
            session: RwLock::new(session),
            commands: Mutex::new(()),
            pipeline,
            reference_path,
            show_audio,
        }
    }
}

/// Build the full router over shared state
pub fn router(state: Arc<ApiState>) -> Router {
    // CORS layer for cross-origin requests from a browser frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", session::router(Arc::clone(&state)))
        .merge(health::router())
        .merge(health::ready_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server bound to one session
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    #[must_use]
    pub fn new(state: ApiState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
        }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutting down API server");
            })
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}
