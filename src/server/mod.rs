//! Log relay and static file server
//!
//! - `POST /log`: ingest a batch of event records (or a single record)
//! - `OPTIONS *`: permissive CORS preflight
//! - anything else: a file under the app root
//!
//! Persistence is best-effort: a failing store is logged and the client still
//! gets its acknowledgement.

pub mod router;
pub mod store;

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info};
use tokio::net::TcpListener;

use crate::settings::ServerSettings;
pub use router::build_router;
pub use store::{EventStore, JsonlStore, PostgresStore, StoreError};

/// Shared request state
#[derive(Debug)]
pub struct AppState {
    pub store: EventStore,
    /// Static file root
    pub root: PathBuf,
}

impl AppState {
    pub fn new(store: EventStore, root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            root: root.into(),
        }
    }
}

/// Errors that stop the server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("serve error: {0}")]
    Serve(#[source] io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Bind `0.0.0.0:<port>` and serve until Ctrl-C
pub async fn run(settings: &ServerSettings) -> Result<(), ServerError> {
    let store = EventStore::open(&settings.backend())?;
    info!("Persisting events to {}", store.describe());

    let state = Arc::new(AppState::new(store, settings.root.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(
        "Serving {} on http://localhost:{}",
        settings.root.display(),
        settings.port
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            error!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
