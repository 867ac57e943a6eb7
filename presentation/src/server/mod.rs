//! HTTP surface over the orchestrator.

pub mod dto;
mod routes;

pub use dto::{AskBody, ErrorBody, NO_QUESTION};
pub use routes::{EVENT_STREAM, JSON_LINES, router};

use orc_application::Orchestrator;
use tokio::net::TcpListener;
use tracing::info;

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(orchestrator: Orchestrator, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, router(orchestrator)).await
}
