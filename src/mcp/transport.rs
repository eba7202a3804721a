//! Stdio transport.
//!
//! Direct invocation by desktop MCP clients and agentic IDEs: the server
//! speaks framed JSON-RPC on stdin/stdout, which is why all logging goes
//! to stderr.

use std::sync::Arc;

use rmcp::service::ServiceExt;
use rmcp::transport::io::stdio;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::handler::{AppState, ConduitServer};
use crate::{AppError, Result};

/// Run the MCP server on stdin/stdout until the client disconnects or
/// `ct` fires.
///
/// # Errors
///
/// Returns `AppError::Transport` when the handshake cannot be completed
/// or the running session dies.
pub async fn serve_stdio(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    info!(transport = "stdio", "serving MCP on stdin/stdout");

    let session = ConduitServer::new(state)
        .serve_with_ct(stdio(), ct)
        .await
        .map_err(|err| AppError::Transport(format!("stdio handshake: {err}")))?;

    session
        .waiting()
        .await
        .map_err(|err| AppError::Transport(format!("stdio session ended abnormally: {err}")))?;

    info!(transport = "stdio", "session closed");
    Ok(())
}
