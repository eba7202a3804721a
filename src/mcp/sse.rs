//! HTTP transports: SSE and streamable HTTP.
//!
//! Both mount behind an axum router carrying the auth middleware, which
//! enforces the boundary described in the auth module: Slack bearers and
//! issued MCP tokens pass, the static API key is compared constant-time,
//! and with no key configured requests proceed unauthenticated.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::handler::{AppState, ConduitServer};
use crate::{AppError, Result};

/// Authenticate one HTTP request at the transport edge.
async fn authenticate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).to_owned());

    match state.auth.authorize(bearer.as_deref()) {
        Ok(_) => next.run(request).await,
        Err(err) => {
            warn!(%err, "request rejected at auth boundary");
            (StatusCode::UNAUTHORIZED, err.to_string()).into_response()
        }
    }
}

fn bind_address(state: &AppState) -> SocketAddr {
    let ip: IpAddr = state
        .config
        .host
        .parse()
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    SocketAddr::new(ip, state.config.port)
}

/// Start the SSE MCP transport.
///
/// Each inbound SSE connection gets its own [`ConduitServer`] sharing the
/// same [`AppState`].
///
/// # Errors
///
/// Returns `AppError::Transport` if the server fails to bind.
pub async fn serve_sse(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind = bind_address(&state);

    let config = SseServerConfig {
        bind,
        sse_path: "/sse".into(),
        post_path: "/message".into(),
        ct: ct.clone(),
        sse_keep_alive: None,
    };

    let (sse_server, router) = SseServer::new(config);

    let server_ct = {
        let state = Arc::clone(&state);
        sse_server.with_service(move || ConduitServer::new(Arc::clone(&state)))
    };

    let router = router.layer(axum::middleware::from_fn_with_state(
        Arc::clone(&state),
        authenticate,
    ));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Transport(format!("failed to bind SSE on {bind}: {err}")))?;

    info!(%bind, "starting SSE MCP transport");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
            server_ct.cancel();
        })
        .await
        .map_err(|err| AppError::Transport(format!("SSE server error: {err}")))?;

    info!("SSE MCP transport shut down");
    Ok(())
}

/// Start the streamable HTTP MCP transport at `/mcp`.
///
/// # Errors
///
/// Returns `AppError::Transport` if the server fails to bind.
pub async fn serve_http(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind = bind_address(&state);

    let service = StreamableHttpService::new(
        {
            let state = Arc::clone(&state);
            move || Ok::<_, std::io::Error>(ConduitServer::new(Arc::clone(&state)))
        },
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let router = axum::Router::new()
        .nest_service("/mcp", service)
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            authenticate,
        ));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Transport(format!("failed to bind HTTP on {bind}: {err}")))?;

    info!(%bind, "starting streamable HTTP MCP transport");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
        })
        .await
        .map_err(|err| AppError::Transport(format!("HTTP server error: {err}")))?;

    info!("streamable HTTP MCP transport shut down");
    Ok(())
}
