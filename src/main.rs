#![forbid(unsafe_code)]

//! `slack-conduit` — MCP server binary.
//!
//! Bootstraps configuration from the environment, connects the Slack
//! gateway, starts the background cache backfill, and serves the chosen
//! MCP transport (stdio, SSE, or streamable HTTP).

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use slack_conduit::cache::WorkspaceCache;
use slack_conduit::config::Config;
use slack_conduit::limiter::Limiters;
use slack_conduit::mcp::auth::AuthRegistry;
use slack_conduit::mcp::handler::AppState;
use slack_conduit::mcp::{sse, transport};
use slack_conduit::slack::gateway::SlackGateway;
use slack_conduit::slack::http::NetOptions;
use slack_conduit::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Which MCP transport to serve.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Transport {
    /// Stdio (for direct client invocation).
    Stdio,
    /// Server-Sent Events over HTTP.
    Sse,
    /// Streamable HTTP.
    Http,
}

#[derive(Debug, Parser)]
#[command(
    name = "slack-conduit",
    about = "MCP server exposing a Slack workspace to LLM clients",
    version,
    long_about = None
)]
struct Cli {
    /// Which MCP transport to serve.
    #[arg(short = 't', long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("slack-conduit bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let config = Arc::new(Config::from_env()?);
    info!(
        govslack = config.govslack,
        tools = ?config.enabled_tools,
        "configuration loaded"
    );

    // ── Connect the Slack gateway ───────────────────────
    let net = NetOptions::from_config(&config);
    let gateway = if config.has_process_credentials() {
        Some(Arc::new(SlackGateway::connect(&config.auth, &net)?))
    } else {
        if args.transport == Transport::Stdio {
            return Err(AppError::Config(
                "stdio transport needs process credentials: set SLACK_MCP_XOXC_TOKEN/\
                 SLACK_MCP_XOXD_TOKEN, SLACK_MCP_XOXP_TOKEN, or SLACK_MCP_XOXB_TOKEN"
                    .into(),
            ));
        }
        info!("no process credentials; relying on per-request tokens");
        None
    };

    if let Some(gateway) = &gateway {
        match gateway.auth_test().await {
            Ok(identity) => info!(
                team = %identity.team,
                user = %identity.user,
                kind = %gateway.kind(),
                "authenticated against slack"
            ),
            Err(err) => error!(%err, "auth.test failed; continuing, calls may fail"),
        }
    }

    // ── Shared state and background tasks ───────────────
    let ct = CancellationToken::new();
    let limiters = Limiters::default();
    let cache = WorkspaceCache::new(&config);
    let auth = Arc::new(AuthRegistry::new(&config));

    if let Some(gateway) = &gateway {
        cache.spawn_backfill(Arc::clone(gateway), limiters.clone(), ct.clone());
        info!("cache backfill started");
    }
    let cleanup_handle = auth.spawn_cleanup(ct.clone());

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        gateway,
        cache,
        limiters,
        auth,
        shutdown: ct.clone(),
    });

    // ── Serve the selected transport ────────────────────
    let serve_ct = ct.clone();
    let serve_state = Arc::clone(&state);
    let serve_handle = tokio::spawn(async move {
        let result = match args.transport {
            Transport::Stdio => transport::serve_stdio(serve_state, serve_ct.clone()).await,
            Transport::Sse => sse::serve_sse(serve_state, serve_ct.clone()).await,
            Transport::Http => sse::serve_http(serve_state, serve_ct.clone()).await,
        };
        if let Err(err) = result {
            error!(%err, "transport failed — initiating shutdown");
            serve_ct.cancel();
            return Err(err);
        }
        Ok(())
    });

    info!(transport = ?args.transport, "MCP server ready");

    // ── Wait for shutdown ───────────────────────────────
    tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown signal caught; draining");
            ct.cancel();
        }
        () = ct.cancelled() => {}
    }

    // A second signal force-exits.
    tokio::spawn(async {
        shutdown_signal().await;
        error!("second signal; exiting immediately");
        std::process::exit(1);
    });

    let outcome = match serve_handle.await {
        Ok(result) => result,
        Err(err) => Err(AppError::Transport(format!("transport task panicked: {err}"))),
    };
    cleanup_handle.abort();

    info!("slack-conduit shut down");
    outcome
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "SIGTERM handler unavailable; relying on ctrl-c");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = slack_conduit::config::env_var("LOG_LEVEL")
        .map_or_else(
            || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            EnvFilter::new,
        );
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
