#![forbid(unsafe_code)]

//! `slack-conduit` — MCP server that exposes a Slack workspace as a uniform
//! tool/resource surface for LLM clients.
//!
//! Mediates between MCP transports (stdio / SSE / streamable HTTP) and
//! Slack's public and edge APIs, normalising four authentication modes into
//! a single gateway abstraction and flattening Slack's paginated JSON into
//! compact CSV.

pub mod cache;
pub mod config;
pub mod errors;
pub mod limiter;
pub mod mcp;
pub mod models;
pub mod output;
pub mod search;
pub mod slack;
pub mod unread;

pub use errors::{AppError, Result};
