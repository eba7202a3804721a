//! MCP surface: server handler, transports, tool registry, and the auth
//! boundary.

pub mod auth;
pub mod handler;
pub mod registry;
pub mod resources;
pub mod sse;
pub mod tools;
pub mod transport;
