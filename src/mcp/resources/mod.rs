//! MCP resources exposed by the server.

pub mod directory;
