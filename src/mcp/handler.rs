//! MCP server handler and shared application state.

use std::future::Future;
use std::sync::Arc;

use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ListResourcesResult, ListToolsResult,
    PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult, ServerCapabilities,
    ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::WorkspaceCache;
use crate::config::Config;
use crate::limiter::Limiters;
use crate::mcp::auth::AuthRegistry;
use crate::mcp::{registry, resources, tools};
use crate::slack::gateway::SlackGateway;
use crate::slack::token::TokenKind;
use crate::{AppError, Result};

/// Shared application state accessible by every tool handler.
#[derive(Debug)]
pub struct AppState {
    /// Process configuration snapshot.
    pub config: Arc<Config>,
    /// Process-wide gateway built from the configured credentials.
    /// Absent when the server relies solely on per-request tokens.
    pub gateway: Option<Arc<SlackGateway>>,
    /// Users and channels directories.
    pub cache: WorkspaceCache,
    /// Slack-tier limiter singletons.
    pub limiters: Limiters,
    /// Auth boundary for SSE/HTTP requests.
    pub auth: Arc<AuthRegistry>,
    /// Process shutdown token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Pick the gateway for a request: a per-request Slack bearer when the
    /// transport delivered one, otherwise the process-wide gateway.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when neither is available.
    pub fn gateway_for(
        &self,
        extensions: &rmcp::model::Extensions,
    ) -> Result<Arc<SlackGateway>> {
        if let Some(parts) = extensions.get::<axum::http::request::Parts>() {
            let bearer = parts
                .headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "));
            if let Some(bearer) = bearer {
                if TokenKind::detect(bearer).is_some() {
                    return self.auth.gateway_for_token(bearer);
                }
                if let Some(info) = self.auth.store.lookup(bearer) {
                    if let Some(slack_token) = info.slack_token.as_deref() {
                        return self.auth.gateway_for_token(slack_token);
                    }
                }
            }
        }

        self.gateway.clone().ok_or_else(|| {
            AppError::Config(
                "no slack credentials for this request: configure a process token or \
                 present a slack token in the Authorization header"
                    .into(),
            )
        })
    }
}

/// MCP server implementation exposing the Slack tool surface.
pub struct ConduitServer {
    state: Arc<AppState>,
}

impl ConduitServer {
    /// Create a server bound to shared application state.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Access the shared application state.
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Unwrap a `json!` schema literal into the shared map `Tool` wants.
    /// Only objects are ever authored here.
    fn schema(value: serde_json::Value) -> Arc<serde_json::Map<String, serde_json::Value>> {
        let serde_json::Value::Object(map) = value else {
            return Arc::default();
        };
        Arc::new(map)
    }

    /// Tools that pass the registration policy right now.
    fn registered_tools(&self) -> Vec<Tool> {
        let enabled = &self.state.config.enabled_tools;
        Self::all_tools()
            .into_iter()
            .filter(|tool| registry::is_registered(&tool.name, enabled))
            .collect()
    }

    // One schema literal per tool; the length is the surface, not logic.
    #[allow(clippy::too_many_lines)]
    fn all_tools() -> Vec<Tool> {
        let channel_id = serde_json::json!({
            "type": "string",
            "description": "Channel ID (C…/G…/D…), #channel-name, or @user-handle"
        });
        let limit = serde_json::json!({
            "type": "string",
            "description": "Message count, or a duration window like 1d, 2w, 1m"
        });
        let cursor = serde_json::json!({
            "type": "string",
            "description": "Opaque pagination cursor from a previous page"
        });
        let timestamp = serde_json::json!({
            "type": "string",
            "description": "Slack message timestamp, e.g. 1736510400.000000"
        });

        vec![
            Tool {
                name: "conversations_history".into(),
                description: Some(
                    "Fetch channel message history as CSV. Accepts a message count or a \
                     duration window (1d/1w/1m) and an opaque cursor for pagination."
                        .into(),
                ),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "channel_id": channel_id.clone(),
                        "limit": limit.clone(),
                        "cursor": cursor.clone(),
                        "include_activity_messages": { "type": "boolean", "default": false }
                    },
                    "required": ["channel_id"]
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "conversations_replies".into(),
                description: Some(
                    "Fetch a thread's replies as CSV, given the parent message timestamp."
                        .into(),
                ),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "channel_id": channel_id.clone(),
                        "thread_ts": timestamp.clone(),
                        "limit": limit.clone(),
                        "cursor": cursor.clone(),
                        "include_activity_messages": { "type": "boolean", "default": false }
                    },
                    "required": ["channel_id", "thread_ts"]
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "conversations_search_messages".into(),
                description: Some(
                    "Search workspace messages. Free text plus structured filters \
                     (channel, users, dates, threads-only). Not available with bot tokens."
                        .into(),
                ),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "search_query": { "type": "string" },
                        "filter_in_channel": { "type": "string" },
                        "filter_in_im_or_mpim": { "type": "string" },
                        "filter_users_with": { "type": "string" },
                        "filter_users_from": { "type": "string" },
                        "filter_date_before": { "type": "string" },
                        "filter_date_after": { "type": "string" },
                        "filter_date_on": { "type": "string" },
                        "filter_date_during": { "type": "string" },
                        "filter_threads_only": { "type": "boolean", "default": false },
                        "limit": { "type": "integer", "minimum": 1, "maximum": 100 },
                        "cursor": cursor.clone()
                    }
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "conversations_add_message".into(),
                description: Some(
                    "Post a message to a channel or thread. Subject to the channel \
                     allow/deny policy."
                        .into(),
                ),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "channel_id": channel_id.clone(),
                        "text": { "type": "string" },
                        "content_type": {
                            "type": "string",
                            "enum": ["text/plain", "text/markdown"],
                            "default": "text/markdown"
                        },
                        "thread_ts": timestamp.clone()
                    },
                    "required": ["channel_id", "text"]
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "conversations_edit_message".into(),
                description: Some("Edit a previously posted message.".into()),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "channel_id": channel_id.clone(),
                        "timestamp": timestamp.clone(),
                        "text": { "type": "string" }
                    },
                    "required": ["channel_id", "timestamp", "text"]
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "conversations_delete_message".into(),
                description: Some("Delete a message.".into()),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "channel_id": channel_id.clone(),
                        "timestamp": timestamp
                    },
                    "required": ["channel_id", "timestamp"]
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "conversations_mark_read".into(),
                description: Some(
                    "Move the read cursor of a channel up to a timestamp (defaults to \
                     the latest message)."
                        .into(),
                ),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "channel_id": channel_id.clone(),
                        "ts": timestamp.clone()
                    },
                    "required": ["channel_id"]
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "reactions_add".into(),
                description: Some("Add an emoji reaction to a message.".into()),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "channel_id": channel_id.clone(),
                        "timestamp": timestamp.clone(),
                        "emoji": { "type": "string", "description": "Emoji name, colons optional" }
                    },
                    "required": ["channel_id", "timestamp", "emoji"]
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "reactions_remove".into(),
                description: Some("Remove an emoji reaction from a message.".into()),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "channel_id": channel_id.clone(),
                        "timestamp": timestamp.clone(),
                        "emoji": { "type": "string" }
                    },
                    "required": ["channel_id", "timestamp", "emoji"]
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "reactions_get".into(),
                description: Some("List the reaction tallies on a message.".into()),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "channel_id": channel_id.clone(),
                        "timestamp": timestamp
                    },
                    "required": ["channel_id", "timestamp"]
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "attachment_get_data".into(),
                description: Some(
                    "Download a file attachment (max 5 MiB). Text content is returned \
                     inline, binary content base64-encoded."
                        .into(),
                ),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "file_id": { "type": "string" }
                    },
                    "required": ["file_id"]
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "channels_list".into(),
                description: Some(
                    "List channels, DMs, and group DMs from the workspace directory as CSV."
                        .into(),
                ),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "channel_types": {
                            "type": "string",
                            "description": "all, or a comma list of public_channel, private_channel, im, mpim"
                        },
                        "sort": { "type": "string", "enum": ["popularity"] },
                        "limit": { "type": "integer", "minimum": 1, "maximum": 999 },
                        "cursor": cursor.clone()
                    }
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
            Tool {
                name: "unread_conversations".into(),
                description: Some(
                    "Discover conversations with unread messages, priority-sorted \
                     (DMs first). Not available with bot tokens."
                        .into(),
                ),
                input_schema: Self::schema(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "max_channels": { "type": "integer", "minimum": 1, "maximum": 200 },
                        "max_messages_per_channel": { "type": "integer", "minimum": 1, "maximum": 100 },
                        "include_muted": { "type": "boolean", "default": false },
                        "mentions_only": { "type": "boolean", "default": false },
                        "include_messages": { "type": "boolean", "default": false },
                        "channel_types": {
                            "type": "string",
                            "enum": ["all", "dm", "group_dm", "partner", "internal"]
                        }
                    }
                })),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
                title: None,
            },
        ]
    }
}

impl ServerHandler for ConduitServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            instructions: Some(
                "Slack workspace access. Tools return CSV; pass the cursor column \
                 back verbatim to paginate. Channel parameters accept IDs, #names, \
                 and @handles."
                    .into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<CallToolResult, rmcp::ErrorData>> + Send + '_
    {
        async move {
            let name = request.name.to_string();
            debug!(tool = %name, "tool call");

            if !registry::is_registered(&name, &self.state.config.enabled_tools) {
                return Err(rmcp::ErrorData::invalid_params(
                    format!("tool '{name}' is not available"),
                    None,
                ));
            }

            let gateway = self.state.gateway_for(&context.extensions)?;
            let args = request.arguments.unwrap_or_default();
            let ct = context.ct.clone();
            let state = &self.state;

            match name.as_str() {
                "conversations_history" => {
                    tools::conversations::history(state, &gateway, args, &ct).await
                }
                "conversations_replies" => {
                    tools::conversations::replies(state, &gateway, args, &ct).await
                }
                "conversations_search_messages" => {
                    tools::search::search(state, &gateway, args, &ct).await
                }
                "conversations_add_message" => {
                    tools::message::add_message(state, &gateway, args, &ct).await
                }
                "conversations_edit_message" => {
                    tools::message::edit_message(state, &gateway, args, &ct).await
                }
                "conversations_delete_message" => {
                    tools::message::delete_message(state, &gateway, args, &ct).await
                }
                "conversations_mark_read" => {
                    tools::message::mark_read(state, &gateway, args, &ct).await
                }
                "reactions_add" => tools::reactions::toggle(state, &gateway, args, &ct, true).await,
                "reactions_remove" => {
                    tools::reactions::toggle(state, &gateway, args, &ct, false).await
                }
                "reactions_get" => tools::reactions::get(state, &gateway, args, &ct).await,
                "attachment_get_data" => {
                    tools::attachment::get_data(state, &gateway, args, &ct).await
                }
                "channels_list" => tools::channels::list(state, &gateway, args, &ct).await,
                "unread_conversations" => tools::unread::unread(state, &gateway, args, &ct).await,
                _ => Err(rmcp::ErrorData::invalid_params(
                    format!("tool '{name}' is not available"),
                    None,
                )),
            }
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<ListToolsResult, rmcp::ErrorData>> + Send + '_
    {
        let tools = self.registered_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<ListResourcesResult, rmcp::ErrorData>> + Send + '_
    {
        async move {
            resources::directory::list(&self.state)
                .await
                .map_err(rmcp::ErrorData::from)
        }
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<ReadResourceResult, rmcp::ErrorData>> + Send + '_
    {
        async move {
            resources::directory::read(&self.state, &request.uri)
                .await
                .map_err(rmcp::ErrorData::from)
        }
    }
}
