//! The Slack gateway: one capability surface, four token variants.
//!
//! Browser-session tokens reach both the public Web API and the edge
//! endpoints; user OAuth is public-API only; bot OAuth additionally loses
//! search and unread discovery. Per-request gateways are built from sniffed
//! bearer tokens by the auth boundary and share this type.

use tokio::sync::OnceCell;

use super::api::{
    Acknowledged, AuthTestResponse, ConversationInfoResponse, ConversationMembersResponse,
    ConversationsListResponse, FileInfoResponse, HistoryResponse, PostMessageResponse,
    ReactionsGetResponse, SearchResponse, UsergroupsListResponse, UsersListResponse, WireChannel,
    WireFile, WireMessage,
};
use super::edge::{
    ClientCountsResponse, EdgeUsersSearchResponse, ListItemsResponse, SearchChannelsResponse,
    UsersPrefsResponse,
};
use super::http::{NetOptions, SlackHttp};
use super::token::{AuthCredentials, TokenKind};
use crate::{AppError, Result};

/// Parameters for `conversations.history` / `conversations.replies`.
#[derive(Debug, Clone, Default)]
pub struct HistoryParams {
    /// Channel ID.
    pub channel: String,
    /// Thread parent timestamp; set only for replies.
    pub thread_ts: Option<String>,
    /// Native Slack cursor.
    pub cursor: Option<String>,
    /// Page size.
    pub limit: Option<u16>,
    /// Lower timestamp bound.
    pub oldest: Option<String>,
    /// Upper timestamp bound.
    pub latest: Option<String>,
    /// Include the boundary timestamps themselves.
    pub inclusive: bool,
}

/// Options for `chat.postMessage`.
#[derive(Debug, Clone)]
pub struct PostOptions {
    /// Reply into this thread.
    pub thread_ts: Option<String>,
    /// Let Slack render mrkdwn.
    pub markdown: bool,
    /// Allow link/media unfurling.
    pub unfurl: bool,
}

impl Default for PostOptions {
    fn default() -> Self {
        Self {
            thread_ts: None,
            markdown: true,
            unfurl: true,
        }
    }
}

/// Public Web API client shared by every variant.
#[derive(Debug)]
pub struct WebApiClient {
    http: SlackHttp,
    auth: OnceCell<AuthTestResponse>,
}

impl WebApiClient {
    fn new(http: SlackHttp) -> Self {
        Self {
            http,
            auth: OnceCell::new(),
        }
    }

    /// `auth.test`, cached for the lifetime of the client.
    async fn auth_test(&self) -> Result<&AuthTestResponse> {
        self.auth
            .get_or_try_init(|| self.http.get("auth.test", &[]))
            .await
    }
}

/// Browser-session client: the web surface plus the edge endpoints.
#[derive(Debug)]
pub struct EdgeSessionClient {
    web: WebApiClient,
}

/// The capability facade over all token variants.
#[derive(Debug)]
pub enum SlackGateway {
    /// Browser session (`xoxc` + `xoxd`).
    Edge(EdgeSessionClient),
    /// User OAuth (`xoxp`).
    User(WebApiClient),
    /// Bot OAuth (`xoxb`).
    Bot(WebApiClient),
}

impl SlackGateway {
    /// Build a gateway for the given credentials and connection shaping.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when no credentials are present or the
    /// HTTP client cannot be built.
    pub fn connect(creds: &AuthCredentials, net: &NetOptions) -> Result<Self> {
        match creds {
            AuthCredentials::EdgeSession { token, cookie } => {
                let http = SlackHttp::build(token, Some(cookie), net)?;
                Ok(Self::Edge(EdgeSessionClient {
                    web: WebApiClient::new(http),
                }))
            }
            AuthCredentials::UserOauth { token } => {
                let http = SlackHttp::build(token, None, net)?;
                Ok(Self::User(WebApiClient::new(http)))
            }
            AuthCredentials::BotOauth { token } => {
                let http = SlackHttp::build(token, None, net)?;
                Ok(Self::Bot(WebApiClient::new(http)))
            }
            AuthCredentials::None => Err(AppError::Config(
                "no slack credentials configured: set SLACK_MCP_XOXC_TOKEN/SLACK_MCP_XOXD_TOKEN, \
                 SLACK_MCP_XOXP_TOKEN, or SLACK_MCP_XOXB_TOKEN"
                    .into(),
            )),
        }
    }

    /// Build a gateway from a per-request bearer token.
    ///
    /// An `xoxc` bearer needs its paired cookie; it is taken from the
    /// process environment when present. An `xoxd` bearer alone is refused.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for a non-Slack bearer, an unpaired
    /// session token, or a client build failure.
    pub fn from_bearer(token: &str, net: &NetOptions) -> Result<Self> {
        match TokenKind::detect(token) {
            Some(TokenKind::Session) => {
                let cookie = crate::config::env_var("XOXD_TOKEN").ok_or_else(|| {
                    AppError::Config(
                        "request presented an xoxc token but no xoxd cookie is configured".into(),
                    )
                })?;
                Self::connect(
                    &AuthCredentials::EdgeSession {
                        token: token.to_owned(),
                        cookie,
                    },
                    net,
                )
            }
            Some(TokenKind::UserOauth) => Self::connect(
                &AuthCredentials::UserOauth {
                    token: token.to_owned(),
                },
                net,
            ),
            Some(TokenKind::BotOauth) => Self::connect(
                &AuthCredentials::BotOauth {
                    token: token.to_owned(),
                },
                net,
            ),
            Some(TokenKind::Cookie) => Err(AppError::Config(
                "an xoxd cookie cannot be presented alone".into(),
            )),
            None => Err(AppError::Config("bearer is not a slack token".into())),
        }
    }

    /// Token kind behind this gateway.
    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        match self {
            Self::Edge(_) => TokenKind::Session,
            Self::User(_) => TokenKind::UserOauth,
            Self::Bot(_) => TokenKind::BotOauth,
        }
    }

    /// True for OAuth variants (`xoxp` / `xoxb`).
    #[must_use]
    pub const fn is_oauth(&self) -> bool {
        matches!(self, Self::User(_) | Self::Bot(_))
    }

    /// True for the bot variant.
    #[must_use]
    pub const fn is_bot_token(&self) -> bool {
        matches!(self, Self::Bot(_))
    }

    fn web(&self) -> &WebApiClient {
        match self {
            Self::Edge(edge) => &edge.web,
            Self::User(web) | Self::Bot(web) => web,
        }
    }

    fn edge(&self, op: &str) -> Result<&EdgeSessionClient> {
        match self {
            Self::Edge(edge) => Ok(edge),
            Self::User(_) | Self::Bot(_) => Err(AppError::Unsupported(format!(
                "{op} requires a browser session token (this is a {} token)",
                self.kind()
            ))),
        }
    }

    // ── Identity ─────────────────────────────────────────

    /// `auth.test`, cached after the first call.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` on API failure.
    pub async fn auth_test(&self) -> Result<AuthTestResponse> {
        self.web().auth_test().await.cloned()
    }

    /// Workspace subdomain from the team URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` on API failure.
    pub async fn workspace(&self) -> Result<String> {
        Ok(self.web().auth_test().await?.workspace())
    }

    // ── Conversations ────────────────────────────────────

    /// `conversations.history`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn conversations_history(&self, params: &HistoryParams) -> Result<HistoryResponse> {
        self.web()
            .http
            .get("conversations.history", &history_query(params))
            .await
    }

    /// `conversations.replies` for `params.thread_ts`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn conversations_replies(&self, params: &HistoryParams) -> Result<HistoryResponse> {
        let mut query = history_query(params);
        if let Some(ts) = &params.thread_ts {
            query.push(("ts", ts.clone()));
        }
        self.web().http.get("conversations.replies", &query).await
    }

    /// `conversations.info` for a single channel.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn conversation_info(&self, channel: &str) -> Result<WireChannel> {
        let response: ConversationInfoResponse = self
            .web()
            .http
            .get("conversations.info", &[("channel", channel.to_owned())])
            .await?;
        Ok(response.channel)
    }

    /// `conversations.members`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn conversation_members(
        &self,
        channel: &str,
        cursor: Option<&str>,
    ) -> Result<ConversationMembersResponse> {
        let mut query = vec![("channel", channel.to_owned()), ("limit", "200".to_owned())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_owned()));
        }
        self.web().http.get("conversations.members", &query).await
    }

    /// `conversations.list` over the whole workspace.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn conversations_list(
        &self,
        types: &str,
        limit: u16,
        cursor: Option<&str>,
    ) -> Result<ConversationsListResponse> {
        let mut query = vec![
            ("types", types.to_owned()),
            ("limit", limit.to_string()),
            ("exclude_archived", "true".to_owned()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_owned()));
        }
        self.web().http.get("conversations.list", &query).await
    }

    /// `users.conversations` — only conversations the token's user is in.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn users_conversations(
        &self,
        types: &str,
        limit: u16,
        cursor: Option<&str>,
    ) -> Result<ConversationsListResponse> {
        let mut query = vec![
            ("types", types.to_owned()),
            ("limit", limit.to_string()),
            ("exclude_archived", "true".to_owned()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_owned()));
        }
        self.web().http.get("users.conversations", &query).await
    }

    // ── Messages ─────────────────────────────────────────

    /// `chat.postMessage`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        options: &PostOptions,
    ) -> Result<PostMessageResponse> {
        let mut body = serde_json::json!({
            "channel": channel,
            "text": text,
            "mrkdwn": options.markdown,
            "unfurl_links": options.unfurl,
            "unfurl_media": options.unfurl,
        });
        if let Some(ts) = &options.thread_ts {
            body["thread_ts"] = serde_json::Value::String(ts.clone());
        }
        self.web().http.post_json("chat.postMessage", &body).await
    }

    /// `chat.update`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        text: &str,
    ) -> Result<PostMessageResponse> {
        let body = serde_json::json!({ "channel": channel, "ts": ts, "text": text });
        self.web().http.post_json("chat.update", &body).await
    }

    /// `chat.delete`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn delete_message(&self, channel: &str, ts: &str) -> Result<Acknowledged> {
        let body = serde_json::json!({ "channel": channel, "ts": ts });
        self.web().http.post_json("chat.delete", &body).await
    }

    /// `conversations.mark` — move the viewer's read cursor.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn mark_conversation(&self, channel: &str, ts: &str) -> Result<Acknowledged> {
        let body = serde_json::json!({ "channel": channel, "ts": ts });
        self.web().http.post_json("conversations.mark", &body).await
    }

    // ── Search ───────────────────────────────────────────

    /// `search.messages`, page-indexed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unsupported` for bot tokens, otherwise
    /// `AppError::Slack` or `AppError::RateLimited`.
    pub async fn search_messages(
        &self,
        query: &str,
        count: u16,
        page: u16,
    ) -> Result<SearchResponse> {
        if self.is_bot_token() {
            return Err(AppError::Unsupported(
                "search is not available with a bot token".into(),
            ));
        }
        self.web()
            .http
            .get(
                "search.messages",
                &[
                    ("query", query.to_owned()),
                    ("count", count.to_string()),
                    ("page", page.to_string()),
                    ("sort", "timestamp".to_owned()),
                    ("sort_dir", "desc".to_owned()),
                ],
            )
            .await
    }

    // ── Reactions ────────────────────────────────────────

    /// `reactions.add`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<Acknowledged> {
        let body = serde_json::json!({ "channel": channel, "timestamp": ts, "name": name });
        self.web().http.post_json("reactions.add", &body).await
    }

    /// `reactions.remove`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn remove_reaction(
        &self,
        channel: &str,
        ts: &str,
        name: &str,
    ) -> Result<Acknowledged> {
        let body = serde_json::json!({ "channel": channel, "timestamp": ts, "name": name });
        self.web().http.post_json("reactions.remove", &body).await
    }

    /// `reactions.get` for a single message.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn get_reactions(&self, channel: &str, ts: &str) -> Result<WireMessage> {
        let response: ReactionsGetResponse = self
            .web()
            .http
            .get(
                "reactions.get",
                &[
                    ("channel", channel.to_owned()),
                    ("timestamp", ts.to_owned()),
                    ("full", "true".to_owned()),
                ],
            )
            .await?;
        Ok(response.message)
    }

    // ── Files ────────────────────────────────────────────

    /// `files.info`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn file_info(&self, file_id: &str) -> Result<WireFile> {
        let response: FileInfoResponse = self
            .web()
            .http
            .get("files.info", &[("file", file_id.to_owned())])
            .await?;
        Ok(response.file)
    }

    /// Download a private file URL into memory, bounded by `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ResourceLimit` past the cap, `AppError::Slack`
    /// on transport failure.
    pub async fn download_file(&self, url: &str, max_bytes: usize) -> Result<bytes::Bytes> {
        self.web().http.download(url, max_bytes).await
    }

    // ── Directory ────────────────────────────────────────

    /// `users.list`, one page.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn users_list(&self, cursor: Option<&str>) -> Result<UsersListResponse> {
        let mut query = vec![("limit", "1000".to_owned())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_owned()));
        }
        self.web().http.get("users.list", &query).await
    }

    /// `usergroups.list`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` or `AppError::RateLimited`.
    pub async fn usergroups_list(&self) -> Result<UsergroupsListResponse> {
        self.web()
            .http
            .get("usergroups.list", &[("include_disabled", "false".to_owned())])
            .await
    }

    // ── Edge endpoints (browser-session only) ────────────

    /// Edge `client.counts`: unread state for every conversation in one
    /// call.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unsupported` for OAuth tokens, otherwise
    /// `AppError::Slack` or `AppError::RateLimited`.
    pub async fn client_counts(&self) -> Result<ClientCountsResponse> {
        let edge = self.edge("client.counts")?;
        edge.web
            .http
            .post_form(
                "client.counts",
                &[("thread_counts_by_channel", "true".to_owned())],
            )
            .await
    }

    /// Muted-channel set from edge `users.prefs.get`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unsupported` for OAuth tokens (the unread engine
    /// treats that as "mute data unavailable"), otherwise `AppError::Slack`
    /// or `AppError::RateLimited`.
    pub async fn muted_channels(&self) -> Result<std::collections::HashMap<String, bool>> {
        let edge = self.edge("users.prefs.get")?;
        let response: UsersPrefsResponse = edge
            .web
            .http
            .post_form(
                "users.prefs.get",
                &[("prefs", "all_notifications_prefs".to_owned())],
            )
            .await?;
        Ok(super::edge::parse_muted_channels(
            &response.prefs.all_notifications_prefs,
        ))
    }

    /// Edge `users/search`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unsupported` for OAuth tokens, otherwise
    /// `AppError::Slack` or `AppError::RateLimited`.
    pub async fn users_search(&self, query: &str) -> Result<EdgeUsersSearchResponse> {
        let edge = self.edge("users/search")?;
        let team_id = edge.web.auth_test().await?.team_id.clone();
        let body = serde_json::json!({
            "token": edge.web.http.token(),
            "query": query,
            "count": 50,
            "fuzz": 1,
        });
        edge.web.http.post_edge(&team_id, "users/search", &body).await
    }

    /// Edge `search.modules.channels`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unsupported` for OAuth tokens, otherwise
    /// `AppError::Slack` or `AppError::RateLimited`.
    pub async fn search_channels(&self, query: &str) -> Result<SearchChannelsResponse> {
        let edge = self.edge("search.modules.channels")?;
        edge.web
            .http
            .post_form(
                "search.modules.channels",
                &[
                    ("query", query.to_owned()),
                    ("module", "channels".to_owned()),
                    ("count", "50".to_owned()),
                ],
            )
            .await
    }

    /// Edge `slackLists.items.list`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unsupported` for OAuth tokens, otherwise
    /// `AppError::Slack` or `AppError::RateLimited`.
    pub async fn list_items(&self, list_id: &str, limit: u16) -> Result<ListItemsResponse> {
        let edge = self.edge("slackLists.items.list")?;
        edge.web
            .http
            .post_form(
                "slackLists.items.list",
                &[
                    ("list_id", list_id.to_owned()),
                    ("limit", limit.to_string()),
                ],
            )
            .await
    }
}

fn history_query(params: &HistoryParams) -> Vec<(&'static str, String)> {
    let mut query = vec![("channel", params.channel.clone())];
    if let Some(cursor) = &params.cursor {
        query.push(("cursor", cursor.clone()));
    }
    if let Some(limit) = params.limit {
        query.push(("limit", limit.to_string()));
    }
    if let Some(oldest) = &params.oldest {
        query.push(("oldest", oldest.clone()));
    }
    if let Some(latest) = &params.latest {
        query.push(("latest", latest.clone()));
    }
    if params.inclusive {
        query.push(("inclusive", "true".to_owned()));
    }
    query
}
