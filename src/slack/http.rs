//! Low-level Slack HTTP transport.
//!
//! One thin wrapper over `reqwest` shared by every gateway variant. It
//! signs requests for the token it was built with, understands Slack's
//! `{ok, error}` envelope, and classifies HTTP 429 / `ratelimited` into
//! [`AppError::RateLimited`] for the retry primitive to act on. It never
//! retries by itself.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::{AppError, Result};

/// Connection-shaping options derived from the process configuration.
#[derive(Debug, Clone, Default)]
pub struct NetOptions {
    /// Base domain: `slack.com` or `slack-gov.com`.
    pub base_domain: String,
    /// Outbound proxy URL.
    pub proxy: Option<String>,
    /// Custom User-Agent for enterprise workspaces.
    pub user_agent: Option<String>,
    /// Browser-shaped TLS profile toggle.
    pub custom_tls: bool,
    /// Extra root certificate (PEM path).
    pub server_ca: Option<std::path::PathBuf>,
    /// Trust the OS store alongside `server_ca`.
    pub server_ca_toolkit: bool,
    /// Disable TLS verification.
    pub server_ca_insecure: bool,
}

impl NetOptions {
    /// Derive shaping options from the configuration snapshot.
    #[must_use]
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            base_domain: config.base_domain().to_owned(),
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            custom_tls: config.custom_tls,
            server_ca: config.server_ca.clone(),
            server_ca_toolkit: config.server_ca_toolkit,
            server_ca_insecure: config.server_ca_insecure,
        }
    }

    fn base_domain_or_default(&self) -> &str {
        if self.base_domain.is_empty() {
            "slack.com"
        } else {
            &self.base_domain
        }
    }
}

/// User-Agent presented when `custom_tls` shaping is requested but no
/// explicit agent is configured. Matches a mainstream browser so enterprise
/// gateways that fingerprint clients accept the session token.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Request timeout for ordinary API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated transport bound to one token.
#[derive(Debug, Clone)]
pub struct SlackHttp {
    http: reqwest::Client,
    api_base: String,
    edge_base: String,
    token: String,
    cookie: Option<String>,
}

impl SlackHttp {
    /// Build a transport for `token` (optionally cookie-paired) with the
    /// given connection shaping.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built (bad
    /// proxy URL or unreadable CA file).
    pub fn build(token: &str, cookie: Option<&str>, net: &NetOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);

        let agent = net.user_agent.as_deref().unwrap_or(if net.custom_tls {
            BROWSER_USER_AGENT
        } else {
            concat!("slack-conduit/", env!("CARGO_PKG_VERSION"))
        });
        builder = builder.user_agent(agent);

        if let Some(proxy_url) = &net.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|err| AppError::Config(format!("invalid proxy '{proxy_url}': {err}")))?;
            builder = builder.proxy(proxy);
        }

        if let Some(ca_path) = &net.server_ca {
            let pem = std::fs::read(ca_path).map_err(|err| {
                AppError::Config(format!("cannot read CA file '{}': {err}", ca_path.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|err| {
                AppError::Config(format!("invalid CA file '{}': {err}", ca_path.display()))
            })?;
            builder = builder.add_root_certificate(cert);
            if !net.server_ca_toolkit {
                builder = builder.tls_built_in_root_certs(false);
            }
        }

        if net.server_ca_insecure {
            warn!("TLS certificate verification is DISABLED (SLACK_MCP_SERVER_CA_INSECURE)");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        let domain = net.base_domain_or_default();
        Ok(Self {
            http,
            api_base: format!("https://{domain}/api"),
            edge_base: format!("https://edgeapi.{domain}/cache"),
            token: token.to_owned(),
            cookie: cookie.map(str::to_owned),
        })
    }

    /// The bearer token this transport signs with.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether this transport carries a browser cookie.
    #[must_use]
    pub const fn has_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json");
        match &self.cookie {
            Some(cookie) => request.header("Cookie", format!("d={cookie}")),
            None => request,
        }
    }

    /// GET an API method with query parameters.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` with endpoint context, or
    /// `AppError::RateLimited` on a rate-limit response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{method}", self.api_base);
        let request = self.apply_auth(self.http.get(&url)).query(params);
        self.execute(method, request).await
    }

    /// POST an API method with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` with endpoint context, or
    /// `AppError::RateLimited` on a rate-limit response.
    pub async fn post_json<T, B>(&self, method: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + Sync,
    {
        let url = format!("{}/{method}", self.api_base);
        let request = self.apply_auth(self.http.post(&url)).json(body);
        self.execute(method, request).await
    }

    /// POST an API method as form fields. The edge-flavoured endpoints want
    /// the token in the body rather than the Authorization header.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` with endpoint context, or
    /// `AppError::RateLimited` on a rate-limit response.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        method: &str,
        fields: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{method}", self.api_base);
        let mut form: Vec<(&str, String)> = vec![("token", self.token.clone())];
        form.extend(fields.iter().cloned());
        let request = self.apply_auth(self.http.post(&url)).form(&form);
        self.execute(method, request).await
    }

    /// POST to the edge cache endpoint for `team_id` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` with endpoint context, or
    /// `AppError::RateLimited` on a rate-limit response.
    pub async fn post_edge<T: DeserializeOwned>(
        &self,
        team_id: &str,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/{team_id}/{path}", self.edge_base);
        let request = self.apply_auth(self.http.post(&url)).json(body);
        self.execute(path, request).await
    }

    /// Download a raw URL (file contents) into memory, refusing to read
    /// past `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ResourceLimit` when the payload exceeds the cap
    /// and `AppError::Slack` on transport failure.
    pub async fn download(&self, url: &str, max_bytes: usize) -> Result<bytes::Bytes> {
        use futures_util::StreamExt;

        let response = self
            .apply_auth(self.http.get(url))
            .send()
            .await
            .map_err(|err| AppError::slack("file download", err.to_string()))?;

        if let Some(length) = response.content_length() {
            if usize::try_from(length).map_or(true, |l| l > max_bytes) {
                return Err(AppError::ResourceLimit(format!(
                    "file is {length} bytes, cap is {max_bytes}"
                )));
            }
        }

        let mut buffer = bytes::BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| AppError::slack("file download", err.to_string()))?;
            if buffer.len() + chunk.len() > max_bytes {
                return Err(AppError::ResourceLimit(format!(
                    "file exceeds the {max_bytes}-byte cap"
                )));
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(buffer.freeze())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|err| AppError::slack(endpoint, err.to_string()))?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(AppError::RateLimited { retry_after });
        }

        let text = response
            .text()
            .await
            .map_err(|err| AppError::slack(endpoint, err.to_string()))?;

        if !status.is_success() {
            return Err(AppError::slack(
                endpoint,
                format!("HTTP {}: {}", status.as_u16(), truncate(&text, 200)),
            ));
        }

        parse_envelope(endpoint, &text)
    }
}

/// Parse Slack's `{ok, error}` envelope, surfacing `ratelimited` as a
/// retryable error and everything else with endpoint context.
fn parse_envelope<T: DeserializeOwned>(endpoint: &str, text: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|err| AppError::slack(endpoint, format!("parse: {err}: {}", truncate(text, 200))))?;

    if let Some(false) = value.get("ok").and_then(serde_json::Value::as_bool) {
        let error = value
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        if error == "ratelimited" {
            return Err(AppError::RateLimited { retry_after: None });
        }
        return Err(AppError::slack(endpoint, error));
    }

    serde_json::from_value(value)
        .map_err(|err| AppError::slack(endpoint, format!("parse: {err}: {}", truncate(text, 200))))
}

fn truncate(text: &str, max: usize) -> &str {
    let mut end = text.len().min(max);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
