//! `slack://<workspace>/users` and `slack://<workspace>/channels` —
//! the directory caches as CSV resources.

use std::sync::Arc;

use rmcp::model::{
    Annotated, ListResourcesResult, RawResource, ReadResourceResult, ResourceContents,
};
use tracing::info;

use crate::mcp::handler::AppState;
use crate::output::csv;
use crate::{AppError, Result};

const USERS_HEADER: [&str; 8] = [
    "id",
    "name",
    "real_name",
    "display_name",
    "email",
    "title",
    "is_bot",
    "deleted",
];

const CHANNELS_HEADER: [&str; 9] = [
    "id",
    "name",
    "topic",
    "purpose",
    "member_count",
    "is_private",
    "is_im",
    "is_mpim",
    "is_ext_shared",
];

/// Which directory a resource URI addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryKind {
    /// The users directory.
    Users,
    /// The channels directory.
    Channels,
}

/// Parse a `slack://<workspace>/users|channels` URI.
#[must_use]
pub fn parse_uri(uri: &str) -> Option<(&str, DirectoryKind)> {
    let rest = uri.strip_prefix("slack://")?;
    let (workspace, kind) = rest.split_once('/')?;
    if workspace.is_empty() {
        return None;
    }
    match kind {
        "users" => Some((workspace, DirectoryKind::Users)),
        "channels" => Some((workspace, DirectoryKind::Channels)),
        _ => None,
    }
}

/// Build the resource listing for the authenticated workspace.
///
/// # Errors
///
/// Returns `AppError::Slack` when `auth.test` fails.
pub async fn list(state: &Arc<AppState>) -> Result<ListResourcesResult> {
    let Some(gateway) = &state.gateway else {
        return Ok(ListResourcesResult {
            resources: Vec::new(),
            next_cursor: None,
            meta: None,
        });
    };
    let workspace = gateway.workspace().await?;

    let users = Annotated::new(
        RawResource {
            uri: format!("slack://{workspace}/users"),
            name: "Workspace users directory".into(),
            title: None,
            description: Some("CSV of all users in the workspace.".into()),
            mime_type: Some("text/csv".into()),
            size: None,
            icons: None,
            meta: None,
        },
        None,
    );
    let channels = Annotated::new(
        RawResource {
            uri: format!("slack://{workspace}/channels"),
            name: "Workspace channels directory".into(),
            title: None,
            description: Some(
                "CSV of channels, DMs, and group DMs visible to the token.".into(),
            ),
            mime_type: Some("text/csv".into()),
            size: None,
            icons: None,
            meta: None,
        },
        None,
    );

    Ok(ListResourcesResult {
        resources: vec![users, channels],
        next_cursor: None,
        meta: None,
    })
}

/// Read one directory resource as CSV.
///
/// # Errors
///
/// Returns `AppError::NotFound` for unknown URIs.
pub async fn read(state: &Arc<AppState>, uri: &str) -> Result<ReadResourceResult> {
    let (workspace, kind) = parse_uri(uri)
        .ok_or_else(|| AppError::NotFound(format!("resource '{uri}'")))?;
    info!(workspace, ?kind, "reading directory resource");

    let body = match kind {
        DirectoryKind::Users => {
            let users = state.cache.users.all().await;
            let rows: Vec<Vec<String>> = users
                .iter()
                .map(|u| {
                    vec![
                        u.id.clone(),
                        u.name.clone(),
                        u.real_name.clone(),
                        u.display_name.clone(),
                        u.email.clone(),
                        u.title.clone(),
                        u.is_bot.to_string(),
                        u.deleted.to_string(),
                    ]
                })
                .collect();
            csv::render(&USERS_HEADER, &rows)
        }
        DirectoryKind::Channels => {
            let channels = state.cache.channels.all().await;
            let rows: Vec<Vec<String>> = channels
                .iter()
                .map(|c| {
                    vec![
                        c.id.clone(),
                        c.name.clone(),
                        c.topic.clone(),
                        c.purpose.clone(),
                        c.member_count.to_string(),
                        c.is_private.to_string(),
                        c.is_im.to_string(),
                        c.is_mpim.to_string(),
                        c.is_ext_shared.to_string(),
                    ]
                })
                .collect();
            csv::render(&CHANNELS_HEADER, &rows)
        }
    };

    Ok(ReadResourceResult {
        contents: vec![ResourceContents::text(body, uri.to_owned())],
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn uri_parsing() {
        assert_eq!(
            parse_uri("slack://acme/users"),
            Some(("acme", DirectoryKind::Users))
        );
        assert_eq!(
            parse_uri("slack://acme/channels"),
            Some(("acme", DirectoryKind::Channels))
        );
        assert_eq!(parse_uri("slack://acme/other"), None);
        assert_eq!(parse_uri("http://acme/users"), None);
        assert_eq!(parse_uri("slack:///users"), None);
    }
}
