//! Tool-registration policy.
//!
//! The tool set is fixed and closed. Whether a tool is advertised depends
//! on the explicit enabled-tools list and, for write tools, a per-tool env
//! var. The same env var doubles as a per-invocation channel allow/deny
//! list, checked inside the handler so operators can adjust policy without
//! a restart.

use crate::config::{env_var, is_truthy};
use crate::{AppError, Result};

/// Every tool this server can expose.
pub const ALL_TOOLS: [&str; 13] = [
    "conversations_history",
    "conversations_replies",
    "conversations_search_messages",
    "conversations_add_message",
    "conversations_edit_message",
    "conversations_delete_message",
    "conversations_mark_read",
    "reactions_add",
    "reactions_remove",
    "reactions_get",
    "attachment_get_data",
    "channels_list",
    "unread_conversations",
];

/// Whether `name` belongs to the closed tool set.
#[must_use]
pub fn is_valid_tool(name: &str) -> bool {
    ALL_TOOLS.contains(&name)
}

/// Env-var suffix controlling a write tool, if the tool is one.
#[must_use]
pub fn write_tool_var(tool: &str) -> Option<&'static str> {
    match tool {
        "conversations_add_message" => Some("ADD_MESSAGE_TOOL"),
        "conversations_edit_message" => Some("EDIT_MESSAGE_TOOL"),
        "conversations_delete_message" => Some("DELETE_MESSAGE_TOOL"),
        "conversations_mark_read" => Some("MARK_TOOL"),
        "reactions_add" | "reactions_remove" => Some("REACTION_TOOL"),
        "attachment_get_data" => Some("ATTACHMENT_TOOL"),
        _ => None,
    }
}

/// Current policy value for a write tool. `REACTION_TOOL` and the legacy
/// `REACTIONS_TOOL` spelling are synonyms, preferring the former.
#[must_use]
pub fn policy_value(tool: &str) -> Option<String> {
    let var = write_tool_var(tool)?;
    let value = env_var(var);
    if var == "REACTION_TOOL" {
        return value.or_else(|| env_var("REACTIONS_TOOL"));
    }
    value
}

/// Registration decision for one tool.
///
/// | enabled list          | read-only tool | write tool                 |
/// |-----------------------|----------------|----------------------------|
/// | empty                 | yes            | yes iff env var non-empty  |
/// | contains the tool     | yes            | yes                        |
/// | excludes the tool     | no             | no                         |
#[must_use]
pub fn is_registered(tool: &str, enabled: &[String]) -> bool {
    if !is_valid_tool(tool) {
        return false;
    }
    if !enabled.is_empty() {
        return enabled.iter().any(|t| t == tool);
    }
    match write_tool_var(tool) {
        Some(_) => policy_value(tool).is_some(),
        None => true,
    }
}

/// Evaluate a channel against an allow/deny policy value.
///
/// - empty, `true`, or `1` — any channel;
/// - a comma list of channel IDs — allowlist;
/// - entries prefixed with `!` — blocklist (mixed lists evaluate as a
///   blocklist when the first entry is negated).
#[must_use]
pub fn channel_allowed(channel_id: &str, policy: &str) -> bool {
    let policy = policy.trim();
    if policy.is_empty() || is_truthy(policy) {
        return true;
    }

    let entries: Vec<&str> = policy
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();
    let Some(first) = entries.first() else {
        return true;
    };

    if first.starts_with('!') {
        !entries
            .iter()
            .any(|e| e.trim_start_matches('!') == channel_id)
    } else {
        entries.iter().any(|e| *e == channel_id)
    }
}

/// Per-invocation authorisation for a write tool against a channel.
///
/// Reads the env var at call time (hot-reloadable by design): removing the
/// var mid-flight disables a write tool that was registered through it,
/// while a tool named in the explicit enabled list stays allowed with an
/// unset var.
///
/// # Errors
///
/// Returns `AppError::Policy` when the tool is disabled or the channel is
/// rejected by the allow/deny list.
pub fn ensure_channel_allowed(tool: &str, channel_id: &str, enabled: &[String]) -> Result<()> {
    let Some(var) = write_tool_var(tool) else {
        return Ok(());
    };
    match policy_value(tool) {
        Some(value) => {
            if channel_allowed(channel_id, &value) {
                Ok(())
            } else {
                Err(AppError::Policy(format!(
                    "channel {channel_id} is not allowed for {tool} by SLACK_MCP_{var}"
                )))
            }
        }
        None if enabled.iter().any(|t| t == tool) => Ok(()),
        None => Err(AppError::Policy(format!(
            "{tool} is disabled; set SLACK_MCP_{var} to enable it"
        ))),
    }
}
