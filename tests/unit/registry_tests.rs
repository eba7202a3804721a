use serial_test::serial;
use slack_conduit::mcp::registry::{
    channel_allowed, ensure_channel_allowed, is_registered, is_valid_tool, policy_value,
    write_tool_var, ALL_TOOLS,
};

fn clear_policy_env() {
    for var in [
        "SLACK_MCP_ADD_MESSAGE_TOOL",
        "SLACK_MCP_REACTION_TOOL",
        "SLACK_MCP_REACTIONS_TOOL",
        "SLACK_MCP_ATTACHMENT_TOOL",
        "SLACK_MCP_EDIT_MESSAGE_TOOL",
        "SLACK_MCP_DELETE_MESSAGE_TOOL",
        "SLACK_MCP_MARK_TOOL",
    ] {
        std::env::remove_var(var);
    }
}

#[test]
fn the_tool_set_is_closed() {
    assert_eq!(ALL_TOOLS.len(), 13);
    for tool in ALL_TOOLS {
        assert!(is_valid_tool(tool));
    }
    assert!(!is_valid_tool("anything_else"));
}

#[test]
#[serial]
fn read_only_tools_register_with_an_empty_enabled_list() {
    clear_policy_env();
    assert!(is_registered("conversations_history", &[]));
    assert!(is_registered("channels_list", &[]));
    assert!(is_registered("unread_conversations", &[]));
}

#[test]
#[serial]
fn write_tools_need_their_env_var_when_list_is_empty() {
    clear_policy_env();
    assert!(!is_registered("conversations_add_message", &[]));

    std::env::set_var("SLACK_MCP_ADD_MESSAGE_TOOL", "true");
    assert!(is_registered("conversations_add_message", &[]));
    clear_policy_env();
}

#[test]
#[serial]
fn explicit_list_overrides_everything() {
    clear_policy_env();
    let enabled = vec!["conversations_add_message".to_owned()];
    // Write tool without env var: still registered because it is listed.
    assert!(is_registered("conversations_add_message", &enabled));
    // Read-only tool not in the list: excluded.
    assert!(!is_registered("conversations_history", &enabled));
}

#[test]
#[serial]
fn reaction_env_var_spellings_are_synonyms() {
    clear_policy_env();
    assert_eq!(write_tool_var("reactions_add"), Some("REACTION_TOOL"));

    std::env::set_var("SLACK_MCP_REACTIONS_TOOL", "C9");
    assert_eq!(policy_value("reactions_add").as_deref(), Some("C9"));

    // The non-legacy spelling wins when both are set.
    std::env::set_var("SLACK_MCP_REACTION_TOOL", "C1");
    assert_eq!(policy_value("reactions_add").as_deref(), Some("C1"));
    clear_policy_env();
}

#[test]
fn channel_policy_truth_table() {
    assert!(channel_allowed("C1", ""));
    assert!(channel_allowed("C1", "true"));
    assert!(channel_allowed("C1", "1"));

    assert!(channel_allowed("C1", "C1,C2"));
    assert!(channel_allowed("C2", "C1,C2"));
    assert!(!channel_allowed("C3", "C1,C2"));

    assert!(!channel_allowed("C1", "!C1,!C2"));
    assert!(!channel_allowed("C2", "!C1,!C2"));
    assert!(channel_allowed("C3", "!C1,!C2"));
}

#[test]
#[serial]
fn per_invocation_check_reads_env_at_call_time() {
    clear_policy_env();
    let err = ensure_channel_allowed("conversations_add_message", "C1", &[]).unwrap_err();
    assert!(err.to_string().contains("disabled"));

    std::env::set_var("SLACK_MCP_ADD_MESSAGE_TOOL", "C1,C2");
    assert!(ensure_channel_allowed("conversations_add_message", "C1", &[]).is_ok());
    let err = ensure_channel_allowed("conversations_add_message", "C9", &[]).unwrap_err();
    assert!(err.to_string().contains("not allowed"));

    std::env::set_var("SLACK_MCP_ADD_MESSAGE_TOOL", "!C1");
    assert!(ensure_channel_allowed("conversations_add_message", "C9", &[]).is_ok());
    assert!(ensure_channel_allowed("conversations_add_message", "C1", &[]).is_err());
    clear_policy_env();
}

#[test]
#[serial]
fn explicitly_listed_write_tools_pass_without_an_env_var() {
    clear_policy_env();
    let enabled = vec!["conversations_add_message".to_owned()];
    assert!(ensure_channel_allowed("conversations_add_message", "C1", &enabled).is_ok());
}

#[test]
#[serial]
fn read_only_tools_have_no_channel_policy() {
    clear_policy_env();
    assert!(ensure_channel_allowed("conversations_history", "C1", &[]).is_ok());
}
