use serial_test::serial;
use slack_conduit::config::Config;
use slack_conduit::slack::token::{AuthCredentials, TokenKind};

fn clear_env() {
    for var in [
        "SLACK_MCP_XOXC_TOKEN",
        "SLACK_MCP_XOXD_TOKEN",
        "SLACK_MCP_XOXP_TOKEN",
        "SLACK_MCP_XOXB_TOKEN",
        "SLACK_MCP_PORT",
        "SLACK_MCP_HOST",
        "SLACK_MCP_API_KEY",
        "SLACK_MCP_PROXY",
        "SLACK_MCP_USER_AGENT",
        "SLACK_MCP_CUSTOM_TLS",
        "SLACK_MCP_GOVSLACK",
        "SLACK_MCP_ENABLED_TOOLS",
        "SLACK_MCP_USERS_CACHE",
        "SLACK_MCP_CHANNELS_CACHE",
    ] {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn browser_session_pair_resolves() {
    clear_env();
    std::env::set_var("SLACK_MCP_XOXC_TOKEN", "xoxc-abc");
    std::env::set_var("SLACK_MCP_XOXD_TOKEN", "cookie-value");

    let config = Config::from_env().expect("config parses");
    assert_eq!(
        config.auth,
        AuthCredentials::EdgeSession {
            token: "xoxc-abc".into(),
            cookie: "cookie-value".into(),
        }
    );
    assert_eq!(config.auth.kind(), Some(TokenKind::Session));
    clear_env();
}

#[test]
#[serial]
fn xoxc_without_cookie_is_fatal() {
    clear_env();
    std::env::set_var("SLACK_MCP_XOXC_TOKEN", "xoxc-abc");

    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("SLACK_MCP_XOXD_TOKEN"));
    clear_env();
}

#[test]
#[serial]
fn user_token_takes_precedence_over_bot_token() {
    clear_env();
    std::env::set_var("SLACK_MCP_XOXP_TOKEN", "xoxp-abc");
    std::env::set_var("SLACK_MCP_XOXB_TOKEN", "xoxb-abc");

    let config = Config::from_env().expect("config parses");
    assert_eq!(config.auth.kind(), Some(TokenKind::UserOauth));
    clear_env();
}

#[test]
#[serial]
fn wrong_prefix_is_rejected() {
    clear_env();
    std::env::set_var("SLACK_MCP_XOXP_TOKEN", "xoxb-oops");

    assert!(Config::from_env().is_err());
    clear_env();
}

#[test]
#[serial]
fn no_tokens_means_per_request_mode() {
    clear_env();
    let config = Config::from_env().expect("config parses");
    assert!(!config.has_process_credentials());
    clear_env();
}

#[test]
#[serial]
fn govslack_switches_the_base_domain() {
    clear_env();
    std::env::set_var("SLACK_MCP_XOXP_TOKEN", "xoxp-abc");

    let config = Config::from_env().expect("config parses");
    assert_eq!(config.base_domain(), "slack.com");

    std::env::set_var("SLACK_MCP_GOVSLACK", "true");
    let config = Config::from_env().expect("config parses");
    assert_eq!(config.base_domain(), "slack-gov.com");
    clear_env();
}

#[test]
#[serial]
fn unknown_tool_in_enabled_tools_is_fatal() {
    clear_env();
    std::env::set_var("SLACK_MCP_XOXP_TOKEN", "xoxp-abc");
    std::env::set_var("SLACK_MCP_ENABLED_TOOLS", "conversations_history,frobnicate");

    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("frobnicate"));
    clear_env();
}

#[test]
#[serial]
fn enabled_tools_parse_and_trim() {
    clear_env();
    std::env::set_var("SLACK_MCP_XOXP_TOKEN", "xoxp-abc");
    std::env::set_var(
        "SLACK_MCP_ENABLED_TOOLS",
        "conversations_history, channels_list",
    );

    let config = Config::from_env().expect("config parses");
    assert_eq!(
        config.enabled_tools,
        vec!["conversations_history".to_owned(), "channels_list".to_owned()]
    );
    clear_env();
}

#[test]
#[serial]
fn invalid_port_is_fatal() {
    clear_env();
    std::env::set_var("SLACK_MCP_XOXP_TOKEN", "xoxp-abc");
    std::env::set_var("SLACK_MCP_PORT", "not-a-port");

    assert!(Config::from_env().is_err());
    clear_env();
}

#[test]
#[serial]
fn cache_paths_are_overridable() {
    clear_env();
    std::env::set_var("SLACK_MCP_XOXP_TOKEN", "xoxp-abc");
    std::env::set_var("SLACK_MCP_USERS_CACHE", "/tmp/u.json");
    std::env::set_var("SLACK_MCP_CHANNELS_CACHE", "/tmp/c.json");

    let config = Config::from_env().expect("config parses");
    assert_eq!(config.users_cache_path, std::path::PathBuf::from("/tmp/u.json"));
    assert_eq!(
        config.channels_cache_path,
        std::path::PathBuf::from("/tmp/c.json")
    );
    clear_env();
}
