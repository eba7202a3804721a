use chrono::{TimeZone, Utc};
use serial_test::serial;
use slack_conduit::mcp::tools::util::{message_rows, parse_limit, LimitSpec, MESSAGE_HEADER};
use slack_conduit::models::message::Message;

#[test]
fn numeric_limits_are_counts() {
    let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
    assert_eq!(parse_limit("50", &now).unwrap(), LimitSpec::Count(50));
    assert_eq!(parse_limit("2000", &now).unwrap(), LimitSpec::Count(999));
    assert!(parse_limit("0", &now).is_err());
    assert!(parse_limit("", &now).is_err());
    assert!(parse_limit("5x", &now).is_err());
}

#[test]
fn seven_day_window_starts_at_midnight_covering_seven_days() {
    // 2025-01-10T12:00:00Z; a 7-day window covers Jan 4 through Jan 10.
    let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
    let spec = parse_limit("7d", &now).unwrap();
    let expected_oldest = Utc
        .with_ymd_and_hms(2025, 1, 4, 0, 0, 0)
        .unwrap()
        .timestamp();

    match spec {
        LimitSpec::Window { oldest, latest } => {
            assert_eq!(oldest, format!("{expected_oldest}.000000"));
            assert_eq!(latest, format!("{}.000000", now.timestamp()));
        }
        LimitSpec::Count(_) => panic!("expected a window"),
    }
}

#[test]
fn week_and_month_windows_parse() {
    let now = Utc.with_ymd_and_hms(2025, 3, 15, 9, 30, 0).unwrap();

    let LimitSpec::Window { oldest, .. } = parse_limit("1w", &now).unwrap() else {
        panic!("expected a window");
    };
    let expected = Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap().timestamp();
    assert_eq!(oldest, format!("{expected}.000000"));

    assert!(matches!(
        parse_limit("2m", &now).unwrap(),
        LimitSpec::Window { .. }
    ));
    assert!(parse_limit("0d", &now).is_err());
}

#[test]
fn message_rows_carry_cursor_only_on_the_last_row() {
    let messages = vec![
        Message {
            channel: "C1".into(),
            ts: "1.000000".into(),
            text: "first".into(),
            ..Message::default()
        },
        Message {
            channel: "C1".into(),
            ts: "2.000000".into(),
            text: "second".into(),
            ..Message::default()
        },
    ];

    let rows = message_rows(&messages, |_| None, Some("CURSOR"));
    assert_eq!(rows.len(), 2);
    let cursor_idx = MESSAGE_HEADER.len() - 1;
    assert_eq!(rows[0][cursor_idx], "");
    assert_eq!(rows[1][cursor_idx], "CURSOR");
}

#[test]
#[serial]
fn unfurling_policy_is_conservative() {
    use slack_conduit::mcp::tools::message::unfurling_allowed;

    std::env::remove_var("SLACK_MCP_ADD_MESSAGE_UNFURLING");
    assert!(!unfurling_allowed("see https://example.com/x"));

    std::env::set_var("SLACK_MCP_ADD_MESSAGE_UNFURLING", "true");
    assert!(unfurling_allowed("see https://example.com/x"));

    std::env::set_var("SLACK_MCP_ADD_MESSAGE_UNFURLING", "example.com,docs.rs");
    assert!(unfurling_allowed("see https://example.com/x and https://docs.rs/y"));
    assert!(!unfurling_allowed("see https://example.com/x and https://evil.io/y"));

    std::env::remove_var("SLACK_MCP_ADD_MESSAGE_UNFURLING");
}
