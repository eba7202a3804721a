use std::time::Duration;

use slack_conduit::AppError;

#[test]
fn slack_errors_carry_endpoint_context() {
    let err = AppError::slack("conversations.history", "channel_not_found");
    let text = err.to_string();
    assert!(text.contains("conversations.history"));
    assert!(text.contains("channel_not_found"));
}

#[test]
fn rate_limited_refresh_is_distinguishable_from_not_found() {
    let plain = AppError::NotFound("channel '#general'".into());
    let limited = AppError::RefreshRateLimited("channel '#general'".into());

    assert!(!plain.to_string().contains("rate-limited"));
    assert!(limited.to_string().contains("rate-limited"));
    // Both still read as a failed lookup.
    assert!(plain.to_string().contains("not found"));
    assert!(limited.to_string().contains("not found"));
}

#[test]
fn rate_limited_formatting_includes_the_delay() {
    let err = AppError::RateLimited {
        retry_after: Some(Duration::from_secs(30)),
    };
    assert!(err.to_string().contains("30"));
    assert!(err.is_rate_limited());

    let bare = AppError::RateLimited { retry_after: None };
    assert!(bare.is_rate_limited());
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: AppError = io.into();
    assert!(matches!(err, AppError::Io(_)));
}

#[test]
fn input_errors_map_to_invalid_params() {
    let data: rmcp::ErrorData = AppError::InvalidInput("bad ts".into()).into();
    assert_eq!(data.code, rmcp::model::ErrorCode::INVALID_PARAMS);

    let data: rmcp::ErrorData = AppError::slack("auth.test", "boom").into();
    assert_eq!(data.code, rmcp::model::ErrorCode::INTERNAL_ERROR);
}
