use std::path::Path;

use chrono::NaiveDate;
use slack_conduit::cache::WorkspaceCache;
use slack_conduit::config::Config;
use slack_conduit::search::query::{build_query, SearchFilters};
use slack_conduit::slack::token::AuthCredentials;
use slack_conduit::AppError;

fn test_config(dir: &Path) -> Config {
    Config {
        auth: AuthCredentials::UserOauth {
            token: "xoxp-test".into(),
        },
        host: "127.0.0.1".into(),
        port: 0,
        api_key: None,
        proxy: None,
        user_agent: None,
        custom_tls: false,
        server_ca: None,
        server_ca_toolkit: false,
        server_ca_insecure: false,
        govslack: false,
        users_cache_path: dir.join("users_cache.json"),
        channels_cache_path: dir.join("channels_cache_v2.json"),
        enabled_tools: Vec::new(),
    }
}

async fn primed_cache(dir: &Path) -> WorkspaceCache {
    let users = serde_json::json!({
        "users": {
            "U1": { "id": "U1", "name": "alice" },
            "U2": { "id": "U2", "name": "bob" }
        }
    });
    std::fs::write(dir.join("users_cache.json"), users.to_string()).expect("write users");

    let channels = serde_json::json!({
        "version": 2,
        "channels": {
            "C1": { "id": "C1", "name": "general" }
        }
    });
    std::fs::write(dir.join("channels_cache_v2.json"), channels.to_string())
        .expect("write channels");

    let cache = WorkspaceCache::new(&test_config(dir));
    cache.users.load().await;
    cache.channels.load(&cache.users).await;
    cache
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date")
}

#[tokio::test]
async fn composes_free_text_filters_and_dates_in_fixed_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;

    let filters = SearchFilters {
        in_channel: Some("#general".into()),
        date_after: Some("yesterday".into()),
        ..SearchFilters::default()
    };
    let query = build_query(&cache, "hello from:@alice", &filters, today())
        .await
        .expect("query composes");

    assert_eq!(query, "hello in:general from:<@U1> after:2025-01-09");
}

#[tokio::test]
async fn duplicate_filters_are_deduplicated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;

    let filters = SearchFilters {
        in_channel: Some("#general".into()),
        ..SearchFilters::default()
    };
    let query = build_query(&cache, "report in:#general", &filters, today())
        .await
        .expect("query composes");

    assert_eq!(query, "report in:general");
}

#[tokio::test]
async fn threads_only_becomes_is_thread() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;

    let filters = SearchFilters {
        threads_only: true,
        ..SearchFilters::default()
    };
    let query = build_query(&cache, "incident", &filters, today())
        .await
        .expect("query composes");

    assert_eq!(query, "incident is:thread");
}

#[tokio::test]
async fn user_ids_are_wrapped_in_reference_form() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;

    let filters = SearchFilters {
        users_from: Some("U2".into()),
        ..SearchFilters::default()
    };
    let query = build_query(&cache, "", &filters, today())
        .await
        .expect("query composes");

    assert_eq!(query, "from:<@U2>");
}

#[tokio::test]
async fn on_is_exclusive_with_other_date_filters() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;

    let filters = SearchFilters {
        date_on: Some("2025-01-05".into()),
        date_before: Some("2025-01-09".into()),
        ..SearchFilters::default()
    };
    let err = build_query(&cache, "", &filters, today()).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn during_is_exclusive_with_before_and_after() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;

    let filters = SearchFilters {
        date_during: Some("January 2025".into()),
        date_after: Some("2025-01-02".into()),
        ..SearchFilters::default()
    };
    assert!(build_query(&cache, "", &filters, today()).await.is_err());
}

#[tokio::test]
async fn after_must_not_postdate_before() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;

    let filters = SearchFilters {
        date_after: Some("2025-01-09".into()),
        date_before: Some("2025-01-02".into()),
        ..SearchFilters::default()
    };
    let err = build_query(&cache, "", &filters, today()).await.unwrap_err();
    assert!(err.to_string().contains("later than"));

    // Equal bounds are allowed.
    let filters = SearchFilters {
        date_after: Some("2025-01-02".into()),
        date_before: Some("2025-01-02".into()),
        ..SearchFilters::default()
    };
    assert!(build_query(&cache, "", &filters, today()).await.is_ok());
}

#[tokio::test]
async fn unknown_channel_reference_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;

    let filters = SearchFilters {
        in_channel: Some("#nowhere".into()),
        ..SearchFilters::default()
    };
    let err = build_query(&cache, "", &filters, today()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn unknown_filter_keys_stay_free_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;

    let query = build_query(&cache, "error rate:high", &SearchFilters::default(), today())
        .await
        .expect("query composes");
    assert_eq!(query, "error rate:high");
}
