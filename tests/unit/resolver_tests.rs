use std::path::Path;
use std::sync::Arc;

use slack_conduit::cache::resolver::resolve_channel;
use slack_conduit::cache::WorkspaceCache;
use slack_conduit::config::Config;
use slack_conduit::limiter::Limiters;
use slack_conduit::slack::gateway::SlackGateway;
use slack_conduit::slack::http::NetOptions;
use slack_conduit::slack::token::AuthCredentials;
use slack_conduit::AppError;
use tokio_util::sync::CancellationToken;

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
        "users": { "U1": { "id": "U1", "name": "alice" } }
    });
    std::fs::write(dir.join("users_cache.json"), users.to_string()).expect("write users");

    let channels = serde_json::json!({
        "version": 2,
        "channels": {
            "C1": { "id": "C1", "name": "general" },
            "D1": { "id": "D1", "name": "", "is_im": true, "user": "U1" }
        }
    });
    std::fs::write(dir.join("channels_cache_v2.json"), channels.to_string())
        .expect("write channels");

    let cache = WorkspaceCache::new(&test_config(dir));
    cache.users.load().await;
    cache.channels.load(&cache.users).await;
    cache
}

fn offline_gateway() -> Arc<SlackGateway> {
    let creds = AuthCredentials::UserOauth {
        token: "xoxp-test".into(),
    };
    Arc::new(SlackGateway::connect(&creds, &NetOptions::default()).expect("gateway builds"))
}

#[tokio::test]
async fn channel_ids_pass_through_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;
    let gateway = offline_gateway();
    let ct = CancellationToken::new();

    for id in ["C0123ABCD", "G555", "D42", "S9"] {
        let resolved = resolve_channel(&cache, &gateway, &Limiters::default(), &ct, id)
            .await
            .expect("id passes through");
        assert_eq!(resolved, id);
    }
}

#[tokio::test]
async fn cached_references_resolve_without_a_refresh() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;
    let gateway = offline_gateway();
    let ct = CancellationToken::new();
    let limiters = Limiters::default();

    let general = resolve_channel(&cache, &gateway, &limiters, &ct, "#general")
        .await
        .expect("name resolves");
    assert_eq!(general, "C1");

    let dm = resolve_channel(&cache, &gateway, &limiters, &ct, "@alice")
        .await
        .expect("handle resolves");
    assert_eq!(dm, "D1");
}

#[tokio::test]
async fn empty_references_are_invalid_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = primed_cache(dir.path()).await;
    let gateway = offline_gateway();
    let ct = CancellationToken::new();

    let err = resolve_channel(&cache, &gateway, &Limiters::default(), &ct, "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}
