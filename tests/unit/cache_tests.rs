use std::path::PathBuf;
use std::sync::Arc;

use slack_conduit::cache::channels::ChannelsCache;
use slack_conduit::cache::users::UsersCache;

fn write_users_file(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("users_cache.json");
    let body = serde_json::json!({
        "users": {
            "U1": { "id": "U1", "name": "alice", "real_name": "Alice Ant" },
            "U2": { "id": "U2", "name": "bob", "is_bot": true }
        }
    });
    std::fs::write(&path, body.to_string()).expect("write users cache");
    path
}

fn write_channels_file(dir: &std::path::Path, version: u32) -> PathBuf {
    let path = dir.join("channels_cache_v2.json");
    let body = serde_json::json!({
        "version": version,
        "channels": {
            "C1": { "id": "C1", "name": "general", "topic": "hq", "member_count": 12 },
            "D1": { "id": "D1", "name": "", "is_im": true, "user": "U1" },
            "D2": { "id": "D2", "name": "", "is_im": true, "user": "U404" },
            "G1": { "id": "G1", "name": "mpdm-alice--bob-1", "is_mpim": true },
            "C2": { "id": "C2", "name": "partners", "is_ext_shared": true }
        }
    });
    std::fs::write(&path, body.to_string()).expect("write channels cache");
    path
}

#[tokio::test]
async fn users_cache_loads_and_indexes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = UsersCache::new(write_users_file(dir.path()));

    assert!(!cache.is_ready());
    assert!(cache.load().await);
    assert!(cache.is_ready());

    let alice = cache.get("U1").await.expect("alice cached");
    assert_eq!(alice.real_name, "Alice Ant");
    assert_eq!(cache.id_for_handle("alice").await.as_deref(), Some("U1"));
    assert_eq!(cache.login("U2").await.as_deref(), Some("bob"));
    assert!(cache.get("U404").await.is_none());
}

#[tokio::test]
async fn missing_users_file_is_a_miss() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = UsersCache::new(dir.path().join("nope.json"));
    assert!(!cache.load().await);
    assert!(!cache.is_ready());
}

#[tokio::test]
async fn corrupt_users_file_is_a_miss() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("users_cache.json");
    std::fs::write(&path, "{ half a json").expect("write");
    let cache = UsersCache::new(path);
    assert!(!cache.load().await);
}

#[tokio::test]
async fn channels_cache_builds_the_reference_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    let users = Arc::new(UsersCache::new(write_users_file(dir.path())));
    users.load().await;

    let cache = ChannelsCache::new(write_channels_file(dir.path(), 2));
    assert!(cache.load(&users).await);
    assert!(cache.is_ready());

    assert_eq!(cache.resolve_ref("#general").await.as_deref(), Some("C1"));
    assert_eq!(cache.resolve_ref("general").await.as_deref(), Some("C1"));
    assert_eq!(cache.resolve_ref("@alice").await.as_deref(), Some("D1"));
    assert_eq!(
        cache.resolve_ref("mpdm-alice--bob-1").await.as_deref(),
        Some("G1")
    );
    assert!(cache.resolve_ref("#missing").await.is_none());
}

#[tokio::test]
async fn im_with_unknown_counterparty_is_indexed_by_raw_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let users = Arc::new(UsersCache::new(write_users_file(dir.path())));
    users.load().await;

    let cache = ChannelsCache::new(write_channels_file(dir.path(), 2));
    cache.load(&users).await;

    // U404 is not in the users directory yet.
    assert_eq!(cache.resolve_ref("@U404").await.as_deref(), Some("D2"));
}

#[tokio::test]
async fn version_mismatch_is_a_miss() {
    let dir = tempfile::tempdir().expect("tempdir");
    let users = Arc::new(UsersCache::new(write_users_file(dir.path())));
    users.load().await;

    let cache = ChannelsCache::new(write_channels_file(dir.path(), 1));
    assert!(!cache.load(&users).await);
    assert!(!cache.is_ready());
}

#[tokio::test]
async fn display_names_follow_the_convention() {
    let dir = tempfile::tempdir().expect("tempdir");
    let users = Arc::new(UsersCache::new(write_users_file(dir.path())));
    users.load().await;

    let cache = ChannelsCache::new(write_channels_file(dir.path(), 2));
    cache.load(&users).await;

    assert_eq!(
        cache.display_name("C1", &users).await.as_deref(),
        Some("#general")
    );
    assert_eq!(
        cache.display_name("D1", &users).await.as_deref(),
        Some("@alice")
    );
    assert_eq!(
        cache.display_name("G1", &users).await.as_deref(),
        Some("mpdm-alice--bob-1")
    );
}

#[tokio::test]
async fn reindex_resolves_ims_after_a_users_refresh() {
    let dir = tempfile::tempdir().expect("tempdir");

    // Channels land before the users directory knows anyone.
    let empty_users = Arc::new(UsersCache::new(dir.path().join("absent.json")));
    let cache = ChannelsCache::new(write_channels_file(dir.path(), 2));
    cache.load(&empty_users).await;
    assert_eq!(cache.resolve_ref("@U1").await.as_deref(), Some("D1"));
    assert!(cache.resolve_ref("@alice").await.is_none());

    // Users arrive; reindexing upgrades the IM label.
    let users = Arc::new(UsersCache::new(write_users_file(dir.path())));
    users.load().await;
    cache.reindex(&users).await;
    assert_eq!(cache.resolve_ref("@alice").await.as_deref(), Some("D1"));
}

#[tokio::test]
async fn channel_listing_is_sorted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let users = Arc::new(UsersCache::new(write_users_file(dir.path())));
    users.load().await;

    let cache = ChannelsCache::new(write_channels_file(dir.path(), 2));
    cache.load(&users).await;

    let all = cache.all().await;
    assert_eq!(all.len(), 5);
    let mut names: Vec<_> = all.iter().map(|c| c.name.clone()).collect();
    let sorted = names.clone();
    names.sort();
    assert_eq!(names, sorted);
}
