use slack_conduit::slack::api::{
    ConversationsListResponse, HistoryResponse, SearchResponse, UsersListResponse,
};
use slack_conduit::slack::edge::ClientCountsResponse;

#[test]
fn history_payload_deserializes() {
    let body = r#"{
        "ok": true,
        "messages": [
            {
                "type": "message",
                "user": "U012AB3CDE",
                "text": "I find you punny and would like to smell your nose letter",
                "ts": "1512085950.000216",
                "reactions": [{"name": "space_invader", "count": 3, "users": ["U1", "U2", "U3"]}]
            },
            {
                "type": "message",
                "subtype": "channel_join",
                "user": "U061F7AUR",
                "text": "<@U061F7AUR> has joined the channel",
                "ts": "1512085950.218404"
            },
            {
                "type": "message",
                "subtype": "bot_message",
                "bot_id": "B19LU7CSY",
                "text": "deployed",
                "ts": "1512104434.000490",
                "thread_ts": "1512104400.000100"
            }
        ],
        "has_more": true,
        "response_metadata": { "next_cursor": "bmV4dF90czoxNTEyMDg1ODYxMDAwNTQz" }
    }"#;

    let page: HistoryResponse = serde_json::from_str(body).expect("parses");
    assert_eq!(page.messages.len(), 3);
    assert!(page.has_more);
    assert_eq!(
        page.response_metadata.cursor(),
        Some("bmV4dF90czoxNTEyMDg1ODYxMDAwNTQz")
    );

    let first = page.messages[0].clone().into_message("C1");
    assert_eq!(first.user, "U012AB3CDE");
    assert_eq!(first.reactions.len(), 1);
    assert_eq!(first.reactions[0].count, 3);
    assert!(!first.is_activity());

    let join = page.messages[1].clone().into_message("C1");
    assert!(join.is_activity());

    let bot = page.messages[2].clone().into_message("C1");
    assert_eq!(bot.user, "B19LU7CSY");
    assert_eq!(bot.thread_ts.as_deref(), Some("1512104400.000100"));
    assert!(!bot.is_activity());
}

#[test]
fn conversations_list_payload_deserializes() {
    let body = r#"{
        "ok": true,
        "channels": [
            {
                "id": "C012AB3CD",
                "name": "general",
                "is_channel": true,
                "is_private": false,
                "is_im": false,
                "topic": { "value": "Company-wide announcements", "creator": "", "last_set": 0 },
                "purpose": { "value": "This channel is for team-wide communication", "creator": "", "last_set": 0 },
                "num_members": 4
            },
            {
                "id": "D0C1A2B3C",
                "is_im": true,
                "user": "U0BS9U4SV",
                "is_ext_shared": false
            }
        ],
        "response_metadata": { "next_cursor": "" }
    }"#;

    let page: ConversationsListResponse = serde_json::from_str(body).expect("parses");
    assert_eq!(page.channels.len(), 2);
    assert!(page.response_metadata.cursor().is_none());

    let general = page.channels[0].clone().into_channel();
    assert_eq!(general.name, "general");
    assert_eq!(general.topic, "Company-wide announcements");
    assert_eq!(general.member_count, 4);
    assert!(!general.is_im);

    let dm = page.channels[1].clone().into_channel();
    assert!(dm.is_im);
    assert_eq!(dm.user.as_deref(), Some("U0BS9U4SV"));
    assert!(dm.name.is_empty());
}

#[test]
fn users_list_payload_deserializes() {
    let body = r#"{
        "ok": true,
        "members": [
            {
                "id": "W012A3CDE",
                "team_id": "T012AB3C4",
                "name": "spengler",
                "real_name": "Egon Spengler",
                "tz": "America/New_York",
                "profile": {
                    "title": "sprinkler repair",
                    "real_name": "Egon Spengler",
                    "display_name": "spengler",
                    "email": "spengler@ghostbusters.example.com"
                },
                "is_bot": false,
                "deleted": false
            },
            { "id": "U07KECNKX", "name": "deploybot", "is_bot": true }
        ],
        "response_metadata": { "next_cursor": "dXNlcjpVMEc5V0ZYTlo=" }
    }"#;

    let page: UsersListResponse = serde_json::from_str(body).expect("parses");
    assert_eq!(page.members.len(), 2);

    let egon = page.members[0].clone().into_user();
    assert_eq!(egon.id, "W012A3CDE");
    assert_eq!(egon.email, "spengler@ghostbusters.example.com");
    assert_eq!(egon.title, "sprinkler repair");
    assert_eq!(egon.label(), "spengler");
    assert_eq!(egon.tz.as_deref(), Some("America/New_York"));

    let bot = page.members[1].clone().into_user();
    assert!(bot.is_bot);
    assert!(bot.email.is_empty());
}

#[test]
fn search_payload_deserializes() {
    let body = r#"{
        "ok": true,
        "query": "The meaning of life",
        "messages": {
            "total": 42,
            "paging": { "count": 20, "total": 42, "page": 1, "pages": 3 },
            "matches": [
                {
                    "channel": { "id": "C12345678", "name": "general" },
                    "type": "message",
                    "user": "U2U85N1RV",
                    "username": "roach",
                    "ts": "1508795665.000236",
                    "text": "The meaning of life, the universe, and everything is 42.",
                    "permalink": "https://example.slack.com/archives/C12345678/p1508795665000236"
                }
            ]
        }
    }"#;

    let response: SearchResponse = serde_json::from_str(body).expect("parses");
    assert_eq!(response.messages.total, 42);
    assert_eq!(response.messages.paging.page, 1);
    assert_eq!(response.messages.paging.pages, 3);
    assert_eq!(response.messages.matches.len(), 1);
    assert_eq!(response.messages.matches[0].channel.name, "general");
    assert_eq!(response.messages.matches[0].username.as_deref(), Some("roach"));
}

#[test]
fn client_counts_payload_deserializes() {
    let body = r#"{
        "ok": true,
        "channels": [
            { "id": "C1", "has_unreads": true, "mention_count": 0, "last_read": "1736467200.000000", "latest": "1736510400.000000" },
            { "id": "C2", "has_unreads": false, "mention_count": 0, "last_read": "1736467200.000000", "latest": "1736467200.000000" }
        ],
        "mpims": [
            { "id": "G1", "has_unreads": true, "mention_count": 1, "last_read": "1736467200.000000", "latest": "1736510400.000000" }
        ],
        "ims": [
            { "id": "D1", "has_unreads": true, "mention_count": 2, "last_read": "", "latest": "1736510400.000000" }
        ]
    }"#;

    let counts: ClientCountsResponse = serde_json::from_str(body).expect("parses");
    assert_eq!(counts.channels.len(), 2);
    assert_eq!(counts.mpims.len(), 1);
    assert_eq!(counts.ims.len(), 1);
    assert!(counts.ims[0].has_unreads);
    assert_eq!(counts.ims[0].mention_count, 2);
    assert!(counts.ims[0].last_read.is_empty());
}
