use std::collections::HashMap;

use slack_conduit::models::unread::{ChannelType, UnreadChannel};
use slack_conduit::slack::edge::CountsEntry;
use slack_conduit::unread::filter::{
    fallback_budgets, fallback_note, filter_candidates, never_visited, sort_by_priority,
    EdgeCandidate,
};
use slack_conduit::unread::UnreadParams;

fn unread(id: &str, kind: ChannelType) -> UnreadChannel {
    UnreadChannel {
        channel_id: id.into(),
        channel_name: id.into(),
        channel_type: kind,
        unread_count: 1,
        last_read: String::new(),
        latest: String::new(),
    }
}

fn candidate(id: &str, kind: ChannelType, has_unreads: bool, mentions: u32) -> EdgeCandidate {
    EdgeCandidate {
        entry: CountsEntry {
            id: id.into(),
            has_unreads,
            mention_count: mentions,
            last_read: String::new(),
            latest: String::new(),
        },
        channel_type: kind,
        display_name: id.into(),
    }
}

#[test]
fn priority_is_monotone_over_any_output() {
    let mut channels = vec![
        unread("C9", ChannelType::Internal),
        unread("P1", ChannelType::Partner),
        unread("D3", ChannelType::Dm),
        unread("G2", ChannelType::GroupDm),
        unread("D1", ChannelType::Dm),
        unread("C1", ChannelType::Internal),
    ];
    sort_by_priority(&mut channels);

    for pair in channels.windows(2) {
        assert!(pair[0].channel_type.priority() <= pair[1].channel_type.priority());
    }
    // Stability: equal-priority entries keep their input order.
    let dms: Vec<&str> = channels
        .iter()
        .filter(|c| c.channel_type == ChannelType::Dm)
        .map(|c| c.channel_id.as_str())
        .collect();
    assert_eq!(dms, ["D3", "D1"]);
}

#[test]
fn mentions_only_with_mixed_counts_keeps_only_the_dm() {
    // An internal channel with unreads but no mentions, and a DM with two
    // mentions: mentions-only must surface exactly the DM.
    let survivors = filter_candidates(
        vec![
            candidate("C1", ChannelType::Internal, true, 0),
            candidate("D1", ChannelType::Dm, true, 2),
        ],
        None,
        true,
        None,
    );
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].entry.id, "D1");
}

#[test]
fn type_filter_restricts_the_output() {
    let all = vec![
        candidate("D1", ChannelType::Dm, true, 0),
        candidate("G1", ChannelType::GroupDm, true, 0),
        candidate("P1", ChannelType::Partner, true, 0),
        candidate("C1", ChannelType::Internal, true, 0),
    ];

    let dms = filter_candidates(all.clone(), None, false, Some(ChannelType::Dm));
    assert_eq!(dms.len(), 1);
    assert_eq!(dms[0].entry.id, "D1");

    let partners = filter_candidates(all, None, false, Some(ChannelType::Partner));
    assert_eq!(partners.len(), 1);
    assert_eq!(partners[0].entry.id, "P1");
}

#[test]
fn channels_without_unreads_never_survive() {
    let survivors = filter_candidates(
        vec![candidate("C1", ChannelType::Internal, false, 5)],
        None,
        false,
        None,
    );
    assert!(survivors.is_empty());
}

#[test]
fn muted_channels_are_dropped_when_the_set_is_available() {
    let muted: HashMap<String, bool> =
        [("C1".to_owned(), true), ("C2".to_owned(), false)].into_iter().collect();
    let survivors = filter_candidates(
        vec![
            candidate("C1", ChannelType::Internal, true, 1),
            candidate("C2", ChannelType::Internal, true, 1),
        ],
        Some(&muted),
        false,
        None,
    );
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].entry.id, "C2");
}

#[test]
fn budgets_split_dms_full_and_the_rest_half() {
    let [dms, mpims, channels] = fallback_budgets(40);
    assert_eq!(dms.quota, 40);
    assert_eq!(mpims.quota, 20);
    assert_eq!(channels.quota, 20);
    assert_eq!(dms.scan_cap, 80);
    assert_eq!(mpims.scan_cap, 50);
    assert_eq!(channels.scan_cap, 50);

    // The scan cap never drops below 50, even for tiny quotas.
    let [dms, mpims, channels] = fallback_budgets(2);
    assert_eq!(dms.scan_cap, 50);
    assert_eq!(mpims.scan_cap, 50);
    assert_eq!(channels.scan_cap, 50);
}

#[test]
fn never_visited_normalises_the_slack_sentinels() {
    assert!(never_visited(None));
    assert!(never_visited(Some("")));
    assert!(never_visited(Some("0000000000.000000")));
    assert!(!never_visited(Some("1700000000.000123")));
}

#[test]
fn fallback_note_names_the_token_kind_and_counts() {
    let note = fallback_note(37, 82, 3);
    assert!(note.contains("xoxp token"));
    assert!(note.contains("37"));
    assert!(note.contains("82"));
    assert!(note.contains("3 skipped"));
}

#[test]
fn default_params_are_bounded() {
    let params = UnreadParams::default();
    assert_eq!(params.max_channels, 20);
    assert_eq!(params.max_messages_per_channel, 10);
    assert!(!params.include_muted);
    assert!(!params.mentions_only);
    assert!(!params.include_messages);
    assert!(params.channel_types.is_none());
}
