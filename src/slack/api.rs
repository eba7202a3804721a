//! Wire types for Slack's public Web API.
//!
//! Deserialization structs mirror only the fields this server consumes;
//! Slack's payloads carry far more and serde ignores the rest.

use serde::Deserialize;

use crate::models::channel::Channel;
use crate::models::message::{Message, Reaction};
use crate::models::user::User;

/// Pagination envelope shared by cursor-paged endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    /// Cursor for the next page; empty at the end.
    #[serde(default)]
    pub next_cursor: String,
}

impl ResponseMetadata {
    /// The next cursor, `None` when pagination is exhausted.
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        if self.next_cursor.is_empty() {
            None
        } else {
            Some(&self.next_cursor)
        }
    }
}

/// `auth.test` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTestResponse {
    /// Workspace URL, e.g. `https://acme.slack.com/`.
    pub url: String,
    /// Workspace name.
    #[serde(default)]
    pub team: String,
    /// Authenticated user handle.
    #[serde(default)]
    pub user: String,
    /// Workspace ID.
    pub team_id: String,
    /// Authenticated user ID.
    pub user_id: String,
}

impl AuthTestResponse {
    /// Workspace subdomain extracted from the team URL.
    #[must_use]
    pub fn workspace(&self) -> String {
        self.url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split('.')
            .next()
            .unwrap_or("workspace")
            .to_owned()
    }
}

/// A reaction tally on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct WireReaction {
    /// Emoji name.
    pub name: String,
    /// Reactor count.
    #[serde(default)]
    pub count: u32,
}

/// A message as it appears in history/replies/reactions payloads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireMessage {
    /// Slack timestamp.
    #[serde(default)]
    pub ts: String,
    /// Parent thread timestamp.
    #[serde(default)]
    pub thread_ts: Option<String>,
    /// Author user ID.
    #[serde(default)]
    pub user: Option<String>,
    /// Bot ID for bot-authored messages.
    #[serde(default)]
    pub bot_id: Option<String>,
    /// Message text.
    #[serde(default)]
    pub text: String,
    /// Subtype; absent for ordinary messages.
    #[serde(default)]
    pub subtype: Option<String>,
    /// Reaction tallies.
    #[serde(default)]
    pub reactions: Vec<WireReaction>,
}

impl WireMessage {
    /// Normalise into the model entity for the given channel.
    #[must_use]
    pub fn into_message(self, channel: &str) -> Message {
        let user = self
            .user
            .or(self.bot_id)
            .unwrap_or_default();
        Message {
            channel: channel.to_owned(),
            ts: self.ts,
            thread_ts: self.thread_ts,
            user,
            text: self.text,
            subtype: self.subtype.unwrap_or_default(),
            reactions: self
                .reactions
                .into_iter()
                .map(|r| Reaction {
                    name: r.name,
                    count: r.count,
                })
                .collect(),
        }
    }
}

/// `conversations.history` / `conversations.replies` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    /// Page of messages, newest first for history.
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    /// Whether another page exists.
    #[serde(default)]
    pub has_more: bool,
    /// Cursor envelope.
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

/// Topic/purpose wrapper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicField {
    /// The text value.
    #[serde(default)]
    pub value: String,
}

/// A conversation as it appears in list/info payloads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireChannel {
    /// Channel ID.
    pub id: String,
    /// Channel name; absent for IMs.
    #[serde(default)]
    pub name: String,
    /// Topic wrapper.
    #[serde(default)]
    pub topic: TopicField,
    /// Purpose wrapper.
    #[serde(default)]
    pub purpose: TopicField,
    /// Member count.
    #[serde(default)]
    pub num_members: u32,
    /// Private channel flag.
    #[serde(default)]
    pub is_private: bool,
    /// IM flag.
    #[serde(default)]
    pub is_im: bool,
    /// Group-DM flag.
    #[serde(default)]
    pub is_mpim: bool,
    /// Externally shared flag.
    #[serde(default)]
    pub is_ext_shared: bool,
    /// IM counterparty.
    #[serde(default)]
    pub user: Option<String>,
    /// Viewer's last-read timestamp; only on `conversations.info`.
    #[serde(default)]
    pub last_read: Option<String>,
    /// Unread count; Slack fills this for IMs on `conversations.info`.
    #[serde(default)]
    pub unread_count: Option<u32>,
    /// Latest message, when requested.
    #[serde(default)]
    pub latest: Option<WireMessage>,
}

impl WireChannel {
    /// Normalise into the model entity.
    #[must_use]
    pub fn into_channel(self) -> Channel {
        Channel {
            id: self.id,
            name: self.name,
            topic: self.topic.value,
            purpose: self.purpose.value,
            member_count: self.num_members,
            is_private: self.is_private,
            is_im: self.is_im,
            is_mpim: self.is_mpim,
            is_ext_shared: self.is_ext_shared,
            user: self.user,
            last_read: self.last_read,
        }
    }
}

/// `conversations.list` / `users.conversations` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationsListResponse {
    /// Page of conversations.
    #[serde(default)]
    pub channels: Vec<WireChannel>,
    /// Cursor envelope.
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

/// `conversations.info` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationInfoResponse {
    /// The conversation.
    pub channel: WireChannel,
}

/// `conversations.members` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationMembersResponse {
    /// User IDs in the conversation.
    #[serde(default)]
    pub members: Vec<String>,
    /// Cursor envelope.
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

/// Profile subset carried by `users.list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireProfile {
    /// Preferred display name.
    #[serde(default)]
    pub display_name: String,
    /// Profile email.
    #[serde(default)]
    pub email: String,
    /// Job title.
    #[serde(default)]
    pub title: String,
}

/// A user as it appears in `users.list` and edge `users/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireUser {
    /// User ID.
    pub id: String,
    /// Login handle.
    #[serde(default)]
    pub name: String,
    /// Full name.
    #[serde(default)]
    pub real_name: String,
    /// Profile subset.
    #[serde(default)]
    pub profile: WireProfile,
    /// Bot flag.
    #[serde(default)]
    pub is_bot: bool,
    /// Deactivated flag.
    #[serde(default)]
    pub deleted: bool,
    /// IANA time zone.
    #[serde(default)]
    pub tz: Option<String>,
}

impl WireUser {
    /// Normalise into the model entity.
    #[must_use]
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            real_name: self.real_name,
            display_name: self.profile.display_name,
            email: self.profile.email,
            title: self.profile.title,
            is_bot: self.is_bot,
            deleted: self.deleted,
            tz: self.tz,
        }
    }
}

/// `users.list` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersListResponse {
    /// Page of members.
    #[serde(default)]
    pub members: Vec<WireUser>,
    /// Cursor envelope.
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

/// `chat.postMessage` / `chat.update` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    /// Channel the message landed in.
    pub channel: String,
    /// Timestamp of the posted/edited message.
    pub ts: String,
}

/// Channel identity inside a search match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchChannelRef {
    /// Channel ID.
    #[serde(default)]
    pub id: String,
    /// Channel name.
    #[serde(default)]
    pub name: String,
}

/// One `search.messages` match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchMatch {
    /// Channel the match is in.
    #[serde(default)]
    pub channel: SearchChannelRef,
    /// Author user ID.
    #[serde(default)]
    pub user: Option<String>,
    /// Author handle as rendered by search.
    #[serde(default)]
    pub username: Option<String>,
    /// Matched text.
    #[serde(default)]
    pub text: String,
    /// Slack timestamp.
    #[serde(default)]
    pub ts: String,
    /// Permalink to the message.
    #[serde(default)]
    pub permalink: Option<String>,
}

/// Paging block inside `search.messages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPaging {
    /// Current page (1-based).
    #[serde(default)]
    pub page: u32,
    /// Total pages.
    #[serde(default)]
    pub pages: u32,
}

/// `messages` container inside `search.messages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchMessages {
    /// Total matches across all pages.
    #[serde(default)]
    pub total: u32,
    /// Matches on this page.
    #[serde(default)]
    pub matches: Vec<SearchMatch>,
    /// Paging block.
    #[serde(default)]
    pub paging: SearchPaging,
}

/// `search.messages` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// The matches container.
    #[serde(default)]
    pub messages: SearchMessages,
}

/// `reactions.get` response (message type).
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionsGetResponse {
    /// The message with its reactions.
    pub message: WireMessage,
}

/// A file record from `files.info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireFile {
    /// File ID.
    pub id: String,
    /// File name.
    #[serde(default)]
    pub name: String,
    /// Title, often equal to the name.
    #[serde(default)]
    pub title: String,
    /// MIME type.
    #[serde(default)]
    pub mimetype: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Authenticated download URL.
    #[serde(default)]
    pub url_private_download: String,
}

/// `files.info` response.
#[derive(Debug, Clone, Deserialize)]
pub struct FileInfoResponse {
    /// The file record.
    pub file: WireFile,
}

/// A usergroup from `usergroups.list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usergroup {
    /// Usergroup ID (`S…`).
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Mention handle.
    #[serde(default)]
    pub handle: String,
}

/// `usergroups.list` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsergroupsListResponse {
    /// All usergroups visible to the token.
    #[serde(default)]
    pub usergroups: Vec<Usergroup>,
}

/// Empty acknowledgement for write endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Acknowledged {}
