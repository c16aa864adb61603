//! Contract types shared between a frontend, the reducer, and the runtime:
//! wire frames, commands, and the render-ready view model.

use serde::{Deserialize, Serialize};

/// Tuning knobs for the runtime's timers and caps.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientTuning {
    /// Minimum spacing between outbound sends, in milliseconds.
    pub send_cooldown_ms: u64,
    /// Keystroke silence that ends a typing episode, in milliseconds.
    pub typing_idle_ms: u64,
    /// How long a transient notice stays visible, in milliseconds.
    pub notice_ttl_ms: u64,
    /// Upper bound on retained timeline entries.
    pub timeline_max_items: usize,
}

impl Default for ClientTuning {
    fn default() -> Self {
        Self {
            send_cooldown_ms: 500,
            typing_idle_ms: 2_000,
            notice_ttl_ms: 3_000,
            timeline_max_items: 500,
        }
    }
}

/// The session's own user, cached so local echoes can be attributed without
/// waiting on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalIdentity {
    pub user_id: u64,
    pub username: String,
    pub color: String,
}

/// A chat message as the server ships it, both in realtime pushes and in the
/// history snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Provisional id round-tripped from the sender; present when this record
    /// confirms one of our local echoes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<String>,
    /// Server-assigned message id.
    pub id: u64,
    pub user_id: u64,
    pub username: String,
    pub color: String,
    /// Raw body as typed by the author. Escaping is a render-side concern.
    #[serde(default)]
    pub message: Option<String>,
    /// Inline attachment as a `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Server-side clock label, e.g. `03:12 PM`.
    pub time: String,
    /// Human-readable expiry description for the entry tooltip.
    #[serde(default)]
    pub expires_str: String,
}

/// Realtime frames pushed by the server. Applied strictly in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A new message, or the confirming push for one of our echoes.
    ReceiveMessage(MessageRecord),
    /// A message reached its TTL and was redacted server-side.
    MessageExpired { id: u64 },
    /// Absolute count of users currently typing.
    TypingStatus { count: u32 },
    /// Absolute presence count for the room.
    UpdateUserCount { count: u32 },
    /// A user changed their display name or color.
    UserUpdated {
        user_id: u64,
        username: String,
        color: String,
    },
    /// The server refused this session. Terminal: nothing is applied after it.
    ConnectionRejected { message: String },
}

/// Client-to-server realtime signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientSignal {
    StartTyping,
    StopTyping,
}

/// Body for `POST /api/message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Requested lifetime in seconds.
    pub ttl: u64,
    /// Provisional id the server echoes back in the confirming push.
    pub temp_id: String,
}

/// Body for `PUT /api/user/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub color: String,
}

/// Actions a frontend issues to the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// Send the composer contents together with the staged attachment, if any.
    SendMessage { body: String, ttl_seconds: u64 },
    /// Ask the server to delete a confirmed message.
    DeleteMessage { message_id: u64 },
    /// Drop a local echo that has not confirmed, or that failed.
    CancelLocalEcho { echo_id: String },
    /// Validate raw image bytes and stage them as the draft attachment.
    AttachImage {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
    /// Drop the staged draft attachment.
    ClearAttachment,
    /// Request a profile change; the visible update arrives via `user_updated`.
    UpdateProfile { username: String, color: String },
    /// Composer keystroke; drives the typing signaler.
    ComposerActivity,
}

/// Delivery state of one timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLifecycle {
    /// Local echo awaiting the server's confirming push.
    Pending,
    /// Acknowledged by the server.
    Confirmed,
    /// The send attempt failed. The entry stays visible until cancelled.
    Failed,
    /// Redacted after its TTL elapsed.
    Expired,
}

/// One render-ready timeline entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    /// Provisional id; populated until the entry confirms.
    pub echo_id: Option<String>,
    /// Server id; populated once confirmed, and always for foreign entries.
    pub message_id: Option<u64>,
    pub user_id: u64,
    pub username: String,
    pub color: String,
    /// Escaped and linkified body markup.
    pub body_markup: String,
    pub image: Option<String>,
    /// Short clock label shown next to the author.
    pub time_label: String,
    /// Expiry tooltip text; a placeholder until the server assigns one.
    pub expiry_label: String,
    pub lifecycle: MessageLifecycle,
    pub is_own: bool,
    /// Optimistic-delete dimming.
    pub dimmed: bool,
}

/// Transport liveness as the reducer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Live,
    /// The server refused the session. No further events are applied.
    Rejected { message: String },
}

/// Immutable render state, broadcast after every applied mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSnapshot {
    pub messages: Vec<MessageView>,
    pub online_count: u32,
    pub typing_count: u32,
    /// Pre-bucketed indicator text for the typing strip.
    pub typing_label: String,
    /// Current transient notice, if one is showing.
    pub notice: Option<String>,
    pub connection: ConnectionState,
    /// Whether a send attempt would currently pass the cooldown gate.
    pub can_send: bool,
    /// Staged attachment as a `data:` URI, for composer preview.
    pub draft_attachment: Option<String>,
    pub identity: LocalIdentity,
}
