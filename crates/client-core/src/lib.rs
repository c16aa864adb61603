//! Core contract and reconciliation state for the Ember chat client.
//!
//! This crate is synchronous and transport-free: it defines the wire and
//! command types, the message timeline with its optimistic-echo lifecycle,
//! and the small stateful gadgets (cooldown, typing signaler, notice slot)
//! the async runtime in `client-ember` drives. A message is represented by
//! exactly one timeline entry from local echo to expiry; reconciliation
//! mutates that entry in place and never reorders it.

pub mod attachment;
pub mod channel;
pub mod codec;
pub mod cooldown;
pub mod error;
pub mod notice;
pub mod state;
pub mod timeline;
pub mod typing;
pub mod types;

pub use attachment::{AttachmentError, EncodedImage, MAX_ATTACHMENT_BYTES, encode_image};
pub use channel::{ClientChannelError, ClientChannels, SnapshotStream};
pub use cooldown::SendCooldown;
pub use error::{ClientError, ErrorCategory, classify_http_status};
pub use notice::NoticeSlot;
pub use state::{ChatState, typing_label};
pub use timeline::{
    ConfirmOutcome, FAILED_MARKER, MessageTimeline, PENDING_EXPIRY_LABEL, REDACTED_BODY,
};
pub use typing::{TypingEdge, TypingSignaler};
pub use types::{
    ChatSnapshot, ClientCommand, ClientSignal, ClientTuning, ConnectionState, LocalIdentity,
    MessageLifecycle, MessageRecord, MessageView, ProfileUpdate, SendRequest, ServerEvent,
};
