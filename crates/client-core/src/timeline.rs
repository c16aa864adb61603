//! Arrival-ordered message store with optimistic local echoes.
//!
//! Every mutation is an explicit scan over owned entries keyed by `echo_id`
//! or `message_id`. An entry is created exactly once per message and mutated
//! in place through its lifecycle, so ordering never changes under
//! confirmation.

use uuid::Uuid;

use crate::codec;
use crate::types::{LocalIdentity, MessageLifecycle, MessageRecord, MessageView};

/// Body markup a redacted entry displays.
pub const REDACTED_BODY: &str = "<em>[Message Expired]</em>";
/// Expiry tooltip text while a local echo awaits confirmation.
pub const PENDING_EXPIRY_LABEL: &str = "Pending...";
/// Footer text frontends render on `Failed` entries.
pub const FAILED_MARKER: &str = "(Failed)";

/// What `confirm` did with an inbound record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// A local echo carried the record's token; it was bound in place.
    Reconciled,
    /// No token match; the record was appended as a new entry.
    Appended,
    /// The record's id was already present; nothing changed.
    Duplicate,
}

#[derive(Debug)]
pub struct MessageTimeline {
    entries: Vec<MessageView>,
    max_items: usize,
}

impl MessageTimeline {
    pub fn new(max_items: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_items,
        }
    }

    pub fn entries(&self) -> &[MessageView] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a provisional entry for a message we just handed to the
    /// server, and returns its echo id. The body renders through the codec
    /// immediately; nothing about the entry changes when the server later
    /// confirms it except the identity hand-off and the expiry label.
    pub fn insert_local_echo(
        &mut self,
        body: &str,
        image: Option<String>,
        identity: &LocalIdentity,
        time_label: String,
    ) -> String {
        let echo_id = Uuid::new_v4().to_string();
        self.entries.push(MessageView {
            echo_id: Some(echo_id.clone()),
            message_id: None,
            user_id: identity.user_id,
            username: identity.username.clone(),
            color: identity.color.clone(),
            body_markup: codec::render_body(body),
            image,
            time_label,
            expiry_label: PENDING_EXPIRY_LABEL.to_owned(),
            lifecycle: MessageLifecycle::Pending,
            is_own: true,
            dimmed: false,
        });
        self.trim_to_max();
        echo_id
    }

    /// Routes an inbound confirmed record.
    ///
    /// A record whose `temp_id` matches a live echo mutates that entry in
    /// place: the server id is bound, the echo id dropped, and the server's
    /// expiry label adopted, while the locally rendered body, image, and
    /// time label are kept. Position never changes. Anything else appends a
    /// fresh entry, except records whose id is already present (duplicate
    /// delivery), which are ignored.
    pub fn confirm(&mut self, record: MessageRecord, own_user_id: u64) -> ConfirmOutcome {
        if self.position_by_id(record.id).is_some() {
            return ConfirmOutcome::Duplicate;
        }
        if let Some(token) = record.temp_id.as_deref()
            && let Some(at) = self.position_by_echo(token)
        {
            let entry = &mut self.entries[at];
            entry.echo_id = None;
            entry.message_id = Some(record.id);
            entry.lifecycle = MessageLifecycle::Confirmed;
            entry.expiry_label = record.expires_str;
            return ConfirmOutcome::Reconciled;
        }
        let view = view_from_record(record, own_user_id);
        self.entries.push(view);
        self.trim_to_max();
        ConfirmOutcome::Appended
    }

    /// Marks a pending echo as failed. The entry stays where it is; there is
    /// no automatic retry.
    pub fn mark_failed(&mut self, echo_id: &str) -> bool {
        match self.position_by_echo(echo_id) {
            Some(at) if self.entries[at].lifecycle == MessageLifecycle::Pending => {
                self.entries[at].lifecycle = MessageLifecycle::Failed;
                true
            }
            _ => false,
        }
    }

    /// Removes a pending or failed echo. Confirmed entries no longer carry
    /// an echo id, so a cancel that lost the race to the confirming push is
    /// a no-op.
    pub fn cancel_local(&mut self, echo_id: &str) -> bool {
        match self.position_by_echo(echo_id) {
            Some(at) => {
                self.entries.remove(at);
                true
            }
            None => false,
        }
    }

    /// Irreversibly redacts an expired message: placeholder body, attachment
    /// dropped, author metadata and position retained. Unknown ids are a
    /// no-op; expiry can race a delete we already applied.
    pub fn expire(&mut self, message_id: u64) -> bool {
        match self.position_by_id(message_id) {
            Some(at) => {
                let entry = &mut self.entries[at];
                entry.body_markup = REDACTED_BODY.to_owned();
                entry.image = None;
                entry.expiry_label = String::new();
                entry.lifecycle = MessageLifecycle::Expired;
                true
            }
            None => false,
        }
    }

    /// Rewrites the author name and color on every entry of `user_id`,
    /// expired entries included. Bodies are never touched. Returns how many
    /// entries changed.
    pub fn apply_profile_update(&mut self, user_id: u64, username: &str, color: &str) -> usize {
        let mut changed = 0;
        for entry in &mut self.entries {
            if entry.user_id == user_id {
                entry.username = username.to_owned();
                entry.color = color.to_owned();
                changed += 1;
            }
        }
        changed
    }

    /// Full replacement from the history snapshot. Stale provisional entries
    /// from before the bootstrap are dropped with everything else.
    pub fn seed(&mut self, records: Vec<MessageRecord>, own_user_id: u64) {
        self.entries.clear();
        self.entries.extend(
            records
                .into_iter()
                .map(|record| view_from_record(record, own_user_id)),
        );
        self.trim_to_max();
    }

    /// Optimistic-delete dimming and its revert.
    pub fn set_dimmed(&mut self, message_id: u64, dimmed: bool) -> bool {
        match self.position_by_id(message_id) {
            Some(at) => {
                self.entries[at].dimmed = dimmed;
                true
            }
            None => false,
        }
    }

    fn position_by_echo(&self, echo_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.echo_id.as_deref() == Some(echo_id))
    }

    fn position_by_id(&self, message_id: u64) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.message_id == Some(message_id))
    }

    fn trim_to_max(&mut self) {
        if self.entries.len() > self.max_items {
            let excess = self.entries.len() - self.max_items;
            self.entries.drain(0..excess);
        }
    }
}

fn view_from_record(record: MessageRecord, own_user_id: u64) -> MessageView {
    MessageView {
        echo_id: None,
        message_id: Some(record.id),
        user_id: record.user_id,
        username: record.username,
        color: record.color,
        body_markup: record
            .message
            .as_deref()
            .map(codec::render_body)
            .unwrap_or_default(),
        image: record.image,
        time_label: record.time,
        expiry_label: record.expires_str,
        lifecycle: MessageLifecycle::Confirmed,
        is_own: record.user_id == own_user_id,
        dimmed: false,
    }
}
