//! View-state reducer: the single owner of everything a frontend renders.
//!
//! Server events and local actions both funnel through here, one call at a
//! time, so no entry can be observed mid-mutation and race outcomes are
//! decided by call order alone.

use tracing::debug;

use crate::notice::NoticeSlot;
use crate::timeline::{ConfirmOutcome, MessageTimeline};
use crate::types::{
    ChatSnapshot, ClientTuning, ConnectionState, LocalIdentity, MessageRecord, ServerEvent,
};

/// Indicator text for the typing strip.
pub fn typing_label(count: u32) -> &'static str {
    match count {
        0 => "",
        1 => "Someone is typing...",
        _ => "Multiple people are typing...",
    }
}

#[derive(Debug)]
pub struct ChatState {
    identity: LocalIdentity,
    timeline: MessageTimeline,
    online_count: u32,
    typing_count: u32,
    notice: NoticeSlot,
    connection: ConnectionState,
    draft_attachment: Option<String>,
}

impl ChatState {
    pub fn new(identity: LocalIdentity, tuning: &ClientTuning) -> Self {
        Self {
            identity,
            timeline: MessageTimeline::new(tuning.timeline_max_items),
            online_count: 0,
            typing_count: 0,
            notice: NoticeSlot::default(),
            connection: ConnectionState::Live,
            draft_attachment: None,
        }
    }

    /// Routes one server frame. Frames arriving after a rejection are
    /// dropped; the rejection is terminal.
    pub fn apply_server_event(&mut self, event: ServerEvent) {
        if let ConnectionState::Rejected { .. } = self.connection {
            debug!(?event, "server event dropped after rejection");
            return;
        }
        match event {
            ServerEvent::ReceiveMessage(record) => {
                let outcome = self.timeline.confirm(record, self.identity.user_id);
                if outcome == ConfirmOutcome::Duplicate {
                    debug!("duplicate message push ignored");
                }
            }
            ServerEvent::MessageExpired { id } => {
                self.timeline.expire(id);
            }
            ServerEvent::TypingStatus { count } => self.typing_count = count,
            ServerEvent::UpdateUserCount { count } => self.online_count = count,
            ServerEvent::UserUpdated {
                user_id,
                username,
                color,
            } => {
                if user_id == self.identity.user_id {
                    self.identity.username = username.clone();
                    self.identity.color = color.clone();
                }
                self.timeline.apply_profile_update(user_id, &username, &color);
            }
            ServerEvent::ConnectionRejected { message } => {
                self.connection = ConnectionState::Rejected { message };
            }
        }
    }

    /// Inserts the optimistic echo for a send and returns its echo id.
    pub fn begin_send(
        &mut self,
        body: &str,
        image: Option<String>,
        time_label: String,
    ) -> String {
        self.timeline
            .insert_local_echo(body, image, &self.identity, time_label)
    }

    pub fn send_failed(&mut self, echo_id: &str) -> bool {
        self.timeline.mark_failed(echo_id)
    }

    pub fn cancel_local_echo(&mut self, echo_id: &str) -> bool {
        self.timeline.cancel_local(echo_id)
    }

    /// Optimistic delete: dim now, let the expiry push do the real removal.
    pub fn begin_delete(&mut self, message_id: u64) -> bool {
        self.timeline.set_dimmed(message_id, true)
    }

    pub fn delete_failed(&mut self, message_id: u64) -> bool {
        self.timeline.set_dimmed(message_id, false)
    }

    pub fn show_notice(&mut self, text: impl Into<String>) -> u64 {
        self.notice.show(text)
    }

    pub fn clear_notice(&mut self, seq: u64) -> bool {
        self.notice.clear(seq)
    }

    pub fn stage_attachment(&mut self, data_uri: String) {
        self.draft_attachment = Some(data_uri);
    }

    pub fn clear_attachment(&mut self) {
        self.draft_attachment = None;
    }

    pub fn take_attachment(&mut self) -> Option<String> {
        self.draft_attachment.take()
    }

    pub fn has_attachment(&self) -> bool {
        self.draft_attachment.is_some()
    }

    pub fn seed_history(&mut self, records: Vec<MessageRecord>) {
        self.timeline.seed(records, self.identity.user_id);
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub fn is_live(&self) -> bool {
        matches!(self.connection, ConnectionState::Live)
    }

    /// Clones the full render state. `can_send` reflects the cooldown gate,
    /// which lives with the caller; a rejected session can never send.
    pub fn snapshot(&self, can_send: bool) -> ChatSnapshot {
        ChatSnapshot {
            messages: self.timeline.entries().to_vec(),
            online_count: self.online_count,
            typing_count: self.typing_count,
            typing_label: typing_label(self.typing_count).to_owned(),
            notice: self.notice.text().map(str::to_owned),
            connection: self.connection.clone(),
            can_send: can_send && self.is_live(),
            draft_attachment: self.draft_attachment.clone(),
            identity: self.identity.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageLifecycle;

    const ME: u64 = 7;

    fn state() -> ChatState {
        ChatState::new(
            LocalIdentity {
                user_id: ME,
                username: "ada".into(),
                color: "#ff0000".into(),
            },
            &ClientTuning::default(),
        )
    }

    fn record(id: u64, user_id: u64, body: &str) -> MessageRecord {
        MessageRecord {
            temp_id: None,
            id,
            user_id,
            username: format!("user-{user_id}"),
            color: "#00ff00".into(),
            message: Some(body.into()),
            image: None,
            time: "01:00 PM".into(),
            expires_str: "in 5 minutes".into(),
        }
    }

    #[test]
    fn routes_a_confirming_push_onto_the_echo() {
        let mut state = state();
        let echo = state.begin_send("hi", None, "02:00 PM".into());

        let mut push = record(1, ME, "hi");
        push.temp_id = Some(echo);
        state.apply_server_event(ServerEvent::ReceiveMessage(push));

        let snapshot = state.snapshot(true);
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].message_id, Some(1));
        assert_eq!(snapshot.messages[0].lifecycle, MessageLifecycle::Confirmed);
    }

    #[test]
    fn routes_expiry_to_redaction() {
        let mut state = state();
        state.apply_server_event(ServerEvent::ReceiveMessage(record(3, 2, "secret")));
        state.apply_server_event(ServerEvent::MessageExpired { id: 3 });

        let snapshot = state.snapshot(true);
        assert_eq!(snapshot.messages[0].lifecycle, MessageLifecycle::Expired);
    }

    #[test]
    fn counters_are_absolute_assignments() {
        let mut state = state();
        state.apply_server_event(ServerEvent::UpdateUserCount { count: 5 });
        state.apply_server_event(ServerEvent::UpdateUserCount { count: 2 });
        state.apply_server_event(ServerEvent::TypingStatus { count: 1 });

        let snapshot = state.snapshot(true);
        assert_eq!(snapshot.online_count, 2);
        assert_eq!(snapshot.typing_count, 1);
        assert_eq!(snapshot.typing_label, "Someone is typing...");
    }

    #[test]
    fn typing_label_buckets() {
        assert_eq!(typing_label(0), "");
        assert_eq!(typing_label(1), "Someone is typing...");
        assert_eq!(typing_label(2), "Multiple people are typing...");
        assert_eq!(typing_label(40), "Multiple people are typing...");
    }

    #[test]
    fn profile_push_for_the_local_user_refreshes_identity() {
        let mut state = state();
        state.apply_server_event(ServerEvent::ReceiveMessage(record(1, ME, "x")));
        state.apply_server_event(ServerEvent::UserUpdated {
            user_id: ME,
            username: "grace".into(),
            color: "#0000ff".into(),
        });

        assert_eq!(state.identity().username, "grace");
        let snapshot = state.snapshot(true);
        assert_eq!(snapshot.messages[0].username, "grace");
        assert_eq!(snapshot.identity.color, "#0000ff");
    }

    #[test]
    fn profile_push_for_another_user_leaves_identity_alone() {
        let mut state = state();
        state.apply_server_event(ServerEvent::UserUpdated {
            user_id: 99,
            username: "eve".into(),
            color: "#000000".into(),
        });
        assert_eq!(state.identity().username, "ada");
    }

    #[test]
    fn rejection_is_terminal() {
        let mut state = state();
        state.apply_server_event(ServerEvent::ConnectionRejected {
            message: "room is full".into(),
        });
        state.apply_server_event(ServerEvent::ReceiveMessage(record(1, 2, "late")));
        state.apply_server_event(ServerEvent::UpdateUserCount { count: 9 });

        let snapshot = state.snapshot(true);
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.online_count, 0);
        assert_eq!(
            snapshot.connection,
            ConnectionState::Rejected {
                message: "room is full".into()
            }
        );
        // An open cooldown gate cannot override a rejected session.
        assert!(!snapshot.can_send);
    }

    #[test]
    fn delete_dims_and_revert_restores() {
        let mut state = state();
        state.apply_server_event(ServerEvent::ReceiveMessage(record(1, ME, "x")));
        assert!(state.begin_delete(1));
        assert!(state.snapshot(true).messages[0].dimmed);
        assert!(state.delete_failed(1));
        assert!(!state.snapshot(true).messages[0].dimmed);
    }

    #[test]
    fn snapshot_carries_notice_and_draft() {
        let mut state = state();
        let seq = state.show_notice("File too large (Max 6MB)");
        state.stage_attachment("data:image/png;base64,AAAA".into());

        let snapshot = state.snapshot(false);
        assert_eq!(snapshot.notice.as_deref(), Some("File too large (Max 6MB)"));
        assert_eq!(
            snapshot.draft_attachment.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        assert!(!snapshot.can_send);

        assert!(state.clear_notice(seq));
        assert_eq!(state.snapshot(true).notice, None);
    }

    #[test]
    fn restaging_replaces_the_draft() {
        let mut state = state();
        state.stage_attachment("data:image/png;base64,AAAA".into());
        state.stage_attachment("data:image/gif;base64,BBBB".into());
        assert_eq!(
            state.snapshot(true).draft_attachment.as_deref(),
            Some("data:image/gif;base64,BBBB")
        );
    }

    #[test]
    fn taking_the_draft_consumes_it() {
        let mut state = state();
        state.stage_attachment("data:image/gif;base64,AAAA".into());
        assert!(state.has_attachment());
        assert_eq!(
            state.take_attachment().as_deref(),
            Some("data:image/gif;base64,AAAA")
        );
        assert!(!state.has_attachment());
        assert_eq!(state.take_attachment(), None);
    }

    #[test]
    fn seeding_replaces_the_timeline() {
        let mut state = state();
        state.begin_send("stale", None, "t".into());
        state.seed_history(vec![record(1, 2, "a"), record(2, ME, "b")]);

        let snapshot = state.snapshot(true);
        assert_eq!(snapshot.messages.len(), 2);
        assert!(snapshot.messages[1].is_own);
    }
}
