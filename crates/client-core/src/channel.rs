//! Channel plumbing between a frontend and the client runtime.
//!
//! Commands flow through a bounded mpsc queue; snapshots fan out over a
//! broadcast channel. Snapshot emission is best-effort: a subscriber that
//! falls behind sees `Lagged` and re-syncs from the next snapshot, which is
//! always complete.

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::types::{ChatSnapshot, ClientCommand};

/// Receiving half handed to each snapshot consumer.
pub type SnapshotStream = broadcast::Receiver<ChatSnapshot>;

#[derive(Debug, Error)]
pub enum ClientChannelError {
    #[error("client runtime is no longer accepting commands")]
    RuntimeClosed,
}

/// Frontend-facing half of the runtime's channel pair.
#[derive(Debug, Clone)]
pub struct ClientChannels {
    command_tx: mpsc::Sender<ClientCommand>,
    snapshot_tx: broadcast::Sender<ChatSnapshot>,
}

impl ClientChannels {
    /// Builds the pair and returns the command receiver for the runtime
    /// task to own.
    pub fn new(
        command_buffer: usize,
        snapshot_buffer: usize,
    ) -> (Self, mpsc::Receiver<ClientCommand>) {
        let (command_tx, command_rx) = mpsc::channel(command_buffer);
        let (snapshot_tx, _) = broadcast::channel(snapshot_buffer);
        (
            Self {
                command_tx,
                snapshot_tx,
            },
            command_rx,
        )
    }

    pub async fn send_command(&self, command: ClientCommand) -> Result<(), ClientChannelError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ClientChannelError::RuntimeClosed)
    }

    pub fn subscribe(&self) -> SnapshotStream {
        self.snapshot_tx.subscribe()
    }

    /// Publishes a snapshot to whoever is listening. No subscribers is fine.
    pub fn emit(&self, snapshot: ChatSnapshot) {
        let _ = self.snapshot_tx.send(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatState;
    use crate::types::{ClientTuning, LocalIdentity};

    fn snapshot() -> ChatSnapshot {
        ChatState::new(
            LocalIdentity {
                user_id: 1,
                username: "ada".into(),
                color: "#ff0000".into(),
            },
            &ClientTuning::default(),
        )
        .snapshot(true)
    }

    #[tokio::test]
    async fn sends_commands_to_the_runtime_receiver() {
        let (channels, mut command_rx) = ClientChannels::new(4, 4);
        channels
            .send_command(ClientCommand::ComposerActivity)
            .await
            .expect("runtime receiver alive");
        assert_eq!(
            command_rx.recv().await,
            Some(ClientCommand::ComposerActivity)
        );
    }

    #[tokio::test]
    async fn fans_snapshots_out_to_every_subscriber() {
        let (channels, _command_rx) = ClientChannels::new(4, 4);
        let mut first = channels.subscribe();
        let mut second = channels.subscribe();

        channels.emit(snapshot());

        assert!(first.recv().await.is_ok());
        assert!(second.recv().await.is_ok());
    }

    #[tokio::test]
    async fn emitting_without_subscribers_is_fine() {
        let (channels, _command_rx) = ClientChannels::new(4, 4);
        channels.emit(snapshot());
    }

    #[tokio::test]
    async fn send_fails_once_the_runtime_is_gone() {
        let (channels, command_rx) = ClientChannels::new(4, 4);
        drop(command_rx);
        let err = channels
            .send_command(ClientCommand::ClearAttachment)
            .await
            .expect_err("receiver dropped");
        assert!(matches!(err, ClientChannelError::RuntimeClosed));
    }
}
