//! Async client runtime for Ember: owns the reconciliation state, drives the
//! REST boundary, and routes realtime frames.
//!
//! One task owns every piece of mutable state. Commands, server frames, REST
//! outcomes, and timer deadlines all land in the same `select!` loop, so
//! races like cancel-versus-confirm are decided by arrival order at a single
//! owner instead of by lock interleavings.

use std::future::pending;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use client_core::{
    AttachmentError, ChatState, ClientChannelError, ClientChannels, ClientCommand, ClientError,
    ClientSignal, ClientTuning, ErrorCategory, LocalIdentity, MessageRecord, ProfileUpdate,
    SendCooldown, SendRequest, ServerEvent, SnapshotStream, TypingEdge, TypingSignaler,
    encode_image,
};

/// Command queue depth between a frontend and the runtime task.
const COMMAND_BUFFER: usize = 128;
/// Snapshot fan-out depth; slow subscribers lag rather than block.
const SNAPSHOT_BUFFER: usize = 512;
/// Notice text for an attachment over the size ceiling.
const OVERSIZE_NOTICE: &str = "File too large (Max 6MB)";

/// A failed send plus whatever error text the server returned with it.
#[derive(Debug, Clone)]
pub struct SendFailure {
    pub error: ClientError,
    /// The response body's `{"error": ...}` text, shown to the user as a
    /// notice when present.
    pub server_notice: Option<String>,
}

/// REST boundary the runtime drives. Implementations sit behind an `Arc` and
/// are called from spawned tasks, one call per user action.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn fetch_history(&self) -> Result<Vec<MessageRecord>, ClientError>;
    async fn send_message(&self, request: SendRequest) -> Result<(), SendFailure>;
    async fn delete_message(&self, message_id: u64) -> Result<(), ClientError>;
    async fn update_profile(&self, update: ProfileUpdate) -> Result<(), ClientError>;
}

/// `reqwest` implementation against the Ember REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    base_url: Url,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl HttpChatApi {
    pub fn new(mut base_url: Url) -> Self {
        // `Url::join` treats the last path segment as a file unless the base
        // ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url.join(path).map_err(|err| {
            ClientError::new(ErrorCategory::Config, "invalid_endpoint", err.to_string())
        })
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn fetch_history(&self) -> Result<Vec<MessageRecord>, ClientError> {
        let url = self.endpoint("api/history")?;
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::http_status(
                status.as_u16(),
                "history fetch refused",
            ));
        }
        response.json::<Vec<MessageRecord>>().await.map_err(|err| {
            ClientError::new(
                ErrorCategory::Serialization,
                "invalid_history_body",
                err.to_string(),
            )
        })
    }

    async fn send_message(&self, request: SendRequest) -> Result<(), SendFailure> {
        let url = self.endpoint("api/message").map_err(|error| SendFailure {
            error,
            server_notice: None,
        })?;
        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|err| SendFailure {
                error: transport_error(err),
                server_notice: None,
            })?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let server_notice = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error);
        Err(SendFailure {
            error: ClientError::http_status(status.as_u16(), "send refused"),
            server_notice,
        })
    }

    async fn delete_message(&self, message_id: u64) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("api/message/{message_id}"))?;
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::http_status(status.as_u16(), "delete refused"));
        }
        Ok(())
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<(), ClientError> {
        let url = self.endpoint("api/user/me")?;
        let response = self
            .http
            .put(url)
            .json(&update)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::http_status(
                status.as_u16(),
                "profile update refused",
            ));
        }
        Ok(())
    }
}

/// Everything the runtime needs to start: who we are and how the timers run.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub identity: LocalIdentity,
    pub tuning: ClientTuning,
}

impl RuntimeConfig {
    pub fn new(identity: LocalIdentity) -> Self {
        Self {
            identity,
            tuning: ClientTuning::default(),
        }
    }
}

/// Frontend-facing handle to a spawned runtime.
#[derive(Debug, Clone)]
pub struct EmberHandle {
    channels: ClientChannels,
    shutdown: CancellationToken,
}

impl EmberHandle {
    pub async fn send(&self, command: ClientCommand) -> Result<(), ClientChannelError> {
        self.channels.send_command(command).await
    }

    pub fn subscribe(&self) -> SnapshotStream {
        self.channels.subscribe()
    }

    /// Asks the runtime task to exit. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Spawns the runtime task and returns the frontend handle.
///
/// `server_rx` delivers decoded realtime frames in arrival order; when it
/// closes, the transport is gone and the runtime exits. Outbound realtime
/// signals (typing edges) go to `signal_tx` best-effort.
pub fn spawn_runtime(
    config: RuntimeConfig,
    api: Arc<dyn ChatApi>,
    server_rx: mpsc::Receiver<ServerEvent>,
    signal_tx: mpsc::Sender<ClientSignal>,
) -> EmberHandle {
    let (channels, command_rx) = ClientChannels::new(COMMAND_BUFFER, SNAPSHOT_BUFFER);
    let shutdown = CancellationToken::new();
    let runtime = EmberRuntime::new(
        config,
        api,
        channels.clone(),
        command_rx,
        server_rx,
        signal_tx,
        shutdown.clone(),
    );
    tokio::spawn(runtime.run());
    EmberHandle { channels, shutdown }
}

/// Completion report from a spawned REST call.
#[derive(Debug)]
enum ApiOutcome {
    SendFinished {
        echo_id: String,
        result: Result<(), SendFailure>,
    },
    DeleteFinished {
        message_id: u64,
        result: Result<(), ClientError>,
    },
    ProfileFinished {
        result: Result<(), ClientError>,
    },
}

struct EmberRuntime {
    channels: ClientChannels,
    command_rx: mpsc::Receiver<ClientCommand>,
    server_rx: mpsc::Receiver<ServerEvent>,
    signal_tx: mpsc::Sender<ClientSignal>,
    outcome_tx: mpsc::UnboundedSender<ApiOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<ApiOutcome>,
    api: Arc<dyn ChatApi>,
    state: ChatState,
    cooldown: SendCooldown,
    typing: TypingSignaler,
    tuning: ClientTuning,
    /// Pending auto-dismiss for the visible notice: when, and which one.
    notice_deadline: Option<(Instant, u64)>,
    shutdown: CancellationToken,
}

impl EmberRuntime {
    fn new(
        config: RuntimeConfig,
        api: Arc<dyn ChatApi>,
        channels: ClientChannels,
        command_rx: mpsc::Receiver<ClientCommand>,
        server_rx: mpsc::Receiver<ServerEvent>,
        signal_tx: mpsc::Sender<ClientSignal>,
        shutdown: CancellationToken,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let state = ChatState::new(config.identity, &config.tuning);
        Self {
            channels,
            command_rx,
            server_rx,
            signal_tx,
            outcome_tx,
            outcome_rx,
            api,
            state,
            cooldown: SendCooldown::new(Duration::from_millis(config.tuning.send_cooldown_ms)),
            typing: TypingSignaler::new(Duration::from_millis(config.tuning.typing_idle_ms)),
            tuning: config.tuning,
            notice_deadline: None,
            shutdown,
        }
    }

    async fn run(mut self) {
        match self.api.fetch_history().await {
            Ok(records) => {
                info!(count = records.len(), "history seeded");
                self.state.seed_history(records);
            }
            Err(err) => {
                warn!(%err, "history fetch failed; starting with an empty timeline");
            }
        }
        self.publish();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("runtime shutdown requested");
                    break;
                }
                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        debug!("command channel closed");
                        break;
                    };
                    self.handle_command(command);
                    self.publish();
                }
                event = self.server_rx.recv() => {
                    let Some(event) = event else {
                        debug!("server event channel closed");
                        break;
                    };
                    self.state.apply_server_event(event);
                    self.publish();
                    if !self.state.is_live() {
                        info!("session rejected by server");
                        break;
                    }
                }
                outcome = self.outcome_rx.recv() => {
                    // The sender half lives on `self`, so this never closes.
                    if let Some(outcome) = outcome {
                        self.handle_api_outcome(outcome);
                        self.publish();
                    }
                }
                _ = sleep_until_deadline(self.typing.deadline()) => {
                    if let Some(TypingEdge::Stop) = self.typing.on_deadline(Instant::now()) {
                        self.send_signal(ClientSignal::StopTyping);
                    }
                }
                _ = sleep_until_deadline(self.notice_deadline.map(|(at, _)| at)) => {
                    if let Some((_, seq)) = self.notice_deadline.take()
                        && self.state.clear_notice(seq)
                    {
                        self.publish();
                    }
                }
                _ = sleep_until_deadline(self.cooldown.deadline()) => {
                    self.cooldown.disarm();
                    self.publish();
                }
            }
        }
    }

    fn handle_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::SendMessage { body, ttl_seconds } => {
                self.handle_send(&body, ttl_seconds);
            }
            ClientCommand::DeleteMessage { message_id } => self.handle_delete(message_id),
            ClientCommand::CancelLocalEcho { echo_id } => {
                if !self.state.cancel_local_echo(&echo_id) {
                    debug!(echo_id, "cancel ignored; echo already confirmed or gone");
                }
            }
            ClientCommand::AttachImage {
                bytes,
                content_type,
            } => self.handle_attach(&bytes, content_type.as_deref()),
            ClientCommand::ClearAttachment => self.state.clear_attachment(),
            ClientCommand::UpdateProfile { username, color } => {
                self.handle_update_profile(username, color);
            }
            ClientCommand::ComposerActivity => {
                if let Some(TypingEdge::Start) = self.typing.on_keystroke(Instant::now()) {
                    self.send_signal(ClientSignal::StartTyping);
                }
            }
        }
    }

    /// One send attempt: echo first, POST in the background, at most one
    /// attempt per cooldown window. An empty draft never arms the cooldown.
    fn handle_send(&mut self, body: &str, ttl_seconds: u64) {
        if !self.state.is_live() {
            debug!("send ignored; session rejected");
            return;
        }
        let body = body.trim();
        if body.is_empty() && !self.state.has_attachment() {
            return;
        }
        if !self.cooldown.try_begin(Instant::now()) {
            debug!("send dropped by cooldown");
            return;
        }
        if let Some(TypingEdge::Stop) = self.typing.on_send() {
            self.send_signal(ClientSignal::StopTyping);
        }

        let image = self.state.take_attachment();
        let time_label = Local::now().format("%I:%M %p").to_string();
        let echo_id = self.state.begin_send(body, image.clone(), time_label);
        let request = SendRequest {
            message: body.to_owned(),
            image,
            ttl: ttl_seconds,
            temp_id: echo_id.clone(),
        };

        let api = Arc::clone(&self.api);
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = api.send_message(request).await;
            let _ = outcome_tx.send(ApiOutcome::SendFinished { echo_id, result });
        });
    }

    /// Optimistic delete: dim now, undo only if the DELETE fails. On success
    /// the entry stays dimmed until the server's expiry push redacts it.
    fn handle_delete(&mut self, message_id: u64) {
        if !self.state.begin_delete(message_id) {
            debug!(message_id, "delete ignored; message not present");
            return;
        }
        let api = Arc::clone(&self.api);
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = api.delete_message(message_id).await;
            let _ = outcome_tx.send(ApiOutcome::DeleteFinished { message_id, result });
        });
    }

    fn handle_attach(&mut self, bytes: &[u8], content_type: Option<&str>) {
        match encode_image(bytes, content_type) {
            Ok(encoded) => {
                debug!(
                    mime = %encoded.mime,
                    bytes = encoded.byte_len,
                    "draft attachment staged"
                );
                self.state.stage_attachment(encoded.data_uri);
            }
            Err(AttachmentError::Oversize { size }) => {
                debug!(size, "oversize attachment refused");
                self.show_notice(OVERSIZE_NOTICE);
            }
            Err(err) => self.show_notice(err.to_string()),
        }
    }

    /// Fire-and-forget PUT. The authoritative rename arrives back as a
    /// `user_updated` push, so success changes nothing locally.
    fn handle_update_profile(&mut self, username: String, color: String) {
        let api = Arc::clone(&self.api);
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = api.update_profile(ProfileUpdate { username, color }).await;
            let _ = outcome_tx.send(ApiOutcome::ProfileFinished { result });
        });
    }

    fn handle_api_outcome(&mut self, outcome: ApiOutcome) {
        match outcome {
            ApiOutcome::SendFinished { echo_id, result } => {
                if let Err(failure) = result {
                    warn!(error = %failure.error, "send failed");
                    self.state.send_failed(&echo_id);
                    if let Some(text) = failure.server_notice {
                        self.show_notice(text);
                    }
                }
            }
            ApiOutcome::DeleteFinished { message_id, result } => {
                if let Err(err) = result {
                    // Silent in the UI beyond reverting the dim.
                    warn!(message_id, error = %err, "delete failed");
                    self.state.delete_failed(message_id);
                }
            }
            ApiOutcome::ProfileFinished { result } => {
                if let Err(err) = result {
                    warn!(error = %err, "profile update failed");
                }
            }
        }
    }

    fn show_notice(&mut self, text: impl Into<String>) {
        let seq = self.state.show_notice(text);
        let ttl = Duration::from_millis(self.tuning.notice_ttl_ms);
        self.notice_deadline = Some((Instant::now() + ttl, seq));
    }

    fn send_signal(&mut self, signal: ClientSignal) {
        if self.signal_tx.try_send(signal).is_err() {
            debug!(?signal, "realtime signal dropped; transport not keeping up");
        }
    }

    fn publish(&self) {
        let can_send = !self.cooldown.is_active(Instant::now());
        self.channels.emit(self.state.snapshot(can_send));
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => pending::<()>().await,
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    let code = if err.is_timeout() {
        "transport_timeout"
    } else if err.is_connect() {
        "transport_connect"
    } else {
        "transport_io"
    };
    ClientError::new(ErrorCategory::Network, code, err.to_string())
}
