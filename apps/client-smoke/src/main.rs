//! Headless smoke binary: boots the client runtime against a live server,
//! checks that the history bootstrap lands, and exits.

mod config;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info, warn};
use url::Url;

use client_core::ClientCommand;
use client_ember::{HttpChatApi, RuntimeConfig, spawn_runtime};
use client_platform::{AttachmentSource, FileAttachmentSource};

use crate::config::SmokeConfig;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let config = match SmokeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "configuration error");
            return ExitCode::FAILURE;
        }
    };
    let base_url = match Url::parse(&config.server_url) {
        Ok(url) => url,
        Err(err) => {
            error!(%err, url = %config.server_url, "EMBER_SERVER_URL is not a valid URL");
            return ExitCode::FAILURE;
        }
    };
    info!(server = %base_url, user_id = config.identity.user_id, "starting smoke run");

    // No realtime transport here: the frame channel stays open and silent,
    // and any typing signal lands in a buffer nobody reads.
    let (_server_tx, server_rx) = mpsc::channel(16);
    let (signal_tx, _signal_rx) = mpsc::channel(16);

    let api = Arc::new(HttpChatApi::new(base_url));
    let runtime_config = RuntimeConfig {
        identity: config.identity.clone(),
        tuning: config.tuning.clone(),
    };
    let handle = spawn_runtime(runtime_config, api, server_rx, signal_tx);
    let mut snapshots = handle.subscribe();

    // Commands publish a snapshot after the bootstrap, so one harmless
    // command guarantees a post-subscription snapshot even if the bootstrap
    // publish raced our subscribe.
    if handle.send(ClientCommand::ComposerActivity).await.is_err() {
        error!("runtime exited before accepting commands");
        return ExitCode::FAILURE;
    }

    if let Some(path) = &config.image_path {
        match FileAttachmentSource::new(path).read() {
            Ok(payload) => {
                info!(path = %path, bytes = payload.bytes.len(), "staging draft attachment");
                if handle
                    .send(ClientCommand::AttachImage {
                        bytes: payload.bytes,
                        content_type: payload.content_type,
                    })
                    .await
                    .is_err()
                {
                    error!("runtime refused the attach command");
                    return ExitCode::FAILURE;
                }
            }
            Err(err) => warn!(%err, path = %path, "attachment not staged"),
        }
    }

    let snapshot = match timeout(Duration::from_secs(30), snapshots.recv()).await {
        Ok(Ok(snapshot)) => snapshot,
        Ok(Err(err)) => {
            error!(%err, "runtime exited before publishing a snapshot");
            return ExitCode::FAILURE;
        }
        Err(_) => {
            error!("no snapshot within 30s; is the server reachable?");
            return ExitCode::FAILURE;
        }
    };
    info!(
        messages = snapshot.messages.len(),
        online = snapshot.online_count,
        can_send = snapshot.can_send,
        "history bootstrap complete"
    );

    handle.shutdown();
    ExitCode::SUCCESS
}
