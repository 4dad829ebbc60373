//! Relay observer: the listening side of the relay channel.
//!
//! One connection carries one message; the listener reads each connection to
//! end of stream and hands the parsed message to a sink. A connection that
//! stays open past the read timeout is dropped.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::relay::RelayMessage;

/// How long one connection may take to deliver its message and close.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A message as printed by `listen --json`.
#[derive(Debug, Serialize)]
pub struct ObservedMessage {
    pub timestamp: String,
    pub category: String,
    pub payload: String,
}

impl ObservedMessage {
    pub fn new(message: &RelayMessage) -> Self {
        Self {
            timestamp: chrono::Local::now()
                .format("%Y-%m-%dT%H:%M:%S%.3f")
                .to_string(),
            category: message.category.to_string(),
            payload: message.payload.clone(),
        }
    }
}

pub struct RelayListener {
    listener: UnixListener,
    path: PathBuf,
    read_timeout: Duration,
}

impl RelayListener {
    /// Bind the endpoint, replacing a stale socket file left by a previous run.
    pub fn bind(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            debug!("Removing stale socket {}", path.display());
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        info!("Relay listener on {}", path.display());
        Ok(Self {
            listener,
            path: path.to_path_buf(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Accept connections forever, forwarding messages in arrival order.
    /// Returns when the receiving side of `tx` is dropped.
    pub async fn run(self, tx: mpsc::Sender<RelayMessage>) -> io::Result<()> {
        loop {
            let (mut stream, _) = self.listener.accept().await?;

            // Read inline: concurrent readers could reorder messages.
            let mut buf = Vec::new();
            match tokio::time::timeout(self.read_timeout, stream.read_to_end(&mut buf)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!("Failed to read relay connection: {e}");
                    continue;
                }
                Err(_) => {
                    warn!(
                        "Relay connection still open after {:?}, dropping it",
                        self.read_timeout
                    );
                    continue;
                }
            }

            let wire = String::from_utf8_lossy(&buf);
            let Some(message) = RelayMessage::parse(&wire) else {
                warn!("Unrecognized relay message: {wire:?}");
                continue;
            };

            if tx.send(message).await.is_err() {
                return Ok(());
            }
        }
    }
}

impl Drop for RelayListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{LocalRelayClient, RelayChannel};

    #[tokio::test]
    async fn receives_messages_in_send_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.sock");
        let listener = RelayListener::bind(&path).unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        tokio::spawn(listener.run(tx));

        let client = LocalRelayClient::new(&path);
        tokio::task::spawn_blocking(move || {
            client.send(&RelayMessage::speech("Hi")).unwrap();
            client.send(&RelayMessage::lifecycle("Voice destroyed")).unwrap();
        })
        .await
        .unwrap();

        assert_eq!(rx.recv().await.unwrap(), RelayMessage::speech("Hi"));
        assert_eq!(rx.recv().await.unwrap(), RelayMessage::lifecycle("Voice destroyed"));
    }

    #[tokio::test]
    async fn silent_connection_does_not_stall_later_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.sock");
        let listener = RelayListener::bind(&path)
            .unwrap()
            .with_read_timeout(Duration::from_millis(200));

        let (tx, mut rx) = mpsc::channel(8);
        tokio::spawn(listener.run(tx));

        // Connects and never writes or closes.
        let _silent = tokio::net::UnixStream::connect(&path).await.unwrap();

        let client = LocalRelayClient::new(&path);
        tokio::task::spawn_blocking(move || client.send(&RelayMessage::speech("after")).unwrap())
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("listener stalled on the silent connection");
        assert_eq!(received.unwrap(), RelayMessage::speech("after"));
    }

    #[tokio::test]
    async fn bind_replaces_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("relay.sock");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"stale").unwrap();
        assert!(RelayListener::bind(&path).is_ok());
    }

    #[test]
    fn observed_message_serializes() {
        let json =
            serde_json::to_string(&ObservedMessage::new(&RelayMessage::error("boom"))).unwrap();
        assert!(json.contains("\"category\":\"error\""));
        assert!(json.contains("\"payload\":\"boom\""));
    }
}
