//! Relay channel client.
//!
//! Every message gets its own connection: open, one write of
//! `<category>:<payload>`, close. Nothing is read back.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCategory {
    Lifecycle,
    Speech,
    Error,
}

impl MessageCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lifecycle => "lifecycle",
            Self::Speech => "speech",
            Self::Error => "error",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "lifecycle" => Some(Self::Lifecycle),
            "speech" => Some(Self::Speech),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub category: MessageCategory,
    pub payload: String,
}

impl RelayMessage {
    pub fn new(category: MessageCategory, payload: impl Into<String>) -> Self {
        Self {
            category,
            payload: payload.into(),
        }
    }

    pub fn lifecycle(payload: impl Into<String>) -> Self {
        Self::new(MessageCategory::Lifecycle, payload)
    }

    pub fn speech(payload: impl Into<String>) -> Self {
        Self::new(MessageCategory::Speech, payload)
    }

    pub fn error(payload: impl Into<String>) -> Self {
        Self::new(MessageCategory::Error, payload)
    }

    pub fn to_wire(&self) -> String {
        format!("{}:{}", self.category, self.payload)
    }

    /// Parse a wire message. The payload may itself contain colons.
    pub fn parse(wire: &str) -> Option<Self> {
        let (name, payload) = wire.split_once(':')?;
        Some(Self::new(MessageCategory::from_name(name)?, payload))
    }
}

/// Fire-and-forget delivery of one message.
pub trait RelayChannel {
    fn send(&self, message: &RelayMessage) -> Result<(), RelayError>;
}

/// Relay client for a local endpoint: a unix socket path, or a named pipe
/// path on Windows.
#[derive(Debug, Clone)]
pub struct LocalRelayClient {
    endpoint: PathBuf,
}

impl LocalRelayClient {
    pub fn new(endpoint: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    #[cfg(unix)]
    fn connect(&self) -> io::Result<std::os::unix::net::UnixStream> {
        std::os::unix::net::UnixStream::connect(&self.endpoint)
    }

    #[cfg(windows)]
    fn connect(&self) -> io::Result<std::fs::File> {
        std::fs::OpenOptions::new().write(true).open(&self.endpoint)
    }
}

impl RelayChannel for LocalRelayClient {
    fn send(&self, message: &RelayMessage) -> Result<(), RelayError> {
        let mut conn = self.connect().map_err(|source| RelayError::ChannelUnavailable {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        let wire = message.to_wire();
        write_once(&mut conn, wire.as_bytes())?;
        debug!("Relayed {} bytes ({})", wire.len(), message.category);
        Ok(())
    }
}

/// One write call. A short write counts as a failure.
fn write_once(w: &mut impl Write, bytes: &[u8]) -> Result<(), RelayError> {
    let written = w
        .write(bytes)
        .map_err(|e| RelayError::WriteFailed(e.to_string()))?;
    if written != bytes.len() {
        return Err(RelayError::WriteFailed(format!(
            "short write: {written} of {} bytes",
            bytes.len()
        )));
    }
    w.flush().map_err(|e| RelayError::WriteFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        assert_eq!(RelayMessage::speech("Hi").to_wire(), "speech:Hi");
        assert_eq!(RelayMessage::lifecycle("Voice destroyed").to_wire(), "lifecycle:Voice destroyed");
        assert_eq!(RelayMessage::error("boom").to_wire(), "error:boom");
    }

    #[test]
    fn parse_keeps_colons_in_payload() {
        let msg = RelayMessage::parse("speech:at 10:30").unwrap();
        assert_eq!(msg, RelayMessage::speech("at 10:30"));
        assert!(RelayMessage::parse("bogus:x").is_none());
        assert!(RelayMessage::parse("no separator").is_none());
    }

    struct ShortWriter;

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len() / 2)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn short_write_is_write_failed() {
        let err = write_once(&mut ShortWriter, b"speech:hello").unwrap_err();
        assert!(matches!(err, RelayError::WriteFailed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn missing_listener_is_channel_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let client = LocalRelayClient::new(dir.path().join("nobody.sock"));
        let err = client.send(&RelayMessage::speech("Hi")).unwrap_err();
        assert!(matches!(err, RelayError::ChannelUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn each_message_is_its_own_connection() {
        use std::io::Read;
        use std::os::unix::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let reader = std::thread::spawn(move || {
            let mut received = Vec::new();
            for stream in listener.incoming().take(2) {
                let mut buf = String::new();
                stream.unwrap().read_to_string(&mut buf).unwrap();
                received.push(buf);
            }
            received
        });

        let client = LocalRelayClient::new(&path);
        client.send(&RelayMessage::speech("one")).unwrap();
        client.send(&RelayMessage::error("two")).unwrap();

        assert_eq!(reader.join().unwrap(), vec!["speech:one", "error:two"]);
    }
}
