//! Error type shared by every layer of the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who is to blame for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// An engine invariant was violated.
    Implementation,
    /// The remote side sent something illegal or malformed.
    Peer,
    /// The hosting application used the API against the state machine contract.
    Client,
    /// Resolve, connect, accept, bind or read/write failure.
    Network,
    /// A bounded operation exceeded its deadline.
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Implementation => "implementation error",
            ErrorKind::Peer => "peer error",
            ErrorKind::Client => "client error",
            ErrorKind::Network => "network error",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// A failure, tagged with its [`ErrorKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {text}")]
pub struct Error {
    pub kind: ErrorKind,
    pub text: String,
}

impl Error {
    pub fn new(kind: ErrorKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn implementation(text: impl Into<String>) -> Self {
        Self::new(ErrorKind::Implementation, text)
    }

    pub fn peer(text: impl Into<String>) -> Self {
        Self::new(ErrorKind::Peer, text)
    }

    pub fn client(text: impl Into<String>) -> Self {
        Self::new(ErrorKind::Client, text)
    }

    pub fn network(text: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, text)
    }

    pub fn timeout(text: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, text)
    }

    /// Peer and client errors end the session without a retry of the same exchange.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self.kind, ErrorKind::Peer | ErrorKind::Client)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_and_text() {
        let e = Error::peer("maximum message size exceeded");
        assert_eq!(e.to_string(), "peer error: maximum message size exceeded");
    }

    #[test]
    fn io_errors_are_network_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let e: Error = io.into();
        assert_eq!(e.kind, ErrorKind::Network);
        assert!(!e.is_protocol_violation());
    }
}
