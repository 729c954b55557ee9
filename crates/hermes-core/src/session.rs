//! Session identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Identifies one connection of a role instance. Zero means "no session".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out session ids: 1, 2, 3, ... wrapping around without ever yielding 0.
#[derive(Debug, Default)]
pub struct SessionIdAllocator {
    last: u32,
}

impl SessionIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> SessionId {
        self.last = self.last.wrapping_add(1);
        if self.last == 0 {
            self.last = 1;
        }
        SessionId(self.last)
    }
}

/// The remote end of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub address: IpAddr,
    pub port: u16,
    /// The configured host for connections we initiated, the address otherwise.
    pub host_name: String,
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.host_name, self.address, self.port)
    }
}
