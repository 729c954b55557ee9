//! Protocol states of each role.

use serde::{Deserialize, Serialize};
use std::fmt;

/// States of the horizontal (Downstream and Upstream) interfaces.
///
/// ```text
/// NotConnected -> SocketConnected -> ServiceDescriptionExchanged -> NotAvailableNotReady
///     NotAvailableNotReady -> BoardAvailable | MachineReady -> AvailableAndReady
///     AvailableAndReady -> Transporting -> TransportStopped | TransportFinished
///     TransportStopped | TransportFinished -> NotAvailableNotReady
/// any -> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    NotConnected,
    SocketConnected,
    ServiceDescriptionExchanged,
    NotAvailableNotReady,
    BoardAvailable,
    MachineReady,
    AvailableAndReady,
    Transporting,
    TransportStopped,
    TransportFinished,
    Disconnected,
}

impl State {
    pub const ALL: [State; 11] = [
        State::NotConnected,
        State::SocketConnected,
        State::ServiceDescriptionExchanged,
        State::NotAvailableNotReady,
        State::BoardAvailable,
        State::MachineReady,
        State::AvailableAndReady,
        State::Transporting,
        State::TransportStopped,
        State::TransportFinished,
        State::Disconnected,
    ];
}

/// States of the vertical (supervisory) interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerticalState {
    NotConnected,
    SocketConnected,
    SupervisoryServiceDescriptionExchanged,
    Connected,
    Disconnected,
}

impl VerticalState {
    pub const ALL: [VerticalState; 5] = [
        VerticalState::NotConnected,
        VerticalState::SocketConnected,
        VerticalState::SupervisoryServiceDescriptionExchanged,
        VerticalState::Connected,
        VerticalState::Disconnected,
    ];
}

/// States of a remote configuration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigurationState {
    NotConnected,
    SocketConnected,
    Disconnected,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Display for VerticalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Display for ConfigurationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
