//! Protocol state machines.
//!
//! Every role shares one engine, [`StateMachine`], and differs only in its
//! transition table ([`Role::step`]). The engine is the legality gate for
//! every event of a session: messages received from the peer and messages the
//! application asks to send. It never performs I/O; it returns the
//! [`Action`]s the session owner must carry out, in order.

mod configuration;
mod horizontal;
mod vertical;

pub use configuration::ConfigurationService;
pub use horizontal::{Downstream, Upstream};
pub use vertical::{VerticalClient, VerticalService};

use crate::message::{Message, NotificationCode, NotificationData, Severity};
use crate::settings::CheckState;
use crate::Error;
use std::fmt;

/// Where an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Received from the remote side.
    Peer,
    /// Signaled by the hosting application.
    Local,
}

/// Outcome of looking an event up in a role's transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<S> {
    /// Legal; move to the given state.
    Enter(S),
    /// Legal; the state does not change.
    Stay,
    /// Not legal in this state.
    Reject,
}

/// Whether a role accepts connections or initiates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Server,
    Client,
}

/// How many sessions a role keeps at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Point-to-point: a second connection is refused.
    Single,
    /// One session per connected peer.
    Multiple,
}

/// A protocol role: its states, its message set and its transition table.
pub trait Role: Send + 'static {
    type State: Copy + Eq + fmt::Debug + fmt::Display + Send + 'static;

    const NAME: &'static str;
    const NOT_CONNECTED: Self::State;
    const SOCKET_CONNECTED: Self::State;
    const DISCONNECTED: Self::State;
    const SIDE: Side;
    const ADMISSION: Admission;
    /// Whether received pings may be answered automatically.
    const ANSWERS_PINGS: bool;
    /// Message types this role's sessions decode.
    const TAGS: &'static [&'static str];

    /// Looks up a state-dependent event. `Notification` and `CheckAlive` never
    /// reach this; the engine passes them through.
    fn step(state: Self::State, message: &Message, origin: Origin) -> Step<Self::State>;
}

/// Something the owner of a session must do, in the order given.
#[derive(Debug, Clone, PartialEq)]
pub enum Action<S> {
    /// The protocol state changed.
    State(S),
    /// Hand a received message to the application, with the resulting state.
    Deliver(Message, S),
    /// Write a message to the peer.
    Send(Message),
    /// The session ended. `None` when the application ended it.
    Disconnected(S, Option<Error>),
    /// Close the transport.
    Close,
}

/// The per-session legality gate of role `R`.
#[derive(Debug)]
pub struct StateMachine<R: Role> {
    state: R::State,
    check_state: CheckState,
    transport_board_id: Option<String>,
}

impl<R: Role> StateMachine<R> {
    pub fn new(check_state: CheckState) -> Self {
        Self {
            state: R::NOT_CONNECTED,
            check_state,
            transport_board_id: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn at(state: R::State, check_state: CheckState) -> Self {
        Self {
            state,
            check_state,
            transport_board_id: None,
        }
    }

    pub fn state(&self) -> R::State {
        self.state
    }

    /// True between socket connection and disconnection.
    pub fn is_connected(&self) -> bool {
        self.state != R::NOT_CONNECTED && self.state != R::DISCONNECTED
    }

    pub fn is_disconnected(&self) -> bool {
        self.state == R::DISCONNECTED
    }

    /// The transport connected.
    pub fn connect(&mut self) -> Vec<Action<R::State>> {
        if self.state != R::NOT_CONNECTED {
            return self.fail(Error::implementation(format!(
                "{} session connected twice (state {})",
                R::NAME,
                self.state
            )));
        }
        self.state = R::SOCKET_CONNECTED;
        vec![Action::State(self.state)]
    }

    /// A message arrived from the peer.
    pub fn receive(&mut self, message: Message) -> Vec<Action<R::State>> {
        self.handle(message, Origin::Peer)
    }

    /// The application wants to send a message.
    pub fn signal(&mut self, message: Message) -> Vec<Action<R::State>> {
        self.handle(message, Origin::Local)
    }

    /// The application ends the session, telling the peer why.
    pub fn disconnect(&mut self, notification: NotificationData) -> Vec<Action<R::State>> {
        if self.state == R::DISCONNECTED {
            return Vec::new();
        }
        let reached_peer = self.state != R::NOT_CONNECTED;
        self.state = R::DISCONNECTED;
        let mut actions = vec![Action::Disconnected(self.state, None)];
        if reached_peer {
            actions.push(Action::Send(Message::Notification(notification)));
        }
        actions.push(Action::Close);
        actions
    }

    /// The transport is gone; nothing more can be sent.
    pub fn transport_closed(&mut self, error: Error) -> Vec<Action<R::State>> {
        if self.state == R::DISCONNECTED {
            return Vec::new();
        }
        tracing::info!(role = R::NAME, state = %self.state, %error, "connection lost");
        self.state = R::DISCONNECTED;
        vec![Action::Disconnected(self.state, Some(error)), Action::Close]
    }

    /// Ends the session on an error detected outside the transition table,
    /// such as a framing or decode failure.
    pub fn fail(&mut self, error: Error) -> Vec<Action<R::State>> {
        if self.state == R::DISCONNECTED {
            return Vec::new();
        }
        tracing::error!(role = R::NAME, state = %self.state, %error, "closing session");
        let description = error.text.clone();
        self.state = R::DISCONNECTED;
        vec![
            Action::Disconnected(self.state, Some(error)),
            Action::Send(Message::notification(
                NotificationCode::ProtocolError,
                Severity::Fatal,
                description,
            )),
            Action::Close,
        ]
    }

    fn handle(&mut self, message: Message, origin: Origin) -> Vec<Action<R::State>> {
        if !self.is_connected() {
            tracing::debug!(
                role = R::NAME,
                state = %self.state,
                tag = message.tag(),
                ?origin,
                "dropping message outside a connection"
            );
            return Vec::new();
        }
        if matches!(message, Message::Notification(_) | Message::CheckAlive(_)) {
            return self.accept(message, origin, None);
        }
        match R::step(self.state, &message, origin) {
            Step::Enter(next) => match self.check_board_id(&message) {
                Ok(()) => self.accept(message, origin, Some(next)),
                Err(text) => self.violation(message, origin, text),
            },
            Step::Stay => self.accept(message, origin, None),
            Step::Reject => {
                let text = format!(
                    "unexpected {} from {} in state {}",
                    message.tag(),
                    match origin {
                        Origin::Peer => "peer",
                        Origin::Local => "application",
                    },
                    self.state
                );
                self.violation(message, origin, text)
            }
        }
    }

    /// StopTransport and TransportFinished must name the board StartTransport named.
    fn check_board_id(&self, message: &Message) -> Result<(), String> {
        let board_id = match message {
            Message::StopTransport(data) => &data.board_id,
            Message::TransportFinished(data) => &data.board_id,
            _ => return Ok(()),
        };
        match &self.transport_board_id {
            Some(expected) if expected != board_id => Err(format!(
                "{} for board {board_id} does not match StartTransport for board {expected}",
                message.tag()
            )),
            _ => Ok(()),
        }
    }

    fn accept(
        &mut self,
        message: Message,
        origin: Origin,
        next: Option<R::State>,
    ) -> Vec<Action<R::State>> {
        let mut actions = Vec::with_capacity(2);
        if let Message::StartTransport(data) = &message {
            self.transport_board_id = Some(data.board_id.clone());
        }
        if let Some(next) = next
            && next != self.state
        {
            tracing::debug!(role = R::NAME, from = %self.state, to = %next, "transition");
            self.state = next;
            actions.push(Action::State(next));
        }
        actions.push(match origin {
            Origin::Peer => Action::Deliver(message, self.state),
            Origin::Local => Action::Send(message),
        });
        actions
    }

    fn violation(&mut self, message: Message, origin: Origin, text: String) -> Vec<Action<R::State>> {
        match (origin, self.check_state) {
            (Origin::Peer, _) => self.fail(Error::peer(text)),
            (Origin::Local, CheckState::SendAndReceive) => self.fail(Error::client(text)),
            (Origin::Local, CheckState::OnlyReceive) => {
                tracing::warn!(role = R::NAME, "{text}; forwarding unchecked");
                vec![Action::Send(message)]
            }
        }
    }
}

#[cfg(test)]
mod tests;
