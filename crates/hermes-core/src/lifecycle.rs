//! Connection management around the per-session state machines.
//!
//! A [`Lifecycle`] owns every session of one role instance: it assigns
//! session ids, admits or refuses connections, schedules reconnects and
//! check-alive probes, and turns state machine [`Action`]s into transport
//! [`Command`]s and observer [`Event`]s. It performs no I/O. The owner feeds
//! it transport completions and timer expirations and drains
//! [`Lifecycle::take_commands`] after every call, executing the commands in
//! order.

use crate::dispatch::Dispatcher;
use crate::envelope;
use crate::machine::{Action, Admission, Role, Side, StateMachine};
use crate::message::{CheckAliveData, Message, NotificationCode, NotificationData, Severity};
use crate::session::{ConnectionInfo, SessionId, SessionIdAllocator};
use crate::settings::{CheckAliveResponseMode, NetworkConfiguration, Settings};
use crate::Error;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::time::Duration;

/// What the application observes, per session and in causal order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event<S> {
    /// The socket is up.
    Connected {
        session_id: SessionId,
        state: S,
        peer: ConnectionInfo,
    },
    /// A message arrived, paired with the state it left the session in.
    Message {
        session_id: SessionId,
        state: S,
        message: Message,
    },
    State {
        session_id: SessionId,
        state: S,
    },
    /// Emitted once per session. `error` is `None` when the application
    /// ended the session.
    Disconnected {
        session_id: SessionId,
        state: S,
        error: Option<Error>,
    },
}

impl<S> Event<S> {
    pub fn session_id(&self) -> SessionId {
        match self {
            Event::Connected { session_id, .. }
            | Event::Message { session_id, .. }
            | Event::State { session_id, .. }
            | Event::Disconnected { session_id, .. } => *session_id,
        }
    }
}

/// Timers a lifecycle can arm. Arming a running timer restarts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timer {
    CheckAlive(SessionId),
    Reconnect,
    Listen,
}

/// Work for the transport, to be carried out in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command<S> {
    /// Bind and accept; report with `on_accepted` or `on_listen_failed`.
    /// Accepted peers must be checked against `allowed_client` if set.
    Listen {
        network: NetworkConfiguration,
        allowed_client: Option<String>,
    },
    StopListening,
    /// Connect; report with `on_connected` or `on_connect_failed`.
    Connect {
        session_id: SessionId,
        network: NetworkConfiguration,
    },
    /// Write an encoded envelope.
    Send { session_id: SessionId, bytes: String },
    /// Close the socket once queued writes are flushed, or abandon the attempt.
    Close { session_id: SessionId },
    StartTimer { timer: Timer, after: Duration },
    CancelTimer(Timer),
    /// Signal `message` on a later loop turn, outside the current handler.
    Defer {
        session_id: SessionId,
        message: Message,
    },
    Notify(Event<S>),
}

struct Session<R: Role> {
    machine: StateMachine<R>,
    dispatcher: Dispatcher,
    peer: Option<ConnectionInfo>,
    /// The peer's service description arrived; a drop after this reconnects at once.
    peer_described: bool,
}

impl<R: Role> Session<R> {
    fn new(settings: &Settings) -> Self {
        Self {
            machine: StateMachine::new(settings.check_state),
            dispatcher: Dispatcher::new(R::TAGS),
            peer: None,
            peer_described: false,
        }
    }
}

/// All sessions of one role instance.
pub struct Lifecycle<R: Role> {
    settings: Option<Settings>,
    ids: SessionIdAllocator,
    sessions: BTreeMap<SessionId, Session<R>>,
    outbox: Vec<Command<R::State>>,
}

impl<R: Role> Default for Lifecycle<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Role> Lifecycle<R> {
    pub fn new() -> Self {
        Self {
            settings: None,
            ids: SessionIdAllocator::new(),
            sessions: BTreeMap::new(),
            outbox: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.is_some()
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    /// Protocol state of a live session.
    pub fn state(&self, session_id: SessionId) -> Option<R::State> {
        self.sessions.get(&session_id).map(|s| s.machine.state())
    }

    /// Ids of all live sessions, oldest first.
    pub fn session_ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.sessions.keys().copied()
    }

    /// Commands accumulated since the last call.
    pub fn take_commands(&mut self) -> Vec<Command<R::State>> {
        std::mem::take(&mut self.outbox)
    }

    /// Starts listening or connecting. Enabling again with different settings
    /// resets every session and restarts the transport; identical settings
    /// change nothing.
    pub fn enable(&mut self, settings: Settings) {
        if self.settings.as_ref() == Some(&settings) {
            tracing::debug!(role = R::NAME, "already enabled with these settings");
            return;
        }
        if self.is_enabled() {
            tracing::info!(role = R::NAME, "settings changed, restarting transport");
            self.stop(NotificationData::new(
                NotificationCode::ConnectionResetBecauseOfChangedConfiguration,
                Severity::Info,
                "configuration changed",
            ));
        }
        tracing::info!(
            role = R::NAME,
            host = %settings.network.host,
            port = settings.network.port,
            "enabled"
        );
        let network = settings.network.clone();
        let allowed_client = settings.allowed_client.clone();
        self.settings = Some(settings);
        match R::SIDE {
            Side::Server => self.outbox.push(Command::Listen {
                network,
                allowed_client,
            }),
            Side::Client => self.start_connect(),
        }
    }

    /// Ends every session with `notification`, stops listening and
    /// reconnecting, and cancels all timers.
    pub fn disable(&mut self, notification: NotificationData) {
        if !self.is_enabled() {
            return;
        }
        tracing::info!(role = R::NAME, "disabled");
        self.stop(notification);
    }

    /// Ends one session, telling the peer why. Client roles reconnect afterwards.
    pub fn reset(&mut self, session_id: SessionId, notification: NotificationData) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            tracing::warn!(role = R::NAME, session = %session_id, "reset of unknown session");
            return;
        };
        let actions = session.machine.disconnect(notification);
        self.apply(session_id, actions);
    }

    /// The application wants to send `message` on a session.
    pub fn signal(&mut self, session_id: SessionId, message: Message) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            tracing::warn!(
                role = R::NAME,
                session = %session_id,
                tag = message.tag(),
                "signal for unknown session dropped"
            );
            return;
        };
        let actions = session.machine.signal(message);
        self.apply(session_id, actions);
    }

    /// A listening role accepted a socket. `allowed` is the outcome of the
    /// allow-list check. Returns the id under which the transport must track
    /// the socket, even when it is refused.
    pub fn on_accepted(&mut self, peer: ConnectionInfo, allowed: bool) -> SessionId {
        let session_id = self.ids.next_id();
        let Some(settings) = &self.settings else {
            self.outbox.push(Command::Close { session_id });
            return session_id;
        };
        if R::SIDE != Side::Server {
            tracing::error!(role = R::NAME, %peer, "client role cannot accept connections");
            self.outbox.push(Command::Close { session_id });
            return session_id;
        }
        if !allowed {
            tracing::warn!(role = R::NAME, session = %session_id, %peer, "refusing host not on allow list");
            self.refuse(
                session_id,
                NotificationCode::ConfigurationError,
                Severity::Warning,
                format!("connection from {} not allowed", peer.host_name),
            );
            return session_id;
        }
        if R::ADMISSION == Admission::Single
            && let Some(&active) = self.sessions.keys().next()
        {
            tracing::warn!(
                role = R::NAME,
                session = %session_id,
                %active,
                %peer,
                "refusing second connection"
            );
            self.refuse(
                session_id,
                NotificationCode::ConnectionRefusedBecauseOfEstablishedConnection,
                Severity::Info,
                format!("session {active} is already established"),
            );
            self.signal(active, CheckAliveData::default().into());
            return session_id;
        }
        let session = Session::new(settings);
        self.sessions.insert(session_id, session);
        self.connected(session_id, peer);
        session_id
    }

    /// A listen attempt failed; it is retried after the retry delay.
    pub fn on_listen_failed(&mut self, error: Error) {
        let Some(settings) = &self.settings else {
            return;
        };
        tracing::warn!(role = R::NAME, %error, "listen failed, retrying");
        self.outbox.push(Command::StartTimer {
            timer: Timer::Listen,
            after: settings.network.retry_delay,
        });
    }

    /// An outgoing connection was established.
    pub fn on_connected(&mut self, session_id: SessionId, peer: ConnectionInfo) {
        if !self.sessions.contains_key(&session_id) {
            self.outbox.push(Command::Close { session_id });
            return;
        }
        self.connected(session_id, peer);
    }

    /// An outgoing connection attempt failed.
    pub fn on_connect_failed(&mut self, session_id: SessionId, error: Error) {
        self.on_closed(session_id, error);
    }

    /// Bytes arrived on a session.
    pub fn on_received(&mut self, session_id: SessionId, bytes: &[u8]) {
        let Some(Session {
            machine,
            dispatcher,
            ..
        }) = self.sessions.get_mut(&session_id)
        else {
            return;
        };
        let mut actions = Vec::new();
        let result = dispatcher.dispatch(bytes, |message| {
            actions.extend(machine.receive(message));
            if machine.is_disconnected() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        if let Err(error) = result {
            actions.extend(machine.fail(error));
        }
        self.apply(session_id, actions);
    }

    /// The transport of a session is gone: peer close, read or write error.
    pub fn on_closed(&mut self, session_id: SessionId, error: Error) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };
        let actions = session.machine.transport_closed(error);
        self.apply(session_id, actions);
    }

    pub fn on_timer(&mut self, timer: Timer) {
        let Some(settings) = &self.settings else {
            return;
        };
        match timer {
            Timer::CheckAlive(session_id) => {
                if self
                    .sessions
                    .get(&session_id)
                    .is_some_and(|s| s.machine.is_connected())
                {
                    tracing::debug!(role = R::NAME, session = %session_id, "check alive");
                    self.signal(session_id, CheckAliveData::default().into());
                }
            }
            Timer::Reconnect => {
                if R::SIDE == Side::Client && self.sessions.is_empty() {
                    self.start_connect();
                }
            }
            Timer::Listen => {
                if R::SIDE == Side::Server {
                    self.outbox.push(Command::Listen {
                        network: settings.network.clone(),
                        allowed_client: settings.allowed_client.clone(),
                    });
                }
            }
        }
    }

    fn stop(&mut self, notification: NotificationData) {
        self.settings = None;
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for session_id in ids {
            self.reset(session_id, notification.clone());
        }
        match R::SIDE {
            Side::Server => {
                self.outbox.push(Command::StopListening);
                self.outbox.push(Command::CancelTimer(Timer::Listen));
            }
            Side::Client => self.outbox.push(Command::CancelTimer(Timer::Reconnect)),
        }
    }

    fn start_connect(&mut self) {
        let Some(settings) = &self.settings else {
            return;
        };
        let session_id = self.ids.next_id();
        let network = settings.network.clone();
        tracing::debug!(role = R::NAME, session = %session_id, host = %network.host, port = network.port, "connecting");
        self.sessions.insert(session_id, Session::new(settings));
        self.outbox.push(Command::Connect {
            session_id,
            network,
        });
    }

    fn connected(&mut self, session_id: SessionId, peer: ConnectionInfo) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };
        tracing::info!(role = R::NAME, session = %session_id, %peer, "connected");
        let actions = session.machine.connect();
        let state = session.machine.state();
        if session.machine.is_disconnected() {
            self.apply(session_id, actions);
            return;
        }
        session.peer = Some(peer.clone());
        self.outbox.push(Command::Notify(Event::Connected {
            session_id,
            state,
            peer,
        }));
        self.arm_check_alive(session_id);
    }

    fn refuse(
        &mut self,
        session_id: SessionId,
        code: NotificationCode,
        severity: Severity,
        description: String,
    ) {
        let notification = Message::notification(code, severity, description);
        self.outbox.push(Command::Send {
            session_id,
            bytes: envelope::encode(&notification),
        });
        self.outbox.push(Command::Close { session_id });
    }

    fn apply(&mut self, session_id: SessionId, actions: Vec<Action<R::State>>) {
        for action in actions {
            match action {
                Action::State(state) => {
                    self.outbox
                        .push(Command::Notify(Event::State { session_id, state }));
                }
                Action::Deliver(message, state) => self.deliver(session_id, message, state),
                Action::Send(message) => self.send(session_id, &message),
                Action::Disconnected(state, error) => {
                    self.outbox.push(Command::Notify(Event::Disconnected {
                        session_id,
                        state,
                        error,
                    }));
                }
                Action::Close => self.close(session_id),
            }
        }
    }

    fn deliver(&mut self, session_id: SessionId, message: Message, state: R::State) {
        let answers_pings = self.answers_pings();
        let mut pong = None;
        if let Some(session) = self.sessions.get_mut(&session_id) {
            match &message {
                Message::ServiceDescription(_) | Message::SupervisoryServiceDescription(_) => {
                    session.peer_described = true;
                }
                Message::CheckAlive(ping) if answers_pings => pong = ping.pong(),
                _ => {}
            }
        }
        self.outbox.push(Command::Notify(Event::Message {
            session_id,
            state,
            message,
        }));
        if let Some(pong) = pong {
            self.outbox.push(Command::Defer {
                session_id,
                message: pong.into(),
            });
        }
    }

    fn answers_pings(&self) -> bool {
        R::ANSWERS_PINGS
            && self
                .settings
                .as_ref()
                .is_some_and(|s| s.check_alive_response == CheckAliveResponseMode::Auto)
    }

    fn send(&mut self, session_id: SessionId, message: &Message) {
        tracing::debug!(role = R::NAME, session = %session_id, tag = message.tag(), "send");
        self.outbox.push(Command::Send {
            session_id,
            bytes: envelope::encode(message),
        });
        self.arm_check_alive(session_id);
    }

    fn arm_check_alive(&mut self, session_id: SessionId) {
        let Some(settings) = &self.settings else {
            return;
        };
        let period = settings.network.check_alive_period;
        let live = self
            .sessions
            .get(&session_id)
            .is_some_and(|s| s.machine.is_connected());
        if live && !period.is_zero() {
            self.outbox.push(Command::StartTimer {
                timer: Timer::CheckAlive(session_id),
                after: period,
            });
        }
    }

    fn close(&mut self, session_id: SessionId) {
        self.outbox.push(Command::CancelTimer(Timer::CheckAlive(session_id)));
        self.outbox.push(Command::Close { session_id });
        let Some(session) = self.sessions.remove(&session_id) else {
            return;
        };
        if let Some(peer) = &session.peer {
            tracing::info!(role = R::NAME, session = %session_id, %peer, "session closed");
        }
        if R::SIDE == Side::Client
            && let Some(settings) = &self.settings
        {
            let after = if session.peer_described {
                Duration::ZERO
            } else {
                settings.network.retry_delay
            };
            tracing::debug!(role = R::NAME, ?after, "scheduling reconnect");
            self.outbox.push(Command::StartTimer {
                timer: Timer::Reconnect,
                after,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{ConfigurationService, Downstream, Upstream, VerticalService};
    use crate::message::{
        BoardAvailableData, CheckAliveType, GetConfigurationData, ServiceDescriptionData,
        SupervisoryServiceDescriptionData,
    };
    use crate::settings::CheckState;
    use crate::state::{ConfigurationState, State, VerticalState};
    use crate::ErrorKind;
    use std::net::{IpAddr, Ipv4Addr};

    fn peer(port: u16) -> ConnectionInfo {
        ConnectionInfo {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            host_name: "127.0.0.1".into(),
        }
    }

    fn settings(check_alive_ms: u64) -> Settings {
        let mut network = NetworkConfiguration::new("127.0.0.1", 50101);
        network.retry_delay = Duration::from_millis(500);
        network.check_alive_period = Duration::from_millis(check_alive_ms);
        Settings::new(network)
    }

    fn wire(message: impl Into<Message>) -> Vec<u8> {
        envelope::encode(&message.into()).into_bytes()
    }

    fn sent_to<S>(commands: &[Command<S>], id: SessionId) -> Vec<&str> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::Send { session_id, bytes } if *session_id == id => Some(bytes.as_str()),
                _ => None,
            })
            .collect()
    }

    fn events<S: Clone>(commands: &[Command<S>]) -> Vec<Event<S>> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::Notify(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    /// A Downstream with one session driven to NotAvailableNotReady.
    fn downstream_ready() -> (Lifecycle<Downstream>, SessionId) {
        let mut lifecycle = Lifecycle::<Downstream>::new();
        lifecycle.enable(settings(0));
        let id = lifecycle.on_accepted(peer(40000), true);
        lifecycle.on_received(id, &wire(ServiceDescriptionData::new("U", 1)));
        lifecycle.signal(id, ServiceDescriptionData::new("D", 1).into());
        assert_eq!(lifecycle.state(id), Some(State::NotAvailableNotReady));
        lifecycle.take_commands();
        (lifecycle, id)
    }

    #[test]
    fn server_listens_once_per_settings() {
        let mut lifecycle = Lifecycle::<Downstream>::new();
        lifecycle.enable(settings(0));
        let commands = lifecycle.take_commands();
        assert!(matches!(commands.as_slice(), [Command::Listen { network, allowed_client: None }] if network.port == 50101));
        lifecycle.enable(settings(0));
        assert!(lifecycle.take_commands().is_empty());
    }

    #[test]
    fn accepted_session_reports_connected() {
        let mut lifecycle = Lifecycle::<Downstream>::new();
        lifecycle.enable(settings(0));
        lifecycle.take_commands();
        let id = lifecycle.on_accepted(peer(40000), true);
        assert_eq!(id, SessionId(1));
        assert_eq!(
            events(&lifecycle.take_commands()),
            vec![Event::Connected {
                session_id: id,
                state: State::SocketConnected,
                peer: peer(40000),
            }]
        );
    }

    #[test]
    fn second_connection_is_refused_and_first_is_probed() {
        let (mut lifecycle, first) = downstream_ready();
        let second = lifecycle.on_accepted(peer(40001), true);
        assert_eq!(second, SessionId(2));
        let commands = lifecycle.take_commands();

        let refused = sent_to(&commands, second);
        assert_eq!(refused.len(), 1);
        assert!(refused[0].contains("NotificationCode=\"2\""), "{}", refused[0]);
        assert!(commands.contains(&Command::Close { session_id: second }));

        let probe = sent_to(&commands, first);
        assert_eq!(probe.len(), 1);
        assert!(probe[0].contains("<CheckAlive/>"));

        assert_eq!(lifecycle.state(first), Some(State::NotAvailableNotReady));
        assert_eq!(lifecycle.state(second), None);
        assert!(events(&commands).is_empty());
    }

    #[test]
    fn multi_session_roles_admit_concurrent_peers() {
        let mut lifecycle = Lifecycle::<ConfigurationService>::new();
        lifecycle.enable(settings(0));
        let a = lifecycle.on_accepted(peer(1), true);
        let b = lifecycle.on_accepted(peer(2), true);
        assert_eq!(lifecycle.session_ids().collect::<Vec<_>>(), vec![a, b]);
        lifecycle.take_commands();
        lifecycle.on_received(b, &wire(GetConfigurationData {}));
        assert_eq!(
            events(&lifecycle.take_commands()),
            vec![Event::Message {
                session_id: b,
                state: ConfigurationState::SocketConnected,
                message: GetConfigurationData {}.into(),
            }]
        );
    }

    #[test]
    fn host_outside_allow_list_is_refused() {
        let mut lifecycle = Lifecycle::<Downstream>::new();
        lifecycle.enable(settings(0));
        lifecycle.take_commands();
        let id = lifecycle.on_accepted(peer(40000), false);
        let commands = lifecycle.take_commands();
        let sent = sent_to(&commands, id);
        assert!(sent[0].contains("NotificationCode=\"4\""), "{}", sent[0]);
        assert!(commands.contains(&Command::Close { session_id: id }));
        assert!(events(&commands).is_empty());
        assert_eq!(lifecycle.session_ids().count(), 0);
    }

    #[test]
    fn reconnect_waits_unless_the_peer_was_described() {
        let mut lifecycle = Lifecycle::<Upstream>::new();
        lifecycle.enable(settings(0));
        let commands = lifecycle.take_commands();
        assert!(matches!(
            commands.as_slice(),
            [Command::Connect { session_id: SessionId(1), .. }]
        ));

        lifecycle.on_connected(SessionId(1), peer(50101));
        lifecycle.on_closed(SessionId(1), Error::network("reset by peer"));
        let commands = lifecycle.take_commands();
        assert!(commands.contains(&Command::StartTimer {
            timer: Timer::Reconnect,
            after: Duration::from_millis(500),
        }));

        lifecycle.on_timer(Timer::Reconnect);
        let commands = lifecycle.take_commands();
        assert!(matches!(
            commands.as_slice(),
            [Command::Connect { session_id: SessionId(2), .. }]
        ));

        lifecycle.on_connected(SessionId(2), peer(50101));
        lifecycle.signal(SessionId(2), ServiceDescriptionData::new("U", 1).into());
        lifecycle.on_received(SessionId(2), &wire(ServiceDescriptionData::new("D", 1)));
        assert_eq!(lifecycle.state(SessionId(2)), Some(State::NotAvailableNotReady));
        lifecycle.take_commands();

        lifecycle.on_closed(SessionId(2), Error::network("reset by peer"));
        let commands = lifecycle.take_commands();
        assert!(commands.contains(&Command::StartTimer {
            timer: Timer::Reconnect,
            after: Duration::ZERO,
        }));
    }

    #[test]
    fn failed_connect_is_reported_and_retried() {
        let mut lifecycle = Lifecycle::<Upstream>::new();
        lifecycle.enable(settings(0));
        lifecycle.take_commands();
        lifecycle.on_connect_failed(SessionId(1), Error::network("connection refused"));
        let commands = lifecycle.take_commands();
        assert_eq!(
            events(&commands),
            vec![Event::Disconnected {
                session_id: SessionId(1),
                state: State::Disconnected,
                error: Some(Error::network("connection refused")),
            }]
        );
        assert!(commands.contains(&Command::StartTimer {
            timer: Timer::Reconnect,
            after: Duration::from_millis(500),
        }));
    }

    #[test]
    fn listen_failure_is_retried() {
        let mut lifecycle = Lifecycle::<Downstream>::new();
        lifecycle.enable(settings(0));
        lifecycle.take_commands();
        lifecycle.on_listen_failed(Error::network("address in use"));
        assert_eq!(
            lifecycle.take_commands(),
            vec![Command::StartTimer {
                timer: Timer::Listen,
                after: Duration::from_millis(500),
            }]
        );
        lifecycle.on_timer(Timer::Listen);
        assert!(matches!(
            lifecycle.take_commands().as_slice(),
            [Command::Listen { .. }]
        ));
    }

    #[test]
    fn sends_rearm_the_check_alive_timer() {
        let mut lifecycle = Lifecycle::<Downstream>::new();
        lifecycle.enable(settings(1000));
        let id = lifecycle.on_accepted(peer(40000), true);
        lifecycle.on_received(id, &wire(ServiceDescriptionData::new("U", 1)));
        lifecycle.take_commands();

        lifecycle.signal(id, ServiceDescriptionData::new("D", 1).into());
        let arm = Command::StartTimer {
            timer: Timer::CheckAlive(id),
            after: Duration::from_secs(1),
        };
        assert!(lifecycle.take_commands().contains(&arm));

        lifecycle.on_timer(Timer::CheckAlive(id));
        let commands = lifecycle.take_commands();
        let sent = sent_to(&commands, id);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("<CheckAlive/>"));
        assert!(commands.contains(&arm));
    }

    #[test]
    fn vertical_service_answers_pings_on_a_later_turn() {
        let mut lifecycle = Lifecycle::<VerticalService>::new();
        lifecycle.enable(settings(0));
        let id = lifecycle.on_accepted(peer(40000), true);
        lifecycle.take_commands();

        lifecycle.on_received(id, &wire(CheckAliveData::ping("7")));
        let commands = lifecycle.take_commands();
        assert!(sent_to(&commands, id).is_empty());
        let pong = Message::from(CheckAliveData {
            kind: Some(CheckAliveType::Pong),
            id: Some("7".into()),
        });
        assert_eq!(
            commands.last(),
            Some(&Command::Defer {
                session_id: id,
                message: pong.clone(),
            })
        );

        lifecycle.signal(id, pong);
        let sent = lifecycle.take_commands();
        assert!(sent_to(&sent, id)[0].contains("Type=\"2\""));
    }

    #[test]
    fn application_mode_leaves_pings_to_the_application() {
        let mut lifecycle = Lifecycle::<VerticalService>::new();
        let mut s = settings(0);
        s.check_alive_response = CheckAliveResponseMode::Application;
        lifecycle.enable(s);
        let id = lifecycle.on_accepted(peer(40000), true);
        lifecycle.take_commands();
        lifecycle.on_received(id, &wire(CheckAliveData::ping("7")));
        assert!(
            !lifecycle
                .take_commands()
                .iter()
                .any(|c| matches!(c, Command::Defer { .. }))
        );
    }

    #[test]
    fn horizontal_roles_never_answer_pings() {
        let (mut lifecycle, id) = downstream_ready();
        lifecycle.on_received(id, &wire(CheckAliveData::ping("7")));
        assert!(
            !lifecycle
                .take_commands()
                .iter()
                .any(|c| matches!(c, Command::Defer { .. }))
        );
    }

    #[test]
    fn framing_error_ends_the_session() {
        let (mut lifecycle, id) = downstream_ready();
        lifecycle.on_received(id, b"<Hermes Timestamp=\"x\"></Hermes>");
        let commands = lifecycle.take_commands();
        match events(&commands).as_slice() {
            [Event::Disconnected { error: Some(error), state: State::Disconnected, .. }] => {
                assert_eq!(error.kind, ErrorKind::Peer);
                assert!(error.text.contains("missing message type node"));
            }
            other => panic!("unexpected events {other:?}"),
        }
        assert!(sent_to(&commands, id)[0].contains("NotificationCode=\"1\""));
        assert!(commands.contains(&Command::Close { session_id: id }));
        assert_eq!(lifecycle.state(id), None);
    }

    #[test]
    fn messages_after_a_violation_are_not_dispatched() {
        let (mut lifecycle, id) = downstream_ready();
        let mut bytes = wire(crate::message::StartTransportData::new("B1"));
        bytes.extend(wire(crate::message::MachineReadyData::default()));
        lifecycle.on_received(id, &bytes);
        let commands = lifecycle.take_commands();
        let seen = events(&commands);
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], Event::Disconnected { .. }));
    }

    #[test]
    fn changed_settings_reset_sessions() {
        let (mut lifecycle, id) = downstream_ready();
        let mut changed = settings(0);
        changed.network.port = 50200;
        lifecycle.enable(changed);
        let commands = lifecycle.take_commands();
        assert!(sent_to(&commands, id)[0].contains("NotificationCode=\"3\""));
        assert!(commands.contains(&Command::StopListening));
        assert!(matches!(
            commands.last(),
            Some(Command::Listen { network, .. }) if network.port == 50200
        ));
        assert_eq!(
            events(&commands),
            vec![Event::Disconnected {
                session_id: id,
                state: State::Disconnected,
                error: None,
            }]
        );
    }

    #[test]
    fn disable_ends_everything_once() {
        let mut lifecycle = Lifecycle::<Upstream>::new();
        lifecycle.enable(settings(0));
        lifecycle.on_connected(SessionId(1), peer(50101));
        lifecycle.take_commands();

        let bye = NotificationData::new(NotificationCode::MachineShutdown, Severity::Info, "bye");
        lifecycle.disable(bye.clone());
        let commands = lifecycle.take_commands();
        assert_eq!(events(&commands).len(), 1);
        assert!(sent_to(&commands, SessionId(1))[0].contains("NotificationCode=\"5\""));
        assert!(commands.contains(&Command::CancelTimer(Timer::Reconnect)));
        assert!(
            !commands
                .iter()
                .any(|c| matches!(c, Command::StartTimer { .. } | Command::Connect { .. }))
        );

        lifecycle.disable(bye);
        lifecycle.on_timer(Timer::Reconnect);
        lifecycle.on_closed(SessionId(1), Error::network("closed"));
        assert!(lifecycle.take_commands().is_empty());
    }

    #[test]
    fn reset_of_client_session_reconnects() {
        let mut lifecycle = Lifecycle::<Upstream>::new();
        lifecycle.enable(settings(0));
        lifecycle.on_connected(SessionId(1), peer(50101));
        lifecycle.take_commands();
        lifecycle.reset(
            SessionId(1),
            NotificationData::new(NotificationCode::Unspecific, Severity::Info, "again"),
        );
        let commands = lifecycle.take_commands();
        assert!(commands.contains(&Command::StartTimer {
            timer: Timer::Reconnect,
            after: Duration::from_millis(500),
        }));
    }

    #[test]
    fn lenient_sessions_forward_out_of_order_signals() {
        let mut lifecycle = Lifecycle::<Downstream>::new();
        let mut s = settings(0);
        s.check_state = CheckState::OnlyReceive;
        lifecycle.enable(s);
        let id = lifecycle.on_accepted(peer(40000), true);
        lifecycle.take_commands();
        lifecycle.signal(
            id,
            BoardAvailableData {
                board_id: "B1".into(),
                board_id_created_by: "D".into(),
                ..Default::default()
            }
            .into(),
        );
        let commands = lifecycle.take_commands();
        assert_eq!(sent_to(&commands, id).len(), 1);
        assert_eq!(lifecycle.state(id), Some(State::SocketConnected));
    }

    #[test]
    fn vertical_handshake_reaches_connected() {
        let mut lifecycle = Lifecycle::<VerticalService>::new();
        lifecycle.enable(settings(0));
        let id = lifecycle.on_accepted(peer(40000), true);
        lifecycle.on_received(id, &wire(SupervisoryServiceDescriptionData::new("SUP")));
        lifecycle.signal(id, SupervisoryServiceDescriptionData::new("M").into());
        assert_eq!(lifecycle.state(id), Some(VerticalState::Connected));
    }
}
