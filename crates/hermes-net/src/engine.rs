//! The per-role engine task and its handle.
//!
//! Each role instance runs in one task that owns its [`Lifecycle`]. Socket
//! tasks, timers and application calls all reach it through channels, so the
//! protocol state is only ever touched from that task.

use crate::connection::{Completion, Connection};
use hermes_core::message::{NotificationCode, NotificationData, Severity};
use hermes_core::{
    Command, ConnectionInfo, Error, Event, Lifecycle, Message, NetworkConfiguration, Role,
    SessionId, Settings, Timer,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::marker::PhantomData;
use std::net::IpAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

enum Input {
    Enable(Settings),
    Disable(NotificationData),
    Reset(SessionId, NotificationData),
    Signal(SessionId, Message),
}

/// Handle on a running role instance. Dropping every handle shuts the
/// instance down, ending its sessions with a `MachineShutdown` notification.
pub struct Endpoint<R: Role> {
    inputs: mpsc::UnboundedSender<Input>,
    role: PhantomData<fn() -> R>,
}

impl<R: Role> Clone for Endpoint<R> {
    fn clone(&self) -> Self {
        Self {
            inputs: self.inputs.clone(),
            role: PhantomData,
        }
    }
}

impl<R: Role> Endpoint<R> {
    /// Starts listening or connecting with `settings`.
    pub fn enable(&self, settings: Settings) -> Result<(), Error> {
        self.post(Input::Enable(settings))
    }

    /// Ends all sessions and stops the transport.
    pub fn disable(&self, notification: NotificationData) -> Result<(), Error> {
        self.post(Input::Disable(notification))
    }

    /// Ends one session.
    pub fn reset(&self, session_id: SessionId, notification: NotificationData) -> Result<(), Error> {
        self.post(Input::Reset(session_id, notification))
    }

    /// Sends a message on a session, subject to the role's state machine.
    pub fn signal(&self, session_id: SessionId, message: impl Into<Message>) -> Result<(), Error> {
        self.post(Input::Signal(session_id, message.into()))
    }

    fn post(&self, input: Input) -> Result<(), Error> {
        self.inputs
            .send(input)
            .map_err(|_| Error::implementation(format!("{} engine has stopped", R::NAME)))
    }
}

/// Starts a role instance on the current tokio runtime. It stays idle until
/// [`Endpoint::enable`] is called.
pub fn spawn<R: Role>() -> (Endpoint<R>, mpsc::UnboundedReceiver<Event<R::State>>) {
    let (inputs, input_rx) = mpsc::unbounded_channel();
    let (events, event_rx) = mpsc::unbounded_channel();
    let (completions, completion_rx) = mpsc::unbounded_channel();
    let engine = Engine::<R> {
        lifecycle: Lifecycle::new(),
        events,
        completions,
        connections: HashMap::new(),
        connecting: HashMap::new(),
        listener: None,
        generation: 0,
        timers: BTreeMap::new(),
        deferred: VecDeque::new(),
        hosts: HashMap::new(),
    };
    tokio::spawn(engine.run(input_rx, completion_rx));
    (
        Endpoint {
            inputs,
            role: PhantomData,
        },
        event_rx,
    )
}

struct Engine<R: Role> {
    lifecycle: Lifecycle<R>,
    events: mpsc::UnboundedSender<Event<R::State>>,
    completions: mpsc::UnboundedSender<Completion>,
    connections: HashMap<SessionId, Connection>,
    /// Outgoing connection attempts in flight.
    connecting: HashMap<SessionId, JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,
    /// Bumped on every listen and stop, so stale acceptor reports are dropped.
    generation: u64,
    timers: BTreeMap<Timer, Instant>,
    deferred: VecDeque<(SessionId, Message)>,
    /// Configured host of each outgoing attempt, reported as the peer host name.
    hosts: HashMap<SessionId, String>,
}

impl<R: Role> Engine<R> {
    async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<Input>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        loop {
            if let Some((session_id, message)) = self.deferred.pop_front() {
                self.lifecycle.signal(session_id, message);
                self.execute();
                continue;
            }
            let deadline = self.timers.iter().min_by_key(|(_, at)| **at).map(|(t, at)| (*t, *at));
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => break,
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
                _ = wait(deadline.map(|(_, at)| at)) => {
                    if let Some((timer, _)) = deadline {
                        self.timers.remove(&timer);
                        self.lifecycle.on_timer(timer);
                    }
                }
            }
            self.execute();
        }

        tracing::debug!(role = R::NAME, "all handles dropped, shutting down");
        self.lifecycle.disable(NotificationData::new(
            NotificationCode::MachineShutdown,
            Severity::Info,
            "shutting down",
        ));
        self.execute();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        for (_, attempt) in self.connecting.drain() {
            attempt.abort();
        }
        for (_, connection) in self.connections.drain() {
            connection.close();
        }
    }

    fn handle_input(&mut self, input: Input) {
        match input {
            Input::Enable(settings) => self.lifecycle.enable(settings),
            Input::Disable(notification) => self.lifecycle.disable(notification),
            Input::Reset(session_id, notification) => {
                self.lifecycle.reset(session_id, notification)
            }
            Input::Signal(session_id, message) => self.lifecycle.signal(session_id, message),
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Accepted {
                generation,
                stream,
                allowed,
            } => {
                if generation != self.generation {
                    return;
                }
                let Ok(address) = stream.peer_addr() else {
                    return;
                };
                let peer = ConnectionInfo {
                    address: address.ip(),
                    port: address.port(),
                    host_name: address.ip().to_string(),
                };
                let session_id = self.lifecycle.on_accepted(peer, allowed);
                self.attach(session_id, stream);
            }
            Completion::ListenFailed { generation, error } => {
                if generation == self.generation {
                    self.listener = None;
                    self.lifecycle.on_listen_failed(error);
                }
            }
            Completion::Connected { session_id, stream } => {
                self.connecting.remove(&session_id);
                let host_name = self.hosts.remove(&session_id).unwrap_or_default();
                let Ok(address) = stream.peer_addr() else {
                    self.lifecycle
                        .on_connect_failed(session_id, Error::network("peer address unavailable"));
                    return;
                };
                let peer = ConnectionInfo {
                    address: address.ip(),
                    port: address.port(),
                    host_name,
                };
                self.attach(session_id, stream);
                self.lifecycle.on_connected(session_id, peer);
            }
            Completion::ConnectFailed { session_id, error } => {
                self.connecting.remove(&session_id);
                self.hosts.remove(&session_id);
                tracing::debug!(role = R::NAME, session = %session_id, %error, "connect failed");
                self.lifecycle.on_connect_failed(session_id, error);
            }
            Completion::Received { session_id, bytes } => {
                self.lifecycle.on_received(session_id, &bytes);
            }
            Completion::Closed { session_id, error } => {
                if let Some(connection) = self.connections.remove(&session_id) {
                    connection.close();
                }
                self.lifecycle.on_closed(session_id, error);
            }
        }
    }

    fn attach(&mut self, session_id: SessionId, stream: TcpStream) {
        let connection = Connection::open(session_id, stream, self.completions.clone());
        self.connections.insert(session_id, connection);
    }

    /// Carries out everything the lifecycle asked for, in order.
    fn execute(&mut self) {
        for command in self.lifecycle.take_commands() {
            match command {
                Command::Listen {
                    network,
                    allowed_client,
                } => self.listen(network, allowed_client),
                Command::StopListening => {
                    self.generation += 1;
                    if let Some(listener) = self.listener.take() {
                        listener.abort();
                    }
                }
                Command::Connect {
                    session_id,
                    network,
                } => self.connect(session_id, network),
                Command::Send { session_id, bytes } => match self.connections.get(&session_id) {
                    Some(connection) => connection.send(bytes),
                    None => {
                        tracing::debug!(role = R::NAME, session = %session_id, "send on closed session dropped")
                    }
                },
                Command::Close { session_id } => {
                    if let Some(connection) = self.connections.remove(&session_id) {
                        connection.close();
                    }
                    if let Some(attempt) = self.connecting.remove(&session_id) {
                        attempt.abort();
                    }
                    self.hosts.remove(&session_id);
                }
                Command::StartTimer { timer, after } => {
                    self.timers.insert(timer, Instant::now() + after);
                }
                Command::CancelTimer(timer) => {
                    self.timers.remove(&timer);
                }
                Command::Defer {
                    session_id,
                    message,
                } => self.deferred.push_back((session_id, message)),
                Command::Notify(event) => {
                    let _ = self.events.send(event);
                }
            }
        }
    }

    fn listen(&mut self, network: NetworkConfiguration, allowed_client: Option<String>) {
        self.generation += 1;
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        let generation = self.generation;
        let completions = self.completions.clone();
        self.listener = Some(tokio::spawn(accept_loop(
            generation,
            network,
            allowed_client,
            completions,
        )));
    }

    fn connect(&mut self, session_id: SessionId, network: NetworkConfiguration) {
        let completions = self.completions.clone();
        let host = network.host.clone();
        let port = network.port;
        self.hosts.insert(session_id, host.clone());
        let attempt = tokio::spawn(async move {
            let completion = match TcpStream::connect((host.as_str(), port)).await {
                Ok(stream) => Completion::Connected { session_id, stream },
                Err(e) => Completion::ConnectFailed {
                    session_id,
                    error: Error::network(format!("connect to {host}:{port} failed: {e}")),
                },
            };
            let _ = completions.send(completion);
        });
        self.connecting.insert(session_id, attempt);
    }
}

async fn wait(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn accept_loop(
    generation: u64,
    network: NetworkConfiguration,
    allowed_client: Option<String>,
    completions: mpsc::UnboundedSender<Completion>,
) {
    let (host, port) = network.bind_address();
    let listener = match TcpListener::bind((host, port)).await {
        Ok(listener) => listener,
        Err(e) => {
            let error = Error::network(format!("bind {host}:{port} failed: {e}"));
            let _ = completions.send(Completion::ListenFailed { generation, error });
            return;
        }
    };
    tracing::info!(host, port, "listening");
    loop {
        match listener.accept().await {
            Ok((stream, address)) => {
                let allowed = match &allowed_client {
                    Some(client) => is_allowed(client, address.ip()).await,
                    None => true,
                };
                tracing::debug!(%address, allowed, "accepted");
                let accepted = Completion::Accepted {
                    generation,
                    stream,
                    allowed,
                };
                if completions.send(accepted).is_err() {
                    return;
                }
            }
            Err(e) => {
                let error = Error::network(format!("accept failed: {e}"));
                let _ = completions.send(Completion::ListenFailed { generation, error });
                return;
            }
        }
    }
}

/// Resolves the allowed client host and checks whether `peer` is one of its addresses.
async fn is_allowed(client: &str, peer: IpAddr) -> bool {
    match tokio::net::lookup_host((client, 0)).await {
        Ok(mut addresses) => addresses.any(|a| a.ip() == peer),
        Err(e) => {
            tracing::warn!(client, error = %e, "cannot resolve allowed client");
            false
        }
    }
}
