//! Protocol engine for The Hermes Standard (IPC-HERMES-9852).
//!
//! Machines on an assembly line hand boards to each other over TCP by
//! exchanging XML messages. This crate is the sans-IO core: it frames and
//! decodes those messages, checks every event against the role's state
//! machine and manages sessions, but never touches a socket or a clock. The
//! transport lives in `hermes-net`.
//!
//! ```text
//! bytes -> Dispatcher (framer + envelope + decoders) -> StateMachine -> Lifecycle -> Commands
//! ```

mod dispatch;
pub mod envelope;
mod error;
mod framer;
mod lifecycle;
pub mod machine;
pub mod message;
mod session;
mod settings;
mod state;
mod wire;

pub use dispatch::{Dispatcher, MAX_MESSAGE_SIZE};
pub use error::{Error, ErrorKind};
pub use framer::MessageFramer;
pub use lifecycle::{Command, Event, Lifecycle, Timer};
pub use machine::{
    Action, ConfigurationService, Downstream, Role, StateMachine, Upstream, VerticalClient,
    VerticalService,
};
pub use message::Message;
pub use session::{ConnectionInfo, SessionId, SessionIdAllocator};
pub use settings::{
    CheckAliveResponseMode, CheckState, DEFAULT_CHECK_ALIVE_PERIOD, DEFAULT_CONFIGURATION_PORT,
    DEFAULT_HORIZONTAL_PORT, DEFAULT_RETRY_DELAY, DEFAULT_VERTICAL_PORT, NetworkConfiguration,
    Settings,
};
pub use state::{ConfigurationState, State, VerticalState};
pub use wire::{WireEnum, XmlNode};
