//! Remote configuration sessions: connect, ask or set, answer.

use super::{Admission, Origin, Role, Side, Step};
use crate::message::{
    CheckAliveData, CurrentConfigurationData, Fields, GetConfigurationData, Message,
    NotificationData, SetConfigurationData,
};
use crate::state::ConfigurationState;

/// The machine side of remote configuration. Listens; multi-session.
#[derive(Debug)]
pub struct ConfigurationService;

impl Role for ConfigurationService {
    type State = ConfigurationState;

    const NAME: &'static str = "configuration service";
    const NOT_CONNECTED: ConfigurationState = ConfigurationState::NotConnected;
    const SOCKET_CONNECTED: ConfigurationState = ConfigurationState::SocketConnected;
    const DISCONNECTED: ConfigurationState = ConfigurationState::Disconnected;
    const SIDE: Side = Side::Server;
    const ADMISSION: Admission = Admission::Multiple;
    const ANSWERS_PINGS: bool = false;
    const TAGS: &'static [&'static str] = &[
        GetConfigurationData::TAG,
        SetConfigurationData::TAG,
        CurrentConfigurationData::TAG,
        NotificationData::TAG,
        CheckAliveData::TAG,
    ];

    fn step(
        state: ConfigurationState,
        message: &Message,
        origin: Origin,
    ) -> Step<ConfigurationState> {
        match (state, message, origin) {
            (
                ConfigurationState::SocketConnected,
                Message::GetConfiguration(_) | Message::SetConfiguration(_),
                Origin::Peer,
            )
            | (
                ConfigurationState::SocketConnected,
                Message::CurrentConfiguration(_),
                Origin::Local,
            ) => Step::Stay,
            _ => Step::Reject,
        }
    }
}
