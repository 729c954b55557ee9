//! VerticalService and VerticalClient: a machine and its supervisory system.
//!
//! The supervisory side (client) opens the description exchange. Once both
//! descriptions are exchanged the session is `Connected` and every vertical
//! message is a pass-through event.

use super::{Admission, Origin, Role, Side, Step};
use crate::message::{
    BoardArrivedData, BoardDepartedData, CheckAliveData, CurrentConfigurationData, Fields,
    GetConfigurationData, Message, NotificationData, QueryHermesCapabilitiesData,
    QueryWorkOrderInfoData, ReplyWorkOrderInfoData, SendHermesCapabilitiesData,
    SendWorkOrderInfoData, SetConfigurationData, SupervisoryServiceDescriptionData,
};
use crate::state::VerticalState;

const VERTICAL_TAGS: &[&str] = &[
    SupervisoryServiceDescriptionData::TAG,
    BoardArrivedData::TAG,
    BoardDepartedData::TAG,
    QueryWorkOrderInfoData::TAG,
    SendWorkOrderInfoData::TAG,
    ReplyWorkOrderInfoData::TAG,
    GetConfigurationData::TAG,
    SetConfigurationData::TAG,
    CurrentConfigurationData::TAG,
    QueryHermesCapabilitiesData::TAG,
    SendHermesCapabilitiesData::TAG,
    NotificationData::TAG,
    CheckAliveData::TAG,
];

/// The machine side. Listens; one session per supervisory system.
#[derive(Debug)]
pub struct VerticalService;

/// The supervisory side. Connects.
#[derive(Debug)]
pub struct VerticalClient;

impl Role for VerticalService {
    type State = VerticalState;

    const NAME: &'static str = "vertical service";
    const NOT_CONNECTED: VerticalState = VerticalState::NotConnected;
    const SOCKET_CONNECTED: VerticalState = VerticalState::SocketConnected;
    const DISCONNECTED: VerticalState = VerticalState::Disconnected;
    const SIDE: Side = Side::Server;
    const ADMISSION: Admission = Admission::Multiple;
    const ANSWERS_PINGS: bool = true;
    const TAGS: &'static [&'static str] = VERTICAL_TAGS;

    fn step(state: VerticalState, message: &Message, origin: Origin) -> Step<VerticalState> {
        step(state, message, origin == Origin::Peer)
    }
}

impl Role for VerticalClient {
    type State = VerticalState;

    const NAME: &'static str = "vertical client";
    const NOT_CONNECTED: VerticalState = VerticalState::NotConnected;
    const SOCKET_CONNECTED: VerticalState = VerticalState::SocketConnected;
    const DISCONNECTED: VerticalState = VerticalState::Disconnected;
    const SIDE: Side = Side::Client;
    const ADMISSION: Admission = Admission::Single;
    const ANSWERS_PINGS: bool = true;
    const TAGS: &'static [&'static str] = VERTICAL_TAGS;

    fn step(state: VerticalState, message: &Message, origin: Origin) -> Step<VerticalState> {
        step(state, message, origin == Origin::Local)
    }
}

/// `from_supervisor` is true when the event comes from the supervisory system.
fn step(state: VerticalState, message: &Message, from_supervisor: bool) -> Step<VerticalState> {
    use Message as M;
    use VerticalState as S;

    match (state, message, from_supervisor) {
        (S::SocketConnected, M::SupervisoryServiceDescription(_), true) => {
            Step::Enter(S::SupervisoryServiceDescriptionExchanged)
        }
        (S::SupervisoryServiceDescriptionExchanged, M::SupervisoryServiceDescription(_), false) => {
            Step::Enter(S::Connected)
        }
        (
            S::Connected,
            M::BoardArrived(_)
            | M::BoardDeparted(_)
            | M::QueryWorkOrderInfo(_)
            | M::SendWorkOrderInfo(_)
            | M::ReplyWorkOrderInfo(_)
            | M::GetConfiguration(_)
            | M::SetConfiguration(_)
            | M::CurrentConfiguration(_)
            | M::QueryHermesCapabilities(_)
            | M::SendHermesCapabilities(_),
            _,
        ) => Step::Stay,
        _ => Step::Reject,
    }
}
