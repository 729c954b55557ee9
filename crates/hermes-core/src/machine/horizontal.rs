//! Downstream and Upstream: the two ends of one lane.
//!
//! Both run the same table seen from opposite ends. The *board side* is the
//! machine handing a board over (it announces `BoardAvailable`, reports
//! `TransportFinished`); the *receiving side* announces `MachineReady` and
//! drives `StartTransport`/`StopTransport`. The receiving side opens the
//! service description exchange.

use super::{Admission, Origin, Role, Side, Step};
use crate::message::{
    BoardAvailableData, BoardForecastData, CheckAliveData, Fields, MachineReadyData, Message,
    NotificationData, QueryBoardInfoData, RevokeBoardAvailableData, RevokeMachineReadyData,
    SendBoardInfoData, ServiceDescriptionData, StartTransportData, StopTransportData,
    TransportFinishedData,
};
use crate::state::State;

const HORIZONTAL_TAGS: &[&str] = &[
    ServiceDescriptionData::TAG,
    BoardAvailableData::TAG,
    RevokeBoardAvailableData::TAG,
    MachineReadyData::TAG,
    RevokeMachineReadyData::TAG,
    StartTransportData::TAG,
    StopTransportData::TAG,
    TransportFinishedData::TAG,
    NotificationData::TAG,
    CheckAliveData::TAG,
    BoardForecastData::TAG,
    QueryBoardInfoData::TAG,
    SendBoardInfoData::TAG,
];

/// The interface towards the next machine: hands boards over. Listens.
#[derive(Debug)]
pub struct Downstream;

/// The interface towards the previous machine: takes boards over. Connects.
#[derive(Debug)]
pub struct Upstream;

impl Role for Downstream {
    type State = State;

    const NAME: &'static str = "downstream";
    const NOT_CONNECTED: State = State::NotConnected;
    const SOCKET_CONNECTED: State = State::SocketConnected;
    const DISCONNECTED: State = State::Disconnected;
    const SIDE: Side = Side::Server;
    const ADMISSION: Admission = Admission::Single;
    const ANSWERS_PINGS: bool = false;
    const TAGS: &'static [&'static str] = HORIZONTAL_TAGS;

    fn step(state: State, message: &Message, origin: Origin) -> Step<State> {
        step(state, message, origin == Origin::Local)
    }
}

impl Role for Upstream {
    type State = State;

    const NAME: &'static str = "upstream";
    const NOT_CONNECTED: State = State::NotConnected;
    const SOCKET_CONNECTED: State = State::SocketConnected;
    const DISCONNECTED: State = State::Disconnected;
    const SIDE: Side = Side::Client;
    const ADMISSION: Admission = Admission::Single;
    const ANSWERS_PINGS: bool = false;
    const TAGS: &'static [&'static str] = HORIZONTAL_TAGS;

    fn step(state: State, message: &Message, origin: Origin) -> Step<State> {
        step(state, message, origin == Origin::Peer)
    }
}

/// The lane table. `board_side` is true when the event comes from the
/// machine handing the board over.
fn step(state: State, message: &Message, board_side: bool) -> Step<State> {
    use Message as M;
    use State as S;

    let next = match (state, message, board_side) {
        (S::SocketConnected, M::ServiceDescription(_), false) => S::ServiceDescriptionExchanged,
        (S::ServiceDescriptionExchanged, M::ServiceDescription(_), true) => {
            S::NotAvailableNotReady
        }

        (S::NotAvailableNotReady, M::BoardAvailable(_), true) => S::BoardAvailable,
        (S::NotAvailableNotReady, M::MachineReady(_), false) => S::MachineReady,
        (S::BoardAvailable, M::MachineReady(_), false) => S::AvailableAndReady,
        (S::MachineReady, M::BoardAvailable(_), true) => S::AvailableAndReady,

        (S::BoardAvailable, M::RevokeBoardAvailable(_), true) => S::NotAvailableNotReady,
        (S::MachineReady, M::RevokeMachineReady(_), false) => S::NotAvailableNotReady,
        (S::AvailableAndReady, M::RevokeBoardAvailable(_), true) => S::MachineReady,
        (S::AvailableAndReady, M::RevokeMachineReady(_), false) => S::BoardAvailable,

        (S::AvailableAndReady, M::StartTransport(_), false) => S::Transporting,
        (S::Transporting, M::StopTransport(_), false) => S::TransportStopped,
        (S::Transporting, M::TransportFinished(_), true) => S::TransportFinished,
        (S::TransportStopped, M::TransportFinished(_), true) => S::NotAvailableNotReady,
        (S::TransportFinished, M::StopTransport(_), false) => S::NotAvailableNotReady,

        (
            S::Transporting | S::TransportStopped,
            M::BoardAvailable(_) | M::RevokeBoardAvailable(_),
            true,
        ) => return Step::Stay,

        (s, M::BoardForecast(_) | M::SendBoardInfo(_), true) if handshake_done(s) => {
            return Step::Stay;
        }
        (s, M::QueryBoardInfo(_), false) if handshake_done(s) => return Step::Stay,

        _ => return Step::Reject,
    };
    Step::Enter(next)
}

fn handshake_done(state: State) -> bool {
    !matches!(
        state,
        State::NotConnected
            | State::SocketConnected
            | State::ServiceDescriptionExchanged
            | State::Disconnected
    )
}
