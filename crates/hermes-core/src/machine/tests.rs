use super::*;
use crate::ErrorKind;
use crate::message::{
    BoardAvailableData, BoardForecastData, CheckAliveData, MachineReadyData, QueryBoardInfoData,
    RevokeBoardAvailableData, RevokeMachineReadyData, SendBoardInfoData, ServiceDescriptionData,
    StartTransportData, StopTransportData, SupervisoryServiceDescriptionData, TransferState,
    TransportFinishedData,
};
use crate::message::{BoardArrivedData, GetConfigurationData, SendWorkOrderInfoData};
use crate::state::{ConfigurationState, State, VerticalState};

fn sample(tag: &str) -> Message {
    match tag {
        "ServiceDescription" => ServiceDescriptionData::new("M", 1).into(),
        "BoardAvailable" => BoardAvailableData {
            board_id: "B1".into(),
            board_id_created_by: "M".into(),
            ..Default::default()
        }
        .into(),
        "RevokeBoardAvailable" => RevokeBoardAvailableData {}.into(),
        "MachineReady" => MachineReadyData::default().into(),
        "RevokeMachineReady" => RevokeMachineReadyData {}.into(),
        "StartTransport" => StartTransportData::new("B1").into(),
        "StopTransport" => StopTransportData::new(TransferState::Complete, "B1").into(),
        "TransportFinished" => TransportFinishedData::new(TransferState::Complete, "B1").into(),
        "BoardForecast" => BoardForecastData::default().into(),
        "QueryBoardInfo" => QueryBoardInfoData::default().into(),
        "SendBoardInfo" => SendBoardInfoData::default().into(),
        other => panic!("no sample for {other}"),
    }
}

const STATE_DEPENDENT: [&str; 11] = [
    "ServiceDescription",
    "BoardAvailable",
    "RevokeBoardAvailable",
    "MachineReady",
    "RevokeMachineReady",
    "StartTransport",
    "StopTransport",
    "TransportFinished",
    "BoardForecast",
    "QueryBoardInfo",
    "SendBoardInfo",
];

/// The Downstream table written out row by row: (from, tag, origin, to).
/// `None` as target means a legal event that keeps the state.
fn downstream_table() -> Vec<(State, &'static str, Origin, Option<State>)> {
    use Origin::{Local, Peer};
    use State as S;
    let mut rows = vec![
        (S::SocketConnected, "ServiceDescription", Peer, Some(S::ServiceDescriptionExchanged)),
        (S::ServiceDescriptionExchanged, "ServiceDescription", Local, Some(S::NotAvailableNotReady)),
        (S::NotAvailableNotReady, "BoardAvailable", Local, Some(S::BoardAvailable)),
        (S::NotAvailableNotReady, "MachineReady", Peer, Some(S::MachineReady)),
        (S::BoardAvailable, "MachineReady", Peer, Some(S::AvailableAndReady)),
        (S::MachineReady, "BoardAvailable", Local, Some(S::AvailableAndReady)),
        (S::BoardAvailable, "RevokeBoardAvailable", Local, Some(S::NotAvailableNotReady)),
        (S::MachineReady, "RevokeMachineReady", Peer, Some(S::NotAvailableNotReady)),
        (S::AvailableAndReady, "RevokeBoardAvailable", Local, Some(S::MachineReady)),
        (S::AvailableAndReady, "RevokeMachineReady", Peer, Some(S::BoardAvailable)),
        (S::AvailableAndReady, "StartTransport", Peer, Some(S::Transporting)),
        (S::Transporting, "StopTransport", Peer, Some(S::TransportStopped)),
        (S::Transporting, "TransportFinished", Local, Some(S::TransportFinished)),
        (S::TransportStopped, "TransportFinished", Local, Some(S::NotAvailableNotReady)),
        (S::TransportFinished, "StopTransport", Peer, Some(S::NotAvailableNotReady)),
        (S::Transporting, "BoardAvailable", Local, None),
        (S::Transporting, "RevokeBoardAvailable", Local, None),
        (S::TransportStopped, "BoardAvailable", Local, None),
        (S::TransportStopped, "RevokeBoardAvailable", Local, None),
    ];
    for state in [
        S::NotAvailableNotReady,
        S::BoardAvailable,
        S::MachineReady,
        S::AvailableAndReady,
        S::Transporting,
        S::TransportStopped,
        S::TransportFinished,
    ] {
        rows.push((state, "BoardForecast", Local, None));
        rows.push((state, "SendBoardInfo", Local, None));
        rows.push((state, "QueryBoardInfo", Peer, None));
    }
    rows
}

fn mirrored(origin: Origin) -> Origin {
    match origin {
        Origin::Peer => Origin::Local,
        Origin::Local => Origin::Peer,
    }
}

fn fire<R: Role>(machine: &mut StateMachine<R>, message: Message, origin: Origin) -> Vec<Action<R::State>> {
    match origin {
        Origin::Peer => machine.receive(message),
        Origin::Local => machine.signal(message),
    }
}

fn sweep<R: Role<State = State>>(mirror: bool) {
    let table = downstream_table();
    let connected = State::ALL
        .into_iter()
        .filter(|s| !matches!(s, State::NotConnected | State::Disconnected));
    for state in connected {
        for tag in STATE_DEPENDENT {
            for origin in [Origin::Peer, Origin::Local] {
                let table_origin = if mirror { mirrored(origin) } else { origin };
                let row = table
                    .iter()
                    .find(|(s, t, o, _)| *s == state && *t == tag && *o == table_origin);
                let mut machine = StateMachine::<R>::at(state, CheckState::SendAndReceive);
                let actions = fire(&mut machine, sample(tag), origin);
                match row {
                    Some((_, _, _, target)) => {
                        let expected = target.unwrap_or(state);
                        assert_eq!(
                            machine.state(),
                            expected,
                            "{} {tag} from {origin:?} in {state}",
                            R::NAME
                        );
                        assert!(
                            !actions
                                .iter()
                                .any(|a| matches!(a, Action::Disconnected(..))),
                            "{} {tag} from {origin:?} in {state} should be legal",
                            R::NAME
                        );
                    }
                    None => {
                        assert!(
                            machine.is_disconnected(),
                            "{} {tag} from {origin:?} in {state} should be rejected",
                            R::NAME
                        );
                        let expected_kind = match origin {
                            Origin::Peer => ErrorKind::Peer,
                            Origin::Local => ErrorKind::Client,
                        };
                        assert!(matches!(
                            &actions[0],
                            Action::Disconnected(State::Disconnected, Some(e)) if e.kind == expected_kind
                        ));
                    }
                }
            }
        }
    }
}

#[test]
fn downstream_legality_matches_table() {
    sweep::<Downstream>(false);
}

#[test]
fn upstream_is_the_mirror_of_downstream() {
    sweep::<Upstream>(true);
}

#[test]
fn accepted_peer_message_is_delivered_with_new_state() {
    let mut machine = StateMachine::<Downstream>::at(State::SocketConnected, CheckState::SendAndReceive);
    let sd = sample("ServiceDescription");
    let actions = machine.receive(sd.clone());
    assert_eq!(
        actions,
        vec![
            Action::State(State::ServiceDescriptionExchanged),
            Action::Deliver(sd, State::ServiceDescriptionExchanged),
        ]
    );
}

#[test]
fn accepted_local_message_is_sent() {
    let mut machine =
        StateMachine::<Downstream>::at(State::ServiceDescriptionExchanged, CheckState::SendAndReceive);
    let sd = sample("ServiceDescription");
    let actions = machine.signal(sd.clone());
    assert_eq!(
        actions,
        vec![Action::State(State::NotAvailableNotReady), Action::Send(sd)]
    );
}

#[test]
fn peer_violation_sends_fatal_notification_and_closes() {
    let mut machine = StateMachine::<Downstream>::at(State::SocketConnected, CheckState::SendAndReceive);
    let actions = machine.receive(sample("StartTransport"));
    assert_eq!(actions.len(), 3);
    match &actions[1] {
        Action::Send(Message::Notification(n)) => {
            assert_eq!(n.notification_code, NotificationCode::ProtocolError);
            assert_eq!(n.severity, Severity::Fatal);
        }
        other => panic!("expected notification, got {other:?}"),
    }
    assert_eq!(actions[2], Action::Close);
}

#[test]
fn board_id_mismatch_is_a_violation() {
    let finishes = [
        (
            Message::from(StopTransportData::new(TransferState::Complete, "B")),
            Origin::Peer,
        ),
        (
            Message::from(TransportFinishedData::new(TransferState::Complete, "B")),
            Origin::Local,
        ),
    ];
    for (finish, origin) in finishes {
        let mut machine =
            StateMachine::<Downstream>::at(State::AvailableAndReady, CheckState::SendAndReceive);
        machine.receive(StartTransportData::new("A").into());
        assert_eq!(machine.state(), State::Transporting);
        let actions = fire(&mut machine, finish, origin);
        assert!(machine.is_disconnected());
        match &actions[0] {
            Action::Disconnected(_, Some(error)) => {
                assert!(error.is_protocol_violation());
                assert!(error.text.contains("does not match"), "{}", error.text);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[test]
fn matching_board_id_completes_the_transfer() {
    let mut machine =
        StateMachine::<Upstream>::at(State::AvailableAndReady, CheckState::SendAndReceive);
    machine.signal(StartTransportData::new("A").into());
    machine.receive(TransportFinishedData::new(TransferState::Complete, "A").into());
    assert_eq!(machine.state(), State::TransportFinished);
    machine.signal(StopTransportData::new(TransferState::Complete, "A").into());
    assert_eq!(machine.state(), State::NotAvailableNotReady);
}

#[test]
fn lenient_mode_forwards_illegal_local_signal() {
    let mut machine = StateMachine::<Downstream>::at(State::SocketConnected, CheckState::OnlyReceive);
    let msg = sample("BoardAvailable");
    let actions = machine.signal(msg.clone());
    assert_eq!(actions, vec![Action::Send(msg)]);
    assert_eq!(machine.state(), State::SocketConnected);
}

#[test]
fn lenient_mode_still_rejects_peer_violations() {
    let mut machine = StateMachine::<Downstream>::at(State::SocketConnected, CheckState::OnlyReceive);
    machine.receive(sample("MachineReady"));
    assert!(machine.is_disconnected());
}

#[test]
fn notification_and_check_alive_pass_through() {
    let mut machine = StateMachine::<Upstream>::at(State::Transporting, CheckState::SendAndReceive);
    let ping = Message::from(CheckAliveData::ping("1"));
    assert_eq!(
        machine.receive(ping.clone()),
        vec![Action::Deliver(ping, State::Transporting)]
    );
    let note = Message::notification(NotificationCode::MachineShutdown, Severity::Info, "bye");
    assert_eq!(machine.signal(note.clone()), vec![Action::Send(note)]);
    assert_eq!(machine.state(), State::Transporting);
}

#[test]
fn events_outside_a_connection_are_dropped() {
    let mut fresh = StateMachine::<Downstream>::new(CheckState::SendAndReceive);
    assert!(fresh.signal(CheckAliveData::default().into()).is_empty());
    assert!(fresh.receive(sample("ServiceDescription")).is_empty());
    assert_eq!(fresh.state(), State::NotConnected);

    let mut closed = StateMachine::<Downstream>::at(State::Disconnected, CheckState::SendAndReceive);
    assert!(closed.receive(sample("ServiceDescription")).is_empty());
    assert!(closed.fail(Error::peer("late")).is_empty());
}

#[test]
fn connect_twice_is_an_implementation_error() {
    let mut machine = StateMachine::<Upstream>::new(CheckState::SendAndReceive);
    assert_eq!(machine.connect(), vec![Action::State(State::SocketConnected)]);
    let actions = machine.connect();
    assert!(matches!(
        &actions[0],
        Action::Disconnected(_, Some(e)) if e.kind == ErrorKind::Implementation
    ));
}

#[test]
fn disconnect_is_idempotent() {
    let note = NotificationData::new(NotificationCode::MachineShutdown, Severity::Info, "off");
    let mut machine = StateMachine::<Downstream>::at(State::MachineReady, CheckState::SendAndReceive);
    assert_eq!(
        machine.disconnect(note.clone()),
        vec![
            Action::Disconnected(State::Disconnected, None),
            Action::Send(Message::Notification(note.clone())),
            Action::Close,
        ]
    );
    assert!(machine.disconnect(note.clone()).is_empty());
    assert!(machine.transport_closed(Error::network("gone")).is_empty());

    let mut never = StateMachine::<Downstream>::new(CheckState::SendAndReceive);
    assert_eq!(
        never.disconnect(note),
        vec![Action::Disconnected(State::Disconnected, None), Action::Close]
    );
}

#[test]
fn vertical_handshake_then_free_exchange() {
    let ssd = Message::from(SupervisoryServiceDescriptionData::new("SUP"));
    let mut service =
        StateMachine::<VerticalService>::at(VerticalState::SocketConnected, CheckState::SendAndReceive);
    service.receive(ssd.clone());
    assert_eq!(service.state(), VerticalState::SupervisoryServiceDescriptionExchanged);
    service.signal(ssd.clone());
    assert_eq!(service.state(), VerticalState::Connected);

    let arrived = Message::from(BoardArrivedData::default());
    assert_eq!(service.signal(arrived.clone()), vec![Action::Send(arrived.clone())]);
    assert_eq!(
        service.receive(arrived.clone()),
        vec![Action::Deliver(arrived, VerticalState::Connected)]
    );
    let work_order = Message::from(SendWorkOrderInfoData::default());
    service.receive(work_order);
    assert_eq!(service.state(), VerticalState::Connected);
}

#[test]
fn vertical_client_opens_the_exchange() {
    let ssd = Message::from(SupervisoryServiceDescriptionData::new("SUP"));
    let mut client =
        StateMachine::<VerticalClient>::at(VerticalState::SocketConnected, CheckState::SendAndReceive);
    client.receive(ssd.clone());
    assert!(client.is_disconnected());

    let mut client =
        StateMachine::<VerticalClient>::at(VerticalState::SocketConnected, CheckState::SendAndReceive);
    client.signal(ssd.clone());
    client.receive(ssd);
    assert_eq!(client.state(), VerticalState::Connected);
}

#[test]
fn vertical_message_before_connected_is_a_violation() {
    let mut service = StateMachine::<VerticalService>::at(
        VerticalState::SupervisoryServiceDescriptionExchanged,
        CheckState::SendAndReceive,
    );
    service.receive(BoardArrivedData::default().into());
    assert!(service.is_disconnected());
}

#[test]
fn configuration_service_answers_without_state_change() {
    let mut service = StateMachine::<ConfigurationService>::at(
        ConfigurationState::SocketConnected,
        CheckState::SendAndReceive,
    );
    let get = Message::from(GetConfigurationData {});
    assert_eq!(
        service.receive(get.clone()),
        vec![Action::Deliver(get, ConfigurationState::SocketConnected)]
    );
    service.receive(StartTransportData::new("X").into());
    assert!(service.is_disconnected());
}
