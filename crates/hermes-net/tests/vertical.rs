mod common;

use common::{connected, local, reach, wait_for};
use hermes_core::message::{
    BoardArrivedData, CheckAliveData, CheckAliveType, SupervisoryServiceDescriptionData,
    TrackedBoard,
};
use hermes_core::{Event, Message, VerticalClient, VerticalService, VerticalState};

#[tokio::test]
async fn supervisory_session_exchanges_board_tracking() {
    let (service, mut service_events) = hermes_net::spawn::<VerticalService>();
    let (client, mut client_events) = hermes_net::spawn::<VerticalClient>();
    service.enable(local(50120)).unwrap();
    client.enable(local(50120)).unwrap();

    let machine = connected(&mut service_events).await;
    let supervisor = connected(&mut client_events).await;

    client
        .signal(supervisor, SupervisoryServiceDescriptionData::new("MES"))
        .unwrap();
    reach(&mut service_events, VerticalState::SupervisoryServiceDescriptionExchanged).await;
    service
        .signal(machine, SupervisoryServiceDescriptionData::new("M1"))
        .unwrap();
    reach(&mut service_events, VerticalState::Connected).await;
    reach(&mut client_events, VerticalState::Connected).await;

    service
        .signal(
            machine,
            BoardArrivedData {
                machine_id: "M1".into(),
                board: TrackedBoard {
                    board_id: "B9".into(),
                    board_id_created_by: "M0".into(),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .unwrap();
    let arrived = wait_for(&mut client_events, |e| {
        matches!(e, Event::Message { message: Message::BoardArrived(_), .. })
    })
    .await;
    let Event::Message { message: Message::BoardArrived(data), .. } = arrived else {
        unreachable!();
    };
    assert_eq!(data.board.board_id, "B9");

    // Pings are answered by the engine on either side.
    client.signal(supervisor, CheckAliveData::ping("p1")).unwrap();
    let pong = wait_for(&mut client_events, |e| {
        matches!(e, Event::Message { message: Message::CheckAlive(_), .. })
    })
    .await;
    let Event::Message { message: Message::CheckAlive(pong), .. } = pong else {
        unreachable!();
    };
    assert_eq!(pong.kind, Some(CheckAliveType::Pong));
    assert_eq!(pong.id.as_deref(), Some("p1"));
}
