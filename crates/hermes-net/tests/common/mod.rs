#![allow(dead_code)]

use hermes_core::{Event, NetworkConfiguration, SessionId, Settings};
use std::fmt::Debug;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub const WAIT: Duration = Duration::from_secs(5);

/// Loopback settings with a short retry delay so clients find a late listener quickly.
pub fn local(port: u16) -> Settings {
    let mut network = NetworkConfiguration::new("127.0.0.1", port);
    network.retry_delay = Duration::from_millis(50);
    Settings::new(network)
}

pub async fn next_event<S: Debug>(events: &mut UnboundedReceiver<Event<S>>) -> Event<S> {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("engine stopped")
}

/// Skips events until `accept` matches one, and returns it.
pub async fn wait_for<S: Debug>(
    events: &mut UnboundedReceiver<Event<S>>,
    mut accept: impl FnMut(&Event<S>) -> bool,
) -> Event<S> {
    loop {
        let event = next_event(events).await;
        if accept(&event) {
            return event;
        }
    }
}

pub async fn connected<S: Debug>(events: &mut UnboundedReceiver<Event<S>>) -> SessionId {
    wait_for(events, |e| matches!(e, Event::Connected { .. }))
        .await
        .session_id()
}

pub async fn reach<S: Debug + PartialEq + Copy>(
    events: &mut UnboundedReceiver<Event<S>>,
    target: S,
) {
    wait_for(events, |e| matches!(e, Event::State { state, .. } if *state == target)).await;
}
