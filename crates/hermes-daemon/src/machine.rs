//! The machine the daemon stands in for: runs the configured roles, answers
//! the handshakes and configuration requests, and reports every event.

use crate::config::{DaemonConfig, RoleConfig};
use hermes_core::message::{
    CurrentConfigurationData, DownstreamConfiguration, NotificationCode, NotificationData,
    SendHermesCapabilitiesData, ServiceDescriptionData, SetConfigurationData, Severity,
    SupervisoryServiceDescriptionData, UpstreamConfiguration,
};
use hermes_core::{
    ConfigurationService, ConfigurationState, Downstream, Event, Message, Role, State, Upstream,
    VerticalService, VerticalState,
};
use hermes_net::{DownstreamEndpoint, Endpoint, UpstreamEndpoint};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedReceiver;

pub struct Machine {
    config: DaemonConfig,
    current: RwLock<CurrentConfigurationData>,
    json: bool,
    downstream: Option<DownstreamEndpoint>,
    upstream: Option<UpstreamEndpoint>,
    vertical: Option<Endpoint<VerticalService>>,
    configuration: Option<Endpoint<ConfigurationService>>,
}

impl Machine {
    /// Spawns every configured role and the tasks answering their events.
    pub fn start(config: DaemonConfig, json: bool) -> anyhow::Result<Arc<Self>> {
        let current = RwLock::new(initial_configuration(&config));

        let mut downstream_events = None;
        let downstream = match config.downstream_settings() {
            Some(settings) => {
                let (endpoint, events) = hermes_net::spawn::<Downstream>();
                endpoint.enable(settings)?;
                downstream_events = Some(events);
                Some(endpoint)
            }
            None => None,
        };
        let mut upstream_events = None;
        let upstream = match config.upstream_settings() {
            Some(settings) => {
                let (endpoint, events) = hermes_net::spawn::<Upstream>();
                endpoint.enable(settings)?;
                upstream_events = Some(events);
                Some(endpoint)
            }
            None => None,
        };
        let mut vertical_events = None;
        let vertical = match config.vertical_settings() {
            Some(settings) => {
                let (endpoint, events) = hermes_net::spawn::<VerticalService>();
                endpoint.enable(settings)?;
                vertical_events = Some(events);
                Some(endpoint)
            }
            None => None,
        };
        let mut configuration_events = None;
        let configuration = match config.configuration_settings() {
            Some(settings) => {
                let (endpoint, events) = hermes_net::spawn::<ConfigurationService>();
                endpoint.enable(settings)?;
                configuration_events = Some(events);
                Some(endpoint)
            }
            None => None,
        };

        let machine = Arc::new(Self {
            config,
            current,
            json,
            downstream,
            upstream,
            vertical,
            configuration,
        });
        if let Some(events) = downstream_events {
            tokio::spawn(machine.clone().run_downstream(events));
        }
        if let Some(events) = upstream_events {
            tokio::spawn(machine.clone().run_upstream(events));
        }
        if let Some(events) = vertical_events {
            tokio::spawn(machine.clone().run_vertical(events));
        }
        if let Some(events) = configuration_events {
            tokio::spawn(machine.clone().run_configuration(events));
        }
        Ok(machine)
    }

    /// Ends every session with a shutdown notification.
    pub fn shutdown(&self) {
        let bye = NotificationData::new(
            NotificationCode::MachineShutdown,
            Severity::Info,
            "machine shutting down",
        );
        if let Some(endpoint) = &self.downstream {
            let _ = endpoint.disable(bye.clone());
        }
        if let Some(endpoint) = &self.upstream {
            let _ = endpoint.disable(bye.clone());
        }
        if let Some(endpoint) = &self.vertical {
            let _ = endpoint.disable(bye.clone());
        }
        if let Some(endpoint) = &self.configuration {
            let _ = endpoint.disable(bye);
        }
    }

    fn service_description(&self, lane: Option<&RoleConfig>) -> ServiceDescriptionData {
        let mut sd = ServiceDescriptionData::new(
            self.config.machine_id.clone(),
            lane.map_or(1, |l| l.lane_id()),
        );
        sd.interface_id = lane.and_then(|l| l.interface_id.clone());
        sd
    }

    async fn run_downstream(self: Arc<Self>, mut events: UnboundedReceiver<Event<State>>) {
        let Some(endpoint) = self.downstream.clone() else {
            return;
        };
        while let Some(event) = events.recv().await {
            self.report(Downstream::NAME, &event);
            // The next machine opens the exchange; answer with ours.
            if let Event::Message {
                session_id,
                state: State::ServiceDescriptionExchanged,
                message: Message::ServiceDescription(_),
            } = event
            {
                let sd = self.service_description(self.config.downstream.as_ref());
                if let Err(error) = endpoint.signal(session_id, sd) {
                    tracing::error!(%error, "downstream engine gone");
                    return;
                }
            }
        }
    }

    async fn run_upstream(self: Arc<Self>, mut events: UnboundedReceiver<Event<State>>) {
        let Some(endpoint) = self.upstream.clone() else {
            return;
        };
        while let Some(event) = events.recv().await {
            self.report(Upstream::NAME, &event);
            if let Event::Connected { session_id, .. } = event {
                let sd = self.service_description(self.config.upstream.as_ref());
                if let Err(error) = endpoint.signal(session_id, sd) {
                    tracing::error!(%error, "upstream engine gone");
                    return;
                }
            }
        }
    }

    async fn run_vertical(self: Arc<Self>, mut events: UnboundedReceiver<Event<VerticalState>>) {
        let Some(endpoint) = self.vertical.clone() else {
            return;
        };
        while let Some(event) = events.recv().await {
            self.report(VerticalService::NAME, &event);
            let Event::Message {
                session_id,
                state,
                message,
            } = event
            else {
                continue;
            };
            let reply: Message = match (state, message) {
                (
                    VerticalState::SupervisoryServiceDescriptionExchanged,
                    Message::SupervisoryServiceDescription(_),
                ) => {
                    let mut ssd =
                        SupervisoryServiceDescriptionData::new(self.config.machine_id.clone());
                    ssd.supported_features.configuration = true;
                    ssd.supported_features.check_alive_response = true;
                    ssd.supported_features.query_hermes_capabilities = true;
                    ssd.supported_features.send_hermes_capabilities = true;
                    ssd.into()
                }
                (_, Message::GetConfiguration(_)) => self.current.read().await.clone().into(),
                (_, Message::SetConfiguration(set)) => self.apply(set).await,
                (_, Message::QueryHermesCapabilities(_)) => SendHermesCapabilitiesData {
                    optional_messages: vec![
                        "GetConfiguration".into(),
                        "SetConfiguration".into(),
                        "QueryHermesCapabilities".into(),
                    ],
                }
                .into(),
                _ => continue,
            };
            if let Err(error) = endpoint.signal(session_id, reply) {
                tracing::error!(%error, "vertical engine gone");
                return;
            }
        }
    }

    async fn run_configuration(
        self: Arc<Self>,
        mut events: UnboundedReceiver<Event<ConfigurationState>>,
    ) {
        let Some(endpoint) = self.configuration.clone() else {
            return;
        };
        while let Some(event) = events.recv().await {
            self.report(ConfigurationService::NAME, &event);
            let Event::Message {
                session_id,
                message,
                ..
            } = event
            else {
                continue;
            };
            let reply = match message {
                Message::GetConfiguration(_) => self.current.read().await.clone().into(),
                Message::SetConfiguration(set) => self.apply(set).await,
                _ => continue,
            };
            if let Err(error) = endpoint.signal(session_id, reply) {
                tracing::error!(%error, "configuration engine gone");
                return;
            }
        }
    }

    /// Adopts a new configuration in memory and moves the lanes to it.
    /// Returns the answer for the requesting peer.
    async fn apply(&self, set: SetConfigurationData) -> Message {
        if set.machine_id.trim().is_empty() {
            return Message::notification(
                NotificationCode::ConfigurationError,
                Severity::Error,
                "MachineId must not be empty",
            );
        }
        if let Some(bad) = set.upstream_configurations.iter().find(|u| u.host_address.is_empty()) {
            return Message::notification(
                NotificationCode::ConfigurationError,
                Severity::Error,
                format!("upstream lane {} has no host address", bad.upstream_lane_id),
            );
        }
        tracing::info!(machine_id = %set.machine_id, "configuration changed");

        if let (Some(endpoint), Some(lane)) = (&self.downstream, &self.config.downstream)
            && let Some(entry) = set
                .downstream_configurations
                .iter()
                .find(|d| d.downstream_lane_id == lane.lane_id())
        {
            let mut settings = lane.settings(entry.port);
            settings.network.port = entry.port;
            settings.allowed_client = entry.client_address.clone();
            let _ = endpoint.enable(settings);
        }
        if let (Some(endpoint), Some(lane)) = (&self.upstream, &self.config.upstream)
            && let Some(entry) = set
                .upstream_configurations
                .iter()
                .find(|u| u.upstream_lane_id == lane.lane_id())
        {
            let mut settings = lane.settings(entry.port);
            settings.network.host = entry.host_address.clone();
            settings.network.port = entry.port;
            let _ = endpoint.enable(settings);
        }

        let current = CurrentConfigurationData::from(set);
        *self.current.write().await = current.clone();
        current.into()
    }

    fn report<S: Serialize + std::fmt::Debug>(&self, role: &str, event: &Event<S>) {
        if self.json {
            match serde_json::to_string(&serde_json::json!({ "role": role, "event": event })) {
                Ok(line) => println!("{line}"),
                Err(error) => tracing::warn!(%error, "cannot encode event"),
            }
            return;
        }
        match event {
            Event::Disconnected {
                error: Some(error), ..
            } => tracing::warn!(role, session = %event.session_id(), %error, "disconnected"),
            _ => tracing::info!(role, session = %event.session_id(), ?event),
        }
    }
}

/// What a `GetConfiguration` reports before anyone has set anything.
fn initial_configuration(config: &DaemonConfig) -> CurrentConfigurationData {
    let upstream_configurations = config
        .upstream
        .iter()
        .map(|lane| {
            let settings = lane.settings(hermes_core::DEFAULT_HORIZONTAL_PORT);
            UpstreamConfiguration {
                upstream_lane_id: lane.lane_id(),
                upstream_interface_id: lane.interface_id.clone(),
                host_address: settings.network.host,
                port: settings.network.port,
            }
        })
        .collect();
    let downstream_configurations = config
        .downstream
        .iter()
        .map(|lane| {
            let settings = lane.settings(hermes_core::DEFAULT_HORIZONTAL_PORT);
            DownstreamConfiguration {
                downstream_lane_id: lane.lane_id(),
                downstream_interface_id: lane.interface_id.clone(),
                client_address: settings.allowed_client,
                port: settings.network.port,
            }
        })
        .collect();
    CurrentConfigurationData {
        machine_id: Some(config.machine_id.clone()),
        supervisory_system_port: config.vertical_settings().map(|s| s.network.port),
        upstream_configurations,
        downstream_configurations,
    }
}
