//! tokio transport for the Hermes protocol engine.
//!
//! [`spawn`] starts one role instance in its own task and returns an
//! [`Endpoint`] to drive it plus the stream of observer [`Event`]s:
//!
//! ```no_run
//! # async fn demo() -> Result<(), hermes_core::Error> {
//! use hermes_core::{NetworkConfiguration, Settings, Event};
//! use hermes_core::message::ServiceDescriptionData;
//!
//! let (upstream, mut events) = hermes_net::spawn::<hermes_core::Upstream>();
//! upstream.enable(Settings::new(NetworkConfiguration::new("10.0.0.7", 50101)))?;
//! while let Some(event) = events.recv().await {
//!     if let Event::Connected { session_id, .. } = event {
//!         upstream.signal(session_id, ServiceDescriptionData::new("M2", 1))?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod configuration;
mod connection;
mod engine;

pub use configuration::{get_configuration, set_configuration};
pub use engine::{Endpoint, spawn};
pub use hermes_core::Event;

use hermes_core::{ConfigurationService, Downstream, Upstream, VerticalClient, VerticalService};

pub type DownstreamEndpoint = Endpoint<Downstream>;
pub type UpstreamEndpoint = Endpoint<Upstream>;
pub type VerticalServiceEndpoint = Endpoint<VerticalService>;
pub type VerticalClientEndpoint = Endpoint<VerticalClient>;
pub type ConfigurationServiceEndpoint = Endpoint<ConfigurationService>;
