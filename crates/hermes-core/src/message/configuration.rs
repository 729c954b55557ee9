//! Remote configuration of a machine's Hermes interfaces.

use super::Fields;
use crate::Error;
use crate::wire::XmlNode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetConfigurationData {}

impl Fields for GetConfigurationData {
    const TAG: &'static str = "GetConfiguration";

    fn to_node(&self) -> XmlNode {
        XmlNode::new(Self::TAG)
    }

    fn from_node(_: &XmlNode) -> Result<Self, Error> {
        Ok(Self {})
    }
}

/// Where a machine's upstream interface connects to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfiguration {
    pub upstream_lane_id: u32,
    pub upstream_interface_id: Option<String>,
    pub host_address: String,
    pub port: u16,
}

impl UpstreamConfiguration {
    const TAG: &'static str = "UpstreamConfiguration";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set("UpstreamLaneId", self.upstream_lane_id);
        node.set_opt("UpstreamInterfaceId", self.upstream_interface_id.as_ref());
        node.set("HostAddress", &self.host_address);
        node.set("Port", self.port);
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            upstream_lane_id: node.required_parse("UpstreamLaneId")?,
            upstream_interface_id: node.optional("UpstreamInterfaceId"),
            host_address: node.required_string("HostAddress")?,
            port: node.required_parse("Port")?,
        })
    }
}

/// Where a machine's downstream interface listens, and whom it admits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownstreamConfiguration {
    pub downstream_lane_id: u32,
    pub downstream_interface_id: Option<String>,
    pub client_address: Option<String>,
    pub port: u16,
}

impl DownstreamConfiguration {
    const TAG: &'static str = "DownstreamConfiguration";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set("DownstreamLaneId", self.downstream_lane_id);
        node.set_opt("DownstreamInterfaceId", self.downstream_interface_id.as_ref());
        node.set_opt("ClientAddress", self.client_address.as_ref());
        node.set("Port", self.port);
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            downstream_lane_id: node.required_parse("DownstreamLaneId")?,
            downstream_interface_id: node.optional("DownstreamInterfaceId"),
            client_address: node.optional("ClientAddress"),
            port: node.required_parse("Port")?,
        })
    }
}

fn write_lists(
    node: &mut XmlNode,
    upstream: &[UpstreamConfiguration],
    downstream: &[DownstreamConfiguration],
) {
    if !upstream.is_empty() {
        let mut list = XmlNode::new("UpstreamConfigurations");
        for item in upstream {
            list.push(item.to_node());
        }
        node.push(list);
    }
    if !downstream.is_empty() {
        let mut list = XmlNode::new("DownstreamConfigurations");
        for item in downstream {
            list.push(item.to_node());
        }
        node.push(list);
    }
}

type Lists = (Vec<UpstreamConfiguration>, Vec<DownstreamConfiguration>);

fn read_lists(node: &XmlNode) -> Result<Lists, Error> {
    let upstream = node
        .child("UpstreamConfigurations")
        .map(|list| {
            list.children()
                .iter()
                .filter(|c| c.name() == UpstreamConfiguration::TAG)
                .map(UpstreamConfiguration::from_node)
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();
    let downstream = node
        .child("DownstreamConfigurations")
        .map(|list| {
            list.children()
                .iter()
                .filter(|c| c.name() == DownstreamConfiguration::TAG)
                .map(DownstreamConfiguration::from_node)
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();
    Ok((upstream, downstream))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetConfigurationData {
    pub machine_id: String,
    pub supervisory_system_port: Option<u16>,
    pub upstream_configurations: Vec<UpstreamConfiguration>,
    pub downstream_configurations: Vec<DownstreamConfiguration>,
}

impl Fields for SetConfigurationData {
    const TAG: &'static str = "SetConfiguration";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set("MachineId", &self.machine_id);
        node.set_opt("SupervisorySystemPort", self.supervisory_system_port);
        write_lists(
            &mut node,
            &self.upstream_configurations,
            &self.downstream_configurations,
        );
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        let (upstream_configurations, downstream_configurations) = read_lists(node)?;
        Ok(Self {
            machine_id: node.required_string("MachineId")?,
            supervisory_system_port: node.optional_parse("SupervisorySystemPort")?,
            upstream_configurations,
            downstream_configurations,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentConfigurationData {
    pub machine_id: Option<String>,
    pub supervisory_system_port: Option<u16>,
    pub upstream_configurations: Vec<UpstreamConfiguration>,
    pub downstream_configurations: Vec<DownstreamConfiguration>,
}

impl From<SetConfigurationData> for CurrentConfigurationData {
    fn from(set: SetConfigurationData) -> Self {
        Self {
            machine_id: Some(set.machine_id),
            supervisory_system_port: set.supervisory_system_port,
            upstream_configurations: set.upstream_configurations,
            downstream_configurations: set.downstream_configurations,
        }
    }
}

impl Fields for CurrentConfigurationData {
    const TAG: &'static str = "CurrentConfiguration";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set_opt("MachineId", self.machine_id.as_ref());
        node.set_opt("SupervisorySystemPort", self.supervisory_system_port);
        write_lists(
            &mut node,
            &self.upstream_configurations,
            &self.downstream_configurations,
        );
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        let (upstream_configurations, downstream_configurations) = read_lists(node)?;
        Ok(Self {
            machine_id: node.optional("MachineId"),
            supervisory_system_port: node.optional_parse("SupervisorySystemPort")?,
            upstream_configurations,
            downstream_configurations,
        })
    }
}
