//! Messages between a machine and its supervisory system.

use super::{
    BoardArrivedTransfer, BoardDepartedTransfer, BoardQuality, Dimensions, Fields, FlippedBoard,
    HERMES_VERSION, ReplyWorkOrderInfoStatus,
};
use crate::Error;
use crate::wire::XmlNode;
use serde::{Deserialize, Serialize};

/// Optional features announced in a supervisory service description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisoryFeatures {
    pub configuration: bool,
    pub check_alive_response: bool,
    pub board_tracking: bool,
    pub query_work_order_info: bool,
    pub send_work_order_info: bool,
    pub reply_work_order_info: bool,
    pub query_hermes_capabilities: bool,
    pub send_hermes_capabilities: bool,
}

const SUPERVISORY_FEATURES: [&str; 8] = [
    "FeatureConfiguration",
    "FeatureCheckAliveResponse",
    "FeatureBoardTracking",
    "FeatureQueryWorkOrderInfo",
    "FeatureSendWorkOrderInfo",
    "FeatureReplyWorkOrderInfo",
    "FeatureQueryHermesCapabilities",
    "FeatureSendHermesCapabilities",
];

impl SupervisoryFeatures {
    fn flags(&self) -> [bool; 8] {
        [
            self.configuration,
            self.check_alive_response,
            self.board_tracking,
            self.query_work_order_info,
            self.send_work_order_info,
            self.reply_work_order_info,
            self.query_hermes_capabilities,
            self.send_hermes_capabilities,
        ]
    }

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new("SupportedFeatures");
        for (name, present) in SUPERVISORY_FEATURES.iter().zip(self.flags()) {
            node.set_flag(name, present);
        }
        node
    }

    fn from_node(node: &XmlNode) -> Self {
        let [a, b, c, d, e, f, g, h] = SUPERVISORY_FEATURES.map(|name| node.flag(name));
        Self {
            configuration: a,
            check_alive_response: b,
            board_tracking: c,
            query_work_order_info: d,
            send_work_order_info: e,
            reply_work_order_info: f,
            query_hermes_capabilities: g,
            send_hermes_capabilities: h,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisoryServiceDescriptionData {
    pub system_id: String,
    pub version: String,
    pub supported_features: SupervisoryFeatures,
}

impl SupervisoryServiceDescriptionData {
    pub fn new(system_id: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            version: HERMES_VERSION.to_string(),
            supported_features: SupervisoryFeatures::default(),
        }
    }
}

impl Fields for SupervisoryServiceDescriptionData {
    const TAG: &'static str = "SupervisoryServiceDescription";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set("SystemId", &self.system_id);
        node.set("Version", &self.version);
        node.push(self.supported_features.to_node());
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            system_id: node.required_string("SystemId")?,
            version: node.required_string("Version")?,
            supported_features: node
                .child("SupportedFeatures")
                .map(SupervisoryFeatures::from_node)
                .unwrap_or_default(),
        })
    }
}

/// Board identity and quality attributes shared by arrival and departure reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedBoard {
    pub board_id: String,
    pub board_id_created_by: String,
    pub failed_board: BoardQuality,
    pub product_type_id: Option<String>,
    pub flipped_board: FlippedBoard,
    pub top_barcode: Option<String>,
    pub bottom_barcode: Option<String>,
    pub dimensions: Dimensions,
    pub work_order_id: Option<String>,
    pub batch_id: Option<String>,
}

impl TrackedBoard {
    fn write(&self, node: &mut XmlNode) {
        node.set("BoardId", &self.board_id);
        node.set("BoardIdCreatedBy", &self.board_id_created_by);
        node.set_enum("FailedBoard", self.failed_board);
        node.set_opt("ProductTypeId", self.product_type_id.as_ref());
        node.set_enum("FlippedBoard", self.flipped_board);
        node.set_opt("TopBarcode", self.top_barcode.as_ref());
        node.set_opt("BottomBarcode", self.bottom_barcode.as_ref());
        self.dimensions.write(node);
        node.set_opt("WorkOrderId", self.work_order_id.as_ref());
        node.set_opt("BatchId", self.batch_id.as_ref());
    }

    fn read(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            board_id: node.required_string("BoardId")?,
            board_id_created_by: node.required_string("BoardIdCreatedBy")?,
            failed_board: node.required_enum("FailedBoard")?,
            product_type_id: node.optional("ProductTypeId"),
            flipped_board: node.required_enum("FlippedBoard")?,
            top_barcode: node.optional("TopBarcode"),
            bottom_barcode: node.optional("BottomBarcode"),
            dimensions: Dimensions::read(node)?,
            work_order_id: node.optional("WorkOrderId"),
            batch_id: node.optional("BatchId"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardArrivedData {
    pub machine_id: String,
    pub upstream_lane_id: u32,
    pub upstream_interface_id: Option<String>,
    pub magazine_id: Option<String>,
    pub slot_id: Option<u32>,
    pub board_transfer: BoardArrivedTransfer,
    pub board: TrackedBoard,
}

impl Fields for BoardArrivedData {
    const TAG: &'static str = "BoardArrived";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set("MachineId", &self.machine_id);
        node.set("UpstreamLaneId", self.upstream_lane_id);
        node.set_opt("UpstreamInterfaceId", self.upstream_interface_id.as_ref());
        node.set_opt("MagazineId", self.magazine_id.as_ref());
        node.set_opt("SlotId", self.slot_id);
        node.set_enum("BoardTransfer", self.board_transfer);
        self.board.write(&mut node);
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            machine_id: node.required_string("MachineId")?,
            upstream_lane_id: node.required_parse("UpstreamLaneId")?,
            upstream_interface_id: node.optional("UpstreamInterfaceId"),
            magazine_id: node.optional("MagazineId"),
            slot_id: node.optional_parse("SlotId")?,
            board_transfer: node.required_enum("BoardTransfer")?,
            board: TrackedBoard::read(node)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardDepartedData {
    pub machine_id: String,
    pub downstream_lane_id: u32,
    pub downstream_interface_id: Option<String>,
    pub magazine_id: Option<String>,
    pub slot_id: Option<u32>,
    pub board_transfer: BoardDepartedTransfer,
    pub board: TrackedBoard,
}

impl Fields for BoardDepartedData {
    const TAG: &'static str = "BoardDeparted";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set("MachineId", &self.machine_id);
        node.set("DownstreamLaneId", self.downstream_lane_id);
        node.set_opt("DownstreamInterfaceId", self.downstream_interface_id.as_ref());
        node.set_opt("MagazineId", self.magazine_id.as_ref());
        node.set_opt("SlotId", self.slot_id);
        node.set_enum("BoardTransfer", self.board_transfer);
        self.board.write(&mut node);
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            machine_id: node.required_string("MachineId")?,
            downstream_lane_id: node.required_parse("DownstreamLaneId")?,
            downstream_interface_id: node.optional("DownstreamInterfaceId"),
            magazine_id: node.optional("MagazineId"),
            slot_id: node.optional_parse("SlotId")?,
            board_transfer: node.required_enum("BoardTransfer")?,
            board: TrackedBoard::read(node)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWorkOrderInfoData {
    pub query_id: Option<String>,
    pub machine_id: String,
    pub magazine_id: Option<String>,
    pub slot_id: Option<u32>,
    pub top_barcode: Option<String>,
    pub bottom_barcode: Option<String>,
    pub work_order_id: Option<String>,
    pub batch_id: Option<String>,
}

impl Fields for QueryWorkOrderInfoData {
    const TAG: &'static str = "QueryWorkOrderInfo";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set_opt("QueryId", self.query_id.as_ref());
        node.set("MachineId", &self.machine_id);
        node.set_opt("MagazineId", self.magazine_id.as_ref());
        node.set_opt("SlotId", self.slot_id);
        node.set_opt("TopBarcode", self.top_barcode.as_ref());
        node.set_opt("BottomBarcode", self.bottom_barcode.as_ref());
        node.set_opt("WorkOrderId", self.work_order_id.as_ref());
        node.set_opt("BatchId", self.batch_id.as_ref());
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            query_id: node.optional("QueryId"),
            machine_id: node.required_string("MachineId")?,
            magazine_id: node.optional("MagazineId"),
            slot_id: node.optional_parse("SlotId")?,
            top_barcode: node.optional("TopBarcode"),
            bottom_barcode: node.optional("BottomBarcode"),
            work_order_id: node.optional("WorkOrderId"),
            batch_id: node.optional("BatchId"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendWorkOrderInfoData {
    pub query_id: Option<String>,
    pub work_order_id: Option<String>,
    pub batch_id: Option<String>,
    pub board_id: Option<String>,
    pub board_id_created_by: Option<String>,
    pub failed_board: Option<BoardQuality>,
    pub product_type_id: Option<String>,
    pub flipped_board: Option<FlippedBoard>,
    pub top_barcode: Option<String>,
    pub bottom_barcode: Option<String>,
    pub dimensions: Dimensions,
}

impl Fields for SendWorkOrderInfoData {
    const TAG: &'static str = "SendWorkOrderInfo";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set_opt("QueryId", self.query_id.as_ref());
        node.set_opt("WorkOrderId", self.work_order_id.as_ref());
        node.set_opt("BatchId", self.batch_id.as_ref());
        node.set_opt("BoardId", self.board_id.as_ref());
        node.set_opt("BoardIdCreatedBy", self.board_id_created_by.as_ref());
        node.set_opt_enum("FailedBoard", self.failed_board);
        node.set_opt("ProductTypeId", self.product_type_id.as_ref());
        node.set_opt_enum("FlippedBoard", self.flipped_board);
        node.set_opt("TopBarcode", self.top_barcode.as_ref());
        node.set_opt("BottomBarcode", self.bottom_barcode.as_ref());
        self.dimensions.write(&mut node);
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            query_id: node.optional("QueryId"),
            work_order_id: node.optional("WorkOrderId"),
            batch_id: node.optional("BatchId"),
            board_id: node.optional("BoardId"),
            board_id_created_by: node.optional("BoardIdCreatedBy"),
            failed_board: node.optional_enum("FailedBoard")?,
            product_type_id: node.optional("ProductTypeId"),
            flipped_board: node.optional_enum("FlippedBoard")?,
            top_barcode: node.optional("TopBarcode"),
            bottom_barcode: node.optional("BottomBarcode"),
            dimensions: Dimensions::read(node)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyWorkOrderInfoData {
    pub work_order_id: String,
    pub batch_id: Option<String>,
    pub status: ReplyWorkOrderInfoStatus,
}

impl Fields for ReplyWorkOrderInfoData {
    const TAG: &'static str = "ReplyWorkOrderInfo";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set("WorkOrderId", &self.work_order_id);
        node.set_opt("BatchId", self.batch_id.as_ref());
        node.set_enum("Status", self.status);
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            work_order_id: node.required_string("WorkOrderId")?,
            batch_id: node.optional("BatchId"),
            status: node.required_enum("Status")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHermesCapabilitiesData {}

impl Fields for QueryHermesCapabilitiesData {
    const TAG: &'static str = "QueryHermesCapabilities";

    fn to_node(&self) -> XmlNode {
        XmlNode::new(Self::TAG)
    }

    fn from_node(_: &XmlNode) -> Result<Self, Error> {
        Ok(Self {})
    }
}

/// The optional messages a machine implements, by message-type name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendHermesCapabilitiesData {
    pub optional_messages: Vec<String>,
}

impl Fields for SendHermesCapabilitiesData {
    const TAG: &'static str = "SendHermesCapabilities";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        if !self.optional_messages.is_empty() {
            let mut list = XmlNode::new("OptionalMessages");
            for name in &self.optional_messages {
                list.push(XmlNode::new(name.as_str()));
            }
            node.push(list);
        }
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            optional_messages: node
                .child("OptionalMessages")
                .map(|list| {
                    list.children()
                        .iter()
                        .map(|c| c.name().to_string())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}
