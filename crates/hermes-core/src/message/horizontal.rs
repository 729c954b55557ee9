//! Messages exchanged between adjacent machines on a lane.

use super::{
    BoardQuality, CheckAliveType, Dimensions, Fields, FlippedBoard, HERMES_VERSION,
    NotificationCode, Severity, TransferState,
};
use crate::Error;
use crate::wire::XmlNode;
use serde::{Deserialize, Serialize};

/// Optional features a machine announces in its service description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedFeatures {
    pub board_forecast: bool,
    pub check_alive_response: bool,
    pub query_board_info: bool,
    pub send_board_info: bool,
}

impl SupportedFeatures {
    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new("SupportedFeatures");
        node.set_flag("FeatureBoardForecast", self.board_forecast);
        node.set_flag("FeatureCheckAliveResponse", self.check_alive_response);
        node.set_flag("FeatureQueryBoardInfo", self.query_board_info);
        node.set_flag("FeatureSendBoardInfo", self.send_board_info);
        node
    }

    fn from_node(node: &XmlNode) -> Self {
        Self {
            board_forecast: node.flag("FeatureBoardForecast"),
            check_alive_response: node.flag("FeatureCheckAliveResponse"),
            query_board_info: node.flag("FeatureQueryBoardInfo"),
            send_board_info: node.flag("FeatureSendBoardInfo"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptionData {
    pub machine_id: String,
    pub lane_id: u32,
    pub interface_id: Option<String>,
    pub version: String,
    pub supported_features: SupportedFeatures,
}

impl ServiceDescriptionData {
    pub fn new(machine_id: impl Into<String>, lane_id: u32) -> Self {
        Self {
            machine_id: machine_id.into(),
            lane_id,
            interface_id: None,
            version: HERMES_VERSION.to_string(),
            supported_features: SupportedFeatures::default(),
        }
    }
}

impl Fields for ServiceDescriptionData {
    const TAG: &'static str = "ServiceDescription";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set("MachineId", &self.machine_id);
        node.set("LaneId", self.lane_id);
        node.set_opt("InterfaceId", self.interface_id.as_ref());
        node.set("Version", &self.version);
        node.push(self.supported_features.to_node());
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            machine_id: node.required_string("MachineId")?,
            lane_id: node.required_parse("LaneId")?,
            interface_id: node.optional("InterfaceId"),
            version: node.required_string("Version")?,
            supported_features: node
                .child("SupportedFeatures")
                .map(SupportedFeatures::from_node)
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardAvailableData {
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

impl Fields for BoardAvailableData {
    const TAG: &'static str = "BoardAvailable";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set("BoardId", &self.board_id);
        node.set("BoardIdCreatedBy", &self.board_id_created_by);
        node.set_enum("FailedBoard", self.failed_board);
        node.set_opt("ProductTypeId", self.product_type_id.as_ref());
        node.set_enum("FlippedBoard", self.flipped_board);
        node.set_opt("TopBarcode", self.top_barcode.as_ref());
        node.set_opt("BottomBarcode", self.bottom_barcode.as_ref());
        self.dimensions.write(&mut node);
        node.set_opt("WorkOrderId", self.work_order_id.as_ref());
        node.set_opt("BatchId", self.batch_id.as_ref());
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
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

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeBoardAvailableData {}

impl Fields for RevokeBoardAvailableData {
    const TAG: &'static str = "RevokeBoardAvailable";

    fn to_node(&self) -> XmlNode {
        XmlNode::new(Self::TAG)
    }

    fn from_node(_: &XmlNode) -> Result<Self, Error> {
        Ok(Self {})
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineReadyData {
    pub failed_board: BoardQuality,
    pub forecast_id: Option<String>,
    pub board_id: Option<String>,
    pub product_type_id: Option<String>,
    pub flipped_board: Option<FlippedBoard>,
    pub dimensions: Dimensions,
    pub work_order_id: Option<String>,
    pub batch_id: Option<String>,
}

impl Fields for MachineReadyData {
    const TAG: &'static str = "MachineReady";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set_enum("FailedBoard", self.failed_board);
        node.set_opt("ForecastId", self.forecast_id.as_ref());
        node.set_opt("BoardId", self.board_id.as_ref());
        node.set_opt("ProductTypeId", self.product_type_id.as_ref());
        node.set_opt_enum("FlippedBoard", self.flipped_board);
        self.dimensions.write(&mut node);
        node.set_opt("WorkOrderId", self.work_order_id.as_ref());
        node.set_opt("BatchId", self.batch_id.as_ref());
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            failed_board: node.required_enum("FailedBoard")?,
            forecast_id: node.optional("ForecastId"),
            board_id: node.optional("BoardId"),
            product_type_id: node.optional("ProductTypeId"),
            flipped_board: node.optional_enum("FlippedBoard")?,
            dimensions: Dimensions::read(node)?,
            work_order_id: node.optional("WorkOrderId"),
            batch_id: node.optional("BatchId"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeMachineReadyData {}

impl Fields for RevokeMachineReadyData {
    const TAG: &'static str = "RevokeMachineReady";

    fn to_node(&self) -> XmlNode {
        XmlNode::new(Self::TAG)
    }

    fn from_node(_: &XmlNode) -> Result<Self, Error> {
        Ok(Self {})
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartTransportData {
    pub board_id: String,
    pub conveyor_speed: Option<f64>,
}

impl StartTransportData {
    pub fn new(board_id: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            conveyor_speed: None,
        }
    }
}

impl Fields for StartTransportData {
    const TAG: &'static str = "StartTransport";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set("BoardId", &self.board_id);
        node.set_opt_measure("ConveyorSpeed", self.conveyor_speed);
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            board_id: node.required_string("BoardId")?,
            conveyor_speed: node.optional_measure("ConveyorSpeed")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTransportData {
    pub transfer_state: TransferState,
    pub board_id: String,
}

impl StopTransportData {
    pub fn new(transfer_state: TransferState, board_id: impl Into<String>) -> Self {
        Self {
            transfer_state,
            board_id: board_id.into(),
        }
    }
}

impl Fields for StopTransportData {
    const TAG: &'static str = "StopTransport";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set_enum("TransferState", self.transfer_state);
        node.set("BoardId", &self.board_id);
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            transfer_state: node.required_enum("TransferState")?,
            board_id: node.required_string("BoardId")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportFinishedData {
    pub transfer_state: TransferState,
    pub board_id: String,
}

impl TransportFinishedData {
    pub fn new(transfer_state: TransferState, board_id: impl Into<String>) -> Self {
        Self {
            transfer_state,
            board_id: board_id.into(),
        }
    }
}

impl Fields for TransportFinishedData {
    const TAG: &'static str = "TransportFinished";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set_enum("TransferState", self.transfer_state);
        node.set("BoardId", &self.board_id);
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            transfer_state: node.required_enum("TransferState")?,
            board_id: node.required_string("BoardId")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub notification_code: NotificationCode,
    pub severity: Severity,
    pub description: String,
}

impl NotificationData {
    pub fn new(
        notification_code: NotificationCode,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            notification_code,
            severity,
            description: description.into(),
        }
    }
}

impl Fields for NotificationData {
    const TAG: &'static str = "Notification";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set_enum("NotificationCode", self.notification_code);
        node.set_enum("Severity", self.severity);
        node.set("Description", &self.description);
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            notification_code: node.required_enum("NotificationCode")?,
            severity: node.required_enum("Severity")?,
            description: node.required_string("Description")?,
        })
    }
}

/// Liveness probe. A bare `CheckAlive` carries neither type nor id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckAliveData {
    pub kind: Option<CheckAliveType>,
    pub id: Option<String>,
}

impl CheckAliveData {
    pub fn ping(id: impl Into<String>) -> Self {
        Self {
            kind: Some(CheckAliveType::Ping),
            id: Some(id.into()),
        }
    }

    /// The answer to this probe, if it is a ping.
    pub fn pong(&self) -> Option<Self> {
        (self.kind == Some(CheckAliveType::Ping)).then(|| Self {
            kind: Some(CheckAliveType::Pong),
            id: self.id.clone(),
        })
    }
}

impl Fields for CheckAliveData {
    const TAG: &'static str = "CheckAlive";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set_opt_enum("Type", self.kind);
        node.set_opt("Id", self.id.as_ref());
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            kind: node.optional_enum("Type")?,
            id: node.optional("Id"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardForecastData {
    pub forecast_id: Option<String>,
    pub time_until_available: Option<f64>,
    pub board_id: Option<String>,
    pub board_id_created_by: Option<String>,
    pub failed_board: BoardQuality,
    pub product_type_id: Option<String>,
    pub flipped_board: FlippedBoard,
    pub top_barcode: Option<String>,
    pub bottom_barcode: Option<String>,
    pub dimensions: Dimensions,
}

impl Fields for BoardForecastData {
    const TAG: &'static str = "BoardForecast";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set_opt("ForecastId", self.forecast_id.as_ref());
        node.set_opt_measure("TimeUntilAvailable", self.time_until_available);
        node.set_opt("BoardId", self.board_id.as_ref());
        node.set_opt("BoardIdCreatedBy", self.board_id_created_by.as_ref());
        node.set_enum("FailedBoard", self.failed_board);
        node.set_opt("ProductTypeId", self.product_type_id.as_ref());
        node.set_enum("FlippedBoard", self.flipped_board);
        node.set_opt("TopBarcode", self.top_barcode.as_ref());
        node.set_opt("BottomBarcode", self.bottom_barcode.as_ref());
        self.dimensions.write(&mut node);
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            forecast_id: node.optional("ForecastId"),
            time_until_available: node.optional_measure("TimeUntilAvailable")?,
            board_id: node.optional("BoardId"),
            board_id_created_by: node.optional("BoardIdCreatedBy"),
            failed_board: node.required_enum("FailedBoard")?,
            product_type_id: node.optional("ProductTypeId"),
            flipped_board: node.required_enum("FlippedBoard")?,
            top_barcode: node.optional("TopBarcode"),
            bottom_barcode: node.optional("BottomBarcode"),
            dimensions: Dimensions::read(node)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryBoardInfoData {
    pub top_barcode: Option<String>,
    pub bottom_barcode: Option<String>,
}

impl Fields for QueryBoardInfoData {
    const TAG: &'static str = "QueryBoardInfo";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set_opt("TopBarcode", self.top_barcode.as_ref());
        node.set_opt("BottomBarcode", self.bottom_barcode.as_ref());
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            top_barcode: node.optional("TopBarcode"),
            bottom_barcode: node.optional("BottomBarcode"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendBoardInfoData {
    pub board_id: Option<String>,
    pub board_id_created_by: Option<String>,
    pub failed_board: Option<BoardQuality>,
    pub product_type_id: Option<String>,
    pub flipped_board: Option<FlippedBoard>,
    pub top_barcode: Option<String>,
    pub bottom_barcode: Option<String>,
    pub dimensions: Dimensions,
    pub work_order_id: Option<String>,
    pub batch_id: Option<String>,
}

impl Fields for SendBoardInfoData {
    const TAG: &'static str = "SendBoardInfo";

    fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new(Self::TAG);
        node.set_opt("BoardId", self.board_id.as_ref());
        node.set_opt("BoardIdCreatedBy", self.board_id_created_by.as_ref());
        node.set_opt_enum("FailedBoard", self.failed_board);
        node.set_opt("ProductTypeId", self.product_type_id.as_ref());
        node.set_opt_enum("FlippedBoard", self.flipped_board);
        node.set_opt("TopBarcode", self.top_barcode.as_ref());
        node.set_opt("BottomBarcode", self.bottom_barcode.as_ref());
        self.dimensions.write(&mut node);
        node.set_opt("WorkOrderId", self.work_order_id.as_ref());
        node.set_opt("BatchId", self.batch_id.as_ref());
        node
    }

    fn from_node(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            board_id: node.optional("BoardId"),
            board_id_created_by: node.optional("BoardIdCreatedBy"),
            failed_board: node.optional_enum("FailedBoard")?,
            product_type_id: node.optional("ProductTypeId"),
            flipped_board: node.optional_enum("FlippedBoard")?,
            top_barcode: node.optional("TopBarcode"),
            bottom_barcode: node.optional("BottomBarcode"),
            dimensions: Dimensions::read(node)?,
            work_order_id: node.optional("WorkOrderId"),
            batch_id: node.optional("BatchId"),
        })
    }
}
