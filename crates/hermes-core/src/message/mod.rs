//! Protocol messages.
//!
//! [`Message`] is the closed set of payloads the standard defines. Each
//! variant wraps a `*Data` record carrying only that message's fields; the
//! record knows how to encode itself as the message-type element and how to
//! decode from it ([`Fields`]).

mod configuration;
mod horizontal;
mod vertical;

pub use configuration::{
    CurrentConfigurationData, DownstreamConfiguration, GetConfigurationData,
    SetConfigurationData, UpstreamConfiguration,
};
pub use horizontal::{
    BoardAvailableData, BoardForecastData, CheckAliveData, MachineReadyData, NotificationData,
    QueryBoardInfoData, RevokeBoardAvailableData, RevokeMachineReadyData, SendBoardInfoData,
    ServiceDescriptionData, StartTransportData, StopTransportData, SupportedFeatures,
    TransportFinishedData,
};
pub use vertical::{
    BoardArrivedData, BoardDepartedData, QueryHermesCapabilitiesData, QueryWorkOrderInfoData,
    ReplyWorkOrderInfoData, SendHermesCapabilitiesData, SendWorkOrderInfoData,
    SupervisoryFeatures, SupervisoryServiceDescriptionData, TrackedBoard,
};

use crate::Error;
use crate::wire::{XmlNode, wire_enum};
use serde::{Deserialize, Serialize};

/// Version of the standard this engine speaks.
pub const HERMES_VERSION: &str = "1.3";

/// Encoding to and decoding from a message-type element.
pub trait Fields: Sized {
    /// Element name identifying the message type.
    const TAG: &'static str;

    fn to_node(&self) -> XmlNode;

    fn from_node(node: &XmlNode) -> Result<Self, Error>;
}

pub(crate) type Decoder = fn(&XmlNode) -> Result<Message, Error>;

fn decode_as<T: Fields + Into<Message>>(node: &XmlNode) -> Result<Message, Error> {
    T::from_node(node).map(Into::into)
}

macro_rules! messages {
    ($($variant:ident($data:ty),)+) => {
        /// Every message of the standard, horizontal and vertical.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type")]
        pub enum Message {
            $($variant($data),)+
        }

        impl Message {
            /// The message-type element name.
            pub fn tag(&self) -> &'static str {
                match self {
                    $(Message::$variant(_) => <$data as Fields>::TAG,)+
                }
            }

            pub fn to_node(&self) -> XmlNode {
                match self {
                    $(Message::$variant(data) => data.to_node(),)+
                }
            }
        }

        $(
            impl From<$data> for Message {
                fn from(data: $data) -> Self {
                    Message::$variant(data)
                }
            }
        )+

        const DECODERS: &[(&str, Decoder)] = &[
            $((<$data as Fields>::TAG, decode_as::<$data>),)+
        ];
    };
}

messages! {
    ServiceDescription(ServiceDescriptionData),
    BoardAvailable(BoardAvailableData),
    RevokeBoardAvailable(RevokeBoardAvailableData),
    MachineReady(MachineReadyData),
    RevokeMachineReady(RevokeMachineReadyData),
    StartTransport(StartTransportData),
    StopTransport(StopTransportData),
    TransportFinished(TransportFinishedData),
    Notification(NotificationData),
    CheckAlive(CheckAliveData),
    BoardForecast(BoardForecastData),
    QueryBoardInfo(QueryBoardInfoData),
    SendBoardInfo(SendBoardInfoData),
    GetConfiguration(GetConfigurationData),
    SetConfiguration(SetConfigurationData),
    CurrentConfiguration(CurrentConfigurationData),
    SupervisoryServiceDescription(SupervisoryServiceDescriptionData),
    BoardArrived(BoardArrivedData),
    BoardDeparted(BoardDepartedData),
    QueryWorkOrderInfo(QueryWorkOrderInfoData),
    SendWorkOrderInfo(SendWorkOrderInfoData),
    ReplyWorkOrderInfo(ReplyWorkOrderInfoData),
    QueryHermesCapabilities(QueryHermesCapabilitiesData),
    SendHermesCapabilities(SendHermesCapabilitiesData),
}

/// Looks up the decoder for a message-type element name.
pub(crate) fn decoder(tag: &str) -> Option<Decoder> {
    DECODERS
        .iter()
        .find(|(known, _)| *known == tag)
        .map(|(_, decode)| *decode)
}

/// All message-type element names known to the engine.
pub fn known_tags() -> impl Iterator<Item = &'static str> {
    DECODERS.iter().map(|(tag, _)| *tag)
}

impl Message {
    /// Decodes a message-type element. `Ok(None)` for tags outside the standard.
    pub fn from_node(node: &XmlNode) -> Result<Option<Message>, Error> {
        decoder(node.name()).map(|decode| decode(node)).transpose()
    }

    /// Notification with the given code, severity and text.
    pub fn notification(
        code: NotificationCode,
        severity: Severity,
        description: impl Into<String>,
    ) -> Message {
        Message::Notification(NotificationData::new(code, severity, description))
    }
}

wire_enum! {
    /// Quality of the board being handed over.
    pub enum BoardQuality {
        Any = 0,
        Good = 1,
        Bad = 2,
    }
}

wire_enum! {
    pub enum FlippedBoard {
        SideUpIsUnknown = 0,
        TopSideIsUp = 1,
        BottomSideIsUp = 2,
    }
}

wire_enum! {
    /// How far a transport got before it was stopped or finished.
    pub enum TransferState {
        Unknown = 0,
        NotStarted = 1,
        Incomplete = 2,
        Complete = 3,
    }
}

wire_enum! {
    pub enum NotificationCode {
        Unspecific = 0,
        ProtocolError = 1,
        ConnectionRefusedBecauseOfEstablishedConnection = 2,
        ConnectionResetBecauseOfChangedConfiguration = 3,
        ConfigurationError = 4,
        MachineShutdown = 5,
        BoardForecastError = 6,
    }
}

wire_enum! {
    pub enum Severity {
        Unknown = 0,
        Fatal = 1,
        Error = 2,
        Warning = 3,
        Info = 4,
    }
}

wire_enum! {
    pub enum CheckAliveType {
        Unknown = 0,
        Ping = 1,
        Pong = 2,
    }
}

wire_enum! {
    pub enum BoardArrivedTransfer {
        Unknown = 0,
        Transferred = 1,
        Loaded = 2,
        Inserted = 3,
    }
}

wire_enum! {
    pub enum BoardDepartedTransfer {
        Unknown = 0,
        Transferred = 1,
        Removed = 2,
    }
}

wire_enum! {
    pub enum ReplyWorkOrderInfoStatus {
        Unknown = 0,
        Accepted = 1,
        Rejected = 2,
    }
}

/// Physical board measurements shared by the board-describing messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub thickness: Option<f64>,
    pub conveyor_speed: Option<f64>,
    pub top_clearance_height: Option<f64>,
    pub bottom_clearance_height: Option<f64>,
    pub weight: Option<f64>,
}

impl Dimensions {
    pub(crate) fn write(&self, node: &mut XmlNode) {
        node.set_opt_measure("Length", self.length);
        node.set_opt_measure("Width", self.width);
        node.set_opt_measure("Thickness", self.thickness);
        node.set_opt_measure("ConveyorSpeed", self.conveyor_speed);
        node.set_opt_measure("TopClearanceHeight", self.top_clearance_height);
        node.set_opt_measure("BottomClearanceHeight", self.bottom_clearance_height);
        node.set_opt_measure("Weight", self.weight);
    }

    pub(crate) fn read(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            length: node.optional_measure("Length")?,
            width: node.optional_measure("Width")?,
            thickness: node.optional_measure("Thickness")?,
            conveyor_speed: node.optional_measure("ConveyorSpeed")?,
            top_clearance_height: node.optional_measure("TopClearanceHeight")?,
            bottom_clearance_height: node.optional_measure("BottomClearanceHeight")?,
            weight: node.optional_measure("Weight")?,
        })
    }
}
