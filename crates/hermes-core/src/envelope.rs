//! The `<Hermes Timestamp="...">` envelope around every message body.

use crate::message::Message;
use crate::wire::XmlNode;
use crate::Error;
use chrono::{Local, NaiveDateTime};

pub const ROOT: &str = "Hermes";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Wraps a message body, stamped with the current local time.
pub fn encode(message: &Message) -> String {
    encode_at(message, Local::now().naive_local())
}

pub fn encode_at(message: &Message, timestamp: NaiveDateTime) -> String {
    let mut root = XmlNode::new(ROOT);
    root.set("Timestamp", timestamp.format(TIMESTAMP_FORMAT));
    root.push(message.to_node());
    let mut out = String::with_capacity(256);
    root.write(&mut out);
    out
}

/// Parses one framed envelope and returns its data node, the root's first
/// child, whose element name is the dispatch tag.
pub fn decode(span: &[u8]) -> Result<XmlNode, Error> {
    let text = std::str::from_utf8(span)
        .map_err(|e| Error::peer(format!("message is not valid UTF-8: {e}")))?;
    let root = XmlNode::parse(text)?;
    root.first_child()
        .cloned()
        .ok_or_else(|| Error::peer("missing message type node"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::message::{BoardAvailableData, Dimensions, StartTransportData};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_milli_opt(8, 30, 5, 42)
            .unwrap()
    }

    #[test]
    fn envelope_is_timestamped_with_milliseconds() {
        let text = encode_at(&StartTransportData::new("B1").into(), at());
        assert_eq!(
            text,
            r#"<Hermes Timestamp="2024-05-17T08:30:05.042"><StartTransport BoardId="B1"/></Hermes>"#
        );
    }

    #[test]
    fn measurements_are_fixed_point_three_decimals() {
        let message = Message::BoardAvailable(BoardAvailableData {
            board_id: "B1".into(),
            board_id_created_by: "M1".into(),
            dimensions: Dimensions {
                length: Some(160.0),
                width: Some(80.25),
                thickness: Some(1.6),
                conveyor_speed: Some(0.1234),
                ..Dimensions::default()
            },
            ..BoardAvailableData::default()
        });
        let text = encode_at(&message, at());
        assert!(text.contains(r#"Length="160.000""#));
        assert!(text.contains(r#"Width="80.250""#));
        assert!(text.contains(r#"Thickness="1.600""#));
        assert!(text.contains(r#"ConveyorSpeed="0.123""#));
    }

    #[test]
    fn decode_returns_the_data_node() {
        let text = encode(&StartTransportData::new("B7").into());
        let node = decode(text.as_bytes()).unwrap();
        assert_eq!(node.name(), "StartTransport");
        assert_eq!(node.attr("BoardId"), Some("B7"));
    }

    #[test]
    fn root_without_child_is_a_peer_error() {
        let err = decode(br#"<Hermes Timestamp="x"></Hermes>"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Peer);
        assert!(err.text.contains("missing message type"));
    }

    #[test]
    fn malformed_xml_is_a_peer_error() {
        let err = decode(br#"<Hermes Timestamp="x"><A></B></Hermes>"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Peer);
    }
}
