//! Minimal XML element tree used by the field codec.
//!
//! Every Hermes message body is a single element whose attributes carry
//! scalar fields and whose child elements carry nested records and lists.
//! [`XmlNode`] is that shape and nothing more: text content, comments and
//! processing instructions are dropped on parse.

use crate::Error;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fmt;
use std::str::FromStr;

/// Integer-coded enumerations as they appear on the wire.
///
/// Decoding never fails on an out-of-range value; it yields the enum's zero
/// variant instead.
pub trait WireEnum: Copy + Default {
    fn from_wire(value: i64) -> Self;
    fn to_wire(self) -> i64;
}

/// Declares an integer-coded wire enum. The first variant is the default.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(#[$fmeta:meta])* $first:ident = $fvalue:literal,
            $($(#[$vmeta:meta])* $variant:ident = $value:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[$fmeta])* $first,
            $($(#[$vmeta])* $variant,)*
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$first
            }
        }

        impl $crate::wire::WireEnum for $name {
            fn from_wire(value: i64) -> Self {
                match value {
                    $($value => $name::$variant,)*
                    _ => $name::$first,
                }
            }

            fn to_wire(self) -> i64 {
                match self {
                    $name::$first => $fvalue,
                    $($name::$variant => $value,)*
                }
            }
        }
    };
}

pub(crate) use wire_enum;

/// One XML element: name, attributes in document order, child elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn first_child(&self) -> Option<&XmlNode> {
        self.children.first()
    }

    pub fn push(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    pub fn set(&mut self, key: &str, value: impl fmt::Display) {
        self.attributes.push((key.to_string(), value.to_string()));
    }

    pub fn set_opt(&mut self, key: &str, value: Option<impl fmt::Display>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Physical measurements always carry exactly three decimals.
    pub fn set_measure(&mut self, key: &str, value: f64) {
        self.set(key, format_args!("{value:.3}"));
    }

    pub fn set_opt_measure(&mut self, key: &str, value: Option<f64>) {
        if let Some(value) = value {
            self.set_measure(key, value);
        }
    }

    pub fn set_enum<E: WireEnum>(&mut self, key: &str, value: E) {
        self.set(key, value.to_wire());
    }

    pub fn set_opt_enum<E: WireEnum>(&mut self, key: &str, value: Option<E>) {
        if let Some(value) = value {
            self.set_enum(key, value);
        }
    }

    /// Presence-only child element, e.g. `<FeatureBoardForecast/>`.
    pub fn set_flag(&mut self, name: &str, present: bool) {
        if present {
            self.push(XmlNode::new(name));
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    pub fn required(&self, key: &str) -> Result<&str, Error> {
        self.attr(key).ok_or_else(|| {
            Error::peer(format!(
                "missing required attribute {key} in {}",
                self.name
            ))
        })
    }

    pub fn required_string(&self, key: &str) -> Result<String, Error> {
        self.required(key).map(str::to_string)
    }

    pub fn optional(&self, key: &str) -> Option<String> {
        self.attr(key).map(str::to_string)
    }

    pub fn required_parse<T: FromStr>(&self, key: &str) -> Result<T, Error> {
        let raw = self.required(key)?;
        self.parse_value(key, raw)
    }

    pub fn optional_parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, Error> {
        self.attr(key)
            .map(|raw| self.parse_value(key, raw))
            .transpose()
    }

    pub fn required_measure(&self, key: &str) -> Result<f64, Error> {
        self.required_parse(key)
    }

    pub fn optional_measure(&self, key: &str) -> Result<Option<f64>, Error> {
        self.optional_parse(key)
    }

    pub fn required_enum<E: WireEnum>(&self, key: &str) -> Result<E, Error> {
        self.required_parse::<i64>(key).map(E::from_wire)
    }

    pub fn optional_enum<E: WireEnum>(&self, key: &str) -> Result<Option<E>, Error> {
        Ok(self.optional_parse::<i64>(key)?.map(E::from_wire))
    }

    fn parse_value<T: FromStr>(&self, key: &str, raw: &str) -> Result<T, Error> {
        raw.trim().parse().map_err(|_| {
            Error::peer(format!(
                "invalid value {raw:?} for attribute {key} in {}",
                self.name
            ))
        })
    }

    /// Serializes this element and its subtree.
    pub fn write(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&quick_xml::escape::escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Parses a document and returns its root element.
    pub fn parse(text: &str) -> Result<XmlNode, Error> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        loop {
            let event = reader.read_event().map_err(|e| {
                Error::peer(format!(
                    "malformed XML at byte {}: {e}",
                    reader.error_position()
                ))
            })?;
            match event {
                Event::Start(start) => stack.push(element(&start)?),
                Event::Empty(start) => {
                    let node = element(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.push(node),
                        None => return Ok(node),
                    }
                }
                Event::End(_) => {
                    let Some(node) = stack.pop() else {
                        return Err(Error::peer(format!(
                            "malformed XML at byte {}: unexpected end tag",
                            reader.buffer_position()
                        )));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.push(node),
                        None => return Ok(node),
                    }
                }
                Event::Eof => {
                    return Err(Error::peer(format!(
                        "malformed XML at byte {}: unexpected end of document",
                        reader.buffer_position()
                    )));
                }
                _ => {}
            }
        }
    }
}

impl fmt::Display for XmlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write(&mut out);
        f.write_str(&out)
    }
}

fn element(start: &BytesStart<'_>) -> Result<XmlNode, Error> {
    let mut node = XmlNode::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::peer(format!("malformed attribute: {e}")))?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::peer(format!("malformed attribute value: {e}")))?;
        node.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    wire_enum! {
        pub enum Colour {
            Unknown = 0,
            Red = 1,
            Green = 2,
        }
    }

    #[test]
    fn parse_nested_elements() {
        let root = XmlNode::parse(
            r#"<Hermes Timestamp="x"><A Id="1"><B/><C Name="&lt;c&gt;"/></A></Hermes>"#,
        )
        .unwrap();
        assert_eq!(root.name(), "Hermes");
        let a = root.first_child().unwrap();
        assert_eq!(a.attr("Id"), Some("1"));
        assert!(a.flag("B"));
        assert_eq!(a.child("C").unwrap().attr("Name"), Some("<c>"));
    }

    #[test]
    fn write_escapes_attribute_values() {
        let mut node = XmlNode::new("N");
        node.set("Text", "a \"b\" & <c>");
        let text = node.to_string();
        assert!(!text.contains("<c>"));
        let back = XmlNode::parse(&text).unwrap();
        assert_eq!(back.attr("Text"), Some("a \"b\" & <c>"));
    }

    #[test]
    fn measures_have_three_decimals() {
        let mut node = XmlNode::new("N");
        node.set_measure("Length", 200.0);
        node.set_measure("Width", 0.0005);
        node.set_measure("Weight", 12345678.12345);
        assert_eq!(node.attr("Length"), Some("200.000"));
        assert_eq!(node.attr("Width"), Some("0.001"));
        assert_eq!(node.attr("Weight"), Some("12345678.123"));
    }

    #[test]
    fn out_of_range_enum_falls_back_to_default() {
        let node = XmlNode::parse(r#"<N A="2" B="17" C="-3"/>"#).unwrap();
        assert_eq!(node.required_enum::<Colour>("A").unwrap(), Colour::Green);
        assert_eq!(node.required_enum::<Colour>("B").unwrap(), Colour::Unknown);
        assert_eq!(node.optional_enum::<Colour>("C").unwrap(), Some(Colour::Unknown));
        assert_eq!(node.optional_enum::<Colour>("D").unwrap(), None);
    }

    #[test]
    fn non_numeric_enum_is_a_peer_error() {
        let node = XmlNode::parse(r#"<N A="red"/>"#).unwrap();
        let err = node.required_enum::<Colour>("A").unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Peer);
    }

    #[test]
    fn missing_required_attribute_is_a_peer_error() {
        let node = XmlNode::parse("<N/>").unwrap();
        let err = node.required("BoardId").unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Peer);
        assert!(err.text.contains("BoardId"));
    }

    #[test]
    fn malformed_documents_report_a_position() {
        let err = XmlNode::parse("<Hermes><A></B></Hermes>").unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Peer);
        assert!(err.text.contains("byte"));
        assert!(XmlNode::parse("<Hermes><A/>").is_err());
    }
}
