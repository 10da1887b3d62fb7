//! XML to [`Node`] parsing.
//!
//! Shape rules:
//! - attributes become `@name` text fields
//! - repeated child elements collapse into a list, in document order
//! - an element holding only text becomes a text scalar; an empty element is `Null`
//! - text next to attributes or children is kept under `#text`
//!
//! The result is an object with a single field named after the root element.

use crate::domain::node::{Node, Scalar};
use crate::error::IngestError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::str;

pub const TEXT_KEY: &str = "#text";
pub const ATTRIBUTE_PREFIX: char = '@';

struct Frame {
    name: String,
    fields: Vec<(String, Node)>,
    text: String,
}

impl Frame {
    fn open(e: &BytesStart<'_>) -> Result<Self, IngestError> {
        let name = utf8(e.name().as_ref())?.to_string();
        let mut fields = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(parse_err)?;
            let key = format!("{}{}", ATTRIBUTE_PREFIX, utf8(attr.key.as_ref())?);
            let value = attr.unescape_value().map_err(parse_err)?.into_owned();
            insert_field(&mut fields, key, Node::text(value));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Node) {
        let text = self.text.trim();
        let node = if self.fields.is_empty() {
            if text.is_empty() {
                Node::Scalar(Scalar::Null)
            } else {
                Node::text(text)
            }
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                insert_field(&mut fields, TEXT_KEY.to_string(), Node::text(text));
            }
            Node::Object(fields)
        };
        (self.name, node)
    }
}

fn parse_err(err: impl std::fmt::Display) -> IngestError {
    IngestError::Parse(err.to_string())
}

fn utf8(bytes: &[u8]) -> Result<&str, IngestError> {
    str::from_utf8(bytes).map_err(parse_err)
}

/// Adds a field, turning a repeated name into a list.
fn insert_field(fields: &mut Vec<(String, Node)>, name: String, node: Node) {
    match fields.iter_mut().find(|(k, _)| *k == name) {
        Some((_, Node::List(items))) => items.push(node),
        Some((_, existing)) => {
            let first = std::mem::replace(existing, Node::List(Vec::new()));
            *existing = Node::List(vec![first, node]);
        }
        None => fields.push((name, node)),
    }
}

/// Parses one XML document.
pub fn parse(content: &str) -> Result<Node, IngestError> {
    let mut reader = Reader::from_str(content);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Node)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            IngestError::Parse(format!("{} at position {}", e, reader.buffer_position()))
        })?;
        match event {
            Event::Start(e) => {
                if root.is_some() {
                    return Err(IngestError::Parse("multiple root elements".to_string()));
                }
                stack.push(Frame::open(&e)?);
            }
            Event::Empty(e) => {
                if root.is_some() {
                    return Err(IngestError::Parse("multiple root elements".to_string()));
                }
                let (name, node) = Frame::open(&e)?.close();
                match stack.last_mut() {
                    Some(parent) => insert_field(&mut parent.fields, name, node),
                    None => root = Some((name, node)),
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| IngestError::Parse("unexpected closing tag".to_string()))?;
                let (name, node) = frame.close();
                match stack.last_mut() {
                    Some(parent) => insert_field(&mut parent.fields, name, node),
                    None => root = Some((name, node)),
                }
            }
            Event::Text(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&e.unescape().map_err(parse_err)?);
                }
            }
            Event::CData(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(utf8(&e.into_inner())?);
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(IngestError::Parse(format!("unclosed element `{}`", open.name)));
    }
    let (name, node) = root.ok_or_else(|| IngestError::Parse("document has no root element".to_string()))?;
    Ok(Node::Object(vec![(name, node)]))
}
