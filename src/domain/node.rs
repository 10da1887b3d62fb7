//! Generic document tree produced by parsing.
//!
//! A `Node` carries no behavior beyond shape queries; the mapping rules live in
//! `domain::mapping`.

use serde_json::Value as JsonValue;
use std::fmt;

/// A leaf value.
///
/// XML only yields `Text` and `Null` (empty elements). The other variants show up
/// when a tree is built from JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Whether the value survives mapping.
    ///
    /// Zero, `false` and the empty string count as absent. This is a known defect
    /// kept for compatibility: a legitimate `0` is indistinguishable from "missing".
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Null => false,
            Scalar::Bool(b) => *b,
            Scalar::Int(i) => *i != 0,
            Scalar::Float(f) => *f != 0.0,
            Scalar::Text(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

/// One parsed document (or a subtree of it).
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    /// Fields in document order. Names are unique within one object.
    Object(Vec<(String, Node)>),
    List(Vec<Node>),
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Scalar(Scalar::Text(value.into()))
    }

    /// Looks up a field of an object node. Returns `None` for non-objects.
    pub fn get(&self, name: &str) -> Option<&Node> {
        match self {
            Node::Object(fields) => field(fields, name),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Node)]> {
        match self {
            Node::Object(fields) => Some(fields.as_slice()),
            _ => None,
        }
    }
}

/// Field lookup over an object's field list.
pub fn field<'a>(fields: &'a [(String, Node)], name: &str) -> Option<&'a Node> {
    fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

impl From<JsonValue> for Node {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Node::Scalar(Scalar::Null),
            JsonValue::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Node::Scalar(Scalar::Int(i)),
                None => Node::Scalar(Scalar::Float(n.as_f64().unwrap_or_default())),
            },
            JsonValue::String(s) => Node::Scalar(Scalar::Text(s)),
            JsonValue::Array(items) => Node::List(items.into_iter().map(Node::from).collect()),
            JsonValue::Object(map) => {
                Node::Object(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}
