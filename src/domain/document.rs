use crate::domain::mapping::FILE_NAME_COLUMN;
use crate::domain::node::{field, Node, Scalar};
use crate::error::IngestError;

/// One ingestion unit: the source file, its raw text and the parsed tree.
#[derive(Debug, Clone)]
pub struct Document {
    pub identifier: String,
    pub content: String,
    pub root: Node,
}

impl Document {
    pub fn new(identifier: impl Into<String>, content: impl Into<String>, root: Node) -> Self {
        Self {
            identifier: identifier.into(),
            content: content.into(),
            root,
        }
    }

    /// Fields of the `root_element` object the document wraps.
    pub fn body(&self, root_element: &str) -> Result<&[(String, Node)], IngestError> {
        self.root
            .get(root_element)
            .and_then(Node::as_object)
            .ok_or_else(|| IngestError::MissingRoot(root_element.to_string()))
    }

    /// The `fileName` the document declares about itself; keys the ledger.
    pub fn file_name(&self, root_element: &str) -> Result<String, IngestError> {
        match field(self.body(root_element)?, FILE_NAME_COLUMN) {
            Some(Node::Scalar(value @ (Scalar::Text(_) | Scalar::Int(_)))) if value.is_truthy() => {
                Ok(value.to_string())
            }
            _ => Err(IngestError::MissingFileName(root_element.to_string())),
        }
    }
}
