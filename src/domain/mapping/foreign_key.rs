//! Synthetic foreign keys taken from identifiers already present in the document.

use crate::domain::mapping::row::ForeignKey;
use crate::domain::node::{field, Node};
use tracing::warn;

/// Identifier fields, highest priority first.
pub const DEFAULT_ID_FIELDS: [&str; 3] = ["@id", "@refId", "refNumber"];

pub const FK_PREFIX: &str = "fk_";

#[derive(Debug, Clone)]
pub struct ForeignKeyDeriver {
    id_fields: Vec<String>,
}

impl ForeignKeyDeriver {
    pub fn new(id_fields: Vec<String>) -> Self {
        Self { id_fields }
    }

    /// Derives the key an object hands to its children: `fk_<table>` set to the
    /// first truthy identifier field of the object itself.
    ///
    /// A missing identifier is not an error; the children are just left unlinked.
    pub fn derive(&self, table: &str, fields: &[(String, Node)]) -> Option<ForeignKey> {
        for name in &self.id_fields {
            let Some(Node::Scalar(value)) = field(fields, name) else {
                continue;
            };
            if value.is_truthy() {
                return Some(ForeignKey {
                    column: format!("{}{}", FK_PREFIX, table),
                    value: value.to_string(),
                });
            }
        }

        let names: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
        warn!(table, fields = ?names, "no id field to build a foreign key from");
        None
    }
}

impl Default for ForeignKeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_ID_FIELDS.iter().map(|s| s.to_string()).collect())
    }
}
