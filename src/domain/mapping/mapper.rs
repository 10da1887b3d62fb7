//! Recursive tree-to-rows decomposition.

use crate::domain::mapping::foreign_key::ForeignKeyDeriver;
use crate::domain::mapping::row::{ForeignKey, Row, FILE_NAME_COLUMN};
use crate::domain::node::{Node, Scalar};

/// Turns an object tree into rows spread across tables named after its fields.
///
/// Rows come out children-first: every descendant row precedes the row of the
/// object that contains it.
#[derive(Debug, Clone, Default)]
pub struct RelationalMapper {
    deriver: ForeignKeyDeriver,
}

impl RelationalMapper {
    pub fn new(deriver: ForeignKeyDeriver) -> Self {
        Self { deriver }
    }

    /// Maps `fields` (an object) into `table` and returns all produced rows.
    pub fn map(
        &self,
        fields: &[(String, Node)],
        table: &str,
        document_id: &str,
        inherited_fk: Option<&ForeignKey>,
    ) -> Vec<Row> {
        let mut rows = Vec::new();
        self.map_into(fields, table, document_id, inherited_fk, &mut rows);
        rows
    }

    /// Appends the rows for one object and its subtree to `rows`.
    /// Returns how many rows were added.
    pub fn map_into(
        &self,
        fields: &[(String, Node)],
        table: &str,
        document_id: &str,
        inherited_fk: Option<&ForeignKey>,
        rows: &mut Vec<Row>,
    ) -> usize {
        // Derived before visiting children, from this object's raw fields.
        let child_fk = self.deriver.derive(table, fields);
        let mut count = 0;
        let mut row = Row::new(table);

        for (name, value) in fields {
            match value {
                Node::Object(child) => {
                    count += self.map_into(child, name, document_id, child_fk.as_ref(), rows);
                }
                Node::List(items) => {
                    let mut scalars = Vec::new();
                    count += self.map_list(items, name, document_id, child_fk.as_ref(), rows, &mut scalars);
                    if !scalars.is_empty() {
                        row.set(name.as_str(), Scalar::Text(scalars.join(", ")));
                    }
                }
                Node::Scalar(scalar) => {
                    if scalar.is_truthy() {
                        row.set(name.as_str(), scalar.clone());
                    }
                }
            }
        }

        if !row.columns.is_empty() {
            row.set(FILE_NAME_COLUMN, Scalar::Text(document_id.to_string()));
            if let Some(fk) = inherited_fk {
                row.set(fk.column.as_str(), Scalar::Text(fk.value.clone()));
            }
            rows.push(row);
            count += 1;
        }

        count
    }

    /// Object elements recurse into `table`; truthy scalar elements are collected
    /// into `scalars`. Nested lists are walked as part of the same list.
    fn map_list(
        &self,
        items: &[Node],
        table: &str,
        document_id: &str,
        fk: Option<&ForeignKey>,
        rows: &mut Vec<Row>,
        scalars: &mut Vec<String>,
    ) -> usize {
        let mut count = 0;
        for item in items {
            match item {
                Node::Object(child) => count += self.map_into(child, table, document_id, fk, rows),
                Node::List(inner) => count += self.map_list(inner, table, document_id, fk, rows, scalars),
                Node::Scalar(scalar) => {
                    if scalar.is_truthy() {
                        scalars.push(scalar.to_string());
                    }
                }
            }
        }
        count
    }
}
