//! Rows and the INSERT statements built from them.

use crate::domain::node::Scalar;
use crate::error::IngestError;

/// Reserved column carrying the owning document's identifier.
pub const FILE_NAME_COLUMN: &str = "fileName";

/// Synthetic foreign key handed from a parent object to its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub value: String,
}

/// One row destined for `table`. Column names are raw field names until
/// [`Row::to_insert`] sanitizes them.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub table: String,
    pub columns: Vec<(String, Scalar)>,
}

impl Row {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Sets a column, replacing an existing one with the same name in place.
    pub fn set(&mut self, column: impl Into<String>, value: Scalar) {
        let column = column.into();
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.columns.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    /// Builds the parameterized INSERT for this row.
    ///
    /// Fails when the table or a sanitized column is not a plain SQL identifier:
    /// both come straight from the document.
    pub fn to_insert(&self) -> Result<InsertStatement, IngestError> {
        if !validate_ident(&self.table) {
            return Err(IngestError::InvalidIdentifier(self.table.clone()));
        }
        let mut columns = Vec::with_capacity(self.columns.len());
        let mut values = Vec::with_capacity(self.columns.len());
        for (name, value) in &self.columns {
            let clean = sanitize_column(name);
            if !validate_ident(clean) {
                return Err(IngestError::InvalidIdentifier(name.clone()));
            }
            columns.push(clean.to_string());
            values.push(value.clone());
        }
        Ok(InsertStatement {
            table: self.table.clone(),
            columns,
            values,
        })
    }
}

/// A single-row INSERT with positionally bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Scalar>,
}

impl InsertStatement {
    /// SQL text with `$n` placeholders. Values never appear in it.
    pub fn sql(&self) -> String {
        let placeholders: Vec<String> = (1..=self.values.len()).map(|i| format!("${}", i)).collect();
        format!(
            "INSERT INTO {}({}) VALUES({})",
            self.table,
            self.columns.join(", "),
            placeholders.join(", ")
        )
    }
}

/// Strips leading attribute/text markers (`@id` -> `id`, `#text` -> `text`).
pub fn sanitize_column(name: &str) -> &str {
    name.trim_start_matches(['@', '#'])
}

pub fn validate_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
