//! Mapping of document trees onto relational rows.

pub mod foreign_key;
pub mod mapper;
pub mod row;

pub use foreign_key::ForeignKeyDeriver;
pub use mapper::RelationalMapper;
pub use row::{ForeignKey, InsertStatement, Row, FILE_NAME_COLUMN};
