//! Document model and the rules that turn it into rows.

pub mod document;
pub mod guard;
pub mod mapping;
pub mod node;

pub use document::Document;
pub use guard::IngestionGuard;
pub use mapping::{ForeignKeyDeriver, RelationalMapper};
pub use node::{Node, Scalar};
