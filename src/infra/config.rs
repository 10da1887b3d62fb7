//! Centralized configuration (environment variables + defaults).

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Database URL must be provided (no default) for safety.
pub fn database_url() -> Result<String> {
    std::env::var("DATABASE_URL").context("DATABASE_URL must be set")
}

/// Everything a batch run needs besides its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    /// Directory documents are listed from.
    pub source_dir: PathBuf,
    /// Only files with this suffix are picked up.
    pub extension: String,
    /// Element that wraps each document's content.
    pub root_element: String,
    /// Table the root element maps to; doubles as the ingestion ledger.
    pub root_table: String,
    /// Execute against an in-memory session instead of the database.
    pub dry_run: bool,
    pub max_connections: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("data/dryrun/"),
            extension: ".xml".to_string(),
            root_element: "docList".to_string(),
            root_table: "submission".to_string(),
            dry_run: false,
            max_connections: 1,
        }
    }
}

impl IngestConfig {
    /// Loads configuration from environment variables
    ///
    /// - `XML_SOURCE_DIR`
    /// - `XML_FILE_EXTENSION`
    /// - `XML_ROOT_ELEMENT`
    /// - `XML_ROOT_TABLE`
    /// - `XML_DRY_RUN` (true/false)
    /// - `DATABASE_MAX_CONNECTIONS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("XML_SOURCE_DIR") {
            config.source_dir = PathBuf::from(dir);
        }
        if let Ok(ext) = std::env::var("XML_FILE_EXTENSION") {
            config.extension = ext;
        }
        if let Ok(root) = std::env::var("XML_ROOT_ELEMENT") {
            config.root_element = root;
        }
        if let Ok(table) = std::env::var("XML_ROOT_TABLE") {
            config.root_table = table;
        }
        if let Ok(val) = std::env::var("XML_DRY_RUN") {
            config.dry_run = val
                .parse()
                .with_context(|| format!("XML_DRY_RUN must be true or false, got {:?}", val))?;
        }
        if let Ok(val) = std::env::var("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = val
                .parse()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a valid u32, got {:?}", val))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.root_element.is_empty() {
            anyhow::bail!("root element name cannot be empty");
        }
        if !crate::domain::mapping::row::validate_ident(&self.root_table) {
            anyhow::bail!("root table `{}` is not a valid SQL identifier", self.root_table);
        }
        Ok(())
    }
}
