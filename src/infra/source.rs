//! Where documents come from.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Enumerates documents and fetches their raw content.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Identifiers of the documents available for ingestion.
    async fn list_documents(&self) -> Result<Vec<String>>;

    async fn read_document(&self, document_id: &str) -> Result<String>;
}

/// Files in one directory, filtered by extension and listed in name order.
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    dir: PathBuf,
    extension: String,
}

impl LocalDirSource {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }
}

#[async_trait]
impl DocumentSource for LocalDirSource {
    async fn list_documents(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("cannot list {}", self.dir.display()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.ends_with(&self.extension) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn read_document(&self, document_id: &str) -> Result<String> {
        let path = self.dir.join(document_id);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))
    }
}

/// Documents held in memory, listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: Vec<(String, String)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, document_id: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(document_id, content);
        self
    }

    /// Adds or replaces a document.
    pub fn insert(&mut self, document_id: impl Into<String>, content: impl Into<String>) {
        let document_id = document_id.into();
        let content = content.into();
        match self.documents.iter_mut().find(|(id, _)| *id == document_id) {
            Some(slot) => slot.1 = content,
            None => self.documents.push((document_id, content)),
        }
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn list_documents(&self) -> Result<Vec<String>> {
        Ok(self.documents.iter().map(|(id, _)| id.clone()).collect())
    }

    async fn read_document(&self, document_id: &str) -> Result<String> {
        self.documents
            .iter()
            .find(|(id, _)| id == document_id)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| anyhow::anyhow!("document not found: {}", document_id))
    }
}
