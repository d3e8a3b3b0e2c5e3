//! Payloads read from disk (or stdin), for the CLI and for replaying
//! captured provider responses.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::{decode_payload, PropertyQuery, PropertySource};
use crate::types::{DealError, ProviderRecord, SourceKind};

/// Reads one raw provider payload from a JSON file. The path `-` means stdin.
pub struct JsonFileSource {
    kind: SourceKind,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(kind: SourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn is_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }

    async fn read_raw(&self) -> std::result::Result<String, DealError> {
        let read = if self.is_stdin() {
            let mut raw = String::new();
            let mut stdin = tokio::io::stdin();
            let result = stdin.read_to_string(&mut raw).await;
            result.map(|_| raw)
        } else {
            tokio::fs::read_to_string(&self.path).await
        };
        read.map_err(|e| DealError::Source {
            source_name: self.name(),
            message: format!("Failed to read payload file {}: {e}", self.path.display()),
        })
    }
}

#[async_trait]
impl PropertySource for JsonFileSource {
    fn name(&self) -> String {
        format!("{}:{}", self.kind, self.path.display())
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, query: &PropertyQuery) -> Result<ProviderRecord> {
        let raw = self.read_raw().await?;
        debug!(source = %self.name(), bytes = raw.len(), "Payload read");
        let record = decode_payload(self.kind, &raw, query.as_of)
            .with_context(|| format!("Failed to decode payload: {}", self.path.display()))?;
        Ok(record)
    }
}
