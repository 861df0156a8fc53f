//! Offline row source backed by a JSON dump.
//!
//! The dump maps table names to row arrays:
//!
//! ```json
//! { "tenants": [{"tenant_id": "", "tenant_name": "default"}],
//!   "entities": [{"namespace_id": "AN", "tenant_id": "", "entity_type": "Person"}] }
//! ```

use super::NamespaceSource;
use crate::error::ContextError;
use crate::schema::TableKind;
use crate::snapshot::{NamespaceRows, Row, stringify};
use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Row source reading a whole-database JSON dump.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    tables: NamespaceRows,
}

impl JsonFileSource {
    /// Reads and parses a dump file.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read and a serialization
    /// error if it is not a `{ table: [row, ...] }` document.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ContextError::Io {
                context: format!("Failed to read snapshot dump {}", path.display()),
                source,
            })?;
        let tables: NamespaceRows = serde_json::from_str(&content).map_err(|e| {
            ContextError::serialization(
                format!("Snapshot dump {} is not a table map", path.display()),
                e,
            )
        })?;

        info!(
            "Opened snapshot dump {} with {} tables",
            path.display(),
            tables.len()
        );
        Ok(Self { path, tables })
    }

    /// Builds a source from rows already in memory.
    pub fn from_tables(tables: NamespaceRows) -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            tables,
        }
    }

    fn keeps(kind: Option<TableKind>, row: &Row, namespace_id: &str) -> bool {
        if kind.is_some_and(|kind| !kind.is_namespaced()) {
            return true;
        }
        match row.get("namespace_id") {
            Some(value) => stringify(Some(value)) == namespace_id,
            None => true,
        }
    }
}

#[async_trait]
impl NamespaceSource for JsonFileSource {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let namespaces: BTreeSet<String> = self
            .tables
            .values()
            .flatten()
            .filter_map(|row| row.get("namespace_id"))
            .map(|value| stringify(Some(value)))
            .filter(|id| !id.is_empty())
            .collect();
        Ok(namespaces.into_iter().collect())
    }

    async fn fetch_namespace_context(&self, namespace_id: &str) -> Result<NamespaceRows> {
        let mut data = NamespaceRows::new();
        for (name, rows) in &self.tables {
            let kind = TableKind::from_name(name);
            let kept: Vec<Row> = rows
                .iter()
                .filter(|row| Self::keeps(kind, row, namespace_id))
                .cloned()
                .collect();
            debug!("Table {}: kept {} of {} rows", name, kept.len(), rows.len());
            data.insert(name.clone(), kept);
        }
        Ok(data)
    }

    fn describe(&self) -> String {
        format!("JSON dump {}", self.path.display())
    }
}
