//! Namespace row sources and their factory.
//!
//! A row source turns a namespace id into the raw rows a
//! [`Snapshot`](crate::snapshot::Snapshot) is built from. The global
//! catalogues (tenants, clients) come back unfiltered; every other table
//! is limited to the requested namespace.
//!
//! # Module Structure
//! - `json_file`: offline JSON dumps
//! - `postgres`: live configuration database (feature `postgresql`)

mod json_file;
#[cfg(feature = "postgresql")]
mod postgres;

pub use json_file::JsonFileSource;
#[cfg(feature = "postgresql")]
pub use postgres::PostgresSource;

use crate::config::ConnectionConfig;
use crate::snapshot::NamespaceRows;
use crate::Result;
use async_trait::async_trait;

/// Source of namespace rows.
///
/// # Security Guarantees
/// - Sources only ever read
/// - Connection strings are redacted before they reach logs or errors
///
/// The trait is object-safe so the CLI can hold a `Box<dyn NamespaceSource>`.
#[async_trait]
pub trait NamespaceSource: Send + Sync {
    /// Lists the namespace ids the source knows about, sorted.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read.
    async fn list_namespaces(&self) -> Result<Vec<String>>;

    /// Fetches every row relevant to one namespace, keyed by table name.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read. A failed fetch is
    /// fatal to the operation; nothing is retried.
    async fn fetch_namespace_context(&self, namespace_id: &str) -> Result<NamespaceRows>;

    /// Short description for logs (credentials redacted).
    fn describe(&self) -> String;
}

/// Whether a location names a PostgreSQL database rather than a file.
pub fn is_database_url(location: &str) -> bool {
    location.starts_with("postgres://") || location.starts_with("postgresql://")
}

/// Creates a row source from a location with default connection settings.
///
/// # Errors
/// See [`create_source_with_config`].
pub async fn create_source(location: &str) -> Result<Box<dyn NamespaceSource>> {
    create_source_with_config(location, ConnectionConfig::default()).await
}

/// Creates a row source from a location: a `postgres://` URL opens a
/// pooled database source, anything else is read as a JSON dump.
///
/// # Errors
/// Returns an error if:
/// - The configuration is invalid
/// - The URL is malformed or PostgreSQL support is not compiled in
/// - The dump file cannot be read or parsed
pub async fn create_source_with_config(
    location: &str,
    config: ConnectionConfig,
) -> Result<Box<dyn NamespaceSource>> {
    if is_database_url(location) {
        #[cfg(feature = "postgresql")]
        {
            let source = PostgresSource::new(location, config)?;
            Ok(Box::new(source))
        }
        #[cfg(not(feature = "postgresql"))]
        {
            let _ = config;
            Err(crate::error::ContextError::configuration(format!(
                "Cannot open {}: compile with --features postgresql to enable PostgreSQL support",
                crate::error::redact_database_url(location)
            )))
        }
    } else {
        let source = JsonFileSource::open(location).await?;
        Ok(Box::new(source))
    }
}
