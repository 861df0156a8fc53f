//! PostgreSQL row source with a bounded, read-only connection pool.
//!
//! # Security Guarantees
//! - Every pooled session is forced read-only with a statement timeout
//! - Connection strings are redacted in logs and errors
//! - Table and schema names are validated identifiers, never user text

use super::NamespaceSource;
use crate::config::ConnectionConfig;
use crate::error::{ContextError, redact_database_url};
use crate::schema::TableKind;
use crate::snapshot::{NamespaceRows, Row};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::pool::PoolConnection;
use sqlx::postgres::Postgres;
use tracing::{debug, info, warn};
use url::Url;

/// SQLSTATE for a relation that does not exist.
const UNDEFINED_TABLE: &str = "42P01";

/// Row source over the configuration schema of a PostgreSQL database.
pub struct PostgresSource {
    pool: PgPool,
    config: ConnectionConfig,
    redacted_url: String,
}

impl std::fmt::Debug for PostgresSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSource")
            .field("url", &self.redacted_url)
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

impl PostgresSource {
    /// Creates a source with a lazily connecting pool.
    ///
    /// No connection is opened until the first fetch.
    ///
    /// # Errors
    /// Returns a configuration error if the config or URL is invalid.
    pub fn new(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Self::validate_connection_string(connection_string)?;

        let pool = Self::create_connection_pool(connection_string, &config)?;
        let redacted_url = redact_database_url(connection_string);
        info!("Created row source for {} ({})", redacted_url, config);

        Ok(Self {
            pool,
            config,
            redacted_url,
        })
    }

    /// Validates the URL scheme and host.
    ///
    /// # Errors
    /// Returns a configuration error naming the redacted URL.
    pub fn validate_connection_string(connection_string: &str) -> Result<()> {
        let url = Url::parse(connection_string).map_err(|e| {
            ContextError::configuration(format!(
                "Invalid PostgreSQL connection string format: {}",
                e
            ))
        })?;

        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(ContextError::configuration(format!(
                "Unsupported scheme '{}' in {}",
                url.scheme(),
                redact_database_url(connection_string)
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ContextError::configuration(
                "PostgreSQL connection string must name a host",
            ));
        }
        Ok(())
    }

    fn create_connection_pool(
        connection_string: &str,
        config: &ConnectionConfig,
    ) -> Result<PgPool> {
        use sqlx::Executor;

        let query_timeout_secs = config.query_timeout.as_secs().max(1);
        let read_only = config.read_only;

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    conn.execute(
                        format!("SET statement_timeout = '{}s'", query_timeout_secs).as_str(),
                    )
                    .await?;
                    conn.execute("SET idle_in_transaction_session_timeout = '60s'")
                        .await?;
                    let app_name = format!("ctxmask-{}", env!("CARGO_PKG_VERSION"));
                    conn.execute(format!("SET application_name = '{}'", app_name).as_str())
                        .await?;
                    if read_only {
                        conn.execute("SET default_transaction_read_only = on")
                            .await?;
                    }
                    Ok(())
                })
            })
            .connect_lazy(connection_string)
            .map_err(|e| {
                ContextError::fetch_failed(
                    format!(
                        "Failed to create PostgreSQL connection pool to {}",
                        redact_database_url(connection_string)
                    ),
                    e,
                )
            })
    }

    async fn acquire(&self) -> Result<PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(ContextError::connection_failed)
    }

    fn table_query(&self, kind: TableKind) -> String {
        let base = format!(
            "SELECT row_to_json(t.*) AS row_data FROM \"{}\".\"{}\" t",
            self.config.schema,
            kind.as_str()
        );
        if kind.is_namespaced() {
            format!("{} WHERE t.namespace_id::text = $1", base)
        } else {
            base
        }
    }

    /// Closes the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_undefined_table(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNDEFINED_TABLE),
        _ => false,
    }
}

#[async_trait]
impl NamespaceSource for PostgresSource {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let mut conn = self.acquire().await?;
        let sql = format!(
            "SELECT DISTINCT namespace_id::text FROM \"{}\".\"namespaces\" ORDER BY 1",
            self.config.schema
        );
        let namespaces: Vec<Option<String>> = sqlx::query_scalar(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| ContextError::fetch_failed("Failed to list namespaces", e))?;
        Ok(namespaces.into_iter().flatten().collect())
    }

    async fn fetch_namespace_context(&self, namespace_id: &str) -> Result<NamespaceRows> {
        // one checkout for the whole fetch; dropped on every return path
        let mut conn = self.acquire().await?;
        let mut data = NamespaceRows::new();

        for kind in TableKind::RENDER_ORDER {
            let sql = self.table_query(kind);
            let mut query = sqlx::query_scalar::<_, Value>(&sql);
            if kind.is_namespaced() {
                query = query.bind(namespace_id);
            }

            let values = match query.fetch_all(&mut *conn).await {
                Ok(values) => values,
                Err(e) if is_undefined_table(&e) => {
                    warn!("Table {}.{} does not exist, skipping", self.config.schema, kind);
                    continue;
                }
                Err(e) => {
                    return Err(ContextError::fetch_failed(
                        format!("Failed to read table '{}'", kind),
                        e,
                    ));
                }
            };

            let rows: Vec<Row> = values
                .into_iter()
                .filter_map(|value| match value {
                    Value::Object(row) => Some(row),
                    _ => None,
                })
                .collect();
            debug!("Fetched {} rows from {}", rows.len(), kind);
            data.insert(kind.as_str().to_string(), rows);
        }

        info!(
            "Fetched namespace {} from {} ({} tables)",
            namespace_id,
            self.redacted_url,
            data.len()
        );
        Ok(data)
    }

    fn describe(&self) -> String {
        format!("PostgreSQL {} (schema {})", self.redacted_url, self.config.schema)
    }
}
