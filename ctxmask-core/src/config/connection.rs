//! Row-source connection configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the pooled namespace row source.
///
/// # Security
/// This struct intentionally does NOT store the connection string. The URL
/// is handed to the source separately and only ever logged redacted.
///
/// # Example
/// ```rust
/// use ctxmask_core::config::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new("qe_config")
///     .with_max_connections(2)
///     .with_connect_timeout(Duration::from_secs(5));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Schema holding the configuration tables
    pub schema: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connection (and pool checkout) timeout
    pub connect_timeout: Duration,
    /// Per-statement timeout applied to every pooled session
    pub query_timeout: Duration,
    /// Whether sessions are forced into read-only mode
    pub read_only: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            schema: "qe_config".to_string(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(30),
            read_only: true,
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConnectionConfig(schema={}, pool={})",
            self.schema, self.max_connections
        )
    }
}

impl ConnectionConfig {
    /// Creates a config for the given schema with safe defaults.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the pool size.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Builder method to set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder method to set the query timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.schema.is_empty() {
            return Err(crate::error::ContextError::configuration(
                "schema cannot be empty",
            ));
        }

        if !self
            .schema
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(crate::error::ContextError::configuration(format!(
                "schema '{}' contains invalid characters",
                self.schema
            )));
        }

        if self.max_connections == 0 {
            return Err(crate::error::ContextError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > 100 {
            return Err(crate::error::ContextError::configuration(
                "max_connections should not exceed 100 for safety",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(crate::error::ContextError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.query_timeout.is_zero() {
            return Err(crate::error::ContextError::configuration(
                "query_timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.schema, "qe_config");
        assert_eq!(config.max_connections, 5);
        assert!(config.read_only);
    }

    #[test]
    fn test_connection_config_validation() {
        assert!(ConnectionConfig::new("qe_config").validate().is_ok());

        let config = ConnectionConfig::new("");
        assert!(config.validate().is_err());

        let config = ConnectionConfig::new("qe;drop");
        assert!(config.validate().is_err());

        let config = ConnectionConfig::default().with_max_connections(0);
        assert!(config.validate().is_err());

        let config = ConnectionConfig::default().with_max_connections(101);
        assert!(config.validate().is_err());

        let config = ConnectionConfig::default().with_query_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_config_display() {
        let display = ConnectionConfig::new("analytics").to_string();
        assert!(display.contains("analytics"));
        assert!(display.contains("pool=5"));
    }
}
