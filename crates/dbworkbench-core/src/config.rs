//! Configuration for data source connections and the metadata cache layer.

use serde::{Deserialize, Serialize};

/// Configuration for a data source connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Connection string or URL
    pub url: String,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Query timeout in milliseconds
    pub query_timeout_ms: u64,
    /// Application name for connection identification
    pub application_name: Option<String>,
    /// Show system tables/procedures in metadata results
    pub show_system_objects: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout_ms: 30_000,
            query_timeout_ms: 30_000,
            application_name: None,
            show_system_objects: false,
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Set the query timeout.
    pub fn query_timeout(mut self, ms: u64) -> Self {
        self.query_timeout_ms = ms;
        self
    }

    /// Set the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Show or hide system objects.
    pub fn show_system_objects(mut self, show: bool) -> Self {
        self.show_system_objects = show;
        self
    }
}

/// Tuning knobs for the metadata cache layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prefer one bulk children query over per-parent queries when the
    /// driver supports unrestricted metadata scans
    pub bulk_children_load: bool,
    /// Check the cancellation handle every N rows during a scan
    pub cancel_check_interval: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bulk_children_load: true,
            cancel_check_interval: 100,
        }
    }
}

impl CacheConfig {
    /// Enable or disable bulk children loading.
    pub fn bulk_children_load(mut self, enabled: bool) -> Self {
        self.bulk_children_load = enabled;
        self
    }

    /// Set the cancellation polling interval, in rows.
    pub fn cancel_check_interval(mut self, rows: u32) -> Self {
        self.cancel_check_interval = rows.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_config_builder() {
        let config = ConnectionConfig::new("jdbc:generic://localhost/db")
            .connect_timeout(5000)
            .query_timeout(10_000)
            .application_name("workbench")
            .show_system_objects(true);

        assert_eq!(config.url, "jdbc:generic://localhost/db");
        assert_eq!(config.connect_timeout_ms, 5000);
        assert_eq!(config.query_timeout_ms, 10_000);
        assert_eq!(config.application_name.as_deref(), Some("workbench"));
        assert!(config.show_system_objects);
    }

    #[test]
    fn cache_config_floor() {
        let config = CacheConfig::default().cancel_check_interval(0);
        assert_eq!(config.cancel_check_interval, 1);
    }
}
