//! Connection settings for an HTTP document store.
//!
//! The configuration is a plain value handed to a store client when it is built. Sharing one
//! client (and therefore one configuration) across the process is the application's choice;
//! nothing in this crate reads connection settings from global state.

use serde::{Deserialize, Serialize};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Host, credentials, port and TLS flag of a store server.
///
/// # Example
///
/// ```ignore
/// use couchlayer::config::ConnectionConfig;
///
/// let config = ConnectionConfig::builder()
///     .with_host("couch.internal")
///     .with_credentials("perfect", "perfect")
///     .with_tls(true)
///     .build()?;
///
/// assert_eq!(config.base_url(), "https://couch.internal:5984");
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub port: u16,
    pub tls: bool,
}

impl ConnectionConfig {
    pub const DEFAULT_PORT: u16 = 5984;

    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// `http(s)://host:port`, without a trailing slash. IPv6 hosts are bracketed.
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("{scheme}://[{}]:{}", self.host, self.port)
        } else {
            format!("{scheme}://{}:{}", self.host, self.port)
        }
    }

    /// Whether requests should carry basic authentication.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }

    /// Checks the settings a client cannot work without.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        if self.host.trim().is_empty() {
            return Err(DocumentStoreError::Initialization("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(DocumentStoreError::Initialization("port must not be 0".into()));
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            username: String::new(),
            password: String::new(),
            port: Self::DEFAULT_PORT,
            tls: false,
        }
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("tls", &self.tls)
            .finish()
    }
}

/// Builder for [`ConnectionConfig`].
#[derive(Debug, Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.config.tls = tls;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] for an empty host or a zero port.
    pub fn build(self) -> DocumentStoreResult<ConnectionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
