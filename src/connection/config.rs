//! Per-node connection configuration: what a single [`super::Connection`]
//! needs, independent of any enclosing pool or cluster.
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Authenticator;
use crate::compression::Compressor;

pub(crate) const DEFAULT_PREPARED_CACHE: NonZeroUsize = NonZeroUsize::new(1024).unwrap();

#[derive(Clone)]
pub struct ConnectionConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) connect_timeout: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) compressor: Option<Arc<dyn Compressor>>,
    pub(crate) authenticator: Option<Arc<dyn Authenticator>>,
    pub(crate) prepared_cache_capacity: NonZeroUsize,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("compressor", &self.compressor.as_ref().map(|c| c.name()))
            .field("authenticator", &self.authenticator.is_some())
            .finish()
    }
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> ConnectionConfig {
        ConnectionConfig {
            host: host.into(),
            port,
            connect_timeout: Duration::from_millis(5_000),
            request_timeout: Duration::from_millis(12_000),
            compressor: None,
            authenticator: None,
            prepared_cache_capacity: DEFAULT_PREPARED_CACHE,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> ConnectionConfig {
        self.connect_timeout = timeout;
        self
    }

    /// Deadline for a single request/response round trip once the
    /// connection is established. Elapsing fails the caller with
    /// `Error::Timeout`; the stream id stays reserved until either the
    /// late response arrives or the connection closes.
    pub fn request_timeout(mut self, timeout: Duration) -> ConnectionConfig {
        self.request_timeout = timeout;
        self
    }

    pub fn compressor(mut self, compressor: Arc<dyn Compressor>) -> ConnectionConfig {
        self.compressor = Some(compressor);
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> ConnectionConfig {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn prepared_cache_capacity(mut self, capacity: NonZeroUsize) -> ConnectionConfig {
        self.prepared_cache_capacity = capacity;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> ConnectionConfig {
        ConnectionConfig::new("127.0.0.1", 9042)
    }
}
