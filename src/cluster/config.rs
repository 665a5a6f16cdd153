//! Cluster-wide configuration.
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Authenticator;
use crate::cluster::policy::LoadBalancing;
use crate::compression::Compressor;
use crate::connection::Connection;
use crate::error::Error;

type AfterConnect = Arc<dyn Fn(&Connection) + Send + Sync>;

#[derive(Clone)]
pub struct ClusterConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) nodes: Vec<String>,
    pub(crate) load_balancing: LoadBalancing,
    pub(crate) pool_size: NonZeroUsize,
    pub(crate) idle_interval: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) compressor: Option<Arc<dyn Compressor>>,
    pub(crate) authenticator: Option<Arc<dyn Authenticator>>,
    pub(crate) after_connect: Option<AfterConnect>,
}

impl std::fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("nodes", &self.nodes)
            .field("load_balancing", &self.load_balancing)
            .field("pool_size", &self.pool_size)
            .field("idle_interval", &self.idle_interval)
            .field("connect_timeout", &self.connect_timeout)
            .field("compressor", &self.compressor.as_ref().map(|c| c.name()))
            .field("authenticator", &self.authenticator.is_some())
            .field("after_connect", &self.after_connect.is_some())
            .finish()
    }
}

impl ClusterConfig {
    pub fn new() -> ClusterConfig {
        ClusterConfig {
            host: "127.0.0.1".to_string(),
            port: 9042,
            nodes: Vec::new(),
            load_balancing: LoadBalancing::default(),
            pool_size: NonZeroUsize::new(1).expect("1 is nonzero"),
            idle_interval: Duration::from_millis(30_000),
            connect_timeout: Duration::from_millis(5_000),
            compressor: None,
            authenticator: None,
            after_connect: None,
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> ClusterConfig {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> ClusterConfig {
        self.port = port;
        self
    }

    /// Adds a node, given as `"host"` or `"host:port"`.
    pub fn node(mut self, node: impl Into<String>) -> ClusterConfig {
        self.nodes.push(node.into());
        self
    }

    pub fn load_balancing(mut self, policy: LoadBalancing) -> ClusterConfig {
        self.load_balancing = policy;
        self
    }

    pub fn pool_size(mut self, size: NonZeroUsize) -> ClusterConfig {
        self.pool_size = size;
        self
    }

    pub fn idle_interval(mut self, interval: Duration) -> ClusterConfig {
        self.idle_interval = interval;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> ClusterConfig {
        self.connect_timeout = timeout;
        self
    }

    pub fn compressor(mut self, compressor: Arc<dyn Compressor>) -> ClusterConfig {
        self.compressor = Some(compressor);
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> ClusterConfig {
        self.authenticator = Some(authenticator);
        self
    }

    /// Callback invoked once per new connection, right after it becomes
    /// ready.
    pub fn after_connect(mut self, f: impl Fn(&Connection) + Send + Sync + 'static) -> ClusterConfig {
        self.after_connect = Some(Arc::new(f));
        self
    }

    /// The configured node list as `(host, port)` pairs, falling back to
    /// `(self.host, self.port)` when `nodes` is empty (single-node mode).
    pub(crate) fn node_addresses(&self) -> Result<Vec<(String, u16)>, Error> {
        if self.nodes.is_empty() {
            return Ok(vec![(self.host.clone(), self.port)]);
        }
        self.nodes.iter().map(|n| parse_node(n, self.port)).collect()
    }
}

impl Default for ClusterConfig {
    fn default() -> ClusterConfig {
        ClusterConfig::new()
    }
}

fn parse_node(node: &str, default_port: u16) -> Result<(String, u16), Error> {
    match node.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| Error::invalid_arguments(format!("invalid port in node address: {node}")))?;
            Ok((host.to_string(), port))
        }
        None => Ok((node.to_string(), default_port)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_loopback_single_node() {
        let config = ClusterConfig::new();
        assert_eq!(config.node_addresses().unwrap(), vec![("127.0.0.1".to_string(), 9042)]);
    }

    #[test]
    fn parses_host_port_nodes() {
        let config = ClusterConfig::new().node("10.0.0.1:9043").node("10.0.0.2");
        assert_eq!(
            config.node_addresses().unwrap(),
            vec![("10.0.0.1".to_string(), 9043), ("10.0.0.2".to_string(), 9042)]
        );
    }

    #[test]
    fn rejects_non_numeric_port() {
        let config = ClusterConfig::new().node("10.0.0.1:abc");
        assert!(config.node_addresses().is_err());
    }
}
