//! The cluster manager: configured node list, per-node pools, and the
//! control connections that keep node status current.
//!
//! One actor task owns the `address → Pool` map, gating all reads and
//! writes to it exclusively on its own `mpsc` channel rather than behind a
//! lock — the same single-owner-task shape as the pool's reconnect worker,
//! one level up.
mod config;
mod control;
pub mod policy;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

pub use config::ClusterConfig;
pub use policy::LoadBalancing;

use crate::common::trace;
use crate::connection::ConnectionConfig;
use crate::error::{ConnectionError, Error};
use crate::pool::{AfterConnect, Pool, PoolConfig};
use crate::protocol::response::Event;

pub(crate) enum ClusterMessage {
    Checkout(oneshot::Sender<Result<Arc<Pool>, Error>>),
    Activate { host: String, port: u16, respond: oneshot::Sender<()> },
    Update(Event),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeStatus {
    Unknown,
    Up,
    Down,
}

struct NodeEntry {
    host: String,
    port: u16,
    status: NodeStatus,
    pool: Option<Arc<Pool>>,
}

/// Everything needed to start a node's pool, shared across every
/// `NodeEntry`.
#[derive(Clone)]
struct NodeContext {
    template: ConnectionConfig,
    pool_size: std::num::NonZeroUsize,
    after_connect: Option<AfterConnect>,
}

/// A handle to the background cluster actor. Cheap to clone.
#[derive(Clone)]
pub struct Cluster {
    send: mpsc::UnboundedSender<ClusterMessage>,
}

impl Cluster {
    /// Spawns the cluster actor and one control connection per configured
    /// node.
    pub async fn connect(config: ClusterConfig) -> Result<Cluster, Error> {
        let addresses = config.node_addresses()?;
        let nodes = addresses
            .iter()
            .map(|(host, port)| NodeEntry { host: host.clone(), port: *port, status: NodeStatus::Unknown, pool: None })
            .collect();

        let (send, recv) = mpsc::unbounded_channel();
        let context =
            NodeContext { template: connection_template(&config), pool_size: config.pool_size, after_connect: config.after_connect.clone() };

        tokio::spawn(run(nodes, config.load_balancing, context.clone(), recv));

        for (host, port) in addresses {
            let conn_config = node_connection_config(&context.template, &host, port);
            tokio::spawn(control::spawn(send.clone(), host, port, conn_config));
        }

        Ok(Cluster { send })
    }

    /// Picks an up node's pool per the configured load-balancing policy.
    /// Fails with `ConnectionError::NotConnected` when no node is up.
    pub async fn checkout(&self) -> Result<Arc<Pool>, Error> {
        let (respond, rx) = oneshot::channel();
        self.send
            .send(ClusterMessage::Checkout(respond))
            .map_err(|_| Error::connection(ConnectionError::NotConnected))?;
        rx.await.map_err(|_| Error::connection(ConnectionError::NotConnected))?
    }
}

/// A `ConnectionConfig` carrying the cluster-wide compressor/authenticator/
/// timeout, but no particular node's host/port yet.
fn connection_template(config: &ClusterConfig) -> ConnectionConfig {
    let mut conn = ConnectionConfig::new(&config.host, config.port).connect_timeout(config.connect_timeout);
    if let Some(c) = &config.compressor {
        conn = conn.compressor(c.clone());
    }
    if let Some(a) = &config.authenticator {
        conn = conn.authenticator(a.clone());
    }
    conn
}

fn node_connection_config(template: &ConnectionConfig, host: &str, port: u16) -> ConnectionConfig {
    let mut conn = template.clone();
    conn.host = host.to_string();
    conn.port = port;
    conn
}

async fn run(mut nodes: Vec<NodeEntry>, policy: LoadBalancing, context: NodeContext, mut recv: mpsc::UnboundedReceiver<ClusterMessage>) {
    while let Some(msg) = recv.recv().await {
        match msg {
            ClusterMessage::Checkout(respond) => {
                let up: Vec<usize> = nodes
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| n.status == NodeStatus::Up && n.pool.is_some())
                    .map(|(i, _)| i)
                    .collect();
                let picked = policy.select(&up).and_then(|i| nodes[i].pool.clone());
                let _ = respond.send(picked.ok_or_else(|| Error::connection(ConnectionError::NotConnected)));
            }
            ClusterMessage::Activate { host, port, respond } => {
                start_pool(&mut nodes, &host, port, &context).await;
                let _ = respond.send(());
            }
            ClusterMessage::Update(event) => update(&mut nodes, event, &context).await,
        }
    }
}

/// Marks the node up, starting its pool if it isn't already running.
async fn start_pool(nodes: &mut [NodeEntry], host: &str, port: u16, context: &NodeContext) {
    let already_running = nodes.iter().any(|n| n.host == host && n.port == port && n.pool.is_some());
    if already_running {
        if let Some(entry) = nodes.iter_mut().find(|n| n.host == host && n.port == port) {
            entry.status = NodeStatus::Up;
        }
        return;
    }

    let conn_config = node_connection_config(&context.template, host, port);
    let mut pool_config = PoolConfig::new(conn_config).size(context.pool_size);
    if let Some(f) = &context.after_connect {
        pool_config = pool_config.after_connect(f.clone());
    }
    let pool = match Pool::connect(pool_config).await {
        Ok(pool) => pool,
        Err(e) => {
            trace!("pool start for {host}:{port} failed: {e}");
            return;
        }
    };
    if let Some(entry) = nodes.iter_mut().find(|n| n.host == host && n.port == port) {
        entry.status = NodeStatus::Up;
        entry.pool = Some(Arc::new(pool));
    }
}

async fn update(nodes: &mut [NodeEntry], event: Event, context: &NodeContext) {
    match event {
        Event::StatusChange { change_type, address } => {
            let Some((host, port)) =
                nodes.iter().find(|n| matches_address(n, &address)).map(|n| (n.host.clone(), n.port))
            else {
                return;
            };
            if change_type.eq_ignore_ascii_case("UP") {
                start_pool(nodes, &host, port, context).await;
            } else if let Some(entry) = nodes.iter_mut().find(|n| n.host == host && n.port == port) {
                entry.status = NodeStatus::Down;
                entry.pool = None;
            }
        }
        Event::TopologyChange { .. } => {
            // Observed only; the configured node set is not modified
            //.
        }
        Event::SchemaChange(change) => {
            for entry in nodes.iter() {
                if let Some(pool) = &entry.pool {
                    pool.invalidate_schema(&change.keyspace, change.object.as_deref());
                }
            }
        }
    }
}

fn matches_address(entry: &NodeEntry, address: &std::net::SocketAddr) -> bool {
    match entry.host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip == address.ip() && entry.port == address.port(),
        Err(_) => false,
    }
}
