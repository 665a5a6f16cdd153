//! The control connection: one long-lived per-node connection used only
//! for topology/status events, never for queries.
use tokio::sync::mpsc;

use crate::common::trace;
use crate::connection::{Connection, ConnectionConfig};

use super::ClusterMessage;

const REGISTER_EVENTS: &[&str] = &["STATUS_CHANGE", "TOPOLOGY_CHANGE", "SCHEMA_CHANGE"];

/// Connects to `host:port`, registers for events, reports the node active,
/// then forwards every pushed `EVENT` to the cluster actor until the
/// connection dies.
pub(crate) async fn spawn(send: mpsc::UnboundedSender<ClusterMessage>, host: String, port: u16, config: ConnectionConfig) {
    let conn = match Connection::connect(config).await {
        Ok(conn) => conn,
        Err(e) => {
            trace!("control connection to {host}:{port} failed: {e}");
            return;
        }
    };

    if let Err(e) = conn.register(REGISTER_EVENTS).await {
        trace!("control connection REGISTER to {host}:{port} failed: {e}");
        return;
    }

    let (respond, ack) = tokio::sync::oneshot::channel();
    if send.send(ClusterMessage::Activate { host: host.clone(), port, respond }).is_err() {
        return;
    }
    let _ = ack.await;

    let Some(mut events) = conn.take_events() else {
        return;
    };
    while let Some(event) = events.recv().await {
        if send.send(ClusterMessage::Update(event)).is_err() {
            return;
        }
    }
}
