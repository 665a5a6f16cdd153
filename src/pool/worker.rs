//! Background reconnect worker for a node's [`super::Pool`].
//!
//! An `mpsc`-driven task owned by a `tokio::spawn`. A CQL connection already
//! multiplexes many concurrent requests over its one socket, so this worker
//! has no acquire/release checkout protocol to arbitrate — it only replaces
//! a slot that the round-robin picker reported as failed, which fits a
//! plain `async fn` loop over one channel.
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::common::trace;
use crate::connection::{Connection, ConnectionConfig};
use crate::prepared::PreparedCache;

use super::config::AfterConnect;

#[derive(Clone)]
pub(crate) struct WorkerHandle {
    send: mpsc::UnboundedSender<usize>,
}

impl WorkerHandle {
    pub(crate) fn report_failed(&self, index: usize) {
        let _ = self.send.send(index);
    }
}

pub(crate) fn spawn(
    slots: Arc<Mutex<Vec<Connection>>>,
    config: ConnectionConfig,
    prepared: Arc<PreparedCache>,
    after_connect: Option<AfterConnect>,
) -> WorkerHandle {
    let (send, recv) = mpsc::unbounded_channel();
    tokio::spawn(run(slots, config, prepared, after_connect, recv));
    WorkerHandle { send }
}

async fn run(
    slots: Arc<Mutex<Vec<Connection>>>,
    config: ConnectionConfig,
    prepared: Arc<PreparedCache>,
    after_connect: Option<AfterConnect>,
    mut recv: mpsc::UnboundedReceiver<usize>,
) {
    while let Some(index) = recv.recv().await {
        match Connection::connect_shared(config.clone(), prepared.clone()).await {
            Ok(conn) => {
                if let Some(f) = &after_connect {
                    f(&conn);
                }
                let mut slots = slots.lock().expect("pool lock poisoned");
                if index < slots.len() {
                    slots[index] = conn;
                    trace!("pool slot {index} reconnected to {}:{}", config.host, config.port);
                }
            }
            Err(e) => trace!("pool slot {index} reconnect to {}:{} failed: {e}", config.host, config.port),
        }
    }
}
