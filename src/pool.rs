//! A node's set of parallel connections.
//!
//! CQL connections already multiplex concurrent requests over one socket
//! (`connection::actor`), so there is no acquire/release checkout here:
//! [`Pool::pick`] hands back a cheap `clone()` of a round-robin-selected
//! [`Connection`], and every caller can use it concurrently.
mod config;
mod worker;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub use config::PoolConfig;
pub(crate) use config::AfterConnect;

use crate::connection::Connection;
use crate::error::Error;
use crate::prepared::PreparedCache;

pub struct Pool {
    slots: Arc<Mutex<Vec<Connection>>>,
    next: AtomicUsize,
    worker: worker::WorkerHandle,
    prepared: Arc<PreparedCache>,
}

impl Pool {
    /// Opens `config.size` connections to the same node, sequentially, all
    /// sharing one prepared cache.
    pub async fn connect(config: PoolConfig) -> Result<Pool, Error> {
        let prepared = Arc::new(PreparedCache::new(config.connection.prepared_cache_capacity));
        let mut slots = Vec::with_capacity(config.size.get());
        for _ in 0..config.size.get() {
            let conn = Connection::connect_shared(config.connection.clone(), prepared.clone()).await?;
            if let Some(f) = &config.after_connect {
                f(&conn);
            }
            slots.push(conn);
        }
        let slots = Arc::new(Mutex::new(slots));
        let worker = worker::spawn(slots.clone(), config.connection.clone(), prepared.clone(), config.after_connect.clone());
        Ok(Pool { slots, next: AtomicUsize::new(0), worker, prepared })
    }

    pub fn size(&self) -> usize {
        self.slots.lock().expect("pool lock poisoned").len()
    }

    /// Round-robin picks a connection, returning its slot index alongside
    /// so a caller that hits a connection-level error can report it back
    /// via [`Pool::report_failed`].
    pub fn pick(&self) -> (usize, Connection) {
        let slots = self.slots.lock().expect("pool lock poisoned");
        let index = self.next.fetch_add(1, Ordering::Relaxed) % slots.len();
        (index, slots[index].clone())
    }

    /// Reports that the connection at `index` failed; the background
    /// worker reconnects that slot without blocking other callers.
    pub fn report_failed(&self, index: usize) {
        self.worker.report_failed(index);
    }

    /// Evicts entries touched by a `SCHEMA_CHANGE`, on the cache shared by
    /// every connection in the pool.
    pub(crate) fn invalidate_schema(&self, keyspace: &str, table: Option<&str>) {
        self.prepared.invalidate_schema(keyspace, table);
    }
}
