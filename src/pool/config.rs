//! Per-node pool sizing.
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::connection::{Connection, ConnectionConfig};

pub(crate) type AfterConnect = Arc<dyn Fn(&Connection) + Send + Sync>;

#[derive(Clone)]
pub struct PoolConfig {
    pub(crate) connection: ConnectionConfig,
    pub(crate) size: NonZeroUsize,
    pub(crate) after_connect: Option<AfterConnect>,
}

impl std::fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConfig")
            .field("connection", &self.connection)
            .field("size", &self.size)
            .field("after_connect", &self.after_connect.is_some())
            .finish()
    }
}

impl PoolConfig {
    pub fn new(connection: ConnectionConfig) -> PoolConfig {
        PoolConfig { connection, size: NonZeroUsize::new(1).expect("1 is nonzero"), after_connect: None }
    }

    pub fn size(mut self, size: NonZeroUsize) -> PoolConfig {
        self.size = size;
        self
    }

    pub(crate) fn after_connect(mut self, f: AfterConnect) -> PoolConfig {
        self.after_connect = Some(f);
        self
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }
}
