//! CQL Driver Core
//!
//! Implements the wire-protocol codec, per-node connection state machine,
//! and cluster layer for a CQL native protocol v4 compatible server
//! (Apache Cassandra and compatible databases). Does not provide a
//! higher-level query-builder API; callers drive [`Statement`]/[`Batch`]
//! values directly against a [`Connection`], a [`pool::Pool`], or a
//! [`cluster::Cluster`].
//!
//! # Examples
//!
//! Single connection:
//!
//! ```no_run
//! use cqldriver::{Connection, ConnectionConfig, Statement};
//! use cqldriver::statement::Binder;
//!
//! # async fn app() -> cqldriver::Result<()> {
//! let conn = Connection::connect(ConnectionConfig::new("127.0.0.1", 9042)).await?;
//!
//! let values = Binder::new().bind(1i32).into_values();
//! let stmt = Statement::simple_with("select name from ks.users where id = ?", values);
//! let result = conn.execute_statement(&stmt, &Default::default()).await?;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```
//!
//! Clustered, with failover:
//!
//! ```no_run
//! use cqldriver::cluster::{Cluster, ClusterConfig, LoadBalancing};
//! use cqldriver::Statement;
//!
//! # async fn app() -> cqldriver::Result<()> {
//! let cluster = Cluster::connect(
//!     ClusterConfig::new().node("10.0.0.1:9042").node("10.0.0.2:9042").load_balancing(LoadBalancing::Priority),
//! )
//! .await?;
//!
//! let pool = cluster.checkout().await?;
//! let (_, conn) = pool.pick();
//! let stmt = Statement::simple("select release_version from system.local");
//! let _ = conn.execute_statement(&stmt, &Default::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod batch;
mod column;
pub mod common;
pub mod compression;
pub mod connection;
pub mod decode;
pub mod encode;
mod error;
mod net;
pub mod page;
mod prepared;
pub mod protocol;
pub mod row;
pub mod statement;

pub mod cluster;
pub mod pool;

pub use batch::{Batch, BatchKind};
pub use cluster::{Cluster, ClusterConfig};
pub use connection::{Connection, ConnectionConfig};
pub use decode::{Decode, DecodeError};
pub use encode::{Encode, Encoded};
pub use error::{ConnectionError, Error, MalformedValue, ProtocolViolation, Result};
pub use page::{Page, PageStream};
pub use pool::{Pool, PoolConfig};
pub use protocol::request::QueryOptions;
pub use protocol::response::{Event, QueryResult, ServerError};
pub use row::{FromRow, Row};
pub use statement::{Binder, Consistency, QueryValues, Statement};
