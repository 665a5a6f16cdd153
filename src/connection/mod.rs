//! A single-node CQL connection: handshake, request/response multiplexing,
//! and the prepared-statement cache layered on top.
mod actor;
pub mod config;
mod handshake;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;

pub use config::ConnectionConfig;

use crate::batch::Batch;
use crate::error::{Error, ProtocolViolation};
use crate::net::Socket;
use crate::page::{FetchFut, Page, PageStream};
use crate::prepared::{PollResult, PreparedCache, PreparedStatement};
use crate::protocol::{request, response};
use crate::statement::Statement;

/// One TCP connection to one node, past the handshake and ready to serve
/// concurrent requests. Cheap to clone: the actor and the prepared cache are
/// both already reference-counted internally, so a clone shares the same
/// underlying socket.
#[derive(Clone)]
pub struct Connection {
    actor: actor::ActorHandle,
    prepared: Arc<PreparedCache>,
    config: ConnectionConfig,
}

impl Connection {
    /// Connects, performs the handshake, and spawns the multiplexing actor,
    /// with a prepared cache private to this connection.
    ///
    /// Only useful for a standalone connection outside a [`Pool`](crate::pool::Pool);
    /// a pooled connection shares one cache across all its siblings, process-wide
    /// for a given cluster endpoint, via [`Connection::connect_shared`].
    pub async fn connect(config: ConnectionConfig) -> Result<Connection, Error> {
        let capacity = config.prepared_cache_capacity;
        Connection::connect_shared(config, Arc::new(PreparedCache::new(capacity))).await
    }

    /// Connects and joins an existing, shared prepared cache.
    pub(crate) async fn connect_shared(config: ConnectionConfig, prepared: Arc<PreparedCache>) -> Result<Connection, Error> {
        let mut socket = Socket::connect(&config.host, config.port, config.connect_timeout)
            .await
            .map_err(Error::connection)?;
        let compressor = handshake::perform(&mut socket, &config).await?;
        let actor = actor::spawn(socket, compressor, config.request_timeout);
        Ok(Connection { actor, prepared, config })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// `OPTIONS` / `SUPPORTED`: the server's advertised CQL versions and
    /// compression algorithms.
    pub async fn options(&self) -> Result<HashMap<String, Vec<String>>, Error> {
        let (header, body) = self.actor.request(request::OpCode::Options as u8, request::options_body()).await?;
        match response::OpCode::from_byte(header.opcode)? {
            response::OpCode::Supported => Ok(response::decode_supported(body)?),
            response::OpCode::Error => Err(response::ServerError::decode(body)?.into()),
            _ => Err(ProtocolViolation::UnexpectedMessage { found: header.opcode, phase: "OPTIONS" }.into()),
        }
    }

    /// Prepares `cql`, or returns the cached statement if another caller (or
    /// an earlier call) already has. Concurrent callers for the same text
    /// share one in-flight `PREPARE`.
    pub async fn prepare(&self, cql: &str) -> Result<PreparedStatement, Error> {
        loop {
            match self.prepared.poll(cql) {
                PollResult::Ready(stmt) => return Ok(stmt),
                PollResult::InFlight(notify) => notify.notified().await,
                PollResult::Lead(_notify) => {
                    return match self.do_prepare(cql).await {
                        Ok(stmt) => {
                            self.prepared.complete(cql, stmt.clone());
                            Ok(stmt)
                        }
                        Err(e) => {
                            self.prepared.abandon(cql);
                            Err(e)
                        }
                    };
                }
            }
        }
    }

    async fn do_prepare(&self, cql: &str) -> Result<PreparedStatement, Error> {
        match self.roundtrip(request::OpCode::Prepare, request::prepare_body(cql)).await? {
            response::QueryResult::Prepared(p) => Ok(PreparedStatement {
                id: p.id,
                bind_metadata: Arc::new(p.metadata.columns),
                result_metadata: Arc::new(p.result_metadata.columns),
            }),
            _ => Err(ProtocolViolation::UnexpectedMessage { found: response::OpCode::Result as u8, phase: "PREPARE" }
                .into()),
        }
    }

    /// Sends a `QUERY` or `EXECUTE`, re-preparing and retrying once if the
    /// server reports `UNPREPARED` for a statement this connection had
    /// cached.
    pub async fn execute_statement(
        &self,
        stmt: &Statement,
        opts: &request::QueryOptions,
    ) -> Result<response::QueryResult, Error> {
        if let Statement::Simple { values, .. } = stmt {
            if values.is_named() {
                return Err(Error::invalid_arguments("named values are not allowed on a Simple statement"));
            }
        }
        let (opcode, body) = request::statement_body(stmt, opts);
        match self.roundtrip(opcode, body).await {
            Err(Error::Server(e)) if e.is_unprepared() => {
                let Statement::Prepared { id, cql, values } = stmt else {
                    return Err(Error::Server(e));
                };
                self.prepared.invalidate_id(id);
                let fresh = self.prepare(cql).await?;
                let retried = Statement::prepared(fresh.id, cql.clone(), values.clone());
                let (opcode, body) = request::statement_body(&retried, opts);
                self.roundtrip(opcode, body).await
            }
            other => other,
        }
    }

    /// Sends a `BATCH`. Unlike single statements, an `UNPREPARED` id inside
    /// a batch is not retried: `BatchStatement::Prepared` only carries the
    /// id and bound values, not the original CQL text needed to re-prepare.
    pub async fn execute_batch(&self, batch: &Batch) -> Result<response::QueryResult, Error> {
        self.roundtrip(request::OpCode::Batch, request::batch_body(batch)).await
    }

    /// Runs `stmt` as a lazily-fetched stream of pages, threading the
    /// previous page's `paging_state` into the next pull. A `Simple`
    /// statement is prepared once on the first pull and the resulting id
    /// reused for every later page — re-preparing per page would risk the
    /// server handing back a `paging_state` tied to a bind metadata the next
    /// `PREPARE` doesn't reproduce.
    pub fn execute_stream(&self, stmt: Statement, opts: request::QueryOptions) -> PageStream<impl FnMut(Option<Bytes>) -> FetchFut + Send> {
        let conn = self.clone();
        let resolved: Arc<Mutex<Option<Statement>>> = Arc::new(Mutex::new(match &stmt {
            Statement::Prepared { .. } => Some(stmt.clone()),
            Statement::Simple { .. } => None,
        }));

        PageStream::new(move |cursor: Option<Bytes>| {
            let conn = conn.clone();
            let resolved = resolved.clone();
            let original = stmt.clone();
            let mut opts = opts.clone();
            opts.paging_state = cursor;

            Box::pin(async move {
                let cached = resolved.lock().expect("prepared-statement cache lock poisoned").clone();
                let stmt = match cached {
                    Some(stmt) => stmt,
                    None => {
                        let prepared = conn.prepare(original.cql()).await?;
                        let stmt = Statement::prepared(prepared.id, original.cql(), original.values().clone());
                        *resolved.lock().expect("prepared-statement cache lock poisoned") = Some(stmt.clone());
                        stmt
                    }
                };
                match conn.execute_statement(&stmt, &opts).await? {
                    response::QueryResult::Rows(rows) => Ok(Page::from_rows_result(rows)),
                    _ => Err(ProtocolViolation::UnexpectedMessage { found: response::OpCode::Result as u8, phase: "paged query" }
                        .into()),
                }
            }) as FetchFut
        })
    }

    /// `REGISTER`: subscribes this connection to the named event types. Only
    /// the control connection (`cluster/control.rs`) calls this.
    pub(crate) async fn register(&self, event_types: &[&str]) -> Result<(), Error> {
        let (header, body) =
            self.actor.request(request::OpCode::Register as u8, request::register_body(event_types)).await?;
        match response::OpCode::from_byte(header.opcode)? {
            response::OpCode::Ready => Ok(()),
            response::OpCode::Error => Err(response::ServerError::decode(body)?.into()),
            _ => Err(ProtocolViolation::UnexpectedMessage { found: header.opcode, phase: "REGISTER" }.into()),
        }
    }

    /// Takes ownership of this connection's pushed-`EVENT` stream. Returns
    /// `None` if already taken.
    pub(crate) fn take_events(&self) -> Option<mpsc::UnboundedReceiver<response::Event>> {
        self.actor.take_events()
    }

    /// Evicts this connection's cached prepared statements touched by a
    /// `SCHEMA_CHANGE`.
    pub(crate) fn invalidate_schema(&self, keyspace: &str, table: Option<&str>) {
        self.prepared.invalidate_schema(keyspace, table);
    }

    async fn roundtrip(&self, opcode: request::OpCode, body: BytesMut) -> Result<response::QueryResult, Error> {
        let (header, body) = self.actor.request(opcode as u8, body).await?;
        match response::OpCode::from_byte(header.opcode)? {
            response::OpCode::Result => Ok(response::QueryResult::decode(body)?),
            response::OpCode::Error => Err(response::ServerError::decode(body)?.into()),
            _ => Err(ProtocolViolation::UnexpectedMessage { found: header.opcode, phase: "statement execution" }
                .into()),
        }
    }
}
