//! Request-direction opcodes and message builders.
//!
//! Builders take a `BytesMut` scratch buffer and a `&Statement`/`&Batch`
//! and append the opcode body; the caller (`connection/actor.rs`) wraps the
//! result in a frame via `protocol::frame::Frame::encode_request`.
use bytes::BytesMut;
use std::collections::HashMap;

use crate::batch::Batch;
use crate::protocol::codec::{put_int, put_long_string, put_short, put_string_list, put_string_map};
use crate::statement::{Consistency, QueryValues, Statement};

/// Request-direction opcodes, per the CQL v4 opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Startup = 0x01,
    Options = 0x05,
    Query = 0x07,
    Prepare = 0x09,
    Execute = 0x0A,
    Register = 0x0B,
    Batch = 0x0D,
    AuthResponse = 0x0F,
}

impl OpCode {
    /// STARTUP and OPTIONS precede compression negotiation and must never be
    /// compressed, even once a compressor is configured.
    pub fn is_compressible(opcode: u8) -> bool {
        !matches!(opcode, x if x == OpCode::Startup as u8 || x == OpCode::Options as u8)
    }
}

/// Query option flags, set on the byte preceding a QUERY,
/// EXECUTE, or BATCH's per-statement value block.
pub mod query_flags {
    pub const VALUES: u8 = 0x01;
    pub const SKIP_METADATA: u8 = 0x02;
    pub const PAGE_SIZE: u8 = 0x04;
    pub const WITH_PAGING_STATE: u8 = 0x08;
    pub const WITH_SERIAL_CONSISTENCY: u8 = 0x10;
    pub const WITH_DEFAULT_TIMESTAMP: u8 = 0x20;
    pub const WITH_NAMES_FOR_VALUES: u8 = 0x40;
}

/// `STARTUP {CQL_VERSION, [COMPRESSION]}`.
pub fn startup_body(compression: Option<&str>) -> BytesMut {
    let mut options = HashMap::new();
    options.insert("CQL_VERSION".to_string(), "3.4.4".to_string());
    if let Some(algo) = compression {
        options.insert("COMPRESSION".to_string(), algo.to_string());
    }
    let mut buf = BytesMut::new();
    put_string_map(&mut buf, &options);
    buf
}

/// `AUTH_RESPONSE {[bytes] token}`.
pub fn auth_response_body(token: &[u8]) -> BytesMut {
    let mut buf = BytesMut::new();
    put_int(&mut buf, token.len() as i32);
    buf.extend_from_slice(token);
    buf
}

/// `OPTIONS` has an empty body.
pub fn options_body() -> BytesMut {
    BytesMut::new()
}

/// `REGISTER {[string list] event types}`.
pub fn register_body(event_types: &[&str]) -> BytesMut {
    let mut buf = BytesMut::new();
    put_string_list(&mut buf, event_types);
    buf
}

/// `QUERY {[long string] query, <query_parameters>}`.
pub fn query_body(cql: &str, opts: &QueryOptions, values: &QueryValues) -> BytesMut {
    let mut buf = BytesMut::new();
    put_long_string(&mut buf, cql);
    opts.encode(&mut buf, values);
    buf
}

/// `PREPARE {[long string] query}`.
pub fn prepare_body(cql: &str) -> BytesMut {
    let mut buf = BytesMut::new();
    put_long_string(&mut buf, cql);
    buf
}

/// `EXECUTE {[short bytes] id, <query_parameters>}`.
pub fn execute_body(prepared_id: &[u8], opts: &QueryOptions, values: &QueryValues) -> BytesMut {
    let mut buf = BytesMut::new();
    crate::protocol::codec::put_short_bytes(&mut buf, prepared_id);
    opts.encode(&mut buf, values);
    buf
}

/// Per-request consistency and paging knobs shared by QUERY, EXECUTE, and
/// each BATCH statement.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub consistency: Consistency,
    pub skip_metadata: bool,
    pub page_size: Option<i32>,
    pub paging_state: Option<bytes::Bytes>,
    pub serial_consistency: Option<Consistency>,
    pub default_timestamp: Option<i64>,
}

impl QueryOptions {
    fn encode(&self, buf: &mut BytesMut, values: &QueryValues) {
        put_short(buf, self.consistency as u16);
        let mut flags = 0u8;
        if !values.is_empty() {
            flags |= query_flags::VALUES;
        }
        if values.is_named() {
            flags |= query_flags::WITH_NAMES_FOR_VALUES;
        }
        if self.skip_metadata {
            flags |= query_flags::SKIP_METADATA;
        }
        if self.page_size.is_some() {
            flags |= query_flags::PAGE_SIZE;
        }
        if self.paging_state.is_some() {
            flags |= query_flags::WITH_PAGING_STATE;
        }
        if self.serial_consistency.is_some() {
            flags |= query_flags::WITH_SERIAL_CONSISTENCY;
        }
        if self.default_timestamp.is_some() {
            flags |= query_flags::WITH_DEFAULT_TIMESTAMP;
        }
        buf.extend_from_slice(&[flags]);
        values.encode(buf);
        if let Some(n) = self.page_size {
            put_int(buf, n);
        }
        if let Some(ps) = &self.paging_state {
            crate::protocol::codec::put_bytes_opt(buf, Some(ps));
        }
        if let Some(sc) = self.serial_consistency {
            put_short(buf, sc as u16);
        }
        if let Some(ts) = self.default_timestamp {
            crate::protocol::codec::put_long(buf, ts);
        }
    }
}

/// `BATCH {type, n, n * <query_or_id><values>, consistency, <flags>}`.
pub fn batch_body(batch: &Batch) -> BytesMut {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[batch.kind as u8]);
    put_short(&mut buf, batch.statements.len() as u16);
    for stmt in &batch.statements {
        stmt.encode(&mut buf);
    }
    put_short(&mut buf, batch.consistency as u16);
    let mut flags = 0u8;
    if batch.serial_consistency.is_some() {
        flags |= query_flags::WITH_SERIAL_CONSISTENCY;
    }
    if batch.default_timestamp.is_some() {
        flags |= query_flags::WITH_DEFAULT_TIMESTAMP;
    }
    buf.extend_from_slice(&[flags]);
    if let Some(sc) = batch.serial_consistency {
        put_short(&mut buf, sc as u16);
    }
    if let Some(ts) = batch.default_timestamp {
        crate::protocol::codec::put_long(&mut buf, ts);
    }
    buf
}

/// Assembles the full body for a prepared or simple `Statement`, dispatching
/// to `query_body`/`execute_body` based on whether it carries a prepared id.
pub fn statement_body(stmt: &Statement, opts: &QueryOptions) -> (OpCode, BytesMut) {
    match stmt {
        Statement::Simple { cql, values } => (OpCode::Query, query_body(cql, opts, values)),
        Statement::Prepared { id, values, .. } => (OpCode::Execute, execute_body(id, opts, values)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_is_never_compressible() {
        assert!(!OpCode::is_compressible(OpCode::Startup as u8));
        assert!(!OpCode::is_compressible(OpCode::Options as u8));
        assert!(OpCode::is_compressible(OpCode::Query as u8));
    }

    #[test]
    fn startup_body_includes_cql_version() {
        let body = startup_body(None);
        assert!(!body.is_empty());
    }
}
