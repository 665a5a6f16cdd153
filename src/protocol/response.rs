//! Response-direction opcodes and message parsers.
//!
//! Error codes and body layout follow the CQL v4 ERROR/RESULT message
//! formats, read off a `bytes::Bytes` cursor via the `protocol::codec`
//! get-helpers.
use bytes::Bytes;
use std::collections::HashMap;

use crate::error::{MalformedValue, ProtocolViolation};
use crate::protocol::codec::{
    get_bytes_opt, get_int, get_long, get_short, get_short_bytes, get_string, get_string_list, get_string_map,
    get_string_multimap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Error = 0x00,
    Ready = 0x02,
    Authenticate = 0x03,
    Supported = 0x06,
    Result = 0x08,
    Event = 0x0C,
    AuthChallenge = 0x0E,
    AuthSuccess = 0x10,
}

impl OpCode {
    pub fn from_byte(b: u8) -> Result<OpCode, ProtocolViolation> {
        Ok(match b {
            0x00 => OpCode::Error,
            0x02 => OpCode::Ready,
            0x03 => OpCode::Authenticate,
            0x06 => OpCode::Supported,
            0x08 => OpCode::Result,
            0x0C => OpCode::Event,
            0x0E => OpCode::AuthChallenge,
            0x10 => OpCode::AuthSuccess,
            other => return Err(ProtocolViolation::UnknownOpcode(other)),
        })
    }
}

/// A decoded `ERROR` response, and what [`crate::Error::Server`] wraps.
///
/// Named codes follow the subset this driver actually branches on; any
/// other code still decodes fine and falls back to the generic display.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: {message} ({code:#06x})", Self::name(self.code))]
pub struct ServerError {
    pub code: u32,
    pub message: String,
}

impl ServerError {
    pub const UNAVAILABLE: u32 = 0x1000;
    pub const WRITE_TIMEOUT: u32 = 0x1100;
    pub const READ_TIMEOUT: u32 = 0x1200;
    pub const INVALID: u32 = 0x2400;
    pub const UNPREPARED: u32 = 0x2500;

    fn name(code: u32) -> &'static str {
        match code {
            Self::UNAVAILABLE => "unavailable",
            Self::WRITE_TIMEOUT => "write_timeout",
            Self::READ_TIMEOUT => "read_timeout",
            Self::INVALID => "invalid",
            Self::UNPREPARED => "unprepared",
            _ => "server error",
        }
    }

    pub fn is_unprepared(&self) -> bool {
        self.code == Self::UNPREPARED
    }

    pub(crate) fn decode(mut body: Bytes) -> Result<ServerError, MalformedValue> {
        let code = get_int(&mut body).map_err(|_| MalformedValue::LengthMismatch { declared: 4, actual: 0 })? as u32;
        let message = get_string(&mut body)?;
        Ok(ServerError { code, message })
    }
}

/// `AUTHENTICATE {[string] authenticator class name}`.
pub fn decode_authenticate(mut body: Bytes) -> Result<String, MalformedValue> {
    get_string(&mut body)
}

/// `SUPPORTED {[string multimap]}`.
pub fn decode_supported(mut body: Bytes) -> Result<HashMap<String, Vec<String>>, MalformedValue> {
    get_string_multimap(&mut body)
}

/// `AUTH_CHALLENGE {[bytes] token}`.
pub fn decode_auth_challenge(mut body: Bytes) -> Result<Option<Bytes>, MalformedValue> {
    get_bytes_opt(&mut body)
}

/// `AUTH_SUCCESS {[bytes] token}`.
pub fn decode_auth_success(mut body: Bytes) -> Result<Option<Bytes>, MalformedValue> {
    get_bytes_opt(&mut body)
}

/// RESULT kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ResultKind {
    Void = 0x0001,
    Rows = 0x0002,
    SetKeyspace = 0x0003,
    Prepared = 0x0004,
    SchemaChange = 0x0005,
}

impl ResultKind {
    fn from_u32(v: u32) -> Result<ResultKind, ProtocolViolation> {
        Ok(match v {
            0x0001 => ResultKind::Void,
            0x0002 => ResultKind::Rows,
            0x0003 => ResultKind::SetKeyspace,
            0x0004 => ResultKind::Prepared,
            0x0005 => ResultKind::SchemaChange,
            _ => return Err(ProtocolViolation::UnexpectedMessage { found: v as u8, phase: "RESULT kind" }),
        })
    }
}

/// Per-column metadata carried by a `Rows` or `Prepared` RESULT.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub keyspace: String,
    pub table: String,
    pub name: String,
    pub type_id: u16,
}

/// Result-set metadata flags (the subset this driver acts on).
pub mod rows_flags {
    pub const GLOBAL_TABLES_SPEC: u32 = 0x0001;
    pub const HAS_MORE_PAGES: u32 = 0x0002;
    pub const NO_METADATA: u32 = 0x0004;
}

#[derive(Debug, Clone)]
pub struct RowsMetadata {
    pub columns: Vec<ColumnSpec>,
    pub paging_state: Option<Bytes>,
}

#[derive(Debug, Clone)]
pub struct RowsResult {
    pub metadata: RowsMetadata,
    pub rows: Vec<Vec<Option<Bytes>>>,
}

#[derive(Debug, Clone)]
pub struct PreparedResult {
    pub id: Bytes,
    pub metadata: RowsMetadata,
    pub result_metadata: RowsMetadata,
}

#[derive(Debug, Clone)]
pub struct SchemaChangeResult {
    pub change_type: String,
    pub target: String,
    pub keyspace: String,
    pub object: Option<String>,
}

#[derive(Debug, Clone)]
pub enum QueryResult {
    Void,
    Rows(RowsResult),
    SetKeyspace(String),
    Prepared(PreparedResult),
    SchemaChange(SchemaChangeResult),
}

impl QueryResult {
    pub(crate) fn decode(mut body: Bytes) -> Result<QueryResult, crate::error::Error> {
        let kind = ResultKind::from_u32(get_int(&mut body)? as u32)?;
        Ok(match kind {
            ResultKind::Void => QueryResult::Void,
            ResultKind::SetKeyspace => QueryResult::SetKeyspace(get_string(&mut body)?),
            ResultKind::Rows => QueryResult::Rows(decode_rows(body)?),
            ResultKind::Prepared => QueryResult::Prepared(decode_prepared(body)?),
            ResultKind::SchemaChange => QueryResult::SchemaChange(decode_schema_change(&mut body)?),
        })
    }
}

fn decode_rows_metadata(body: &mut Bytes) -> Result<RowsMetadata, crate::error::Error> {
    let flags = get_int(body)? as u32;
    let column_count = get_int(body)?;
    if column_count < 0 {
        return Err(MalformedValue::NegativeCount(column_count).into());
    }
    let paging_state = if flags & rows_flags::HAS_MORE_PAGES != 0 { get_bytes_opt(body)? } else { None };
    let mut columns = Vec::with_capacity(column_count as usize);
    if flags & rows_flags::NO_METADATA == 0 {
        let (global_ks, global_table) = if flags & rows_flags::GLOBAL_TABLES_SPEC != 0 {
            (Some(get_string(body)?), Some(get_string(body)?))
        } else {
            (None, None)
        };
        for _ in 0..column_count {
            let (keyspace, table) = match (&global_ks, &global_table) {
                (Some(ks), Some(tbl)) => (ks.clone(), tbl.clone()),
                _ => (get_string(body)?, get_string(body)?),
            };
            let name = get_string(body)?;
            let type_id = get_short(body)?;
            skip_option_payload(body, type_id)?;
            columns.push(ColumnSpec { keyspace, table, name, type_id });
        }
    }
    Ok(RowsMetadata { columns, paging_state })
}

/// Parametric type options (list/set/map/udt/tuple) carry extra payload
/// after the 2-byte id that column metadata doesn't otherwise need; skip it
/// so the cursor lands on the next column.
fn skip_option_payload(body: &mut Bytes, type_id: u16) -> Result<(), crate::error::Error> {
    use crate::protocol::types::CqlType;
    match type_id {
        CqlType::ID_LIST | CqlType::ID_SET => {
            let inner = get_short(body)?;
            skip_option_payload(body, inner)?;
        }
        CqlType::ID_MAP => {
            let key = get_short(body)?;
            skip_option_payload(body, key)?;
            let value = get_short(body)?;
            skip_option_payload(body, value)?;
        }
        CqlType::ID_TUPLE => {
            let n = get_short(body)?;
            for _ in 0..n {
                let inner = get_short(body)?;
                skip_option_payload(body, inner)?;
            }
        }
        CqlType::ID_UDT => {
            let _keyspace = get_string(body)?;
            let _name = get_string(body)?;
            let n = get_short(body)?;
            for _ in 0..n {
                let _field = get_string(body)?;
                let inner = get_short(body)?;
                skip_option_payload(body, inner)?;
            }
        }
        CqlType::ID_CUSTOM => {
            let _class = get_string(body)?;
        }
        _ => {}
    }
    Ok(())
}

fn decode_rows(mut body: Bytes) -> Result<RowsResult, crate::error::Error> {
    let metadata = decode_rows_metadata(&mut body)?;
    let row_count = get_int(&mut body)?;
    if row_count < 0 {
        return Err(MalformedValue::NegativeCount(row_count).into());
    }
    let mut rows = Vec::with_capacity(row_count as usize);
    for _ in 0..row_count {
        let mut row = Vec::with_capacity(metadata.columns.len());
        for _ in &metadata.columns {
            row.push(get_bytes_opt(&mut body)?);
        }
        rows.push(row);
    }
    Ok(RowsResult { metadata, rows })
}

fn decode_prepared(mut body: Bytes) -> Result<PreparedResult, crate::error::Error> {
    let id = get_short_bytes(&mut body)?;
    let metadata = decode_rows_metadata(&mut body)?;
    let result_metadata = decode_rows_metadata(&mut body)?;
    Ok(PreparedResult { id, metadata, result_metadata })
}

fn decode_schema_change(body: &mut Bytes) -> Result<SchemaChangeResult, crate::error::Error> {
    let change_type = get_string(body)?;
    let target = get_string(body)?;
    let keyspace = get_string(body)?;
    let object = match target.as_str() {
        "KEYSPACE" => None,
        _ => Some(get_string(body)?),
    };
    Ok(SchemaChangeResult { change_type, target, keyspace, object })
}

/// A topology/status/schema `EVENT` pushed on stream id `-1`.
#[derive(Debug, Clone)]
pub enum Event {
    TopologyChange { change_type: String, address: std::net::SocketAddr },
    StatusChange { change_type: String, address: std::net::SocketAddr },
    SchemaChange(SchemaChangeResult),
}

impl Event {
    pub(crate) fn decode(mut body: Bytes) -> Result<Event, crate::error::Error> {
        let event_type = get_string(&mut body)?;
        Ok(match event_type.as_str() {
            "TOPOLOGY_CHANGE" => {
                let change_type = get_string(&mut body)?;
                let address = crate::protocol::codec::get_inet(&mut body)?;
                Event::TopologyChange { change_type, address }
            }
            "STATUS_CHANGE" => {
                let change_type = get_string(&mut body)?;
                let address = crate::protocol::codec::get_inet(&mut body)?;
                Event::StatusChange { change_type, address }
            }
            "SCHEMA_CHANGE" => Event::SchemaChange(decode_schema_change(&mut body)?),
            _unknown => {
                return Err(ProtocolViolation::UnexpectedMessage { found: 0x0C, phase: "unknown EVENT type" }.into());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    #[test]
    fn server_error_names_known_codes() {
        let mut buf = BytesMut::new();
        buf.put_i32(ServerError::UNPREPARED as i32);
        crate::protocol::codec::put_string(&mut buf, "no such prepared statement");
        let err = ServerError::decode(buf.freeze()).unwrap();
        assert!(err.is_unprepared());
        assert_eq!(format!("{err}"), "unprepared: no such prepared statement (0x2500)");
    }

    #[test]
    fn server_error_unknown_code_falls_back() {
        let mut buf = BytesMut::new();
        buf.put_i32(0x9999);
        crate::protocol::codec::put_string(&mut buf, "mystery");
        let err = ServerError::decode(buf.freeze()).unwrap();
        assert!(!err.is_unprepared());
        assert_eq!(format!("{err}"), "server error: mystery (0x9999)");
    }

    #[test]
    fn void_result_decodes() {
        let mut buf = BytesMut::new();
        buf.put_i32(ResultKind::Void as i32);
        let result = QueryResult::decode(buf.freeze()).unwrap();
        assert!(matches!(result, QueryResult::Void));
    }
}
