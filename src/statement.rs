//! Statement kinds and bound value lists shared by QUERY, PREPARE, EXECUTE,
//! and BATCH bodies.
use bytes::BytesMut;

use crate::encode::{Encode, Encoded};
use crate::error::Error;
use crate::protocol::codec::{put_short, put_string};
use crate::protocol::types::hint_type_id;

/// Query consistency levels, id-for-id the CQL v4 `[consistency]` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum Consistency {
    Any = 0x0000,
    One = 0x0001,
    Two = 0x0002,
    Three = 0x0003,
    Quorum = 0x0004,
    All = 0x0005,
    LocalQuorum = 0x0006,
    EachQuorum = 0x0007,
    Serial = 0x0008,
    LocalSerial = 0x0009,
    #[default]
    LocalOne = 0x000A,
}

/// The bound-value portion of a request: absent, positional, or named.
///
/// Named values are only legal on a single QUERY/EXECUTE, never inside a
/// BATCH — callers building a batch statement
/// must reject `Named` before assembling the frame.
#[derive(Debug, Clone, Default)]
pub enum QueryValues {
    #[default]
    None,
    Positional(Vec<Encoded>),
    Named(Vec<(String, Encoded)>),
}

impl QueryValues {
    pub fn positional(values: Vec<Encoded>) -> QueryValues {
        if values.is_empty() { QueryValues::None } else { QueryValues::Positional(values) }
    }

    pub fn named(values: Vec<(String, Encoded)>) -> QueryValues {
        if values.is_empty() { QueryValues::None } else { QueryValues::Named(values) }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, QueryValues::None)
    }

    pub fn is_named(&self) -> bool {
        matches!(self, QueryValues::Named(_))
    }

    pub(crate) fn named_flag(&self) -> bool {
        self.is_named()
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        match self {
            QueryValues::None => {}
            QueryValues::Positional(values) => {
                put_short(buf, values.len() as u16);
                for v in values {
                    v.encode(buf);
                }
            }
            QueryValues::Named(values) => {
                put_short(buf, values.len() as u16);
                for (name, v) in values {
                    put_string(buf, name);
                    v.encode(buf);
                }
            }
        }
    }
}

/// A builder for a single statement's bound values, accumulating into a
/// growable `Vec` since CQL places no protocol limit on bind count.
#[derive(Debug, Clone, Default)]
pub struct Binder {
    positional: Vec<Encoded>,
    named: Vec<(String, Encoded)>,
}

impl Binder {
    pub fn new() -> Binder {
        Binder::default()
    }

    pub fn bind(mut self, value: impl Encode) -> Binder {
        self.positional.push(value.encode_value());
        self
    }

    pub fn bind_named(mut self, name: impl Into<String>, value: impl Encode) -> Binder {
        self.named.push((name.into(), value.encode_value()));
        self
    }

    /// Binds `value` tagged with an explicit CQL type name (`"int"`,
    /// `"bigint"`, ...) rather than the type its `Encode` impl would
    /// otherwise pick. A Simple statement carries no column-type metadata
    /// for the server to check bound values against, so a literal whose
    /// Rust type is ambiguous on the wire (an `i64` meant as `bigint`, not
    /// `counter` or `timestamp`) needs the hint to disambiguate.
    pub fn bind_hint(mut self, hint: &str, value: impl Encode) -> Result<Binder, Error> {
        let type_id = hint_type_id(hint).ok_or_else(|| Error::invalid_arguments(format!("unknown CQL type hint {hint:?}")))?;
        let mut encoded = value.encode_value();
        encoded.type_id = type_id;
        self.positional.push(encoded);
        Ok(self)
    }

    pub fn into_values(self) -> QueryValues {
        if !self.named.is_empty() {
            QueryValues::named(self.named)
        } else {
            QueryValues::positional(self.positional)
        }
    }
}

/// A CQL statement ready to send: either a literal query string, or a
/// previously prepared statement referenced by its server-assigned id.
#[derive(Debug, Clone)]
pub enum Statement {
    Simple { cql: String, values: QueryValues },
    Prepared { id: bytes::Bytes, cql: String, values: QueryValues },
}

impl Statement {
    pub fn simple(cql: impl Into<String>) -> Statement {
        Statement::Simple { cql: cql.into(), values: QueryValues::None }
    }

    pub fn simple_with(cql: impl Into<String>, values: QueryValues) -> Statement {
        Statement::Simple { cql: cql.into(), values }
    }

    pub fn prepared(id: bytes::Bytes, cql: impl Into<String>, values: QueryValues) -> Statement {
        Statement::Prepared { id, cql: cql.into(), values }
    }

    pub fn cql(&self) -> &str {
        match self {
            Statement::Simple { cql, .. } => cql,
            Statement::Prepared { cql, .. } => cql,
        }
    }

    pub fn values(&self) -> &QueryValues {
        match self {
            Statement::Simple { values, .. } => values,
            Statement::Prepared { values, .. } => values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_binder_yields_none() {
        assert!(matches!(Binder::new().into_values(), QueryValues::None));
    }

    #[test]
    fn mixed_binder_prefers_named() {
        let values = Binder::new().bind_named("a", 1i32).into_values();
        assert!(matches!(values, QueryValues::Named(_)));
    }

    #[test]
    fn positional_binder_preserves_order() {
        let values = Binder::new().bind(1i32).bind(2i32).into_values();
        match values {
            QueryValues::Positional(v) => assert_eq!(v.len(), 2),
            _ => panic!("expected positional"),
        }
    }

    #[test]
    fn bind_hint_tags_the_declared_type() {
        use crate::protocol::types::CqlType;
        let values = Binder::new().bind_hint("int", 1i32).unwrap().into_values();
        match values {
            QueryValues::Positional(v) => assert_eq!(v[0].type_id, CqlType::ID_INT),
            _ => panic!("expected positional"),
        }
    }

    #[test]
    fn bind_hint_rejects_unknown_type_name() {
        assert!(Binder::new().bind_hint("not-a-type", 1i32).is_err());
    }
}
