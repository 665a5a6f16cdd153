//! BATCH assembly: an ordered list of simple or prepared
//! statements sent and applied atomically (LOGGED) or not (UNLOGGED), plus
//! COUNTER batches restricted to counter mutations.
use bytes::BytesMut;

use crate::encode::Encoded;
use crate::error::Error;
use crate::protocol::codec::{put_long_string, put_short, put_short_bytes};
use crate::statement::{Consistency, QueryValues, Statement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BatchKind {
    Logged = 0x00,
    Unlogged = 0x01,
    Counter = 0x02,
}

/// One statement inside a batch: either a literal query or a prepared id,
/// always with positional-only values.
#[derive(Debug, Clone)]
pub(crate) enum BatchStatement {
    Query { cql: String, values: Vec<Encoded> },
    Prepared { id: bytes::Bytes, values: Vec<Encoded> },
}

impl BatchStatement {
    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        match self {
            BatchStatement::Query { cql, values } => {
                buf.extend_from_slice(&[0u8]);
                put_long_string(buf, cql);
                encode_values(buf, values);
            }
            BatchStatement::Prepared { id, values } => {
                buf.extend_from_slice(&[1u8]);
                put_short_bytes(buf, id);
                encode_values(buf, values);
            }
        }
    }
}

fn encode_values(buf: &mut BytesMut, values: &[Encoded]) {
    put_short(buf, values.len() as u16);
    for v in values {
        v.encode(buf);
    }
}

/// An assembled BATCH request, built incrementally with [`Batch::add`].
#[derive(Debug, Clone)]
pub struct Batch {
    pub(crate) kind: BatchKind,
    pub(crate) statements: Vec<BatchStatement>,
    pub consistency: Consistency,
    pub serial_consistency: Option<Consistency>,
    pub default_timestamp: Option<i64>,
}

impl Batch {
    pub fn new(kind: BatchKind) -> Batch {
        Batch {
            kind,
            statements: Vec::new(),
            consistency: Consistency::default(),
            serial_consistency: None,
            default_timestamp: None,
        }
    }

    /// Appends `statement`, rejecting it if it carries named values — CQL's
    /// BATCH wire format has no slot for parameter names, only position.
    pub fn add(&mut self, statement: Statement) -> Result<(), Error> {
        let entry = match statement {
            Statement::Simple { cql, values } => {
                BatchStatement::Query { cql, values: positional_or_reject(values)? }
            }
            Statement::Prepared { id, values, .. } => {
                BatchStatement::Prepared { id, values: positional_or_reject(values)? }
            }
        };
        self.statements.push(entry);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

fn positional_or_reject(values: QueryValues) -> Result<Vec<Encoded>, Error> {
    match values {
        QueryValues::None => Ok(Vec::new()),
        QueryValues::Positional(v) => Ok(v),
        QueryValues::Named(_) => Err(Error::invalid_arguments("named values are not allowed inside a BATCH")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::Encode;

    #[test]
    fn rejects_named_values() {
        let mut batch = Batch::new(BatchKind::Logged);
        let values = QueryValues::named(vec![("a".to_string(), 1i32.encode_value())]);
        let stmt = Statement::simple_with("insert into t (a) values (:a)", values);
        assert!(batch.add(stmt).is_err());
    }

    #[test]
    fn accepts_positional_values() {
        let mut batch = Batch::new(BatchKind::Unlogged);
        let values = QueryValues::positional(vec![1i32.encode_value()]);
        let stmt = Statement::simple_with("insert into t (a) values (?)", values);
        assert!(batch.add(stmt).is_ok());
        assert_eq!(batch.len(), 1);
    }
}
