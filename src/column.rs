//! Result-set column metadata and per-row column access.
//!
//! CQL ships column metadata once per `Rows`/`Prepared` RESULT rather than
//! per-row, so `ColumnSpec` (see `protocol::response`) already carries the
//! decoded name/type — no per-row name scanning is needed here.
use bytes::Bytes;

use crate::protocol::response::ColumnSpec;

/// A single cell: its declared type id and raw bytes, or `NULL`.
#[derive(Debug, Clone)]
pub struct Column<'a> {
    type_id: u16,
    value: Option<&'a Bytes>,
}

impl<'a> Column<'a> {
    pub(crate) fn new(spec: &ColumnSpec, value: Option<&'a Bytes>) -> Self {
        Self { type_id: spec.type_id, value }
    }

    /// Builds a column with no backing `ColumnSpec`, for a value nested
    /// inside another (a list/set/map element, a tuple or UDT field) where
    /// only the CQL type id is known, not a keyspace/table/name.
    pub(crate) fn synthetic(type_id: u16, value: Option<&'a Bytes>) -> Self {
        Self { type_id, value }
    }

    pub fn type_id(&self) -> u16 {
        self.type_id
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    pub fn as_slice(&self) -> Option<&[u8]> {
        self.value.map(|b| b.as_ref())
    }
}

/// A way to locate a column within a row: by ordinal or by name.
pub trait Index: Sized {
    fn position(self, columns: &[ColumnSpec]) -> Option<usize>;
}

impl Index for usize {
    fn position(self, columns: &[ColumnSpec]) -> Option<usize> {
        (self < columns.len()).then_some(self)
    }
}

impl Index for &str {
    fn position(self, columns: &[ColumnSpec]) -> Option<usize> {
        columns.iter().position(|c| c.name == self)
    }
}
