//! Decoded result-set row.
use std::sync::Arc;

use crate::column::{Column, Index};
use crate::decode::{Decode, DecodeError};
use crate::protocol::response::ColumnSpec;

/// One row of a `Rows` RESULT: shared column metadata plus this row's cells.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<ColumnSpec>>,
    values: Vec<Option<bytes::Bytes>>,
}

impl Row {
    pub(crate) fn new(columns: Arc<Vec<ColumnSpec>>, values: Vec<Option<bytes::Bytes>>) -> Row {
        Row { columns, values }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Decodes the column at `idx` (an ordinal or a name) as `R`.
    pub fn try_get<I: Index, R: Decode>(&self, idx: I) -> Result<R, DecodeError> {
        let pos = idx.position(&self.columns).ok_or_else(|| {
            DecodeError::ColumnNotFound("requested column is out of range or unnamed".to_string())
        })?;
        let column = Column::new(&self.columns[pos], self.values[pos].as_ref());
        R::decode(column)
    }
}

/// Type that can be constructed from a whole [`Row`], e.g. a tuple of
/// [`Decode`] columns taken positionally.
pub trait FromRow: Sized {
    fn from_row(row: Row) -> Result<Self, DecodeError>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self, DecodeError> {
        Ok(row)
    }
}

macro_rules! impl_from_row_tuple {
    ($($t:ident $i:tt),+) => {
        impl<$($t: Decode),+> FromRow for ($($t,)+) {
            fn from_row(row: Row) -> Result<Self, DecodeError> {
                Ok(($(row.try_get::<usize, $t>($i)?,)+))
            }
        }
    };
}

impl_from_row_tuple!(T0 0);
impl_from_row_tuple!(T0 0, T1 1);
impl_from_row_tuple!(T0 0, T1 1, T2 2);
impl_from_row_tuple!(T0 0, T1 1, T2 2, T3 3);
impl_from_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::CqlType;
    use bytes::Bytes;

    fn sample_row() -> Row {
        let columns = Arc::new(vec![
            ColumnSpec { keyspace: "ks".into(), table: "t".into(), name: "id".into(), type_id: CqlType::ID_INT },
            ColumnSpec {
                keyspace: "ks".into(),
                table: "t".into(),
                name: "name".into(),
                type_id: CqlType::ID_VARCHAR,
            },
        ]);
        let values = vec![Some(Bytes::copy_from_slice(&7i32.to_be_bytes())), Some(Bytes::from_static(b"ada"))];
        Row::new(columns, values)
    }

    #[test]
    fn gets_by_name_and_index() {
        let row = sample_row();
        assert_eq!(row.try_get::<_, i32>("id").unwrap(), 7);
        assert_eq!(row.try_get::<_, String>(1).unwrap(), "ada");
    }

    #[test]
    fn missing_column_errors() {
        let row = sample_row();
        assert!(matches!(row.try_get::<_, i32>("missing"), Err(DecodeError::ColumnNotFound(_))));
    }

    #[test]
    fn tuple_from_row() {
        let row = sample_row();
        let (id, name): (i32, String) = FromRow::from_row(row).unwrap();
        assert_eq!(id, 7);
        assert_eq!(name, "ada");
    }
}
