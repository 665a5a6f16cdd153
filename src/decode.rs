//! `Decode`: a result-set column's raw bytes -> Rust value, keyed on CQL
//! type ids (`protocol::types::CqlType`).
use bytes::{Buf, Bytes};

use crate::column::Column;
use crate::protocol::codec::{get_bytes_opt, get_int};
use crate::protocol::types::{Ascii, AsCqlType, Counter, CqlType, Date, Decimal, List, Time, Timestamp, UdtValue, Varint};

mod error;
pub use error::DecodeError;

/// Type that can be constructed from one result-set column.
pub trait Decode: Sized {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError>;
}

impl<T: Decode> Decode for Option<T> {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        if col.is_null() {
            Ok(None)
        } else {
            T::decode(col).map(Some)
        }
    }
}

fn check_type<T: AsCqlType>(col: &Column<'_>) -> Result<(), DecodeError> {
    if col.type_id() != T::CQL_TYPE_ID {
        return Err(DecodeError::TypeMismatch { expected: T::CQL_TYPE_ID, found: col.type_id() });
    }
    Ok(())
}

fn non_null<'a>(col: &'a Column<'_>) -> Result<&'a [u8], DecodeError> {
    col.as_slice().ok_or(DecodeError::UnexpectedNull)
}

macro_rules! impl_decode_fixed {
    ($ty:ty, $size:literal, $from_be:path) => {
        impl Decode for $ty {
            fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
                check_type::<$ty>(&col)?;
                let bytes = non_null(&col)?;
                if bytes.len() != $size {
                    return Err(DecodeError::LengthMismatch { expected: $size, found: bytes.len() });
                }
                let mut buf = [0u8; $size];
                buf.copy_from_slice(bytes);
                Ok($from_be(buf))
            }
        }
    };
}

impl_decode_fixed!(i8, 1, i8::from_be_bytes);
impl_decode_fixed!(i16, 2, i16::from_be_bytes);
impl_decode_fixed!(i32, 4, i32::from_be_bytes);
impl_decode_fixed!(i64, 8, i64::from_be_bytes);
impl_decode_fixed!(f32, 4, f32::from_be_bytes);
impl_decode_fixed!(f64, 8, f64::from_be_bytes);

impl Decode for bool {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        check_type::<bool>(&col)?;
        let bytes = non_null(&col)?;
        Ok(bytes.first().copied().unwrap_or(0) != 0)
    }
}

impl Decode for String {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        check_type::<String>(&col)?;
        let bytes = non_null(&col)?;
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }
}

impl Decode for Vec<u8> {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        if col.type_id() != CqlType::ID_BLOB {
            return Err(DecodeError::TypeMismatch { expected: CqlType::ID_BLOB, found: col.type_id() });
        }
        Ok(non_null(&col)?.to_vec())
    }
}

impl Decode for uuid::Uuid {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        // TIMEUUID shares the UUID layout; accept either id.
        if col.type_id() != CqlType::ID_UUID && col.type_id() != CqlType::ID_TIMEUUID {
            return Err(DecodeError::TypeMismatch { expected: CqlType::ID_UUID, found: col.type_id() });
        }
        let bytes = non_null(&col)?;
        if bytes.len() != 16 {
            return Err(DecodeError::LengthMismatch { expected: 16, found: bytes.len() });
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(bytes);
        Ok(uuid::Uuid::from_bytes(buf))
    }
}

impl Decode for Varint {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        check_type::<Varint>(&col)?;
        Ok(Varint(non_null(&col)?.to_vec()))
    }
}

impl Decode for Decimal {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        check_type::<Decimal>(&col)?;
        let bytes = non_null(&col)?;
        if bytes.len() < 4 {
            return Err(DecodeError::LengthMismatch { expected: 4, found: bytes.len() });
        }
        let mut scale = [0u8; 4];
        scale.copy_from_slice(&bytes[..4]);
        Ok(Decimal { scale: i32::from_be_bytes(scale), unscaled: Varint(bytes[4..].to_vec()) })
    }
}

impl Decode for Date {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        check_type::<Date>(&col)?;
        let bytes = non_null(&col)?;
        if bytes.len() != 4 {
            return Err(DecodeError::LengthMismatch { expected: 4, found: bytes.len() });
        }
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(Date(u32::from_be_bytes(buf)))
    }
}

impl Decode for Time {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        check_type::<Time>(&col)?;
        let bytes = non_null(&col)?;
        if bytes.len() != 8 {
            return Err(DecodeError::LengthMismatch { expected: 8, found: bytes.len() });
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(Time(i64::from_be_bytes(buf)))
    }
}

impl Decode for Timestamp {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        check_type::<Timestamp>(&col)?;
        let bytes = non_null(&col)?;
        if bytes.len() != 8 {
            return Err(DecodeError::LengthMismatch { expected: 8, found: bytes.len() });
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(Timestamp(i64::from_be_bytes(buf)))
    }
}

impl Decode for Counter {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        check_type::<Counter>(&col)?;
        let bytes = non_null(&col)?;
        if bytes.len() != 8 {
            return Err(DecodeError::LengthMismatch { expected: 8, found: bytes.len() });
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(Counter(i64::from_be_bytes(buf)))
    }
}

impl Decode for Ascii {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        check_type::<Ascii>(&col)?;
        let bytes = non_null(&col)?;
        if !bytes.is_ascii() {
            return Err(DecodeError::Invalid("ascii column contained a non-7-bit byte".to_string()));
        }
        Ok(Ascii(std::str::from_utf8(bytes)?.to_owned()))
    }
}

impl Decode for std::net::IpAddr {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        check_type::<std::net::IpAddr>(&col)?;
        let bytes = non_null(&col)?;
        Ok(match bytes.len() {
            4 => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                std::net::Ipv4Addr::from(buf).into()
            }
            16 => {
                let mut buf = [0u8; 16];
                buf.copy_from_slice(bytes);
                std::net::Ipv6Addr::from(buf).into()
            }
            n => return Err(DecodeError::Invalid(format!("inet value had {n} bytes, expected 4 or 16"))),
        })
    }
}

fn wire_err(e: impl std::fmt::Display) -> DecodeError {
    DecodeError::Invalid(e.to_string())
}

/// Reads the `[int n][n x [bytes]]` body shared by `list`/`set` values.
fn decode_elements<T: Decode + AsCqlType>(col: &Column<'_>, expected: u16) -> Result<Vec<T>, DecodeError> {
    if col.type_id() != expected {
        return Err(DecodeError::TypeMismatch { expected, found: col.type_id() });
    }
    let mut buf = Bytes::copy_from_slice(non_null(col)?);
    let n = get_int(&mut buf).map_err(wire_err)?;
    if n < 0 {
        return Err(DecodeError::Invalid(format!("negative element count {n}")));
    }
    let mut out = Vec::with_capacity(n as usize);
    for _ in 0..n {
        let elem = get_bytes_opt(&mut buf).map_err(wire_err)?;
        out.push(T::decode(Column::synthetic(T::CQL_TYPE_ID, elem.as_ref()))?);
    }
    Ok(out)
}

impl<T: Decode + AsCqlType> Decode for List<T> {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        Ok(List(decode_elements(&col, CqlType::ID_LIST)?))
    }
}

impl<T: Decode + AsCqlType + Eq + std::hash::Hash> Decode for std::collections::HashSet<T> {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        Ok(decode_elements(&col, CqlType::ID_SET)?.into_iter().collect())
    }
}

impl<K: Decode + AsCqlType + Eq + std::hash::Hash, V: Decode + AsCqlType> Decode for std::collections::HashMap<K, V> {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        if col.type_id() != CqlType::ID_MAP {
            return Err(DecodeError::TypeMismatch { expected: CqlType::ID_MAP, found: col.type_id() });
        }
        let mut buf = Bytes::copy_from_slice(non_null(&col)?);
        let n = get_int(&mut buf).map_err(wire_err)?;
        if n < 0 {
            return Err(DecodeError::Invalid(format!("negative element count {n}")));
        }
        let mut out = std::collections::HashMap::with_capacity(n as usize);
        for _ in 0..n {
            let k = get_bytes_opt(&mut buf).map_err(wire_err)?;
            let v = get_bytes_opt(&mut buf).map_err(wire_err)?;
            let key = K::decode(Column::synthetic(K::CQL_TYPE_ID, k.as_ref()))?;
            let value = V::decode(Column::synthetic(V::CQL_TYPE_ID, v.as_ref()))?;
            out.insert(key, value);
        }
        Ok(out)
    }
}

impl Decode for UdtValue {
    fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
        check_type::<UdtValue>(&col)?;
        let mut buf = Bytes::copy_from_slice(non_null(&col)?);
        let mut fields = Vec::new();
        while buf.has_remaining() {
            fields.push(get_bytes_opt(&mut buf).map_err(wire_err)?);
        }
        Ok(UdtValue(fields))
    }
}

macro_rules! impl_decode_tuple {
    ($($t:ident),+) => {
        impl<$($t: Decode + AsCqlType),+> Decode for ($($t,)+) {
            fn decode(col: Column<'_>) -> Result<Self, DecodeError> {
                if col.type_id() != CqlType::ID_TUPLE {
                    return Err(DecodeError::TypeMismatch { expected: CqlType::ID_TUPLE, found: col.type_id() });
                }
                let mut buf = Bytes::copy_from_slice(non_null(&col)?);
                Ok(($({
                    let field = get_bytes_opt(&mut buf).map_err(wire_err)?;
                    $t::decode(Column::synthetic($t::CQL_TYPE_ID, field.as_ref()))?
                },)+))
            }
        }
    };
}

impl_decode_tuple!(T0, T1);
impl_decode_tuple!(T0, T1, T2);
impl_decode_tuple!(T0, T1, T2, T3);
impl_decode_tuple!(T0, T1, T2, T3, T4);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::response::ColumnSpec;
    use bytes::Bytes;

    fn spec(type_id: u16) -> ColumnSpec {
        ColumnSpec { keyspace: "ks".into(), table: "t".into(), name: "c".into(), type_id }
    }

    #[test]
    fn decodes_i32() {
        let spec = spec(CqlType::ID_INT);
        let raw = Bytes::copy_from_slice(&42i32.to_be_bytes());
        let col = Column::new(&spec, Some(&raw));
        assert_eq!(i32::decode(col).unwrap(), 42);
    }

    #[test]
    fn rejects_type_mismatch() {
        let spec = spec(CqlType::ID_VARCHAR);
        let raw = Bytes::copy_from_slice(&42i32.to_be_bytes());
        let col = Column::new(&spec, Some(&raw));
        assert!(matches!(i32::decode(col), Err(DecodeError::TypeMismatch { .. })));
    }

    #[test]
    fn option_handles_null() {
        let spec = spec(CqlType::ID_INT);
        let col = Column::new(&spec, None);
        assert_eq!(Option::<i32>::decode(col).unwrap(), None);
    }

    #[test]
    fn decodes_list_of_int() {
        use bytes::BufMut;
        let spec = spec(CqlType::ID_LIST);
        let mut raw = bytes::BytesMut::new();
        raw.put_i32(2);
        raw.put_i32(4);
        raw.put_i32(1);
        raw.put_i32(4);
        raw.put_i32(2);
        let raw = raw.freeze();
        let col = Column::new(&spec, Some(&raw));
        assert_eq!(List::<i32>::decode(col).unwrap().0, vec![1, 2]);
    }

    #[test]
    fn decodes_tuple_with_no_count_prefix() {
        use bytes::BufMut;
        let spec = spec(CqlType::ID_TUPLE);
        let mut raw = bytes::BytesMut::new();
        raw.put_i32(4);
        raw.put_i32(7);
        raw.put_i32(2);
        raw.put_slice(b"ab");
        let raw = raw.freeze();
        let col = Column::new(&spec, Some(&raw));
        let (a, b): (i32, String) = Decode::decode(col).unwrap();
        assert_eq!(a, 7);
        assert_eq!(b, "ab");
    }

    #[test]
    fn varint_round_trips_large_value() {
        let spec = spec(CqlType::ID_VARINT);
        let raw = Bytes::copy_from_slice(&[0x01, 0x00]);
        let col = Column::new(&spec, Some(&raw));
        assert_eq!(Varint::decode(col).unwrap().to_i64(), Some(256));
    }
}
