//! `Encode`: Rust value -> wire-ready bound parameter.
//!
//! Always materializes an owned `Bytes` payload rather than threading a
//! borrow lifetime through `Statement`/`Batch`: bound values are built once
//! per call and handed to the connection actor over a channel, which needs
//! `'static` ownership, not a borrow of caller-local data.
use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::codec::put_bytes_opt;
use crate::protocol::types::{Ascii, AsCqlType, Counter, CqlType, Date, Decimal, List, Time, Timestamp, UdtValue, Varint};

/// A bound parameter: its CQL type id plus `NULL`-or-present bytes.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub(crate) type_id: u16,
    pub(crate) value: Option<Bytes>,
}

impl Encoded {
    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        crate::protocol::codec::put_bytes_opt(buf, self.value.as_deref());
    }

    pub fn null(type_id: u16) -> Encoded {
        Encoded { type_id, value: None }
    }
}

/// Converts a Rust value into a bound, wire-ready [`Encoded`] parameter.
pub trait Encode {
    fn encode_value(&self) -> Encoded;
}

macro_rules! impl_encode_fixed {
    ($ty:ty, $put:ident) => {
        impl Encode for $ty {
            fn encode_value(&self) -> Encoded {
                let mut buf = BytesMut::new();
                buf.$put(*self);
                Encoded { type_id: <$ty as AsCqlType>::CQL_TYPE_ID, value: Some(buf.freeze()) }
            }
        }
    };
}

impl_encode_fixed!(i8, put_i8);
impl_encode_fixed!(i16, put_i16);
impl_encode_fixed!(i32, put_i32);
impl_encode_fixed!(i64, put_i64);
impl_encode_fixed!(f32, put_f32);
impl_encode_fixed!(f64, put_f64);

impl Encode for bool {
    fn encode_value(&self) -> Encoded {
        Encoded { type_id: CqlType::ID_BOOLEAN, value: Some(Bytes::from_static(if *self { &[1] } else { &[0] })) }
    }
}

impl Encode for str {
    fn encode_value(&self) -> Encoded {
        Encoded { type_id: CqlType::ID_VARCHAR, value: Some(Bytes::copy_from_slice(self.as_bytes())) }
    }
}

impl Encode for String {
    fn encode_value(&self) -> Encoded {
        self.as_str().encode_value()
    }
}

impl Encode for [u8] {
    fn encode_value(&self) -> Encoded {
        Encoded { type_id: CqlType::ID_BLOB, value: Some(Bytes::copy_from_slice(self)) }
    }
}

impl Encode for Vec<u8> {
    fn encode_value(&self) -> Encoded {
        self.as_slice().encode_value()
    }
}

impl Encode for uuid::Uuid {
    fn encode_value(&self) -> Encoded {
        Encoded { type_id: CqlType::ID_UUID, value: Some(Bytes::copy_from_slice(self.as_bytes())) }
    }
}

impl Encode for Varint {
    fn encode_value(&self) -> Encoded {
        Encoded { type_id: CqlType::ID_VARINT, value: Some(Bytes::copy_from_slice(&self.0)) }
    }
}

impl Encode for Decimal {
    fn encode_value(&self) -> Encoded {
        let mut buf = BytesMut::new();
        buf.put_i32(self.scale);
        buf.put_slice(&self.unscaled.0);
        Encoded { type_id: CqlType::ID_DECIMAL, value: Some(buf.freeze()) }
    }
}

impl Encode for Date {
    fn encode_value(&self) -> Encoded {
        let mut buf = BytesMut::new();
        buf.put_u32(self.0);
        Encoded { type_id: CqlType::ID_DATE, value: Some(buf.freeze()) }
    }
}

impl Encode for Time {
    fn encode_value(&self) -> Encoded {
        let mut buf = BytesMut::new();
        buf.put_i64(self.0);
        Encoded { type_id: CqlType::ID_TIME, value: Some(buf.freeze()) }
    }
}

impl Encode for Timestamp {
    fn encode_value(&self) -> Encoded {
        let mut buf = BytesMut::new();
        buf.put_i64(self.0);
        Encoded { type_id: CqlType::ID_TIMESTAMP, value: Some(buf.freeze()) }
    }
}

impl Encode for Counter {
    fn encode_value(&self) -> Encoded {
        let mut buf = BytesMut::new();
        buf.put_i64(self.0);
        Encoded { type_id: CqlType::ID_COUNTER, value: Some(buf.freeze()) }
    }
}

impl Encode for Ascii {
    fn encode_value(&self) -> Encoded {
        Encoded { type_id: CqlType::ID_ASCII, value: Some(Bytes::copy_from_slice(self.0.as_bytes())) }
    }
}

impl Encode for std::net::IpAddr {
    fn encode_value(&self) -> Encoded {
        let bytes = match self {
            std::net::IpAddr::V4(v4) => Bytes::copy_from_slice(&v4.octets()),
            std::net::IpAddr::V6(v6) => Bytes::copy_from_slice(&v6.octets()),
        };
        Encoded { type_id: CqlType::ID_INET, value: Some(bytes) }
    }
}

impl<T: Encode> Encode for List<T> {
    fn encode_value(&self) -> Encoded {
        let mut buf = BytesMut::new();
        buf.put_i32(self.0.len() as i32);
        for item in &self.0 {
            let encoded = item.encode_value();
            put_bytes_opt(&mut buf, encoded.value.as_deref());
        }
        Encoded { type_id: CqlType::ID_LIST, value: Some(buf.freeze()) }
    }
}

impl<T: Encode> Encode for std::collections::HashSet<T> {
    fn encode_value(&self) -> Encoded {
        let mut buf = BytesMut::new();
        buf.put_i32(self.len() as i32);
        for item in self {
            let encoded = item.encode_value();
            put_bytes_opt(&mut buf, encoded.value.as_deref());
        }
        Encoded { type_id: CqlType::ID_SET, value: Some(buf.freeze()) }
    }
}

impl<K: Encode, V: Encode> Encode for std::collections::HashMap<K, V> {
    fn encode_value(&self) -> Encoded {
        let mut buf = BytesMut::new();
        buf.put_i32(self.len() as i32);
        for (k, v) in self {
            let k = k.encode_value();
            let v = v.encode_value();
            put_bytes_opt(&mut buf, k.value.as_deref());
            put_bytes_opt(&mut buf, v.value.as_deref());
        }
        Encoded { type_id: CqlType::ID_MAP, value: Some(buf.freeze()) }
    }
}

impl Encode for UdtValue {
    fn encode_value(&self) -> Encoded {
        let mut buf = BytesMut::new();
        for field in &self.0 {
            put_bytes_opt(&mut buf, field.as_deref());
        }
        Encoded { type_id: CqlType::ID_UDT, value: Some(buf.freeze()) }
    }
}

macro_rules! impl_encode_tuple {
    ($($t:ident),+) => {
        impl<$($t: Encode),+> Encode for ($($t,)+) {
            fn encode_value(&self) -> Encoded {
                #[allow(non_snake_case)]
                let ($($t,)+) = self;
                let mut buf = BytesMut::new();
                $(
                    let field = $t.encode_value();
                    put_bytes_opt(&mut buf, field.value.as_deref());
                )+
                Encoded { type_id: CqlType::ID_TUPLE, value: Some(buf.freeze()) }
            }
        }
    };
}

impl_encode_tuple!(T0, T1);
impl_encode_tuple!(T0, T1, T2);
impl_encode_tuple!(T0, T1, T2, T3);
impl_encode_tuple!(T0, T1, T2, T3, T4);

impl<T: Encode> Encode for Option<T> {
    fn encode_value(&self) -> Encoded {
        match self {
            Some(v) => v.encode_value(),
            None => Encoded::null(0),
        }
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode_value(&self) -> Encoded {
        (*self).encode_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_none_is_null() {
        let encoded = Option::<i32>::None.encode_value();
        assert!(encoded.value.is_none());
    }

    #[test]
    fn string_encodes_as_varchar() {
        let encoded = "hello".encode_value();
        assert_eq!(encoded.type_id, CqlType::ID_VARCHAR);
        assert_eq!(encoded.value.unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn bool_encodes_single_byte() {
        assert_eq!(true.encode_value().value.unwrap(), Bytes::from_static(&[1]));
        assert_eq!(false.encode_value().value.unwrap(), Bytes::from_static(&[0]));
    }

    #[test]
    fn varint_encodes_minimal_bytes() {
        let encoded = Varint::from_i64(128).encode_value();
        assert_eq!(encoded.type_id, CqlType::ID_VARINT);
        assert_eq!(encoded.value.unwrap(), Bytes::from_static(&[0x00, 0x80]));
    }

    #[test]
    fn list_encodes_count_and_elements() {
        let encoded = List(vec![1i32, 2i32]).encode_value();
        assert_eq!(encoded.type_id, CqlType::ID_LIST);
        let mut expected = BytesMut::new();
        expected.put_i32(2);
        expected.put_i32(4);
        expected.put_i32(1);
        expected.put_i32(4);
        expected.put_i32(2);
        assert_eq!(encoded.value.unwrap(), expected.freeze());
    }

    #[test]
    fn tuple_encodes_fields_sequentially_with_no_count() {
        let encoded = (1i32, "ab").encode_value();
        assert_eq!(encoded.type_id, CqlType::ID_TUPLE);
        let mut expected = BytesMut::new();
        expected.put_i32(4);
        expected.put_i32(1);
        expected.put_i32(2);
        expected.put_slice(b"ab");
        assert_eq!(encoded.value.unwrap(), expected.freeze());
    }

    #[test]
    fn inet_v4_encodes_raw_octets_with_no_port() {
        let addr: std::net::IpAddr = "10.0.0.1".parse().unwrap();
        let encoded = addr.encode_value();
        assert_eq!(encoded.type_id, CqlType::ID_INET);
        assert_eq!(encoded.value.unwrap(), Bytes::from_static(&[10, 0, 0, 1]));
    }
}
