//! CQL type descriptors.
//!
//! Id codes follow the CQL binary protocol v4 `[option]` encoding: a value's
//! `[option]` is a 2-byte id followed by type-dependent extra bytes for the
//! parametric types.

/// The closed set of CQL type descriptors this driver understands.
#[derive(Debug, Clone, PartialEq)]
pub enum CqlType {
    Ascii,
    Bigint,
    Blob,
    Boolean,
    Counter,
    Decimal,
    Double,
    Float,
    Inet,
    Int,
    Smallint,
    Text,
    Timestamp,
    Timeuuid,
    Tinyint,
    Uuid,
    Varint,
    Date,
    Time,
    List(Box<CqlType>),
    Set(Box<CqlType>),
    Map(Box<CqlType>, Box<CqlType>),
    Tuple(Vec<CqlType>),
    Udt {
        keyspace: String,
        name: String,
        fields: Vec<(String, CqlType)>,
    },
}

impl CqlType {
    pub const ID_CUSTOM: u16 = 0x0000;
    pub const ID_ASCII: u16 = 0x0001;
    pub const ID_BIGINT: u16 = 0x0002;
    pub const ID_BLOB: u16 = 0x0003;
    pub const ID_BOOLEAN: u16 = 0x0004;
    pub const ID_COUNTER: u16 = 0x0005;
    pub const ID_DECIMAL: u16 = 0x0006;
    pub const ID_DOUBLE: u16 = 0x0007;
    pub const ID_FLOAT: u16 = 0x0008;
    pub const ID_INT: u16 = 0x0009;
    pub const ID_TIMESTAMP: u16 = 0x000B;
    pub const ID_UUID: u16 = 0x000C;
    pub const ID_VARCHAR: u16 = 0x000D;
    pub const ID_VARINT: u16 = 0x000E;
    pub const ID_TIMEUUID: u16 = 0x000F;
    pub const ID_INET: u16 = 0x0010;
    pub const ID_DATE: u16 = 0x0011;
    pub const ID_TIME: u16 = 0x0012;
    pub const ID_SMALLINT: u16 = 0x0013;
    pub const ID_TINYINT: u16 = 0x0014;
    pub const ID_LIST: u16 = 0x0020;
    pub const ID_MAP: u16 = 0x0021;
    pub const ID_SET: u16 = 0x0022;
    pub const ID_UDT: u16 = 0x0030;
    pub const ID_TUPLE: u16 = 0x0031;

    /// The `[option]` id for this type. Parametric types are followed by
    /// their own `[option]` payload, encoded by the caller.
    pub fn id(&self) -> u16 {
        match self {
            CqlType::Ascii => Self::ID_ASCII,
            CqlType::Bigint => Self::ID_BIGINT,
            CqlType::Blob => Self::ID_BLOB,
            CqlType::Boolean => Self::ID_BOOLEAN,
            CqlType::Counter => Self::ID_COUNTER,
            CqlType::Decimal => Self::ID_DECIMAL,
            CqlType::Double => Self::ID_DOUBLE,
            CqlType::Float => Self::ID_FLOAT,
            CqlType::Inet => Self::ID_INET,
            CqlType::Int => Self::ID_INT,
            CqlType::Smallint => Self::ID_SMALLINT,
            CqlType::Text => Self::ID_VARCHAR,
            CqlType::Timestamp => Self::ID_TIMESTAMP,
            CqlType::Timeuuid => Self::ID_TIMEUUID,
            CqlType::Tinyint => Self::ID_TINYINT,
            CqlType::Uuid => Self::ID_UUID,
            CqlType::Varint => Self::ID_VARINT,
            CqlType::Date => Self::ID_DATE,
            CqlType::Time => Self::ID_TIME,
            CqlType::List(_) => Self::ID_LIST,
            CqlType::Set(_) => Self::ID_SET,
            CqlType::Map(..) => Self::ID_MAP,
            CqlType::Tuple(_) => Self::ID_TUPLE,
            CqlType::Udt { .. } => Self::ID_UDT,
        }
    }
}

/// CQL `varint`: the minimal two's-complement big-endian byte string (no
/// leading `0x00`/`0xff` byte beyond what the sign requires).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Varint(pub Vec<u8>);

impl Varint {
    /// Trims `v` down to its minimal two's-complement form.
    pub fn from_i64(v: i64) -> Varint {
        let bytes = v.to_be_bytes();
        let mut start = 0;
        while start < bytes.len() - 1 {
            let b = bytes[start];
            let next_high_bit = bytes[start + 1] & 0x80;
            if (b == 0x00 && next_high_bit == 0) || (b == 0xff && next_high_bit != 0) {
                start += 1;
            } else {
                break;
            }
        }
        Varint(bytes[start..].to_vec())
    }

    /// `None` if the value doesn't fit in 64 bits.
    pub fn to_i64(&self) -> Option<i64> {
        if self.0.is_empty() || self.0.len() > 8 {
            return None;
        }
        let negative = self.0[0] & 0x80 != 0;
        let mut buf = if negative { [0xffu8; 8] } else { [0u8; 8] };
        let offset = 8 - self.0.len();
        buf[offset..].copy_from_slice(&self.0);
        Some(i64::from_be_bytes(buf))
    }
}

/// CQL `decimal`: an unscaled [`Varint`] and a base-10 scale, value =
/// `unscaled * 10^-scale`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    pub scale: i32,
    pub unscaled: Varint,
}

/// CQL `date`: days since the epoch, offset by `2^31` so the wire form is
/// an unsigned 32-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date(pub u32);

impl Date {
    const EPOCH_OFFSET: i64 = 1 << 31;

    pub fn from_days_since_epoch(days: i64) -> Date {
        Date((days + Self::EPOCH_OFFSET) as u32)
    }

    pub fn days_since_epoch(&self) -> i64 {
        self.0 as i64 - Self::EPOCH_OFFSET
    }
}

/// CQL `time`: nanoseconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time(pub i64);

/// CQL `timestamp`: milliseconds since the Unix epoch. Kept distinct from a
/// bare `i64`/`bigint` so a column's declared type still round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(pub i64);

/// CQL `counter`: a server-maintained 64-bit counter, distinct from
/// `bigint` even though both are 8 raw bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter(pub i64);

/// CQL `ascii`: text restricted to 7-bit US-ASCII, distinct from `varchar`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ascii(pub String);

/// CQL `list<T>`. A newtype over `Vec<T>` rather than binding `Vec<T>`
/// itself, since `Vec<u8>` is already spoken for as `blob`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct List<T>(pub Vec<T>);

impl<T> From<Vec<T>> for List<T> {
    fn from(v: Vec<T>) -> Self {
        List(v)
    }
}

impl<T> From<List<T>> for Vec<T> {
    fn from(v: List<T>) -> Self {
        v.0
    }
}

impl<T> std::ops::Deref for List<T> {
    type Target = Vec<T>;
    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

/// A CQL `tuple`/`udt` value's fields, read off the wire as a bare sequence
/// of `[bytes]` with no count prefix — the arity is implied by context
/// (the requested Rust type for a tuple, the column's schema for a UDT).
/// Used directly as the `Decode`/`Encode` target for a UDT whose field
/// names aren't needed by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UdtValue(pub Vec<Option<bytes::Bytes>>);

/// A statically known CQL type for a Rust type that binds directly, keyed
/// on the CQL wire type id.
pub trait AsCqlType {
    const CQL_TYPE_ID: u16;
}

impl AsCqlType for bool {
    const CQL_TYPE_ID: u16 = CqlType::ID_BOOLEAN;
}
impl AsCqlType for i8 {
    const CQL_TYPE_ID: u16 = CqlType::ID_TINYINT;
}
impl AsCqlType for i16 {
    const CQL_TYPE_ID: u16 = CqlType::ID_SMALLINT;
}
impl AsCqlType for i32 {
    const CQL_TYPE_ID: u16 = CqlType::ID_INT;
}
impl AsCqlType for i64 {
    const CQL_TYPE_ID: u16 = CqlType::ID_BIGINT;
}
impl AsCqlType for f32 {
    const CQL_TYPE_ID: u16 = CqlType::ID_FLOAT;
}
impl AsCqlType for f64 {
    const CQL_TYPE_ID: u16 = CqlType::ID_DOUBLE;
}
impl AsCqlType for str {
    const CQL_TYPE_ID: u16 = CqlType::ID_VARCHAR;
}
impl AsCqlType for String {
    const CQL_TYPE_ID: u16 = CqlType::ID_VARCHAR;
}
impl AsCqlType for [u8] {
    const CQL_TYPE_ID: u16 = CqlType::ID_BLOB;
}
impl AsCqlType for uuid::Uuid {
    const CQL_TYPE_ID: u16 = CqlType::ID_UUID;
}
impl AsCqlType for Varint {
    const CQL_TYPE_ID: u16 = CqlType::ID_VARINT;
}
impl AsCqlType for Decimal {
    const CQL_TYPE_ID: u16 = CqlType::ID_DECIMAL;
}
impl AsCqlType for Date {
    const CQL_TYPE_ID: u16 = CqlType::ID_DATE;
}
impl AsCqlType for Time {
    const CQL_TYPE_ID: u16 = CqlType::ID_TIME;
}
impl AsCqlType for Timestamp {
    const CQL_TYPE_ID: u16 = CqlType::ID_TIMESTAMP;
}
impl AsCqlType for Counter {
    const CQL_TYPE_ID: u16 = CqlType::ID_COUNTER;
}
impl AsCqlType for Ascii {
    const CQL_TYPE_ID: u16 = CqlType::ID_ASCII;
}
impl AsCqlType for std::net::IpAddr {
    const CQL_TYPE_ID: u16 = CqlType::ID_INET;
}
impl<T> AsCqlType for List<T> {
    const CQL_TYPE_ID: u16 = CqlType::ID_LIST;
}
impl<T> AsCqlType for std::collections::HashSet<T> {
    const CQL_TYPE_ID: u16 = CqlType::ID_SET;
}
impl<K, V> AsCqlType for std::collections::HashMap<K, V> {
    const CQL_TYPE_ID: u16 = CqlType::ID_MAP;
}
impl AsCqlType for UdtValue {
    const CQL_TYPE_ID: u16 = CqlType::ID_UDT;
}

/// Maps a CQL type name (as it appears in `CREATE TABLE`/`CAST`) to its
/// wire type id, for a Simple statement the server hasn't supplied
/// column-type metadata for and a bound value's Rust type alone is
/// ambiguous (e.g. binding an `i64` literal that must go out as `bigint`,
/// not `counter` or `timestamp`).
pub fn hint_type_id(name: &str) -> Option<u16> {
    Some(match name {
        "ascii" => CqlType::ID_ASCII,
        "bigint" => CqlType::ID_BIGINT,
        "blob" => CqlType::ID_BLOB,
        "boolean" => CqlType::ID_BOOLEAN,
        "counter" => CqlType::ID_COUNTER,
        "decimal" => CqlType::ID_DECIMAL,
        "double" => CqlType::ID_DOUBLE,
        "float" => CqlType::ID_FLOAT,
        "inet" => CqlType::ID_INET,
        "int" => CqlType::ID_INT,
        "smallint" => CqlType::ID_SMALLINT,
        "text" | "varchar" => CqlType::ID_VARCHAR,
        "timestamp" => CqlType::ID_TIMESTAMP,
        "timeuuid" => CqlType::ID_TIMEUUID,
        "tinyint" => CqlType::ID_TINYINT,
        "uuid" => CqlType::ID_UUID,
        "varint" => CqlType::ID_VARINT,
        "date" => CqlType::ID_DATE,
        "time" => CqlType::ID_TIME,
        "list" => CqlType::ID_LIST,
        "map" => CqlType::ID_MAP,
        "set" => CqlType::ID_SET,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_trims_to_minimal_form() {
        assert_eq!(Varint::from_i64(0).0, vec![0]);
        assert_eq!(Varint::from_i64(127).0, vec![0x7f]);
        assert_eq!(Varint::from_i64(128).0, vec![0x00, 0x80]);
        assert_eq!(Varint::from_i64(-1).0, vec![0xff]);
        assert_eq!(Varint::from_i64(-129).0, vec![0xff, 0x7f]);
    }

    #[test]
    fn varint_round_trips_through_i64() {
        for v in [0i64, 1, -1, 127, 128, -128, -129, i64::MAX, i64::MIN] {
            assert_eq!(Varint::from_i64(v).to_i64(), Some(v));
        }
    }

    #[test]
    fn date_offsets_from_epoch() {
        let date = Date::from_days_since_epoch(0);
        assert_eq!(date.0, 1u32 << 31);
        assert_eq!(date.days_since_epoch(), 0);
    }

    #[test]
    fn hint_resolves_known_names() {
        assert_eq!(hint_type_id("int"), Some(CqlType::ID_INT));
        assert_eq!(hint_type_id("bigint"), Some(CqlType::ID_BIGINT));
        assert_eq!(hint_type_id("not-a-type"), None);
    }
}
