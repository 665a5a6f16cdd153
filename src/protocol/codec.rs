//! Primitive CQL wire encodings.
//!
//! `[byte]`, `[short]`, `[int]`, `[long]`, `[string]`, `[long string]`,
//! `[bytes]`, `[short bytes]`, `[uuid]`, `[inet]`, `[string map]`,
//! `[string multimap]`, `[string list]`, as a set of `Buf`/`BufMut`
//! get/put helpers shared by every message.
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;

use crate::error::{MalformedValue, ProtocolViolation};

pub const NULL_LEN: i32 = -1;
pub const NOT_SET_LEN: i32 = -2;

pub fn put_short(buf: &mut BytesMut, v: u16) {
    buf.put_u16(v);
}

pub fn get_short(buf: &mut Bytes) -> Result<u16, ProtocolViolation> {
    require(buf, 2)?;
    Ok(buf.get_u16())
}

pub fn put_int(buf: &mut BytesMut, v: i32) {
    buf.put_i32(v);
}

pub fn get_int(buf: &mut Bytes) -> Result<i32, ProtocolViolation> {
    require(buf, 4)?;
    Ok(buf.get_i32())
}

pub fn put_long(buf: &mut BytesMut, v: i64) {
    buf.put_i64(v);
}

pub fn get_long(buf: &mut Bytes) -> Result<i64, ProtocolViolation> {
    require(buf, 8)?;
    Ok(buf.get_i64())
}

/// `[string]` = `[short n][n bytes]`, UTF-8.
pub fn put_string(buf: &mut BytesMut, s: &str) {
    put_short(buf, s.len() as u16);
    buf.put_slice(s.as_bytes());
}

pub fn get_string(buf: &mut Bytes) -> Result<String, MalformedValue> {
    let len = get_short(buf).map_err(|_| MalformedValue::LengthMismatch { declared: 0, actual: 0 })? as usize;
    require_len(buf, len)?;
    let s = buf.split_to(len);
    Ok(std::str::from_utf8(&s)?.to_owned())
}

/// `[long string]` = `[int n][n bytes]`.
pub fn put_long_string(buf: &mut BytesMut, s: &str) {
    put_int(buf, s.len() as i32);
    buf.put_slice(s.as_bytes());
}

pub fn get_long_string(buf: &mut Bytes) -> Result<String, MalformedValue> {
    let len = get_int(buf).map_err(|_| MalformedValue::LengthMismatch { declared: 0, actual: 0 })?;
    if len < 0 {
        return Err(MalformedValue::NegativeCount(len));
    }
    let len = len as usize;
    require_len(buf, len)?;
    let s = buf.split_to(len);
    Ok(std::str::from_utf8(&s)?.to_owned())
}

/// `[bytes]` = `[int n][n bytes]`, `n = -1` is NULL, `n = -2` is "not set".
pub fn put_bytes_opt(buf: &mut BytesMut, v: Option<&[u8]>) {
    match v {
        Some(v) => {
            put_int(buf, v.len() as i32);
            buf.put_slice(v);
        }
        None => put_int(buf, NULL_LEN),
    }
}

pub fn get_bytes_opt(buf: &mut Bytes) -> Result<Option<Bytes>, MalformedValue> {
    let len = get_int(buf).map_err(|_| MalformedValue::LengthMismatch { declared: 0, actual: 0 })?;
    if len == NULL_LEN || len == NOT_SET_LEN {
        return Ok(None);
    }
    if len < 0 {
        return Err(MalformedValue::NegativeCount(len));
    }
    let len = len as usize;
    if buf.remaining() < len {
        return Err(MalformedValue::LengthMismatch { declared: len as i32, actual: buf.remaining() });
    }
    Ok(Some(buf.split_to(len)))
}

/// `[short bytes]` = `[short n][n bytes]`.
pub fn put_short_bytes(buf: &mut BytesMut, v: &[u8]) {
    put_short(buf, v.len() as u16);
    buf.put_slice(v);
}

pub fn get_short_bytes(buf: &mut Bytes) -> Result<Bytes, MalformedValue> {
    let len = get_short(buf).map_err(|_| MalformedValue::LengthMismatch { declared: 0, actual: 0 })? as usize;
    require_len(buf, len)?;
    Ok(buf.split_to(len))
}

/// `[uuid]` = 16 bytes, network order.
pub fn put_uuid(buf: &mut BytesMut, v: &uuid::Uuid) {
    buf.put_slice(v.as_bytes());
}

pub fn get_uuid(buf: &mut Bytes) -> Result<uuid::Uuid, MalformedValue> {
    require_len(buf, 16)?;
    let mut bytes = [0u8; 16];
    buf.copy_to_slice(&mut bytes);
    Ok(uuid::Uuid::from_bytes(bytes))
}

/// `[inet]` = `[byte n][n bytes address][int port]`.
pub fn put_inet(buf: &mut BytesMut, addr: std::net::SocketAddr) {
    match addr.ip() {
        std::net::IpAddr::V4(v4) => {
            buf.put_u8(4);
            buf.put_slice(&v4.octets());
        }
        std::net::IpAddr::V6(v6) => {
            buf.put_u8(16);
            buf.put_slice(&v6.octets());
        }
    }
    put_int(buf, addr.port() as i32);
}

pub fn get_inet(buf: &mut Bytes) -> Result<std::net::SocketAddr, MalformedValue> {
    require_len(buf, 1)?;
    let n = buf.get_u8() as usize;
    require_len(buf, n)?;
    let ip: std::net::IpAddr = match n {
        4 => {
            let mut octets = [0u8; 4];
            buf.copy_to_slice(&mut octets);
            std::net::Ipv4Addr::from(octets).into()
        }
        16 => {
            let mut octets = [0u8; 16];
            buf.copy_to_slice(&mut octets);
            std::net::Ipv6Addr::from(octets).into()
        }
        n => return Err(MalformedValue::LengthMismatch { declared: n as i32, actual: 0 }),
    };
    let port = get_int(buf).map_err(|_| MalformedValue::LengthMismatch { declared: 0, actual: 0 })? as u16;
    Ok(std::net::SocketAddr::new(ip, port))
}

/// `[string list]` = `[short n][n [string]]`.
pub fn put_string_list(buf: &mut BytesMut, items: &[impl AsRef<str>]) {
    put_short(buf, items.len() as u16);
    for item in items {
        put_string(buf, item.as_ref());
    }
}

pub fn get_string_list(buf: &mut Bytes) -> Result<Vec<String>, MalformedValue> {
    let n = get_short(buf).map_err(|_| MalformedValue::LengthMismatch { declared: 0, actual: 0 })?;
    (0..n).map(|_| get_string(buf)).collect()
}

/// `[string map]` = `[short n][n [string][string]]`.
pub fn put_string_map(buf: &mut BytesMut, map: &HashMap<String, String>) {
    put_short(buf, map.len() as u16);
    for (k, v) in map {
        put_string(buf, k);
        put_string(buf, v);
    }
}

pub fn get_string_map(buf: &mut Bytes) -> Result<HashMap<String, String>, MalformedValue> {
    let n = get_short(buf).map_err(|_| MalformedValue::LengthMismatch { declared: 0, actual: 0 })?;
    let mut map = HashMap::with_capacity(n as usize);
    for _ in 0..n {
        let k = get_string(buf)?;
        let v = get_string(buf)?;
        map.insert(k, v);
    }
    Ok(map)
}

/// `[string multimap]` = `[short n][n [string][string list]]`.
pub fn get_string_multimap(buf: &mut Bytes) -> Result<HashMap<String, Vec<String>>, MalformedValue> {
    let n = get_short(buf).map_err(|_| MalformedValue::LengthMismatch { declared: 0, actual: 0 })?;
    let mut map = HashMap::with_capacity(n as usize);
    for _ in 0..n {
        let k = get_string(buf)?;
        let v = get_string_list(buf)?;
        map.insert(k, v);
    }
    Ok(map)
}

fn require(buf: &Bytes, n: usize) -> Result<(), ProtocolViolation> {
    if buf.remaining() < n {
        return Err(ProtocolViolation::TruncatedBody { declared: n, available: buf.remaining() });
    }
    Ok(())
}

fn require_len(buf: &Bytes, n: usize) -> Result<(), MalformedValue> {
    if buf.remaining() < n {
        return Err(MalformedValue::LengthMismatch { declared: n as i32, actual: buf.remaining() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trip() {
        let mut buf = BytesMut::new();
        put_string(&mut buf, "hello world");
        let mut frozen = buf.freeze();
        assert_eq!(get_string(&mut frozen).unwrap(), "hello world");
    }

    #[test]
    fn bytes_opt_null_and_not_set() {
        let mut buf = BytesMut::new();
        put_bytes_opt(&mut buf, None);
        let mut frozen = buf.freeze();
        assert_eq!(get_bytes_opt(&mut frozen).unwrap(), None);

        let mut buf = BytesMut::new();
        put_int(&mut buf, NOT_SET_LEN);
        let mut frozen = buf.freeze();
        assert_eq!(get_bytes_opt(&mut frozen).unwrap(), None);
    }

    #[test]
    fn inet_v4_round_trip() {
        let mut buf = BytesMut::new();
        let addr: std::net::SocketAddr = "10.0.0.1:9042".parse().unwrap();
        put_inet(&mut buf, addr);
        let mut frozen = buf.freeze();
        assert_eq!(get_inet(&mut frozen).unwrap(), addr);
    }

    #[test]
    fn string_map_round_trip() {
        let mut map = HashMap::new();
        map.insert("CQL_VERSION".to_string(), "3.4.4".to_string());
        let mut buf = BytesMut::new();
        put_string_map(&mut buf, &map);
        let mut frozen = buf.freeze();
        assert_eq!(get_string_map(&mut frozen).unwrap(), map);
    }
}
