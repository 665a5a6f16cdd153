//! Frame codec: the 9-byte header plus body framing shared by every CQL
//! message, buffered as "read the header, then read exactly `body_len`
//! more bytes."
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolViolation;

pub const HEADER_LEN: usize = 9;

/// Request/response direction is encoded in the high bit of the version byte.
pub const REQUEST_VERSION: u8 = 0x04;
pub const RESPONSE_VERSION: u8 = 0x84;

/// A tiny bitflags stand-in, avoiding a dependency for four bits; mirrors
/// the accessor shape of the real `bitflags!` macro closely enough that
/// swapping it in later is a drop-in change.
macro_rules! bitflags_like {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($ty:ty) {
            $(const $flag:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(pub $ty);

        impl $name {
            $(pub const $flag: $ty = $value;)*

            pub fn contains(&self, flag: $ty) -> bool {
                self.0 & flag == flag
            }
        }
    };
}

bitflags_like! {
    /// Flags byte: COMPRESSION / TRACING / CUSTOM_PAYLOAD / WARNING.
    pub struct HeaderFlags(u8) {
        const COMPRESSION = 0x01;
        const TRACING = 0x02;
        const CUSTOM_PAYLOAD = 0x04;
        const WARNING = 0x08;
    }
}

/// A decoded, not-yet-decompressed frame header.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub version: u8,
    pub flags: HeaderFlags,
    pub stream: i16,
    pub opcode: u8,
    pub body_len: u32,
}

impl Header {
    pub fn is_response(&self) -> bool {
        self.version & 0x80 != 0
    }

    /// Parses the fixed 9-byte header. Accepts either direction byte (0x04
    /// request, 0x84 response) — only the protocol version in the low 7
    /// bits is validated here; callers that only expect responses check
    /// `is_response()` separately. Does not validate the opcode; callers
    /// match it against the request/response opcode tables.
    pub fn decode(buf: &[u8]) -> Result<Header, ProtocolViolation> {
        if buf.len() < HEADER_LEN {
            return Err(ProtocolViolation::TruncatedBody { declared: HEADER_LEN, available: buf.len() });
        }
        let version = buf[0];
        if version & 0x7f != REQUEST_VERSION {
            return Err(ProtocolViolation::BadVersion(version));
        }
        let flags = HeaderFlags(buf[1]);
        let stream = i16::from_be_bytes([buf[2], buf[3]]);
        let opcode = buf[4];
        let body_len = u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]);
        Ok(Header { version, flags, stream, opcode, body_len })
    }

    pub fn encode_request(stream: i16, opcode: u8, flags: HeaderFlags, body_len: u32, out: &mut BytesMut) {
        out.put_u8(REQUEST_VERSION);
        out.put_u8(flags.0);
        out.put_i16(stream);
        out.put_u8(opcode);
        out.put_u32(body_len);
    }
}

/// An assembled frame ready to write, or freshly read off the wire.
#[derive(Debug, Clone)]
pub struct Frame {
    pub stream: i16,
    pub opcode: u8,
    pub flags: HeaderFlags,
    pub body: Bytes,
}

impl Frame {
    /// Encodes a request frame, compressing the body first unless `opcode`
    /// is STARTUP or OPTIONS (the protocol forbids compressing those, since
    /// the peer hasn't negotiated an algorithm for them yet) or no
    /// compressor is configured.
    pub fn encode_request(
        stream: i16,
        opcode: u8,
        body: &[u8],
        compressor: Option<&dyn crate::compression::Compressor>,
    ) -> BytesMut {
        let (flags, payload): (HeaderFlags, std::borrow::Cow<'_, [u8]>) = match compressor {
            Some(c) if crate::protocol::request::OpCode::is_compressible(opcode) => {
                (HeaderFlags(HeaderFlags::COMPRESSION), std::borrow::Cow::Owned(c.compress(body)))
            }
            _ => (HeaderFlags(0), std::borrow::Cow::Borrowed(body)),
        };
        let mut out = BytesMut::with_capacity(HEADER_LEN + payload.len());
        Header::encode_request(stream, opcode, flags, payload.len() as u32, &mut out);
        out.put_slice(&payload);
        out
    }

    /// Decodes a response body, decompressing it first if the COMPRESSION
    /// flag is set.
    pub fn decode_response(
        header: Header,
        mut body: Bytes,
        decompressor: Option<&dyn crate::compression::Compressor>,
    ) -> Result<Frame, ProtocolViolation> {
        if !header.is_response() {
            return Err(ProtocolViolation::BadVersion(header.version));
        }
        if header.flags.contains(HeaderFlags::COMPRESSION) {
            let decompressor = decompressor.ok_or(ProtocolViolation::UnexpectedMessage {
                found: header.opcode,
                phase: "compressed frame arrived with no compressor configured",
            })?;
            body = Bytes::from(decompressor.decompress(&body).map_err(|_| ProtocolViolation::UnexpectedMessage {
                found: header.opcode,
                phase: "decompression",
            })?);
        }
        Ok(Frame { stream: header.stream, opcode: header.opcode, flags: header.flags, body })
    }
}

/// Scans `buf` for one complete frame (header + body), returning its byte
/// length if present. Callers keep accumulating into `buf` until this
/// returns `Some`.
pub fn next_frame_len(buf: &[u8]) -> Result<Option<usize>, ProtocolViolation> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    let header = Header::decode(buf)?;
    let total = HEADER_LEN + header.body_len as usize;
    if buf.len() < total {
        return Ok(None);
    }
    Ok(Some(total))
}

/// Splits one decoded header + raw body out of `buf`, advancing past it.
pub fn split_frame(buf: &mut BytesMut) -> Result<Option<(Header, Bytes)>, ProtocolViolation> {
    match next_frame_len(buf)? {
        None => Ok(None),
        Some(total) => {
            let header = Header::decode(&buf[..HEADER_LEN])?;
            let mut frame = buf.split_to(total);
            frame.advance(HEADER_LEN);
            Ok(Some((header, frame.freeze())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let mut buf = BytesMut::new();
        Header::encode_request(7, 0x07, HeaderFlags(0), 42, &mut buf);
        let header = Header::decode(&buf).unwrap();
        assert_eq!(header.stream, 7);
        assert_eq!(header.opcode, 0x07);
        assert_eq!(header.body_len, 42);
        assert!(!header.is_response());
    }

    #[test]
    fn requests_are_not_responses() {
        let mut buf = BytesMut::new();
        Header::encode_request(1, 0x07, HeaderFlags(0), 0, &mut buf);
        let header = Header::decode(&buf).unwrap();
        assert!(!header.is_response());
    }

    #[test]
    fn rejects_unknown_protocol_version() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x03); // protocol v3, unsupported
        buf.put_u8(0);
        buf.put_i16(0);
        buf.put_u8(0);
        buf.put_u32(0);
        assert!(matches!(Header::decode(&buf), Err(ProtocolViolation::BadVersion(0x03))));
    }

    #[test]
    fn response_header_decodes() {
        let mut buf = BytesMut::new();
        buf.put_u8(RESPONSE_VERSION);
        buf.put_u8(0);
        buf.put_i16(5);
        buf.put_u8(0x08);
        buf.put_u32(0);
        let header = Header::decode(&buf).unwrap();
        assert!(header.is_response());
        assert_eq!(header.stream, 5);
    }

    #[test]
    fn next_frame_len_waits_for_full_body() {
        let mut buf = BytesMut::new();
        Header::encode_request(1, 0x07, HeaderFlags(0), 4, &mut buf);
        assert_eq!(next_frame_len(&buf).unwrap(), None);
        buf.put_slice(&[1, 2, 3, 4]);
        assert_eq!(next_frame_len(&buf).unwrap(), Some(HEADER_LEN + 4));
    }

    #[test]
    fn split_frame_advances_buffer() {
        let mut buf = BytesMut::new();
        Header::encode_request(1, 0x07, HeaderFlags(0), 2, &mut buf);
        buf.put_slice(&[9, 9]);
        buf.put_u8(0xff); // start of a second, unrelated frame
        let (header, body) = split_frame(&mut buf).unwrap().unwrap();
        assert_eq!(header.opcode, 0x07);
        assert_eq!(&body[..], &[9, 9]);
        assert_eq!(buf.len(), 1);
    }
}
