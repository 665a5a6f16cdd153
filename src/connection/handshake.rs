//! Connection setup: OPTIONS/SUPPORTED negotiation, STARTUP, optional
//! authentication, run directly on the raw socket (stream id `0`) before
//! the socket is handed to the steady-state actor.
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::common::trace;
use crate::compression::Compressor;
use crate::connection::config::ConnectionConfig;
use crate::error::{ConnectionError, Error, ProtocolViolation};
use crate::net::Socket;
use crate::protocol::frame::{self, Frame};
use crate::protocol::request::{self, OpCode};
use crate::protocol::response;

/// Performs the handshake and returns the compressor negotiated with the
/// server, if any — the caller hands this to the steady-state actor rather
/// than blindly trusting the locally configured one, since the server may
/// not advertise it.
pub(crate) async fn perform(socket: &mut Socket, config: &ConnectionConfig) -> Result<Option<Arc<dyn Compressor>>, Error> {
    let mut read_buf = BytesMut::with_capacity(4096);

    let supported = request_options(socket, &mut read_buf).await?;
    let compressor = negotiate_compressor(config, &supported);
    let compression_name = compressor.as_ref().map(|c| c.name());

    write_frame(socket, OpCode::Startup as u8, &request::startup_body(compression_name)).await?;
    let (header, body) = read_frame(socket, &mut read_buf).await?;

    match response::OpCode::from_byte(header.opcode)? {
        response::OpCode::Ready => {}
        response::OpCode::Authenticate => {
            let authenticator_class = response::decode_authenticate(body)?;
            authenticate(socket, &mut read_buf, config, &authenticator_class).await?;
        }
        response::OpCode::Error => return Err(response::ServerError::decode(body)?.into()),
        _ => {
            return Err(ProtocolViolation::UnexpectedMessage { found: header.opcode, phase: "handshake" }.into());
        }
    }

    trace!("handshake complete with {}:{} (compression: {compression_name:?})", config.host, config.port);
    Ok(compressor)
}

/// `OPTIONS` / `SUPPORTED`: always sent uncompressed, ahead of STARTUP.
async fn request_options(
    socket: &mut Socket,
    read_buf: &mut BytesMut,
) -> Result<std::collections::HashMap<String, Vec<String>>, Error> {
    write_frame(socket, OpCode::Options as u8, &request::options_body()).await?;
    let (header, body) = read_frame(socket, read_buf).await?;
    match response::OpCode::from_byte(header.opcode)? {
        response::OpCode::Supported => Ok(response::decode_supported(body)?),
        response::OpCode::Error => Err(response::ServerError::decode(body)?.into()),
        _ => Err(ProtocolViolation::UnexpectedMessage { found: header.opcode, phase: "OPTIONS" }.into()),
    }
}

/// Picks the configured compressor if the server's `COMPRESSION` option
/// list names it, else falls back to no compression — a STARTUP naming an
/// algorithm the server never advertised would just get rejected.
fn negotiate_compressor(
    config: &ConnectionConfig,
    supported: &std::collections::HashMap<String, Vec<String>>,
) -> Option<Arc<dyn Compressor>> {
    let configured = config.compressor.as_ref()?;
    let server_algorithms = supported.get("COMPRESSION")?;
    server_algorithms.iter().any(|a| a.eq_ignore_ascii_case(configured.name())).then(|| configured.clone())
}

async fn authenticate(
    socket: &mut Socket,
    read_buf: &mut BytesMut,
    config: &ConnectionConfig,
    authenticator_class: &str,
) -> Result<(), Error> {
    let authenticator = config.authenticator.as_ref().ok_or_else(|| {
        Error::authentication(format!(
            "server requires authenticator {authenticator_class} but none is configured"
        ))
    })?;

    let mut token = authenticator.initial_response(authenticator_class);
    loop {
        write_frame(socket, OpCode::AuthResponse as u8, &request::auth_response_body(&token)).await?;
        let (header, body) = read_frame(socket, read_buf).await?;
        match response::OpCode::from_byte(header.opcode)? {
            response::OpCode::AuthSuccess => return Ok(()),
            response::OpCode::AuthChallenge => {
                let challenge = response::decode_auth_challenge(body)?.unwrap_or_default();
                token = authenticator.evaluate_challenge(&challenge)?;
            }
            response::OpCode::Error => return Err(response::ServerError::decode(body)?.into()),
            _ => {
                return Err(
                    ProtocolViolation::UnexpectedMessage { found: header.opcode, phase: "authentication" }.into(),
                );
            }
        }
    }
}

/// Handshake frames are never compressed: STARTUP precedes negotiation by
/// definition, and this driver keeps the rest of the handshake uncompressed
/// too rather than assume the server already honored the `COMPRESSION`
/// STARTUP option before replying `READY`.
async fn write_frame(socket: &mut Socket, opcode: u8, body: &[u8]) -> Result<(), Error> {
    let frame = Frame::encode_request(0, opcode, body, None);
    socket.write_all(&frame).await.map_err(Error::Io)
}

async fn read_frame(socket: &mut Socket, buf: &mut BytesMut) -> Result<(frame::Header, Bytes), Error> {
    loop {
        if let Some((header, body)) = frame::split_frame(buf)? {
            let frame = Frame::decode_response(header, body, None)?;
            return Ok((header, frame.body));
        }
        let n = socket.read_buf(buf).await?;
        if n == 0 {
            return Err(Error::connection(ConnectionError::Closed));
        }
    }
}
