//! The CQL binary protocol v4 wire format.
//!
//! - [`frame`] — the 9-byte header and the compress/decompress envelope
//!   around a message body.
//! - [`codec`] — primitive `[short]`/`[int]`/`[string]`/`[bytes]`/… get/put
//!   helpers shared by every message.
//! - [`types`] — the closed set of CQL type descriptors and their wire ids.
//! - [`request`] — opcodes and builders for the client-to-server messages
//!   (STARTUP, QUERY, PREPARE, EXECUTE, BATCH, REGISTER, …).
//! - [`response`] — opcodes and parsers for the server-to-client messages
//!   (ERROR, READY, RESULT, EVENT, …).
//!
//! Split by message direction rather than by query mode: every request on
//! a connection goes through the same opcode set, there's no separate
//! simple/extended query path.
pub mod codec;
pub mod frame;
pub mod request;
pub mod response;
pub mod types;
