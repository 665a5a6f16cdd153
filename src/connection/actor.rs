//! The per-connection actor: owns the one TCP socket, multiplexes concurrent
//! requests over CQL stream ids, and demultiplexes responses back to their
//! caller.
//!
//! A task owning shared state (a free list of stream ids, plus the table of
//! in-flight responders) driven by `mpsc` channels. The socket's read half
//! and write half are split (`tokio::io::split`) into two plain `async fn`
//! loops sharing a `Mutex`-guarded stream table — two futures that would
//! otherwise need to mutably borrow the same socket inside one
//! `tokio::select!` can't, so splitting the halves sidesteps that entirely.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot};

use crate::common::trace;
use crate::compression::Compressor;
use crate::error::{ConnectionError, Error};
use crate::net::Socket;
use crate::protocol::frame::{self, Frame, Header};
use crate::protocol::response::Event;

/// Stream ids are a signed 16-bit range; `-1` is reserved for server-pushed
/// `EVENT`s, so usable request ids are `0..32767`.
const MAX_STREAMS: i16 = 32767;

type Respond = oneshot::Sender<Result<(Header, Bytes), Error>>;

pub(crate) enum ActorMessage {
    Request { stream: i16, opcode: u8, body: BytesMut },
}

#[derive(Clone)]
pub(crate) struct ActorHandle {
    send: mpsc::UnboundedSender<ActorMessage>,
    table: Arc<Mutex<StreamTable>>,
    events: Arc<Mutex<Option<mpsc::UnboundedReceiver<Event>>>>,
    request_timeout: Duration,
}

impl ActorHandle {
    /// Reserves a stream id up front (rather than leaving it to `write_loop`)
    /// so a client-side timeout below can poison the exact id this request
    /// used, instead of guessing.
    pub(crate) async fn request(&self, opcode: u8, body: BytesMut) -> Result<(Header, Bytes), Error> {
        let (respond, rx) = oneshot::channel();
        let stream = {
            let mut table = self.table.lock().expect("stream table lock poisoned");
            match table.acquire() {
                Some(stream) => {
                    table.register(stream, respond);
                    stream
                }
                None => return Err(Error::connection(ConnectionError::NotConnected)),
            }
        };

        if self.send.send(ActorMessage::Request { stream, opcode, body }).is_err() {
            self.table.lock().expect("stream table lock poisoned").release(stream);
            return Err(Error::connection(ConnectionError::Closed));
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::connection(ConnectionError::Closed)),
            Err(_) => {
                self.table.lock().expect("stream table lock poisoned").poison(stream);
                Err(Error::Timeout)
            }
        }
    }

    /// Takes ownership of the event receiver; only the control connection
    /// (`cluster/control.rs`) calls this, once.
    pub(crate) fn take_events(&self) -> Option<mpsc::UnboundedReceiver<Event>> {
        self.events.lock().expect("event receiver lock poisoned").take()
    }
}

struct StreamTable {
    free: Vec<i16>,
    pending: HashMap<i16, Respond>,
    /// Ids given up on client-side (timed out) but not yet confirmed idle:
    /// the server may still reply on them. Kept out of `free` until that
    /// reply arrives (or the connection closes), so a late response can't
    /// alias onto a stream id some other request has since reused.
    poisoned: HashSet<i16>,
}

impl StreamTable {
    fn new() -> StreamTable {
        StreamTable { free: (0..MAX_STREAMS).rev().collect(), pending: HashMap::new(), poisoned: HashSet::new() }
    }

    fn acquire(&mut self) -> Option<i16> {
        self.free.pop()
    }

    fn register(&mut self, stream: i16, respond: Respond) {
        self.pending.insert(stream, respond);
    }

    /// Marks `stream` as given up on: its responder is dropped so a late
    /// response is silently discarded, but the id does not rejoin `free`
    /// here — see `release`.
    fn poison(&mut self, stream: i16) {
        self.pending.remove(&stream);
        self.poisoned.insert(stream);
    }

    /// Releases `stream` back to the pool on a genuine response or a write
    /// failure. Returns the responder to notify, if there still is one — a
    /// poisoned stream has none, since `poison` already dropped it.
    fn release(&mut self, stream: i16) -> Option<Respond> {
        self.free.push(stream);
        if self.poisoned.remove(&stream) { None } else { self.pending.remove(&stream) }
    }

    fn fail_all(&mut self, make_err: impl Fn() -> Error) {
        for (_, respond) in self.pending.drain() {
            let _ = respond.send(Err(make_err()));
        }
        self.poisoned.clear();
    }
}

/// Spawns the reader and writer loops for a freshly handshaken connection.
pub(crate) fn spawn(socket: Socket, compressor: Option<Arc<dyn Compressor>>, request_timeout: Duration) -> ActorHandle {
    let (send, recv) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let table = Arc::new(Mutex::new(StreamTable::new()));
    let (read_half, write_half) = tokio::io::split(socket);

    tokio::spawn(write_loop(write_half, recv, table.clone(), compressor.clone()));
    tokio::spawn(read_loop(read_half, table.clone(), compressor, event_tx));

    ActorHandle { send, table, events: Arc::new(Mutex::new(Some(event_rx))), request_timeout }
}

async fn write_loop(
    mut write_half: WriteHalf<Socket>,
    mut recv: mpsc::UnboundedReceiver<ActorMessage>,
    table: Arc<Mutex<StreamTable>>,
    compressor: Option<Arc<dyn Compressor>>,
) {
    while let Some(ActorMessage::Request { stream, opcode, body }) = recv.recv().await {
        let frame = Frame::encode_request(stream, opcode, &body, compressor.as_deref());
        if let Err(e) = write_half.write_all(&frame).await {
            if let Some(respond) = table.lock().expect("stream table lock poisoned").release(stream) {
                let _ = respond.send(Err(Error::Io(e)));
            }
            break;
        }
    }
}

async fn read_loop(
    mut read_half: ReadHalf<Socket>,
    table: Arc<Mutex<StreamTable>>,
    compressor: Option<Arc<dyn Compressor>>,
    events: mpsc::UnboundedSender<Event>,
) {
    let mut buf = BytesMut::with_capacity(8 * 1024);
    loop {
        match next_frame(&mut buf, compressor.as_deref()) {
            Ok(Some((header, body))) => {
                trace!("(R) stream={} opcode={:#04x} len={}", header.stream, header.opcode, body.len());
                if header.stream == -1 {
                    if let Ok(event) = Event::decode(body) {
                        let _ = events.send(event);
                    }
                    continue;
                }
                let respond = table.lock().expect("stream table lock poisoned").release(header.stream);
                if let Some(respond) = respond {
                    let _ = respond.send(Ok((header, body)));
                }
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                table.lock().expect("stream table lock poisoned").fail_all(|| clone_error(&e));
                return;
            }
        }

        match read_half.read_buf(&mut buf).await {
            Ok(0) => {
                table
                    .lock()
                    .expect("stream table lock poisoned")
                    .fail_all(|| Error::connection(ConnectionError::Closed));
                return;
            }
            Ok(_) => {}
            Err(e) => {
                table.lock().expect("stream table lock poisoned").fail_all(|| Error::Io(io_error_kind(&e)));
                return;
            }
        }
    }
}

fn next_frame(buf: &mut BytesMut, compressor: Option<&dyn Compressor>) -> Result<Option<(Header, Bytes)>, Error> {
    let Some((header, body)) = frame::split_frame(buf)? else {
        return Ok(None);
    };
    let frame = Frame::decode_response(header, body, compressor)?;
    Ok(Some((header, frame.body)))
}

fn clone_error(e: &Error) -> Error {
    match e {
        Error::Protocol(p) => Error::Protocol(clone_protocol_violation(p)),
        _ => Error::connection(ConnectionError::Closed),
    }
}

fn clone_protocol_violation(p: &crate::error::ProtocolViolation) -> crate::error::ProtocolViolation {
    use crate::error::ProtocolViolation::*;
    match p {
        BadVersion(v) => BadVersion(*v),
        UnknownOpcode(v) => UnknownOpcode(*v),
        TruncatedBody { declared, available } => TruncatedBody { declared: *declared, available: *available },
        UnexpectedMessage { found, phase } => UnexpectedMessage { found: *found, phase },
    }
}

fn io_error_kind(e: &std::io::Error) -> std::io::Error {
    std::io::Error::from(e.kind())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release_roundtrip_a_stream_id() {
        let mut table = StreamTable::new();
        let stream = table.acquire().unwrap();
        let (respond, _rx) = oneshot::channel();
        table.register(stream, respond);
        assert!(table.release(stream).is_some());
    }

    #[test]
    fn poisoned_stream_stays_out_of_free_until_released() {
        let mut table = StreamTable::new();
        let stream = table.acquire().unwrap();
        let (respond, _rx) = oneshot::channel();
        table.register(stream, respond);

        table.poison(stream);
        assert!(!table.free.contains(&stream), "poisoned id must not be reusable yet");

        let responded = table.release(stream);
        assert!(responded.is_none(), "a poisoned stream's responder was already dropped");
        assert!(table.free.contains(&stream), "the late response should finally free the id");
    }

    #[tokio::test]
    async fn request_times_out_and_poisons_its_stream() {
        let table = Arc::new(Mutex::new(StreamTable::new()));
        let (send, mut recv) = mpsc::unbounded_channel();
        let handle = ActorHandle {
            send,
            table: table.clone(),
            events: Arc::new(Mutex::new(None)),
            request_timeout: Duration::from_millis(20),
        };

        let result = handle.request(0, BytesMut::new()).await;
        assert!(matches!(result, Err(Error::Timeout)));

        let ActorMessage::Request { stream, .. } = recv.recv().await.unwrap();
        assert!(table.lock().unwrap().poisoned.contains(&stream));
    }
}
