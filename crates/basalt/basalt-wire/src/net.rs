//! TCP adapter: a point-to-point framed connection.
//!
//! The codec itself ([`crate::framing`], [`crate::message`]) knows nothing
//! about sockets; this module supplies the byte source/sink and the
//! connection-level policies (dial retries, receive deadlines).

use crate::error::WireError;
use crate::message::Message;
use std::io::BufReader;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// One framed TCP connection.
///
/// Reads go through a `BufReader`, so frames that arrived back-to-back in a
/// single segment are decoded one by one without blocking on the socket.
///
/// A `recv` that hits its deadline in the middle of a frame leaves the stream
/// desynchronized (part of the frame was consumed); treat [`WireError::Timeout`]
/// mid-stream as fatal for the connection and reconnect. A deadline that
/// expires while waiting for the *first* byte of a frame is harmless.
pub struct FramedConn {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    peer: SocketAddr,
}

impl FramedConn {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, WireError> {
        let stream = TcpStream::connect(addr)?;
        Self::from_stream(stream)
    }

    /// Dial with bounded retries; processes start in arbitrary order, so the
    /// listener may not be up yet.
    pub fn connect_with_retry<A: ToSocketAddrs + Copy>(
        addr: A,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self, WireError> {
        let mut last = None;
        for attempt in 1..=attempts.max(1) {
            match Self::connect(addr) {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    if attempt < attempts {
                        tracing::warn!(attempt, error = %e, "connect failed, retrying");
                        std::thread::sleep(delay);
                    }
                    last = Some(e);
                }
            }
        }
        Err(last.unwrap_or(WireError::Timeout))
    }

    /// Wrap an already-accepted stream (server side).
    pub fn from_stream(stream: TcpStream) -> Result<Self, WireError> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            peer,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Bound how long a `recv` may block; `None` restores blocking reads.
    pub fn set_recv_timeout(&self, timeout: Option<Duration>) -> Result<(), WireError> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send one message as a single write (prefix and payload together).
    pub fn send(&mut self, msg: &Message) -> Result<(), WireError> {
        use std::io::Write;
        let frame = msg.encode()?;
        self.writer.write_all(&frame)?;
        Ok(())
    }

    /// Receive the next message in stream order.
    ///
    /// `Ok(None)` means the peer closed cleanly; a disconnect is never
    /// reported as a successful read.
    pub fn recv(&mut self) -> Result<Option<Message>, WireError> {
        Message::read_from(&mut self.reader)
    }
}
