//! Length-prefixed framing over a byte stream.
//!
//! Wire unit: `[len: u32 big-endian][payload: len bytes]`. The prefix always
//! equals the exact payload length; payload bytes are never interpreted until
//! all `len` of them have arrived. Zero-length payloads are legal frames.
//!
//! Short reads are accumulated, not treated as malformed: the underlying
//! source may hand back one byte at a time and decoding still succeeds.

use crate::error::WireError;
use std::io::{self, Read, Write};

/// Width of the length prefix in bytes.
pub const LEN_PREFIX: usize = 4;

/// Largest payload either side may produce or accept. Checked against the
/// declared length before the payload buffer is allocated.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

enum Fill {
    Full,
    /// Stream ended before the first byte of the buffer: a clean close.
    CleanEof,
    /// Stream ended with the buffer partially filled.
    Truncated,
}

/// Read exactly `buf.len()` bytes, retrying short reads.
fn fill<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<Fill, WireError> {
    let mut got = 0usize;
    while got < buf.len() {
        match r.read(&mut buf[got..]) {
            Ok(0) => {
                return Ok(if got == 0 { Fill::CleanEof } else { Fill::Truncated });
            }
            Ok(n) => got += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(WireError::from(e)),
        }
    }
    Ok(Fill::Full)
}

/// Write one frame: prefix, then payload.
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> Result<(), WireError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(WireError::OversizedFrame {
            got: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }
    w.write_all(&(payload.len() as u32).to_be_bytes())?;
    w.write_all(payload)?;
    w.flush()?;
    Ok(())
}

/// Read exactly one frame's payload.
///
/// `Ok(None)` means the peer closed the stream at a frame boundary. A close
/// after a partial prefix or partial payload is a framing error, and a
/// declared length above [`MAX_FRAME_LEN`] is rejected without allocating it.
pub fn read_frame<R: Read>(r: &mut R) -> Result<Option<Vec<u8>>, WireError> {
    let mut prefix = [0u8; LEN_PREFIX];
    match fill(r, &mut prefix)? {
        Fill::Full => {}
        Fill::CleanEof => return Ok(None),
        Fill::Truncated => return Err(WireError::Framing("length prefix")),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(WireError::OversizedFrame {
            got: len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut payload = vec![0u8; len];
    if len > 0 {
        match fill(r, &mut payload)? {
            Fill::Full => {}
            Fill::CleanEof | Fill::Truncated => {
                return Err(WireError::Framing("payload"));
            }
        }
    }
    Ok(Some(payload))
}
