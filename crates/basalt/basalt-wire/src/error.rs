use std::io;

/// Everything that can go wrong between a `Message` and the bytes on a stream.
///
/// All variants surface to the caller; a dropped frame is a correctness
/// problem, never a log line.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The payload cannot be represented on the wire (e.g. a non-finite
    /// float, which JSON has no encoding for).
    #[error("payload not representable: {0}")]
    Encoding(&'static str),

    /// The payload bytes are not valid for the declared kind.
    #[error("malformed payload")]
    Decoding(#[source] serde_json::Error),

    /// The stream closed mid-frame, after a partial prefix or partial payload.
    #[error("stream closed mid-frame while reading {0}")]
    Framing(&'static str),

    /// A frame declared (or would require) a length beyond the maximum.
    /// Raised before any payload allocation happens.
    #[error("frame length {got} exceeds maximum {max}")]
    OversizedFrame { got: usize, max: usize },

    /// The caller-specified I/O deadline elapsed.
    #[error("i/o deadline exceeded")]
    Timeout,

    #[error("i/o failure")]
    Io(#[source] io::Error),
}

impl From<io::Error> for WireError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => WireError::Timeout,
            _ => WireError::Io(e),
        }
    }
}
