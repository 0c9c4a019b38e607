//! Framed message protocol for inter-process streams.
//!
//! Layers, bottom up:
//! - [`framing`] — `[u32 BE length][payload]` frames over any `Read`/`Write`
//! - [`message`] — typed message bodies, JSON payload encoding
//! - [`net`] — framed TCP connections with retries and deadlines

mod error;
pub mod framing;
pub mod message;
pub mod net;

pub use error::WireError;
pub use framing::{LEN_PREFIX, MAX_FRAME_LEN};
pub use message::{
    Body, ExecStatus, Execution, Level, MarketData, Message, Order, Sentiment, Side, Tone,
};
pub use net::FramedConn;
