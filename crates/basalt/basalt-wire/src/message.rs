//! Typed messages and their wire encoding.
//!
//! In process, every payload is a strongly typed struct behind one variant of
//! [`Body`]; on the wire it travels as self-describing key/value JSON under a
//! `kind` tag, framed by the length prefix from [`crate::framing`]. The two
//! views are the same data: `decode(encode(m)) == m` for any message whose
//! floats are finite.

use crate::error::WireError;
use crate::framing::{self, LEN_PREFIX, MAX_FRAME_LEN};
use basalt_util::now_secs;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// One (price, size) level as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub size: f64,
}

/// Snapshot of one symbol's synthetic book, streamed by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub symbol: String,
    /// Best-first: descending price.
    pub bids: Vec<Level>,
    /// Best-first: ascending price.
    pub asks: Vec<Level>,
    pub last_price: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

/// News sentiment for one symbol, score in [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub symbol: String,
    pub tone: Tone,
    pub score: f64,
    pub headline: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

/// An order emitted by the strategy, with the signal context that caused it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub quantity: u32,
    pub price_change: f64,
    pub sentiment: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecStatus {
    Filled,
    Rejected,
}

/// Result of a simulated fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub execution_id: String,
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: u32,
    pub order_price: f64,
    pub execution_price: f64,
    pub status: ExecStatus,
}

/// Message body: one variant per wire kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum Body {
    #[serde(rename = "MARKET_DATA")]
    MarketData(MarketData),
    #[serde(rename = "SENTIMENT")]
    Sentiment(Sentiment),
    #[serde(rename = "ORDER")]
    Order(Order),
    #[serde(rename = "EXECUTION")]
    Execution(Execution),
    #[serde(rename = "HEARTBEAT")]
    Heartbeat,
    #[serde(rename = "SHUTDOWN")]
    Shutdown,
}

/// A discrete unit of communication: a kind-tagged payload plus the creation
/// timestamp in float seconds since the epoch (microsecond precision survives
/// the round trip; JSON prints the shortest representation that parses back
/// to the identical f64).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub ts: f64,
    #[serde(flatten)]
    pub body: Body,
}

impl Message {
    pub fn new(body: Body) -> Self {
        Self {
            ts: now_secs(),
            body,
        }
    }

    pub fn heartbeat() -> Self {
        Self::new(Body::Heartbeat)
    }

    pub fn shutdown() -> Self {
        Self::new(Body::Shutdown)
    }

    pub fn kind(&self) -> &'static str {
        match self.body {
            Body::MarketData(_) => "MARKET_DATA",
            Body::Sentiment(_) => "SENTIMENT",
            Body::Order(_) => "ORDER",
            Body::Execution(_) => "EXECUTION",
            Body::Heartbeat => "HEARTBEAT",
            Body::Shutdown => "SHUTDOWN",
        }
    }

    /// Serialize to one complete frame: length prefix plus JSON payload.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let payload = self.to_payload()?;
        let mut out = Vec::with_capacity(LEN_PREFIX + payload.len());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Deserialize a frame payload (prefix already stripped).
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(payload).map_err(WireError::Decoding)
    }

    /// Read one framed message from the source.
    ///
    /// `Ok(None)` means the peer closed the stream at a frame boundary.
    /// The payload is never deserialized before all of its bytes arrived.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Option<Self>, WireError> {
        match framing::read_frame(r)? {
            Some(payload) => Ok(Some(Self::decode(&payload)?)),
            None => Ok(None),
        }
    }

    /// Write this message as one frame.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), WireError> {
        let payload = self.to_payload()?;
        framing::write_frame(w, &payload)
    }

    fn to_payload(&self) -> Result<Vec<u8>, WireError> {
        self.ensure_representable()?;
        let bytes =
            serde_json::to_vec(self).map_err(|_| WireError::Encoding("serialization failed"))?;
        if bytes.len() > MAX_FRAME_LEN {
            return Err(WireError::OversizedFrame {
                got: bytes.len(),
                max: MAX_FRAME_LEN,
            });
        }
        Ok(bytes)
    }

    /// JSON cannot carry NaN or infinities; reject them before any bytes are
    /// produced rather than let the encoder degrade them to `null`.
    fn ensure_representable(&self) -> Result<(), WireError> {
        fn levels_ok(levels: &[Level]) -> bool {
            levels.iter().all(|l| l.price.is_finite() && l.size.is_finite())
        }

        if !self.ts.is_finite() {
            return Err(WireError::Encoding("non-finite timestamp"));
        }
        let ok = match &self.body {
            Body::MarketData(md) => {
                md.last_price.is_finite() && levels_ok(&md.bids) && levels_ok(&md.asks)
            }
            Body::Sentiment(s) => s.score.is_finite(),
            Body::Order(o) => {
                o.price.is_finite() && o.price_change.is_finite() && o.sentiment.is_finite()
            }
            Body::Execution(e) => e.order_price.is_finite() && e.execution_price.is_finite(),
            Body::Heartbeat | Body::Shutdown => true,
        };
        if ok {
            Ok(())
        } else {
            Err(WireError::Encoding("non-finite numeric field"))
        }
    }
}
