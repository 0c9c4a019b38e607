//! Binary layout of the shared book region.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ BookHeader                                                   │
//! │  magic (8B) │ version (8B) │ slot_count (8B) │ slot_size (8B)│
//! │  depth (8B)                                                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │ BookSlot[0]   symbol (8B, padded) │ seq (8B) │ BookState     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ ...                                                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │ BookSlot[slot_count-1]                                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is `#[repr(C)]` so the layout is identical in every attached
//! process, and the header is validated on attach so a mismatched build can
//! never misinterpret slots.

use crate::error::StoreError;
use crate::seqlock::SeqlockSlot;
use std::fmt;
use std::mem::size_of;

/// Region identification. ASCII "BASLBOOK".
pub const BOOK_MAGIC: u64 = 0x4241_534C_424F_4F4B;

/// Bumped on any incompatible layout change; attach rejects a mismatch.
pub const BOOK_VERSION: u64 = 1;

/// Levels retained per book side.
pub const DEPTH: usize = 5;

/// Fixed width of a symbol identifier in the region.
pub const SYMBOL_LEN: usize = 8;

/// A fixed-width, ASCII symbol identifier ("AAPL", "GOOGL", ...).
///
/// Stored inline in each slot; unused trailing bytes are zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol([u8; SYMBOL_LEN]);

impl Symbol {
    pub fn new(s: &str) -> Result<Self, StoreError> {
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > SYMBOL_LEN || !s.is_ascii() {
            return Err(StoreError::InvalidSymbol(s.to_string()));
        }
        let mut raw = [0u8; SYMBOL_LEN];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(SYMBOL_LEN);
        std::str::from_utf8(&self.0[..len]).unwrap_or("")
    }

    pub(crate) fn from_raw(raw: [u8; SYMBOL_LEN]) -> Self {
        Self(raw)
    }

    pub(crate) fn raw(&self) -> [u8; SYMBOL_LEN] {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl std::str::FromStr for Symbol {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// One (price, size) level inside the region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct PriceLevel {
    pub price: f64,
    pub size: f64,
}

/// The seqlock-protected body of one slot.
///
/// Plain old data, `Copy`, and valid as all zeroes: a freshly created region
/// reads as an empty book with `last_update_ts` 0.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct BookState {
    pub last_update_ts: f64,
    pub n_bids: u32,
    pub n_asks: u32,
    pub bids: [PriceLevel; DEPTH],
    pub asks: [PriceLevel; DEPTH],
}

impl Default for BookState {
    fn default() -> Self {
        Self {
            last_update_ts: 0.0,
            n_bids: 0,
            n_asks: 0,
            bids: [PriceLevel::default(); DEPTH],
            asks: [PriceLevel::default(); DEPTH],
        }
    }
}

/// Header at offset 0 of the region.
///
/// Padded to one cache line so the slot array that follows it starts
/// 64-byte aligned (mmap bases are page aligned).
#[derive(Clone, Copy)]
#[repr(C, align(64))]
pub struct BookHeader {
    pub magic: u64,
    pub version: u64,
    pub slot_count: u64,
    pub slot_size: u64,
    pub depth: u64,
}

impl BookHeader {
    /// Reject regions this build cannot safely interpret.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.magic != BOOK_MAGIC {
            return Err("bad magic");
        }
        if self.version != BOOK_VERSION {
            return Err("version mismatch");
        }
        if self.slot_count == 0 {
            return Err("region holds no slots");
        }
        if self.slot_size as usize != size_of::<BookSlot>() {
            return Err("slot size mismatch");
        }
        if self.depth as usize != DEPTH {
            return Err("depth mismatch");
        }
        Ok(())
    }
}

/// One symbol's slot: the identifier plus the locked state.
///
/// The symbol bytes are written once at region creation, before any reader
/// attaches, and are constant afterwards; reading them needs no lock.
#[repr(C, align(64))]
pub struct BookSlot {
    pub(crate) symbol: [u8; SYMBOL_LEN],
    pub(crate) lock: SeqlockSlot<BookState>,
}

/// Total bytes for a region holding `slot_count` symbols.
pub fn bytes_for_region(slot_count: usize) -> usize {
    size_of::<BookHeader>() + slot_count * size_of::<BookSlot>()
}
