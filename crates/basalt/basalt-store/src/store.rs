//! Writer and reader handles over the shared book region.
//!
//! Exactly one process holds a [`BookWriter`] (single-writer discipline, by
//! convention); any number of processes hold [`BookReader`]s. Readers never
//! block the writer: consistency comes from the per-slot seqlock, and a read
//! that keeps racing writes fails with [`StoreError::InconsistentRead`]
//! after a small bounded number of attempts instead of spinning.

use crate::error::StoreError;
use crate::layout::{
    BOOK_MAGIC, BOOK_VERSION, BookHeader, BookSlot, BookState, DEPTH, PriceLevel, Symbol,
    bytes_for_region,
};
use basalt_shm::{ShmRegion, ShmRegionMut};
use basalt_util::now_secs;
use std::mem::size_of;
use std::path::Path;
use std::ptr;

/// Consistent-read attempts before a read reports contention.
pub const READ_RETRIES: usize = 3;

/// A consistent copy of one symbol's book, taken under the seqlock.
///
/// `sequence` counts mutations: 0 before the first write, +1 per write,
/// strictly increasing. Two snapshots of the same slot with equal sequences
/// hold identical state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBookSnapshot {
    pub symbol: Symbol,
    pub sequence: u64,
    state: BookState,
}

impl OrderBookSnapshot {
    pub fn last_update_ts(&self) -> f64 {
        self.state.last_update_ts
    }

    /// Resting bids, best (highest price) first.
    pub fn bids(&self) -> &[PriceLevel] {
        &self.state.bids[..(self.state.n_bids as usize).min(DEPTH)]
    }

    /// Resting asks, best (lowest price) first.
    pub fn asks(&self) -> &[PriceLevel] {
        &self.state.asks[..(self.state.n_asks as usize).min(DEPTH)]
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids().first().copied()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks().first().copied()
    }

    /// Midpoint of the touch, when both sides rest.
    pub fn mid(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => Some((b.price + a.price) / 2.0),
            _ => None,
        }
    }
}

/// The single mutating handle to a book region.
pub struct BookWriter {
    _region: ShmRegionMut,
    base: *mut u8,
    symbols: Vec<Symbol>,
}

// SAFETY: `base` points into the mapping owned by `_region`, which moves with
// the struct; cross-thread visibility of slot contents is governed by the
// seqlock's atomic sequence word.
unsafe impl Send for BookWriter {}

impl BookWriter {
    /// Create a fresh region with one slot per symbol.
    ///
    /// An existing region of the same name is a collision: the caller either
    /// reclaims it (`unlink`, then retry) or aborts startup.
    pub fn create<P: AsRef<Path>>(path: P, symbols: &[Symbol]) -> Result<Self, StoreError> {
        Self::check_symbol_table(symbols)?;
        let bytes = bytes_for_region(symbols.len());
        let region = ShmRegionMut::create(&path, bytes as u64)
            .map_err(|source| StoreError::Allocation {
                path: path.as_ref().display().to_string(),
                source,
            })?;
        Ok(Self::init_region(region, symbols))
    }

    /// Attach to an existing compatible region, or create one if absent.
    ///
    /// A present-but-incompatible region (other layout, other symbol table)
    /// fails with [`StoreError::Incompatible`] rather than being silently
    /// overwritten.
    pub fn open_or_create<P: AsRef<Path>>(path: P, symbols: &[Symbol]) -> Result<Self, StoreError> {
        Self::check_symbol_table(symbols)?;
        match ShmRegionMut::open(&path) {
            Ok(region) => Self::attach(region, symbols),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::create(path, symbols),
            Err(source) => Err(StoreError::Allocation {
                path: path.as_ref().display().to_string(),
                source,
            }),
        }
    }

    fn check_symbol_table(symbols: &[Symbol]) -> Result<(), StoreError> {
        if symbols.is_empty() {
            return Err(StoreError::Incompatible("symbol table is empty"));
        }
        for (i, sym) in symbols.iter().enumerate() {
            if symbols[..i].contains(sym) {
                return Err(StoreError::InvalidSymbol(sym.to_string()));
            }
        }
        Ok(())
    }

    fn init_region(mut region: ShmRegionMut, symbols: &[Symbol]) -> Self {
        let base = region.as_mut_ptr();

        // SAFETY: the region was just created with exactly
        // bytes_for_region(symbols.len()) bytes and no other process can have
        // attached yet.
        unsafe {
            let header = base as *mut BookHeader;
            ptr::write(
                header,
                BookHeader {
                    magic: BOOK_MAGIC,
                    version: BOOK_VERSION,
                    slot_count: symbols.len() as u64,
                    slot_size: size_of::<BookSlot>() as u64,
                    depth: DEPTH as u64,
                },
            );

            let slots = base.add(size_of::<BookHeader>()) as *mut BookSlot;
            for (i, sym) in symbols.iter().enumerate() {
                let slot = &mut *slots.add(i);
                slot.symbol = sym.raw();
                slot.lock.init();
            }
        }

        Self {
            _region: region,
            base,
            symbols: symbols.to_vec(),
        }
    }

    fn attach(mut region: ShmRegionMut, symbols: &[Symbol]) -> Result<Self, StoreError> {
        if region.len() < size_of::<BookHeader>() {
            return Err(StoreError::Incompatible("region smaller than header"));
        }
        let base = region.as_mut_ptr();

        // SAFETY: length checked above; validate() rejects anything that is
        // not a book region of this exact layout.
        let header = unsafe { &*(base as *const BookHeader) };
        header.validate().map_err(StoreError::Incompatible)?;

        if header.slot_count as usize != symbols.len() {
            return Err(StoreError::Incompatible("slot count differs"));
        }
        if region.len() != bytes_for_region(symbols.len()) {
            return Err(StoreError::Incompatible("region size mismatch"));
        }

        let slots = unsafe { base.add(size_of::<BookHeader>()) as *const BookSlot };
        for (i, sym) in symbols.iter().enumerate() {
            let stored = unsafe { (*slots.add(i)).symbol };
            if stored != sym.raw() {
                return Err(StoreError::Incompatible("symbol table differs"));
            }
        }

        Ok(Self {
            _region: region,
            base,
            symbols: symbols.to_vec(),
        })
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Overwrite one symbol's book and publish it as the next generation.
    ///
    /// Levels must arrive best-first (bids descending, asks ascending);
    /// anything beyond [`DEPTH`] per side is dropped. Stamps
    /// `last_update_ts` and returns the new sequence, which is exactly one
    /// above the previous.
    pub fn write(
        &mut self,
        symbol: Symbol,
        bids: &[(f64, f64)],
        asks: &[(f64, f64)],
    ) -> Result<u64, StoreError> {
        let idx = self.index_of(symbol)?;

        debug_assert!(
            bids.windows(2).all(|w| w[0].0 >= w[1].0),
            "bids must be best-first (descending)"
        );
        debug_assert!(
            asks.windows(2).all(|w| w[0].0 <= w[1].0),
            "asks must be best-first (ascending)"
        );

        let mut state = BookState {
            last_update_ts: now_secs(),
            ..BookState::default()
        };
        for (i, &(price, size)) in bids.iter().take(DEPTH).enumerate() {
            state.bids[i] = PriceLevel { price, size };
            state.n_bids = (i + 1) as u32;
        }
        for (i, &(price, size)) in asks.iter().take(DEPTH).enumerate() {
            state.asks[i] = PriceLevel { price, size };
            state.n_asks = (i + 1) as u32;
        }

        let raw = self.slot_mut(idx).lock.write(state);
        Ok(raw >> 1)
    }

    fn index_of(&self, symbol: Symbol) -> Result<usize, StoreError> {
        self.symbols
            .iter()
            .position(|s| *s == symbol)
            .ok_or_else(|| StoreError::UnknownSymbol(symbol.to_string()))
    }

    #[inline(always)]
    fn slot_mut(&mut self, idx: usize) -> &mut BookSlot {
        // SAFETY: idx comes from index_of, bounded by the slot table written
        // at creation.
        let slots = unsafe { self.base.add(size_of::<BookHeader>()) as *mut BookSlot };
        unsafe { &mut *slots.add(idx) }
    }
}

/// A read-only handle; any number may attach concurrently.
pub struct BookReader {
    _region: ShmRegion,
    base: *const u8,
    symbols: Vec<Symbol>,
}

// SAFETY: as for BookWriter; readers only ever copy out of the mapping under
// the seqlock protocol, so sharing a reader across threads is also sound.
unsafe impl Send for BookReader {}
unsafe impl Sync for BookReader {}

impl BookReader {
    /// Attach to an existing region read-only and load its symbol table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let region = ShmRegion::open(&path).map_err(|source| StoreError::Allocation {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        if region.len() < size_of::<BookHeader>() {
            return Err(StoreError::Incompatible("region smaller than header"));
        }
        let base = region.as_ptr();

        // SAFETY: length checked above; validate() rejects foreign layouts.
        let header = unsafe { &*(base as *const BookHeader) };
        header.validate().map_err(StoreError::Incompatible)?;

        let slot_count = header.slot_count as usize;
        if region.len() != bytes_for_region(slot_count) {
            return Err(StoreError::Incompatible("region size mismatch"));
        }

        let slots = unsafe { base.add(size_of::<BookHeader>()) as *const BookSlot };
        let symbols = (0..slot_count)
            .map(|i| Symbol::from_raw(unsafe { (*slots.add(i)).symbol }))
            .collect();

        Ok(Self {
            _region: region,
            base,
            symbols,
        })
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Copy out one symbol's book without blocking the writer.
    ///
    /// Retries up to [`READ_RETRIES`] times when a concurrent write tears the
    /// copy, then fails with [`StoreError::InconsistentRead`]; the returned
    /// snapshot is always from a single generation.
    pub fn read(&self, symbol: Symbol) -> Result<OrderBookSnapshot, StoreError> {
        let idx = self.index_of(symbol)?;
        match self.slot(idx).lock.try_read(READ_RETRIES) {
            Some((raw, state)) => Ok(OrderBookSnapshot {
                symbol,
                sequence: raw >> 1,
                state,
            }),
            None => Err(StoreError::InconsistentRead {
                attempts: READ_RETRIES,
            }),
        }
    }

    /// Best resting bid, or `None` when no bid interest exists.
    pub fn best_bid(&self, symbol: Symbol) -> Result<Option<PriceLevel>, StoreError> {
        Ok(self.read(symbol)?.best_bid())
    }

    /// Best resting ask, or `None` when no ask interest exists.
    pub fn best_ask(&self, symbol: Symbol) -> Result<Option<PriceLevel>, StoreError> {
        Ok(self.read(symbol)?.best_ask())
    }

    fn index_of(&self, symbol: Symbol) -> Result<usize, StoreError> {
        self.symbols
            .iter()
            .position(|s| *s == symbol)
            .ok_or_else(|| StoreError::UnknownSymbol(symbol.to_string()))
    }

    #[inline(always)]
    fn slot(&self, idx: usize) -> &BookSlot {
        // SAFETY: idx comes from index_of; slot table size was validated on
        // open.
        let slots = unsafe { self.base.add(size_of::<BookHeader>()) as *const BookSlot };
        unsafe { &*slots.add(idx) }
    }
}

/// Destroy a region by name. Idempotent: unlinking an absent region is a
/// no-op. Only the process responsible for teardown should call this.
pub fn unlink<P: AsRef<Path>>(path: P) -> Result<(), StoreError> {
    basalt_shm::unlink(&path).map_err(|source| StoreError::Allocation {
        path: path.as_ref().display().to_string(),
        source,
    })
}
