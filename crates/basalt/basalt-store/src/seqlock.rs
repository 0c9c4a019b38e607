//! Sequence lock for single-writer, multi-reader slots in shared memory.
//!
//! # Protocol
//!
//! **Writer:**
//! 1. Store seq+1 (odd, "write in progress") with Release
//! 2. Overwrite the data
//! 3. Store seq+2 (even, "stable") with Release
//!
//! **Reader:**
//! 1. Load seq with Acquire; odd means a write is in flight
//! 2. Copy the data
//! 3. Load seq again; any change means the copy is torn
//!
//! Unlike a classic seqlock, reads here are *bounded*: after a fixed number
//! of failed attempts the reader reports the contention to its caller instead
//! of spinning indefinitely. A stalled writer (crashed mid-write, seq stuck
//! odd) therefore degrades to an error, not a livelock.

use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

/// A slot protected by a sequence lock.
///
/// `T` must be `Copy` so a read is a plain bitwise copy that can be discarded
/// when torn. Layout is `#[repr(C)]` and cache-line aligned for mmap use; the
/// sequence word sits first, the payload after it.
///
/// Odd sequence = write in progress, even = stable. The all-zero state
/// (freshly `ftruncate`d region) reads as seq 0 with zeroed data, so `T`'s
/// all-zero bit pattern must be a valid value.
#[repr(C, align(64))]
pub struct SeqlockSlot<T: Copy> {
    seq: AtomicU64,
    data: MaybeUninit<T>,
}

impl<T: Copy> SeqlockSlot<T> {
    /// Reset to the initial stable state (seq 0, data untouched).
    #[inline(always)]
    pub fn init(&mut self) {
        self.seq.store(0, Ordering::Relaxed);
    }

    /// Current raw sequence word.
    #[inline(always)]
    pub fn raw_seq(&self) -> u64 {
        self.seq.load(Ordering::Acquire)
    }

    /// Publish a new value; returns the raw sequence after the write.
    ///
    /// Not safe for concurrent writers on the same slot; the store enforces
    /// the single-writer role by construction (only `BookWriter` can reach
    /// this, and only one process holds the writer mapping by convention).
    #[inline(always)]
    pub fn write(&mut self, value: T) -> u64 {
        let s0 = self.seq.load(Ordering::Relaxed);
        self.seq.store(s0.wrapping_add(1), Ordering::Release);
        // SAFETY: exclusive write access through &mut self; the Release
        // stores around this publish make the bytes visible to readers that
        // observe the even sequence.
        unsafe { self.data.as_mut_ptr().write(value) };
        let s2 = s0.wrapping_add(2);
        self.seq.store(s2, Ordering::Release);
        s2
    }

    /// Attempt a consistent read, at most `attempts` times.
    ///
    /// Returns the raw (even) sequence observed together with the copied
    /// value, or `None` once every attempt raced a concurrent write.
    #[inline(always)]
    pub fn try_read(&self, attempts: usize) -> Option<(u64, T)> {
        for _ in 0..attempts {
            let s1 = self.seq.load(Ordering::Acquire);
            if s1 & 1 == 1 {
                // Write in flight; burn this attempt politely.
                std::hint::spin_loop();
                continue;
            }

            // SAFETY: the region is zero-initialized at creation, and T's
            // all-zero pattern is valid, so the copy is defined even before
            // the first write. Consistency is verified below.
            let v = unsafe { self.data.as_ptr().read() };

            let s2 = self.seq.load(Ordering::Acquire);
            if s1 == s2 {
                return Some((s2, v));
            }
            std::hint::spin_loop();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zeroed_slot() -> Box<SeqlockSlot<[u64; 4]>> {
        // Mirrors a fresh mmap region: all bytes zero.
        unsafe { Box::new(std::mem::zeroed()) }
    }

    #[test]
    fn fresh_slot_reads_as_sequence_zero() {
        let slot = zeroed_slot();
        let (seq, data) = slot.try_read(1).expect("uncontended read");
        assert_eq!(seq, 0);
        assert_eq!(data, [0, 0, 0, 0]);
    }

    #[test]
    fn write_bumps_raw_sequence_by_two() {
        let mut slot = zeroed_slot();
        assert_eq!(slot.write([1, 2, 3, 4]), 2);
        assert_eq!(slot.write([5, 6, 7, 8]), 4);

        let (seq, data) = slot.try_read(1).expect("uncontended read");
        assert_eq!(seq, 4);
        assert_eq!(data, [5, 6, 7, 8]);
    }

    #[test]
    fn read_with_zero_attempts_reports_contention() {
        let slot = zeroed_slot();
        assert!(slot.try_read(0).is_none());
    }
}
