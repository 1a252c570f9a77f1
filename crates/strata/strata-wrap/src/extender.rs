//! Lock-free extension of a narrow wrapping counter into a wide monotonic one.
//!
//! A narrow hardware counter (the *low* word, `W` bits) wraps quickly. The
//! extender keeps a second word (the *high* word) whose bit 0 mirrors the low
//! word's top bit. The two words overlap by exactly one bit, and that shared
//! bit is what lets the writer and every reader agree on the wrap count
//! without a lock and without any cross-word atomicity.
//!
//! # Protocol
//!
//! **Maintenance (single writer):**
//! 1. Load `hi` and `lo`
//! 2. `diff = (hi & 1) ^ (lo >> (W-1))`
//! 3. `high += diff`
//!
//! **Read (any thread):**
//! 1. Load `hi`, then `lo`
//! 2. Compute the same `diff` and add it to a local copy of `hi`
//! 3. Return `(hi << (W-1)) | lo`
//!
//! The high word advances twice per revolution of the low word: once when the
//! top bit turns on (midpoint) and once when it turns off (wrap). A reader that
//! sees a high word lagging one crossing behind corrects it locally with the
//! same `diff`, so a read right after a wrap is already exact.
//!
//! # Memory Layout
//!
//! ```text
//! wide (2W-1 bits):  [ high ............ ]
//!                                      [ low ............ ]
//!                                      ^ overlapping bit: high bit 0 == low bit W-1
//! ```
//!
//! # Preconditions
//!
//! - Maintenance runs at least once per quarter revolution of the low word,
//!   so at most one crossing is pending when it runs.
//! - A reader's two loads are not separated by more than a quarter revolution.

use std::sync::atomic::Ordering;

use crate::word::{Word, word_mask};

/// Diff bit: 1 when the high word's parity disagrees with the low word's top bit.
#[inline(always)]
pub fn diff_bit<W: Word>(high: W, low: W) -> u64 {
    (high.widen() & 1) ^ (low.widen() >> (W::BITS - 1))
}

/// Reconstructs the wide value from a `(high, low)` snapshot.
///
/// The high word is corrected by the diff bit before the two words are joined,
/// so the snapshot does not need to be freshly maintained.
///
/// # Example
/// ```
/// use strata_wrap::reconstruct;
/// // High word has seen the midpoint but not the wrap; low word already wrapped.
/// assert_eq!(reconstruct::<u8>(1, 5), 256 + 5);
/// ```
#[inline(always)]
pub fn reconstruct<W: Word>(high: W, low: W) -> u64 {
    let high = (high.widen() + diff_bit(high, low)) & word_mask::<W>();
    (high << (W::BITS - 1)) | low.widen()
}

/// The shared pair of words.
///
/// Readers only ever need `&WrapExtender`. Mutation goes through
/// [`WrapWriter`](crate::WrapWriter), which is the single owner of the write
/// side.
///
/// Both words share one cache line; padding keeps neighbours off it.
#[repr(C, align(64))]
#[derive(Debug)]
pub struct WrapExtender<W: Word> {
    /// Raw narrow counter sample, written by the tick source.
    low: W::Atomic,
    /// Crossing count. Only maintenance writes it.
    high: W::Atomic,
}

impl<W: Word> WrapExtender<W> {
    /// Both words start at zero.
    pub fn new() -> Self {
        Self {
            low: W::atomic(W::truncate(0)),
            high: W::atomic(W::truncate(0)),
        }
    }

    /// Reads a consistent wide value.
    ///
    /// Never writes shared state and never blocks. Repeated calls with no
    /// intervening writer activity return the same value.
    ///
    /// # Memory Ordering
    /// `high` is loaded before `low`, both with `Acquire`. A high word published
    /// by maintenance was computed from a low word at least as old as the one
    /// loaded next, so the high word seen here is never ahead of the low word.
    /// It can only lag, and the diff bit fixes a lag of one crossing.
    #[inline(always)]
    pub fn read(&self) -> u64 {
        let hi = W::load(&self.high, Ordering::Acquire);
        let lo = W::load(&self.low, Ordering::Acquire);
        reconstruct(hi, lo)
    }

    /// Current low word.
    pub fn low(&self) -> W {
        W::load(&self.low, Ordering::Acquire)
    }

    /// Current high word.
    pub fn high(&self) -> W {
        W::load(&self.high, Ordering::Acquire)
    }

    #[inline(always)]
    pub(crate) fn store_low(&self, value: W) {
        W::store(&self.low, value, Ordering::Release);
    }

    /// Loads `(high, low)` for maintenance.
    ///
    /// `high` has a single mutator (the caller), so a relaxed load suffices.
    #[inline(always)]
    pub(crate) fn snapshot(&self) -> (W, W) {
        let hi = W::load(&self.high, Ordering::Relaxed);
        let lo = W::load(&self.low, Ordering::Acquire);
        (hi, lo)
    }

    #[inline(always)]
    pub(crate) fn store_high(&self, value: W) {
        W::store(&self.high, value, Ordering::Release);
    }
}

impl<W: Word> Default for WrapExtender<W> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_bit_flags_parity_mismatch() {
        assert_eq!(diff_bit::<u8>(0, 0x7F), 0);
        assert_eq!(diff_bit::<u8>(0, 0x80), 1);
        assert_eq!(diff_bit::<u8>(1, 0x80), 0);
        assert_eq!(diff_bit::<u8>(1, 0x01), 1);
        assert_eq!(diff_bit::<u8>(2, 0x01), 0);
    }

    #[test]
    fn reconstruct_joins_on_overlapping_bit() {
        assert_eq!(reconstruct::<u32>(0, 0), 0);
        assert_eq!(reconstruct::<u32>(1, 0x8000_0000), 0x8000_0000);
        assert_eq!(reconstruct::<u32>(2, 7), (1 << 32) + 7);
        // Lagging high word: corrected locally.
        assert_eq!(reconstruct::<u32>(1, 7), (1 << 32) + 7);
        assert_eq!(reconstruct::<u32>(2, 0x8000_0001), (1 << 32) + 0x8000_0001);
    }

    #[test]
    fn widest_value_fits_in_63_bits() {
        let v = reconstruct::<u32>(u32::MAX, u32::MAX);
        assert_eq!(v, u64::MAX >> 1);
    }

    #[test]
    fn fresh_extender_reads_zero() {
        let ext = WrapExtender::<u16>::new();
        assert_eq!(ext.read(), 0);
        assert_eq!(ext.high(), 0);
        assert_eq!(ext.low(), 0);
    }
}
