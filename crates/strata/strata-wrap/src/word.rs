//! Narrow counter word widths.
//!
//! Every width is handled by the same algorithm; the `Word` trait only supplies
//! the bit width and the matching atomic cell. Arithmetic is done in `u64` and
//! truncated back to the word width, so the widest supported word is 32 bits
//! (a `2W - 1` = 63 bit wide value still fits in a `u64`).

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU16, AtomicU32, Ordering};

mod sealed {
    pub trait Sealed {}
}

/// An unsigned word that can be extended by a [`WrapExtender`](crate::WrapExtender).
///
/// Sealed: implemented for `u8`, `u16` and `u32` only.
pub trait Word: sealed::Sealed + Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Bit width `W` of the word.
    const BITS: u32;

    /// Lock-free cell holding one word.
    type Atomic: fmt::Debug + Send + Sync;

    fn atomic(value: Self) -> Self::Atomic;
    fn load(cell: &Self::Atomic, order: Ordering) -> Self;
    fn store(cell: &Self::Atomic, value: Self, order: Ordering);

    /// Zero-extends the word into a `u64`.
    fn widen(self) -> u64;

    /// Keeps the low `W` bits of `value`.
    fn truncate(value: u64) -> Self;
}

macro_rules! impl_word {
    ($word:ty, $atomic:ty) => {
        impl sealed::Sealed for $word {}

        impl Word for $word {
            const BITS: u32 = <$word>::BITS;
            type Atomic = $atomic;

            #[inline(always)]
            fn atomic(value: Self) -> $atomic {
                <$atomic>::new(value)
            }

            #[inline(always)]
            fn load(cell: &$atomic, order: Ordering) -> Self {
                cell.load(order)
            }

            #[inline(always)]
            fn store(cell: &$atomic, value: Self, order: Ordering) {
                cell.store(value, order)
            }

            #[inline(always)]
            fn widen(self) -> u64 {
                self as u64
            }

            #[inline(always)]
            fn truncate(value: u64) -> Self {
                value as $word
            }
        }
    };
}

impl_word!(u8, AtomicU8);
impl_word!(u16, AtomicU16);
impl_word!(u32, AtomicU32);

/// All `W` bits set, as a `u64`.
#[inline(always)]
pub fn word_mask<W: Word>() -> u64 {
    u64::MAX >> (64 - W::BITS)
}

/// One quarter revolution of a `W` bit word: `2^(W-2)` ticks.
///
/// Maintenance must run more often than this for the single-crossing
/// detection to hold.
#[inline(always)]
pub fn quarter_revolution<W: Word>() -> u64 {
    1 << (W::BITS - 2)
}

/// Forward distance from `from` to `to`, modulo `2^W`.
///
/// The counter only moves forward, so an apparent step backwards is read as
/// almost a full revolution.
#[inline(always)]
pub fn forward_distance<W: Word>(from: W, to: W) -> u64 {
    to.widen().wrapping_sub(from.widen()) & word_mask::<W>()
}
