//! Single-writer / multi-reader handles over a shared [`WrapExtender`].
//!
//! - **Writer**: owns the write side. Not `Clone`, so there is exactly one per
//!   extender. `set_low` and `maintain` take `&mut self`, which serializes them.
//! - **Readers**: cheap to clone, `Send + Sync`, read-only.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::{LivenessCheck, WrapConfig};
use crate::error::WrapError;
use crate::extender::{WrapExtender, diff_bit};
use crate::word::{Word, forward_distance, quarter_revolution};

/// The write side of a wrap extender: stores low-word samples and maintains
/// the high word.
#[derive(Debug)]
pub struct WrapWriter<W: Word> {
    shared: Arc<WrapExtender<W>>,
    /// `low | 1` as of the previous maintenance call.
    last_odd_low: Option<W>,
    check: LivenessCheck,
    /// Advances at or above this are reported.
    limit: u64,
    /// First liveness violation; once set, maintenance is refused for good.
    failed: Option<WrapError>,
}

/// The read side of a wrap extender.
#[derive(Debug, Clone)]
pub struct WrapReader<W: Word> {
    shared: Arc<WrapExtender<W>>,
}

impl<W: Word> WrapWriter<W> {
    /// Creates a zeroed extender with the default configuration.
    pub fn new() -> Self {
        Self::build(WrapConfig::default(), quarter_revolution::<W>())
    }

    /// Creates a zeroed extender.
    ///
    /// # Errors
    /// [`WrapError::InvalidLimit`] if `cfg.max_advance` is zero or looser than
    /// a quarter revolution.
    pub fn with_config(cfg: WrapConfig) -> Result<Self, WrapError> {
        let limit = cfg.limit::<W>()?;
        Ok(Self::build(cfg, limit))
    }

    fn build(cfg: WrapConfig, limit: u64) -> Self {
        Self {
            shared: Arc::new(WrapExtender::new()),
            last_odd_low: None,
            check: cfg.check,
            limit,
            failed: None,
        }
    }

    /// Returns a new reader over the same extender.
    pub fn reader(&self) -> WrapReader<W> {
        WrapReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn extender(&self) -> &WrapExtender<W> {
        &self.shared
    }

    /// Publishes a fresh low-word sample. Cannot fail.
    #[inline(always)]
    pub fn set_low(&mut self, value: W) {
        self.shared.store_low(value);
    }

    /// Folds a pending crossing of the low word's top bit into the high word.
    ///
    /// After a successful return, bit 0 of the high word equals the top bit of
    /// the low word that was just loaded. At most one crossing can be pending
    /// when the call cadence is respected, so a single conditional increment
    /// is enough.
    ///
    /// # Errors
    /// With [`LivenessCheck::Enforce`], returns
    /// [`WrapError::ViolatedInvariant`] when the low word moved `limit` or more
    /// ticks since the previous call. Nothing is updated in that case, and
    /// every later call returns the same error without looking at the words:
    /// any number of wraps may have been missed, so the wrap count can no
    /// longer be trusted.
    #[inline]
    pub fn maintain(&mut self) -> Result<(), WrapError> {
        if let Some(err) = self.failed {
            return Err(err);
        }

        let (hi, lo) = self.shared.snapshot();

        let odd_lo = W::truncate(lo.widen() | 1);
        if let (LivenessCheck::Enforce, Some(last)) = (self.check, self.last_odd_low) {
            let advance = forward_distance(last, odd_lo);
            if advance >= self.limit {
                error!(
                    advance,
                    limit = self.limit,
                    low = %lo,
                    "maintenance fell behind the low word"
                );
                let err = WrapError::ViolatedInvariant {
                    advance,
                    limit: self.limit,
                };
                self.failed = Some(err);
                return Err(err);
            }
        }
        self.last_odd_low = Some(odd_lo);

        let diff = diff_bit(hi, lo);
        if diff != 0 {
            let next = W::truncate(hi.widen() + diff);
            self.shared.store_high(next);
            debug!(high = %next, low = %lo, "high word advanced");
        }
        Ok(())
    }

    /// Reads the wide value. Same as [`WrapReader::read`].
    #[inline(always)]
    pub fn read(&self) -> u64 {
        self.shared.read()
    }

    /// `set_low`, `maintain`, then `read`.
    #[inline]
    pub fn observe(&mut self, value: W) -> Result<u64, WrapError> {
        self.set_low(value);
        self.maintain()?;
        Ok(self.read())
    }
}

impl<W: Word> Default for WrapWriter<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Word> WrapReader<W> {
    /// Reads a consistent wide value without touching shared state.
    #[inline(always)]
    pub fn read(&self) -> u64 {
        self.shared.read()
    }

    pub fn extender(&self) -> &WrapExtender<W> {
        &self.shared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enforcing<W: Word>() -> WrapWriter<W> {
        WrapWriter::with_config(WrapConfig::new(LivenessCheck::Enforce))
            .expect("default limit is valid")
    }

    #[test]
    fn first_maintain_has_nothing_to_compare() {
        let mut w = enforcing::<u8>();
        w.set_low(200);
        assert_eq!(w.maintain(), Ok(()));
        assert_eq!(w.extender().high(), 1);
        assert_eq!(w.read(), 200);
    }

    #[test]
    fn high_word_parity_tracks_top_bit() {
        let mut w = enforcing::<u8>();
        for low in (0u8..=250).step_by(50).chain([20, 70, 120, 170]) {
            w.set_low(low);
            w.maintain().expect("cadence respected");
            assert_eq!(w.extender().high() & 1, low >> 7, "low = {low}");
        }
    }

    #[test]
    fn reader_sees_writer_updates() {
        let mut w = enforcing::<u16>();
        let r = w.reader();
        assert_eq!(r.read(), 0);
        w.observe(1234).expect("cadence respected");
        assert_eq!(r.read(), 1234);
        assert_eq!(r.clone().read(), w.read());
    }

    #[test]
    fn invalid_limit_is_rejected_at_construction() {
        let cfg = WrapConfig::new(LivenessCheck::Enforce).with_max_advance(1 << 20);
        assert!(matches!(
            WrapWriter::<u16>::with_config(cfg),
            Err(WrapError::InvalidLimit { .. })
        ));
    }
}
