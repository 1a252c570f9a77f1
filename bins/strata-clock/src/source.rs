//! 32-bit tick sources feeding the low word.

use std::time::{Duration, Instant};

use strata_config::SourceKind;
use tracing::warn;

pub trait TickSource: Send {
    fn name(&self) -> &'static str;

    /// Current low 32 bits of the counter.
    fn now(&mut self) -> u32;

    /// Estimates how long the 32-bit value takes to wrap once, by timing the
    /// source against `Instant` over `window`.
    fn estimate_revolution(&mut self, window: Duration) -> Option<Duration> {
        let t0 = self.now();
        let start = Instant::now();
        std::thread::sleep(window);
        let t1 = self.now();
        let elapsed = start.elapsed().as_secs_f64();

        let ticks = f64::from(t1.wrapping_sub(t0));
        if ticks == 0.0 || elapsed == 0.0 {
            return None;
        }
        let ticks_per_sec = ticks / elapsed;
        Some(Duration::from_secs_f64((1u64 << 32) as f64 / ticks_per_sec))
    }
}

/// `CLOCK_MONOTONIC` nanoseconds; wraps every ~4.3 s.
#[derive(Debug, Default)]
pub struct Monotonic32;

impl TickSource for Monotonic32 {
    fn name(&self) -> &'static str {
        "monotonic"
    }

    #[inline(always)]
    fn now(&mut self) -> u32 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec for the whole call.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        debug_assert_eq!(rc, 0, "CLOCK_MONOTONIC is always available");
        ((ts.tv_sec as u64) * 1_000_000_000 + ts.tv_nsec as u64) as u32
    }

    fn estimate_revolution(&mut self, _window: Duration) -> Option<Duration> {
        Some(Duration::from_nanos(1 << 32))
    }
}

/// Time-stamp counter; wraps roughly once per second at GHz rates.
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Default)]
pub struct Tsc32;

#[cfg(target_arch = "x86_64")]
impl TickSource for Tsc32 {
    fn name(&self) -> &'static str {
        "tsc"
    }

    #[inline(always)]
    fn now(&mut self) -> u32 {
        // SAFETY: rdtsc is available on every x86_64 CPU.
        unsafe { core::arch::x86_64::_rdtsc() as u32 }
    }
}

pub fn from_kind(kind: SourceKind) -> Box<dyn TickSource> {
    match kind {
        SourceKind::Monotonic => Box::new(Monotonic32),
        #[cfg(target_arch = "x86_64")]
        SourceKind::Tsc => Box::new(Tsc32),
        #[cfg(not(target_arch = "x86_64"))]
        SourceKind::Tsc => {
            warn!("tsc source needs x86_64; falling back to monotonic");
            Box::new(Monotonic32)
        }
    }
}

/// Warns when `interval` leaves no margin under a quarter revolution.
///
/// Returns the estimated revolution for logging.
pub fn check_cadence(source: &mut dyn TickSource, interval: Duration) -> Option<Duration> {
    let revolution = source.estimate_revolution(Duration::from_millis(20))?;
    let quarter = revolution / 4;
    if interval >= quarter {
        warn!(
            source = source.name(),
            ?interval,
            ?quarter,
            "sample interval is not under a quarter revolution; maintenance will fall behind"
        );
    }
    Some(revolution)
}
