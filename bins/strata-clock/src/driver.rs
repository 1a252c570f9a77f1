use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use strata_wrap::{WrapReader, WrapWriter};
use tracing::{debug, error, info};

use crate::source::TickSource;

/// Samples a tick source into a 32-bit wrap extender and cross-checks the
/// reconstructed value on every iteration.
pub struct Driver {
    writer: WrapWriter<u32>,
    source: Box<dyn TickSource>,
    interval: Duration,
    iterations: u64,
}

impl Driver {
    pub fn new(
        writer: WrapWriter<u32>,
        source: Box<dyn TickSource>,
        interval: Duration,
        iterations: u64,
    ) -> Self {
        Self {
            writer,
            source,
            interval,
            iterations,
        }
    }

    pub fn reader(&self) -> WrapReader<u32> {
        self.writer.reader()
    }

    #[inline]
    fn sample(&mut self) {
        let low = self.source.now();
        self.writer.set_low(low);
    }

    /// Runs the sampling loop, writing one wide value per line to `out`.
    ///
    /// Each iteration:
    /// 1. sample, maintain, read `a`
    /// 2. sample, read `b`, maintain, read `c`
    ///
    /// `b` must equal `c` (reads agree with maintenance) and exceed `a`.
    /// Returns the number of completed iterations.
    pub fn run(&mut self, out: &mut impl Write) -> Result<u64> {
        let mut completed = 0u64;
        while self.iterations == 0 || completed < self.iterations {
            thread::sleep(self.interval);
            self.sample();
            self.writer
                .maintain()
                .context("maintenance after first sample")?;
            let a = self.writer.read();
            writeln!(out, "{a}")?;

            thread::sleep(self.interval);
            self.sample();
            let b = self.writer.read();
            self.writer
                .maintain()
                .context("maintenance after second sample")?;
            let c = self.writer.read();
            writeln!(out, "{b}")?;

            if b != c {
                error!(b, c, "read changed across maintenance");
                bail!("read before maintenance ({b}) differs from read after ({c})");
            }
            if b <= a {
                error!(a, b, "counter did not advance");
                bail!("counter did not advance: {b} <= {a}");
            }

            completed += 1;
            debug!(iteration = completed, a, b, high = self.writer.extender().high(), "sampled");
        }
        Ok(completed)
    }
}

/// What one background reader saw.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReaderReport {
    pub reads: u64,
    pub regressions: u64,
}

/// Background threads calling `read()` in a tight loop, each checking that
/// its own observations never decrease.
pub struct ReaderPool {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<ReaderReport>>,
}

impl ReaderPool {
    pub fn spawn(reader: &WrapReader<u32>, count: usize) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(count);
        for id in 0..count {
            let reader = reader.clone();
            let stop = Arc::clone(&stop);
            let handle = thread::Builder::new()
                .name(format!("strata-reader-{id}"))
                .spawn(move || read_until_stopped(&reader, &stop))
                .with_context(|| format!("spawning reader {id}"))?;
            handles.push(handle);
        }
        info!(count, "reader threads started");
        Ok(Self { stop, handles })
    }

    /// Stops every reader and sums their reports.
    pub fn join(self) -> Result<ReaderReport> {
        self.stop.store(true, Ordering::Release);
        let mut total = ReaderReport::default();
        for handle in self.handles {
            let report = handle
                .join()
                .map_err(|_| anyhow::anyhow!("reader thread panicked"))?;
            total.reads += report.reads;
            total.regressions += report.regressions;
        }
        Ok(total)
    }
}

fn read_until_stopped(reader: &WrapReader<u32>, stop: &AtomicBool) -> ReaderReport {
    let mut report = ReaderReport::default();
    let mut last = reader.read();
    while !stop.load(Ordering::Acquire) {
        let v = reader.read();
        report.reads += 1;
        if v < last {
            report.regressions += 1;
            error!(previous = last, current = v, "reader saw the counter go backwards");
        }
        last = v;
        std::hint::spin_loop();
    }
    report
}
