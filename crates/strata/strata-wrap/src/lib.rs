//! Extends a narrow, fast-wrapping counter into a wide monotonic one.
//!
//! One [`WrapWriter`] publishes low-word samples and runs maintenance; any
//! number of [`WrapReader`]s read the reconstructed wide value lock-free.
//!
//! ```
//! use strata_wrap::{LivenessCheck, WrapConfig, WrapWriter};
//!
//! let mut writer = WrapWriter::<u8>::with_config(WrapConfig::new(LivenessCheck::Enforce)).unwrap();
//! let reader = writer.reader();
//! for low in [0u8, 60, 120, 180, 240, 1] {
//!     writer.set_low(low);
//!     writer.maintain().unwrap();
//! }
//! assert_eq!(reader.read(), 256 + 1);
//! ```

mod config;
mod error;
mod extender;
mod word;
mod writer;

pub use config::{LivenessCheck, WrapConfig};
pub use error::WrapError;
pub use extender::{WrapExtender, diff_bit, reconstruct};
pub use word::{Word, forward_distance, quarter_revolution, word_mask};
pub use writer::{WrapReader, WrapWriter};
