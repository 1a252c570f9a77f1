use serde::Deserialize;

use crate::error::WrapError;
use crate::word::{Word, quarter_revolution};

/// Whether [`WrapWriter::maintain`](crate::WrapWriter::maintain) verifies the
/// maintenance cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessCheck {
    /// Report a late maintenance call as [`WrapError::ViolatedInvariant`].
    Enforce,
    /// Trust the caller. A late call silently drops a wrap.
    Skip,
}

impl Default for LivenessCheck {
    /// Enforced in debug builds, skipped in release builds.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LivenessCheck::Enforce
        } else {
            LivenessCheck::Skip
        }
    }
}

/// Writer-side settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct WrapConfig {
    pub check: LivenessCheck,
    /// Largest allowed advance between maintenance calls is `max_advance - 1`.
    ///
    /// `None` means one quarter revolution, `2^(W-2)`. Only tighter bounds are
    /// accepted; a looser one would break single-crossing detection.
    pub max_advance: Option<u64>,
}

impl WrapConfig {
    pub fn new(check: LivenessCheck) -> Self {
        Self {
            check,
            max_advance: None,
        }
    }

    pub fn with_max_advance(mut self, max_advance: u64) -> Self {
        self.max_advance = Some(max_advance);
        self
    }

    /// Resolves the advance limit for words of width `W`.
    pub(crate) fn limit<W: Word>(&self) -> Result<u64, WrapError> {
        let max = quarter_revolution::<W>();
        match self.max_advance {
            None => Ok(max),
            Some(requested) if (1..=max).contains(&requested) => Ok(requested),
            Some(requested) => Err(WrapError::InvalidLimit { requested, max }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit_is_a_quarter_revolution() {
        assert_eq!(WrapConfig::default().limit::<u8>(), Ok(64));
        assert_eq!(WrapConfig::default().limit::<u32>(), Ok(1 << 30));
    }

    #[test]
    fn tighter_limit_is_accepted() {
        let cfg = WrapConfig::new(LivenessCheck::Enforce).with_max_advance(16);
        assert_eq!(cfg.limit::<u8>(), Ok(16));
    }

    #[test]
    fn looser_or_zero_limit_is_rejected() {
        let cfg = WrapConfig::new(LivenessCheck::Enforce).with_max_advance(65);
        assert_eq!(
            cfg.limit::<u8>(),
            Err(WrapError::InvalidLimit {
                requested: 65,
                max: 64
            })
        );

        let cfg = WrapConfig::new(LivenessCheck::Enforce).with_max_advance(0);
        assert!(cfg.limit::<u16>().is_err());
    }
}
