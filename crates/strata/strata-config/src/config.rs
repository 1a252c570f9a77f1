use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use strata_wrap::LivenessCheck;

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    /// Sleep between two samples of the tick source.
    #[serde(default = "defaults::interval_ms")]
    pub interval_ms: u64,
    /// Loop iterations before exiting; 0 runs forever.
    #[serde(default)]
    pub iterations: u64,
    #[serde(default)]
    pub source: SourceKind,
    /// Background threads hammering `read()`.
    #[serde(default)]
    pub readers: usize,
    #[serde(default = "defaults::liveness_check")]
    pub liveness_check: LivenessCheck,
}

/// Where the 32-bit low word comes from.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// x86_64 time-stamp counter, low 32 bits.
    Tsc,
    /// `CLOCK_MONOTONIC` nanoseconds, low 32 bits.
    #[default]
    Monotonic,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

mod defaults {
    use strata_wrap::LivenessCheck;

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn interval_ms() -> u64 {
        100
    }

    // The driver exists to exercise the counter, so it checks even in release.
    pub fn liveness_check() -> LivenessCheck {
        LivenessCheck::Enforce
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            interval_ms: defaults::interval_ms(),
            iterations: 0,
            source: SourceKind::default(),
            readers: 0,
            liveness_check: defaults::liveness_check(),
        }
    }
}

impl DriverConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml_to_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&toml_to_str)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: DriverConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "interval_ms",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = DriverConfig::from_toml_str("").expect("defaults are valid");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.interval(), Duration::from_millis(100));
        assert_eq!(cfg.iterations, 0);
        assert_eq!(cfg.source, SourceKind::Monotonic);
        assert_eq!(cfg.readers, 0);
        assert_eq!(cfg.liveness_check, LivenessCheck::Enforce);
    }

    #[test]
    fn parses_every_field() {
        let cfg = DriverConfig::from_toml_str(
            r#"
            log_level = "debug"
            interval_ms = 25
            iterations = 40
            source = "tsc"
            readers = 3
            liveness_check = "skip"
            "#,
        )
        .expect("config should parse");
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.interval_ms, 25);
        assert_eq!(cfg.iterations, 40);
        assert_eq!(cfg.source, SourceKind::Tsc);
        assert_eq!(cfg.readers, 3);
        assert_eq!(cfg.liveness_check, LivenessCheck::Skip);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = DriverConfig::from_toml_str("interval_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "interval_ms", .. }));
    }

    #[test]
    fn unknown_source_and_keys_fail_to_parse() {
        assert!(matches!(
            DriverConfig::from_toml_str(r#"source = "hpet""#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            DriverConfig::from_toml_str("interval = 5"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = DriverConfig::load("/nonexistent/strata.toml").unwrap_err();
        match err {
            ConfigError::Read { path, .. } => assert_eq!(path, "/nonexistent/strata.toml"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
