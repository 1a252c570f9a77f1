mod config;

pub use config::{ConfigError, DriverConfig, SourceKind};
