//! Engine configuration, loaded from TOML.

use serde::{Deserialize, Serialize};

use crate::logger::{self, LoggerMode, Severity};

mod loader;
mod validation;

pub use loader::ConfigLoader;
pub use validation::Validate;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub system: SystemConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LimitsConfig {
    /// Upper bound on the iteration count a FOR loop resolves to in one scan.
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: u32,

    /// Maximum nesting of subroutine calls.
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SystemConfig {
    /// Maintain `system.sys.*` status tags at the start of every scan.
    #[serde(default = "default_status_tags")]
    pub status_tags: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    Standalone,
    File,
    Full,
    Silent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: Severity,

    #[serde(default = "default_log_target")]
    pub target: LogTarget,
}

pub const DEFAULT_MAX_LOOP_ITERATIONS: u32 = 10_000;
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 32;

fn default_max_loop_iterations() -> u32 {
    DEFAULT_MAX_LOOP_ITERATIONS
}

fn default_max_call_depth() -> u32 {
    DEFAULT_MAX_CALL_DEPTH
}

fn default_status_tags() -> bool {
    true
}

fn default_log_level() -> Severity {
    Severity::Warn
}

fn default_log_target() -> LogTarget {
    LogTarget::Standalone
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self { status_tags: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Severity::Warn,
            target: LogTarget::Standalone,
        }
    }
}

impl LoggingConfig {
    /// Points the global logger at the configured sink and level.
    pub fn apply(&self) {
        let logger = logger::get_logger();
        logger.set_level(self.level);
        logger.set_mode(match self.target {
            LogTarget::Standalone => LoggerMode::Standalone,
            LogTarget::File => LoggerMode::File,
            LogTarget::Full => LoggerMode::Full,
            LogTarget::Silent => LoggerMode::Silent,
        });
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut config: EngineConfig = toml::from_str(content)?;
        config.validate();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_the_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn out_of_range_limits_are_repaired() {
        let config = EngineConfig::from_toml_str(
            "[limits]\nmax_loop_iterations = 0\nmax_call_depth = 8\n\n\
             [system]\nstatus_tags = false\n",
        )
        .unwrap();
        assert_eq!(config.limits.max_loop_iterations, DEFAULT_MAX_LOOP_ITERATIONS);
        assert_eq!(config.limits.max_call_depth, 8);
        assert!(!config.system.status_tags);
    }

    #[test]
    fn unknown_log_target_is_rejected() {
        assert!(EngineConfig::from_toml_str("[logging]\ntarget = \"syslog\"\n").is_err());
    }
}
