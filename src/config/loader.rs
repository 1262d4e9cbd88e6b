use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::EngineConfig;
use super::validation::Validate;

pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Loader for `<config dir>/ladder/engine.toml`.
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("ladder");

        fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(Self {
            config_path: config_dir.join("engine.toml"),
        })
    }

    pub fn at<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn load_or_create(&self) -> Result<EngineConfig> {
        if !self.config_path.exists() {
            let default_config = EngineConfig::default();
            self.save(&default_config)?;
            Ok(default_config)
        } else {
            self.load_and_normalize()
        }
    }

    pub fn load(&self) -> Result<EngineConfig> {
        let content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file {:?}", self.config_path))?;

        let mut config: EngineConfig =
            toml::from_str(&content).context("Failed to parse config file")?;

        config.validate();
        Ok(config)
    }

    fn load_and_normalize(&self) -> Result<EngineConfig> {
        let content =
            fs::read_to_string(&self.config_path).context("Failed to read config file")?;

        let mut config: EngineConfig = match toml::from_str(&content) {
            Ok(c) => c,
            Err(e) => {
                let backup_path = self.config_path.with_extension("toml.backup");
                fs::write(&backup_path, &content).context("Failed to write backup")?;

                crate::log_error!(
                    "Config file corrupted: {}. Backup saved to {:?}. Using defaults.",
                    e,
                    backup_path
                );

                let default = EngineConfig::default();
                self.save(&default)?;
                return Ok(default);
            }
        };

        config.validate();

        let current_toml = toml::to_string_pretty(&config).context("Failed to serialize config")?;

        if content.trim() != current_toml.trim() {
            self.save(&config)?;
        }

        Ok(config)
    }

    pub fn save(&self, config: &EngineConfig) -> Result<()> {
        let toml_string = toml::to_string_pretty(config).context("Failed to serialize config")?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        fs::write(&self.config_path, toml_string).context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogTarget;
    use crate::logger::Severity;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::at(dir.path().join("engine.toml"));
        let config = loader.load_or_create().unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(loader.config_path().exists());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(
            &path,
            "[limits]\nmax_call_depth = 4\n\n[logging]\nlevel = \"debug\"\ntarget = \"silent\"\n",
        )
        .unwrap();
        let config = ConfigLoader::at(&path).load().unwrap();
        assert_eq!(config.limits.max_call_depth, 4);
        assert_eq!(config.limits.max_loop_iterations, 10_000);
        assert_eq!(config.logging.level, Severity::Debug);
        assert_eq!(config.logging.target, LogTarget::Silent);
        assert!(config.system.status_tags);
    }

    #[test]
    fn corrupted_file_is_backed_up_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, "limits = [[[").unwrap();
        let config = ConfigLoader::at(&path).load_or_create().unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(path.with_extension("toml.backup").exists());
    }

    #[test]
    fn explicit_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, "limits = 3").unwrap();
        assert!(ConfigLoader::at(&path).load().is_err());
    }
}
