//! # Config Loader
//!
//! 读取、校验并写回 `SynchronizerConfig`。
//!
//! - TOML / JSON，按扩展名选择格式
//! - 解析后立即校验（captor id、偏移量、队列容量）
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("sync.toml")).unwrap();
//! println!("Driver: {}", config.driver.id);
//! ```

mod parser;
mod validator;

pub use contracts::SynchronizerConfig;
pub use parser::ConfigFormat;

use std::path::Path;

use contracts::ContractError;

/// Stateless entry point for configuration I/O
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate the configuration at `path`.
    ///
    /// The format follows the extension (`.toml` / `.json`).
    ///
    /// # Errors
    /// Unsupported extension, unreadable file, parse or validation failure
    pub fn load_from_path(path: &Path) -> Result<SynchronizerConfig, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let config = Self::load_from_str(&content, format)?;
        tracing::debug!(
            path = %path.display(),
            format = format.name(),
            followers = config.followers.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// # Errors
    /// Parse or validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SynchronizerConfig, ContractError> {
        let config = format.decode(content)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate and write `config` to `path`, format chosen by extension
    ///
    /// # Errors
    /// Invalid configuration, unsupported extension or write failure
    pub fn save_to_path(config: &SynchronizerConfig, path: &Path) -> Result<(), ContractError> {
        validator::validate(config)?;
        let content = ConfigFormat::from_path(path)?.encode(config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check an in-memory configuration against the loader's rules
    pub fn validate(config: &SynchronizerConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    pub fn to_toml(config: &SynchronizerConfig) -> Result<String, ContractError> {
        ConfigFormat::Toml.encode(config)
    }

    pub fn to_json(config: &SynchronizerConfig) -> Result<String, ContractError> {
        ConfigFormat::Json.encode(config)
    }
}
