//! 配置编解码
//!
//! TOML 为主格式，JSON 用于与其他工具交换。格式由文件扩展名决定。

use std::path::Path;

use contracts::{ContractError, SynchronizerConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// Format for a file extension, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// Format of the file at `path`
    ///
    /// # Errors
    /// Missing or unsupported extension
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Err(ContractError::config_parse(format!(
                "cannot determine config format of {}",
                path.display()
            )));
        };
        Self::from_extension(ext)
            .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }

    /// Deserialize a configuration written in this format
    pub fn decode(self, content: &str) -> Result<SynchronizerConfig, ContractError> {
        let decoded = match self {
            Self::Toml => toml::from_str(content).map_err(boxed),
            Self::Json => serde_json::from_str(content).map_err(boxed),
        };
        decoded.map_err(|source| ContractError::ConfigParse {
            message: format!("{} parse error: {source}", self.name()),
            source: Some(source),
        })
    }

    /// Serialize `config` in this format (pretty-printed)
    pub fn encode(self, config: &SynchronizerConfig) -> Result<String, ContractError> {
        let encoded = match self {
            Self::Toml => toml::to_string_pretty(config).map_err(boxed),
            Self::Json => serde_json::to_string_pretty(config).map_err(boxed),
        };
        encoded.map_err(|source| ContractError::ConfigParse {
            message: format!("{} serialize error: {source}", self.name()),
            source: Some(source),
        })
    }
}

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

fn boxed<E: std::error::Error + Send + Sync + 'static>(e: E) -> BoxedError {
    Box::new(e)
}
