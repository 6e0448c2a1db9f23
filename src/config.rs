// ============================================
// Storage Config - Настройки хранилища
// ============================================
// JSON, все ключи необязательны:
// { "format": "anvil", "idle_timeout_secs": 300, "compression_level": 3 }

use std::fs;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::StorageError;
use crate::region::{RegionFormat, RegionOptions, DEFAULT_IDLE_TIMEOUT};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Формат файлов регионов
    pub format: RegionFormat,
    /// Порог простоя для сборки мусора (секунды)
    pub idle_timeout_secs: u64,
    /// Уровень ZSTD для слотов и level.dat
    pub compression_level: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            format: RegionFormat::default(),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT as u64,
            compression_level: 3,
        }
    }
}

impl StorageConfig {
    pub fn with_format(format: RegionFormat) -> Self {
        Self { format, ..Self::default() }
    }

    /// Загрузить из JSON-строки
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let config: Self = serde_json::from_str(json).map_err(|e| StorageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Загрузить из JSON-файла
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let json = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        let levels = zstd::compression_level_range();
        if !levels.contains(&self.compression_level) {
            return Err(StorageError::Config(format!(
                "compression_level {} is outside {}..={}",
                self.compression_level,
                levels.start(),
                levels.end()
            )));
        }
        if self.idle_timeout_secs > i64::MAX as u64 {
            return Err(StorageError::Config("idle_timeout_secs is too large".to_string()));
        }
        Ok(())
    }

    pub fn region_options(&self) -> RegionOptions {
        RegionOptions {
            compression_level: self.compression_level,
        }
    }

    pub fn idle_timeout(&self) -> i64 {
        self.idle_timeout_secs as i64
    }
}
