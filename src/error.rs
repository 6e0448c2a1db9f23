// ============================================
// Errors - Ошибки хранилища регионов
// ============================================
// RegionError  - уровень одного файла региона
// CodecError   - уровень кодека чанка
// StorageError - то, что видит вызывающий код

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Ошибки открытого файла региона
#[derive(Debug, Error)]
pub enum RegionError {
    /// Файл структурно повреждён (обнаруживается при открытии)
    #[error("corrupted region file {}: {reason}", path.display())]
    Corrupted { path: PathBuf, reason: String },

    /// Повреждён один слот; остальные слоты и файл целы
    #[error("corrupted slot ({x}, {z}): {reason}")]
    CorruptedSlot { x: u8, z: u8, reason: String },

    #[error("slot payload of {size} bytes does not fit in a region file")]
    SlotTooLarge { size: usize },

    #[error("region file is closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Ошибка кодека чанка
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

impl From<bincode::Error> for CodecError {
    fn from(e: bincode::Error) -> Self {
        CodecError(e.to_string())
    }
}

/// Ошибки хранилища мира
#[derive(Debug, Error)]
pub enum StorageError {
    /// Директория не проходит проверку формата
    #[error("{} is not a valid world directory: {reason}", path.display())]
    Validation { path: PathBuf, reason: String },

    /// Ошибка файловой системы (права, диск, rename)
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Ошибка ввода-вывода уровня региона
    #[error("region {}: {source}", path.display())]
    Region {
        path: PathBuf,
        #[source]
        source: RegionError,
    },

    /// Данные одного чанка не декодируются
    #[error("chunk ({x}, {z}) failed to decode: {reason}")]
    Decode { x: i32, z: i32, reason: String },

    #[error("chunk ({x}, {z}) failed to encode: {reason}")]
    Encode { x: i32, z: i32, reason: String },

    #[error("level data {}: {reason}", path.display())]
    LevelData { path: PathBuf, reason: String },

    #[error("invalid storage config: {0}")]
    Config(String),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StorageError::Io { path: path.into(), source }
    }

    /// Ошибка относится только к одному чанку
    pub fn is_chunk_scoped(&self) -> bool {
        matches!(self, StorageError::Decode { .. } | StorageError::Encode { .. })
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
