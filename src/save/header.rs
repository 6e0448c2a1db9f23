// ============================================
// Level Header - Заголовок level.dat
// ============================================

use serde::{Serialize, Deserialize};

/// Магическое число "LVLD" в ASCII
pub const MAGIC_NUMBER: [u8; 4] = [0x4C, 0x56, 0x4C, 0x44];

/// Версия формата level.dat
pub const LEVEL_VERSION: u32 = 1;

/// Заголовок файла метаданных (8 байт)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelHeader {
    /// Магическое число для валидации
    pub magic: [u8; 4],
    /// Версия формата
    pub version: u32,
}

impl LevelHeader {
    pub fn new() -> Self {
        Self {
            magic: MAGIC_NUMBER,
            version: LEVEL_VERSION,
        }
    }

    /// Проверка валидности заголовка
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC_NUMBER && self.version == LEVEL_VERSION
    }
}

impl Default for LevelHeader {
    fn default() -> Self {
        Self::new()
    }
}
