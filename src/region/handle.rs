// ============================================
// Region Handle - Интерфейс открытого файла региона
// ============================================

use std::path::{Path, PathBuf};

use crate::error::RegionError;
use super::coords::{LocalSlot, RegionPos};

/// Параметры открытия файла региона
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionOptions {
    /// Уровень ZSTD для данных слотов
    pub compression_level: i32,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self { compression_level: 3 }
    }
}

/// Один файл региона с послотовым чтением/записью.
///
/// Жизненный цикл двухфазный: `new` не трогает диск, `open` читает
/// и проверяет файл. Если `open` вернул [`RegionError::Corrupted`],
/// хэндл нужно закрыть через `close(false)`, ничего не записывая.
pub trait RegionHandle: Sized {
    fn new(path: PathBuf, pos: RegionPos, options: RegionOptions) -> Self;

    /// Открыть (или создать пустой) файл региона
    fn open(&mut self) -> Result<(), RegionError>;

    /// Данные слота или None если слот пуст
    fn read_slot(&mut self, slot: LocalSlot) -> Result<Option<Vec<u8>>, RegionError>;

    fn write_slot(&mut self, slot: LocalSlot, data: &[u8]) -> Result<(), RegionError>;

    /// Закрыть файл. `flush = false` отбрасывает несохранённое состояние
    fn close(&mut self, flush: bool) -> Result<(), RegionError>;

    fn path(&self) -> &Path;

    fn pos(&self) -> RegionPos;

    fn options(&self) -> RegionOptions;
}
