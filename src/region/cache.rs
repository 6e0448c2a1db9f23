// ============================================
// Region Cache - Кэш открытых файлов регионов
// ============================================
// Регион открывается лениво при первом обращении и закрывается
// по простою (evict_idle) или при выключении (close_all).
// Таймера внутри нет: evict_idle вызывает внешний планировщик.
//
// Однопоточная модель: блокировок нет, хэндл живёт только внутри
// одного вызова get() -> &mut H.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RegionError, StorageError};
use super::coords::{RegionKey, RegionPos};
use super::file::RegionFile;
use super::handle::{RegionHandle, RegionOptions};
use super::recovery;

/// Порог простоя по умолчанию (секунды)
pub const DEFAULT_IDLE_TIMEOUT: i64 = 300;

/// Источник unix-времени в секундах
pub trait Clock {
    fn now(&self) -> i64;
}

/// Системные часы
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Открытый регион + время последнего обращения
struct CacheEntry<H> {
    handle: H,
    last_used: i64,
}

pub struct RegionCache<H: RegionHandle = RegionFile> {
    region_dir: PathBuf,
    extension: &'static str,
    options: RegionOptions,
    entries: HashMap<RegionKey, CacheEntry<H>>,
    /// region/ уже создана
    dir_ready: bool,
    clock: Box<dyn Clock>,
}

impl<H: RegionHandle> RegionCache<H> {
    pub fn new(region_dir: impl Into<PathBuf>, extension: &'static str, options: RegionOptions) -> Self {
        Self {
            region_dir: region_dir.into(),
            extension,
            options,
            entries: HashMap::new(),
            dir_ready: false,
            clock: Box::new(SystemClock),
        }
    }

    /// Подменить часы (тесты, детерминированные метки бэкапов)
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub fn region_dir(&self) -> &Path {
        &self.region_dir
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }

    /// Путь к файлу региона
    pub fn path_for(&self, pos: RegionPos) -> PathBuf {
        self.region_dir.join(pos.file_name(self.extension))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, pos: RegionPos) -> bool {
        self.entries.contains_key(&pos.key())
    }

    /// Время последнего обращения к региону
    pub fn last_used(&self, pos: RegionPos) -> Option<i64> {
        self.entries.get(&pos.key()).map(|e| e.last_used)
    }

    /// Открытый хэндл региона. Открывает (и при повреждении восстанавливает)
    /// файл при первом обращении.
    pub fn get(&mut self, pos: RegionPos) -> Result<&mut H, StorageError> {
        let now = self.clock.now();

        let entry = match self.entries.entry(pos.key()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                // region/ создаётся один раз; флаг ставится только после успеха
                if !self.dir_ready {
                    fs::create_dir_all(&self.region_dir)
                        .map_err(|e| StorageError::io(&self.region_dir, e))?;
                    self.dir_ready = true;
                }
                let path = self.region_dir.join(pos.file_name(self.extension));
                let handle = open_region::<H>(path, pos, self.options, now)?;
                vacant.insert(CacheEntry { handle, last_used: now })
            }
        };

        entry.last_used = now;
        Ok(&mut entry.handle)
    }

    /// Закрыть регионы с `last_used <= now - threshold`. Возвращает число
    /// закрытых. Записи удаляются даже если close вернул ошибку; первая
    /// ошибка возвращается после обработки всех записей.
    pub fn evict_idle(&mut self, now: i64, threshold: i64) -> Result<usize, StorageError> {
        let limit = now.saturating_sub(threshold);
        let idle: Vec<RegionKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.last_used <= limit)
            .map(|(key, _)| *key)
            .collect();

        let mut first_error = None;
        for key in &idle {
            if let Some(mut entry) = self.entries.remove(key) {
                if let Err(e) = entry.handle.close(true) {
                    log::warn!("Failed to close idle region {}: {}", entry.handle.path().display(), e);
                    first_error.get_or_insert(StorageError::Region {
                        path: entry.handle.path().to_path_buf(),
                        source: e,
                    });
                }
            }
        }

        if !idle.is_empty() {
            log::debug!("Evicted {} idle regions, {} still open", idle.len(), self.entries.len());
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(idle.len()),
        }
    }

    /// Закрыть все регионы (с flush). После вызова кэш пуст.
    pub fn close_all(&mut self) -> Result<(), StorageError> {
        let mut first_error = None;
        for (_, mut entry) in self.entries.drain() {
            if let Err(e) = entry.handle.close(true) {
                log::warn!("Failed to close region {}: {}", entry.handle.path().display(), e);
                first_error.get_or_insert(StorageError::Region {
                    path: entry.handle.path().to_path_buf(),
                    source: e,
                });
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Открыть регион; повреждённый файл уходит в карантин
fn open_region<H: RegionHandle>(
    path: PathBuf,
    pos: RegionPos,
    options: RegionOptions,
    now: i64,
) -> Result<H, StorageError> {
    let mut handle = H::new(path.clone(), pos, options);
    match handle.open() {
        Ok(()) => Ok(handle),
        Err(cause @ RegionError::Corrupted { .. }) => recovery::recover(handle, &cause, now),
        Err(source) => Err(StorageError::Region { path, source }),
    }
}

impl<H: RegionHandle> Drop for RegionCache<H> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            let _ = self.close_all();
        }
    }
}
