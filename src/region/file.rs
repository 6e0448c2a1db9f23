// ============================================
// Region File - Файл региона 32x32 чанка
// ============================================
// Формат:
// - Байты 0-4095:   таблица смещений (1024 x u32 BE: offset << 8 | count)
// - Байты 4096-8191: таблица временных меток (1024 x u32 BE)
// - Дальше данные слотов секторами по 4 КБ:
//   u32 BE длина (включая байт сжатия), u8 тип сжатия, сжатые байты
//
// Заголовок держим в памяти и пишем на диск только при close(true).
// Занятость секторов строится по таблице смещений при открытии;
// освободившиеся секторы переиспользуются (first fit), иначе пишем в конец.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::RegionError;
use super::coords::{LocalSlot, RegionPos, REGION_CHUNK_COUNT};
use super::handle::{RegionHandle, RegionOptions};

/// Размер сектора
pub const SECTOR_BYTES: usize = 4096;
/// Заголовок: таблица смещений + таблица меток
pub const HEADER_BYTES: usize = SECTOR_BYTES * 2;
const HEADER_SECTORS: u32 = 2;
/// Максимум секторов на один слот (один байт в таблице)
pub const MAX_SECTOR_COUNT: u32 = 255;
/// Максимальное смещение (три байта в таблице)
const MAX_SECTOR_OFFSET: u32 = (1 << 24) - 1;
/// Тип сжатия: ZSTD (пользовательский id)
pub const COMPRESSION_ZSTD: u8 = 127;

/// Запись таблицы смещений
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Location {
    offset: u32,
    count: u32,
}

impl Location {
    fn from_raw(raw: u32) -> Self {
        Self { offset: raw >> 8, count: raw & 0xff }
    }

    fn to_raw(self) -> u32 {
        (self.offset << 8) | (self.count & 0xff)
    }

    fn is_empty(self) -> bool {
        self.offset == 0 && self.count == 0
    }

    fn end(self) -> u32 {
        self.offset + self.count
    }
}

/// Открытый файл региона
pub struct RegionFile {
    path: PathBuf,
    pos: RegionPos,
    options: RegionOptions,
    file: Option<File>,
    locations: Vec<Location>,
    timestamps: Vec<u32>,
    /// Занятость секторов файла (true = занят)
    sectors: Vec<bool>,
    header_dirty: bool,
}

impl RegionFile {
    /// Количество занятых слотов
    pub fn chunk_count(&self) -> usize {
        self.locations.iter().filter(|l| !l.is_empty()).count()
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Метка последней записи слота (unix-секунды, 0 если не писался)
    pub fn slot_timestamp(&self, slot: LocalSlot) -> u32 {
        self.timestamps[slot.index()]
    }

    fn reset_header(&mut self) {
        self.locations = vec![Location::default(); REGION_CHUNK_COUNT];
        self.timestamps = vec![0; REGION_CHUNK_COUNT];
        self.sectors = vec![true; HEADER_SECTORS as usize];
        self.header_dirty = false;
    }

    fn mark_sectors(&mut self, loc: Location, used: bool) {
        let end = loc.end() as usize;
        if self.sectors.len() < end {
            self.sectors.resize(end, false);
        }
        for sector in &mut self.sectors[loc.offset as usize..end] {
            *sector = used;
        }
    }

    /// Первый свободный отрезок из `count` секторов; хвостовой отрезок
    /// короче `count` продлевается за конец файла
    fn find_free(&self, count: u32) -> u32 {
        let mut run_start = 0;
        let mut run_len = 0;
        for (i, &used) in self.sectors.iter().enumerate() {
            if used {
                run_len = 0;
                continue;
            }
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            if run_len == count as usize {
                return run_start as u32;
            }
        }
        if run_len > 0 {
            run_start as u32
        } else {
            self.sectors.len() as u32
        }
    }

    fn corrupted(&self, reason: impl Into<String>) -> RegionError {
        RegionError::Corrupted {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    /// Разобрать заголовок и проверить таблицу смещений
    fn load_header(&mut self, header: &[u8], file_sectors: u32) -> Result<(), RegionError> {
        for i in 0..REGION_CHUNK_COUNT {
            let at = i * 4;
            let raw = u32::from_be_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]]);
            let stamp_at = SECTOR_BYTES + at;
            let stamp = u32::from_be_bytes([
                header[stamp_at],
                header[stamp_at + 1],
                header[stamp_at + 2],
                header[stamp_at + 3],
            ]);
            self.locations[i] = Location::from_raw(raw);
            self.timestamps[i] = stamp;
        }

        let mut used: Vec<(Location, usize)> = Vec::new();
        for (i, &loc) in self.locations.iter().enumerate() {
            if loc.is_empty() {
                continue;
            }
            if loc.offset == 0 || loc.count == 0 {
                return Err(self.corrupted(format!("location {} is malformed ({:#010x})", i, loc.to_raw())));
            }
            if loc.offset < HEADER_SECTORS {
                return Err(self.corrupted(format!("location {} points into the header", i)));
            }
            if loc.end() > file_sectors {
                return Err(self.corrupted(format!(
                    "location {} ends at sector {} but the file has {} sectors",
                    i,
                    loc.end(),
                    file_sectors
                )));
            }
            used.push((loc, i));
        }

        used.sort_by_key(|(loc, _)| loc.offset);
        for pair in used.windows(2) {
            let (a, ai) = pair[0];
            let (b, bi) = pair[1];
            if a.end() > b.offset {
                return Err(self.corrupted(format!("locations {} and {} overlap", ai, bi)));
            }
        }

        self.sectors = vec![false; file_sectors.max(HEADER_SECTORS) as usize];
        self.mark_sectors(Location { offset: 0, count: HEADER_SECTORS }, true);
        for (loc, _) in used {
            self.mark_sectors(loc, true);
        }
        Ok(())
    }

    fn encode_header(&self) -> Vec<u8> {
        let mut header = vec![0u8; HEADER_BYTES];
        for i in 0..REGION_CHUNK_COUNT {
            let at = i * 4;
            header[at..at + 4].copy_from_slice(&self.locations[i].to_raw().to_be_bytes());
            let stamp_at = SECTOR_BYTES + at;
            header[stamp_at..stamp_at + 4].copy_from_slice(&self.timestamps[i].to_be_bytes());
        }
        header
    }
}

impl RegionHandle for RegionFile {
    fn new(path: PathBuf, pos: RegionPos, options: RegionOptions) -> Self {
        Self {
            path,
            pos,
            options,
            file: None,
            locations: vec![Location::default(); REGION_CHUNK_COUNT],
            timestamps: vec![0; REGION_CHUNK_COUNT],
            sectors: vec![true; HEADER_SECTORS as usize],
            header_dirty: false,
        }
    }

    fn open(&mut self) -> Result<(), RegionError> {
        if self.file.is_some() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)?;
        let len = file.metadata()?.len();

        if len == 0 {
            // Новый регион: пустой заголовок
            self.reset_header();
            file.write_all(&self.encode_header())?;
            log::debug!("Created region file {}", self.path.display());
        } else {
            if len < HEADER_BYTES as u64 {
                return Err(self.corrupted(format!("file is {} bytes, shorter than the header", len)));
            }

            let mut header = vec![0u8; HEADER_BYTES];
            file.read_exact(&mut header)?;

            let file_sectors = len.div_ceil(SECTOR_BYTES as u64);
            let file_sectors = u32::try_from(file_sectors)
                .map_err(|_| self.corrupted("file is larger than the sector table can address"))?;
            if let Err(e) = self.load_header(&header, file_sectors) {
                self.reset_header();
                return Err(e);
            }

            // Добиваем хвост до целого сектора только после проверки
            let padded = file_sectors as u64 * SECTOR_BYTES as u64;
            if padded != len {
                file.set_len(padded)?;
            }
            log::debug!(
                "Opened region file {} ({} chunks)",
                self.path.display(),
                self.chunk_count()
            );
        }

        self.file = Some(file);
        Ok(())
    }

    fn read_slot(&mut self, slot: LocalSlot) -> Result<Option<Vec<u8>>, RegionError> {
        let file = self.file.as_mut().ok_or(RegionError::Closed)?;
        let loc = self.locations[slot.index()];
        if loc.is_empty() {
            return Ok(None);
        }

        let bad_slot = |reason: String| RegionError::CorruptedSlot { x: slot.x, z: slot.z, reason };

        file.seek(SeekFrom::Start(loc.offset as u64 * SECTOR_BYTES as u64))?;
        let mut prefix = [0u8; 5];
        file.read_exact(&mut prefix)?;

        let length = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        let capacity = loc.count as usize * SECTOR_BYTES - 4;
        if length == 0 || length > capacity {
            return Err(bad_slot(format!(
                "payload length {} does not fit {} allocated sectors",
                length, loc.count
            )));
        }
        if prefix[4] != COMPRESSION_ZSTD {
            return Err(bad_slot(format!("unknown compression type {}", prefix[4])));
        }

        let mut compressed = vec![0u8; length - 1];
        file.read_exact(&mut compressed)?;

        zstd::decode_all(&compressed[..])
            .map(Some)
            .map_err(|e| bad_slot(format!("decompression failed: {}", e)))
    }

    fn write_slot(&mut self, slot: LocalSlot, data: &[u8]) -> Result<(), RegionError> {
        if self.file.is_none() {
            return Err(RegionError::Closed);
        }

        let compressed = zstd::encode_all(data, self.options.compression_level)?;
        let length = compressed.len() + 1;
        let mut payload = Vec::with_capacity(length + 4);
        payload.extend_from_slice(&(length as u32).to_be_bytes());
        payload.push(COMPRESSION_ZSTD);
        payload.extend_from_slice(&compressed);

        let sectors = payload.len().div_ceil(SECTOR_BYTES);
        if sectors > MAX_SECTOR_COUNT as usize {
            return Err(RegionError::SlotTooLarge { size: payload.len() });
        }
        let sectors = sectors as u32;
        payload.resize(sectors as usize * SECTOR_BYTES, 0);

        let index = slot.index();
        let current = self.locations[index];
        // На месте если влезает, иначе в свободный отрезок. Старые секторы
        // освобождаются только после записи новых
        let offset = if !current.is_empty() && current.count >= sectors {
            current.offset
        } else {
            self.find_free(sectors)
        };
        if offset + sectors > MAX_SECTOR_OFFSET {
            return Err(RegionError::Io(io::Error::new(
                io::ErrorKind::Other,
                "region file has no addressable sectors left",
            )));
        }

        let file = self.file.as_mut().ok_or(RegionError::Closed)?;
        file.seek(SeekFrom::Start(offset as u64 * SECTOR_BYTES as u64))?;
        file.write_all(&payload)?;

        let placed = Location { offset, count: sectors };
        if !current.is_empty() {
            self.mark_sectors(current, false);
        }
        self.mark_sectors(placed, true);
        self.locations[index] = placed;
        self.timestamps[index] = chrono::Utc::now().timestamp() as u32;
        self.header_dirty = true;
        Ok(())
    }

    fn close(&mut self, flush: bool) -> Result<(), RegionError> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        if flush {
            if self.header_dirty {
                file.seek(SeekFrom::Start(0))?;
                file.write_all(&self.encode_header())?;
            }
            file.sync_data()?;
        }
        self.reset_header();
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn pos(&self) -> RegionPos {
        self.pos
    }

    fn options(&self) -> RegionOptions {
        self.options
    }
}
