// ============================================
// Level Data - Метаданные мира (level.dat)
// ============================================
// Формат файла: LevelHeader (bincode) + ZSTD(bincode(LevelData))
//
// Погода хранится в двух полях: float (PocketMine/MCPE) и byte (PC vanilla).
// Чтение: float если есть, иначе byte. Запись всегда обновляет оба.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::StorageError;
use super::header::LevelHeader;

/// Сложность мира
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Peaceful = 0,
    Easy = 1,
    #[default]
    Normal = 2,
    Hard = 3,
}

impl Difficulty {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Difficulty::Peaceful),
            1 => Some(Difficulty::Easy),
            2 => Some(Difficulty::Normal),
            3 => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl FromStr for Difficulty {
    type Err = String;

    /// "peaceful" / "p" / "0", без учёта регистра
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "peaceful" | "p" => Ok(Difficulty::Peaceful),
            "1" | "easy" | "e" => Ok(Difficulty::Easy),
            "2" | "normal" | "n" => Ok(Difficulty::Normal),
            "3" | "hard" | "h" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// Спавн по умолчанию
pub const DEFAULT_SPAWN: (i32, i32, i32) = (256, 70, 256);

/// Метаданные мира
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub hardcore: bool,
    pub difficulty: u8,
    pub initialized: bool,
    pub game_type: i32,
    pub generator_version: i32,
    pub spawn_x: i32,
    pub spawn_y: i32,
    pub spawn_z: i32,
    /// Версия формата регионов (19132 / 19133)
    pub version: i32,
    pub day_time: i64,
    /// Unix-время в миллисекундах
    pub last_played: i64,
    pub random_seed: i64,
    pub size_on_disk: i64,
    pub time: i64,
    pub generator_name: String,
    pub generator_options: String,
    pub level_name: String,
    pub game_rules: BTreeMap<String, String>,

    // Погода
    pub rain_time: i32,
    pub rain_level: Option<f32>,
    pub raining: u8,
    pub thunder_time: i32,
    pub lightning_level: Option<f32>,
    pub thundering: u8,
}

impl LevelData {
    /// Свежие метаданные нового мира
    pub fn new(level_name: &str, seed: i64, generator_name: &str, format_version: i32) -> Self {
        Self {
            hardcore: false,
            difficulty: Difficulty::Normal.as_u8(),
            initialized: true,
            game_type: 0,
            generator_version: 1,
            spawn_x: DEFAULT_SPAWN.0,
            spawn_y: DEFAULT_SPAWN.1,
            spawn_z: DEFAULT_SPAWN.2,
            version: format_version,
            day_time: 0,
            last_played: chrono::Utc::now().timestamp_millis(),
            random_seed: seed,
            size_on_disk: 0,
            time: 0,
            generator_name: generator_name.to_string(),
            generator_options: String::new(),
            level_name: level_name.to_string(),
            game_rules: BTreeMap::new(),
            rain_time: 0,
            rain_level: None,
            raining: 0,
            thunder_time: 0,
            lightning_level: None,
            thundering: 0,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        Difficulty::from_u8(self.difficulty).unwrap_or_default()
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty.as_u8();
    }

    pub fn rain_level(&self) -> f32 {
        self.rain_level.unwrap_or(self.raining as f32)
    }

    pub fn set_rain_level(&mut self, level: f32) {
        self.rain_level = Some(level);
        self.raining = level.ceil() as u8;
    }

    pub fn lightning_level(&self) -> f32 {
        self.lightning_level.unwrap_or(self.thundering as f32)
    }

    pub fn set_lightning_level(&mut self, level: f32) {
        self.lightning_level = Some(level);
        self.thundering = level.ceil() as u8;
    }

    /// Загрузить level.dat
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let invalid = |reason: String| StorageError::LevelData {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
        let mut reader = BufReader::new(file);

        // 1. Читаем заголовок
        let header_size = bincode::serialized_size(&LevelHeader::default()).unwrap_or(8) as usize;
        let mut header_bytes = vec![0u8; header_size];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|e| invalid(format!("cannot read header: {}", e)))?;

        let header: LevelHeader = bincode::deserialize(&header_bytes).map_err(|e| invalid(e.to_string()))?;
        if !header.is_valid() {
            return Err(invalid(format!(
                "invalid header (magic {:?}, version {})",
                header.magic, header.version
            )));
        }

        // 2. Читаем и распаковываем тело
        let mut compressed = Vec::new();
        reader
            .read_to_end(&mut compressed)
            .map_err(|e| StorageError::io(path, e))?;

        let body = zstd::decode_all(&compressed[..]).map_err(|e| invalid(format!("decompression failed: {}", e)))?;
        bincode::deserialize(&body).map_err(|e| invalid(e.to_string()))
    }

    /// Сохранить level.dat
    pub fn save(&self, path: &Path, compression_level: i32) -> Result<(), StorageError> {
        let invalid = |reason: String| StorageError::LevelData {
            path: path.to_path_buf(),
            reason,
        };

        let header_bytes = bincode::serialize(&LevelHeader::new()).map_err(|e| invalid(e.to_string()))?;
        let body = bincode::serialize(self).map_err(|e| invalid(e.to_string()))?;
        let compressed = zstd::encode_all(&body[..], compression_level).map_err(|e| StorageError::io(path, e))?;

        let file = File::create(path).map_err(|e| StorageError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        let write = |writer: &mut BufWriter<File>| -> std::io::Result<()> {
            writer.write_all(&header_bytes)?;
            writer.write_all(&compressed)?;
            writer.flush()
        };
        write(&mut writer).map_err(|e| StorageError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn level() -> LevelData {
        LevelData::new("Test", 12345, "flat", 19133)
    }

    #[test]
    fn test_float_rain_field_wins() {
        let mut data = level();
        data.raining = 1;
        data.rain_level = Some(0.25);
        assert_eq!(data.rain_level(), 0.25);
    }

    #[test]
    fn test_legacy_rain_field_fallback() {
        let mut data = level();
        data.rain_level = None;
        data.raining = 1;
        assert_eq!(data.rain_level(), 1.0);
    }

    #[test]
    fn test_set_rain_level_updates_both_fields() {
        let mut data = level();
        data.set_rain_level(0.6);
        assert_eq!(data.rain_level, Some(0.6));
        assert_eq!(data.raining, 1);

        data.set_rain_level(0.0);
        assert_eq!(data.raining, 0);
    }

    #[test]
    fn test_lightning_mirrors_rain() {
        let mut data = level();
        data.thundering = 1;
        assert_eq!(data.lightning_level(), 1.0);

        data.set_lightning_level(0.3);
        assert_eq!(data.lightning_level(), 0.3);
        assert_eq!(data.thundering, 1);
    }

    #[test]
    fn test_difficulty_parsing() {
        assert_eq!("peaceful".parse::<Difficulty>(), Ok(Difficulty::Peaceful));
        assert_eq!("E".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!("2".parse::<Difficulty>(), Ok(Difficulty::Normal));
        assert_eq!(" Hard ".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("nightmare".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_unknown_stored_difficulty_reads_normal() {
        let mut data = level();
        data.difficulty = 9;
        assert_eq!(data.difficulty(), Difficulty::Normal);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("level.dat");

        let mut data = level();
        data.set_rain_level(0.5);
        data.game_rules.insert("doDaylightCycle".to_string(), "false".to_string());
        data.save(&path, 3).unwrap();

        assert_eq!(LevelData::load(&path).unwrap(), data);
    }

    #[test]
    fn test_load_rejects_foreign_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("level.dat");
        std::fs::write(&path, b"RUST\x01\x00\x00\x00garbage").unwrap();

        assert!(matches!(LevelData::load(&path), Err(StorageError::LevelData { .. })));
    }

    #[test]
    fn test_load_rejects_newer_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("level.dat");
        let mut header = LevelHeader::new();
        header.version += 1;
        let mut bytes = bincode::serialize(&header).unwrap();
        bytes.extend(zstd::encode_all(&bincode::serialize(&level()).unwrap()[..], 3).unwrap());
        std::fs::write(&path, &bytes).unwrap();

        let err = LevelData::load(&path).unwrap_err();
        assert!(matches!(err, StorageError::LevelData { ref reason, .. } if reason.contains("version 2")));
    }
}
