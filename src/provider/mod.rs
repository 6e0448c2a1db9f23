// ============================================
// Region Level Provider - Мир на файлах регионов
// ============================================
// Чтение/запись чанков по глобальным координатам:
// координаты -> регион + слот -> кэш регионов -> кодек.
// Плюс создание мира, проверка формата и метаданные level.dat.

mod iter;

pub use iter::AllChunks;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::{Map, Value};

use crate::config::StorageConfig;
use crate::error::{RegionError, StorageError};
use crate::region::{
    ChunkPos, Clock, RegionCache, RegionFile, RegionFormat, RegionHandle, LEVEL_DAT, REGION_DIR,
};
use crate::save::{ChunkCodec, ChunkPosition, Difficulty, LevelData};

/// Проверка директории мира для формата
pub fn is_valid(path: &Path, format: RegionFormat) -> bool {
    format.is_valid(path)
}

/// Создать новый мир: region/ и level.dat.
///
/// Опции: `hardcore` (bool), `difficulty` (строка), `preset` (строка).
/// Остальные ключи принадлежат генератору и здесь игнорируются.
pub fn generate(
    path: &Path,
    name: &str,
    seed: i64,
    generator: &str,
    options: &Map<String, Value>,
    config: &StorageConfig,
) -> Result<LevelData, StorageError> {
    let region_dir = path.join(REGION_DIR);
    fs::create_dir_all(&region_dir).map_err(|e| StorageError::io(&region_dir, e))?;

    let mut data = LevelData::new(name, seed, generator, config.format.pc_version());
    data.hardcore = options.get("hardcore").and_then(Value::as_bool).unwrap_or(false);
    data.set_difficulty(difficulty_option(options.get("difficulty")));
    data.generator_options = options
        .get("preset")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    data.save(&path.join(LEVEL_DAT), config.compression_level)?;
    log::info!(
        "Generated world '{}' at {} ({}, seed {})",
        name,
        path.display(),
        config.format.extension(),
        seed
    );
    Ok(data)
}

fn difficulty_option(value: Option<&Value>) -> Difficulty {
    let raw = match value {
        None => return Difficulty::default(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    raw.parse().unwrap_or_else(|e| {
        log::warn!("{}, using normal", e);
        Difficulty::default()
    })
}

/// Мир в формате McRegion/Anvil
pub struct RegionLevelProvider<C: ChunkCodec, H: RegionHandle = RegionFile> {
    path: PathBuf,
    config: StorageConfig,
    codec: C,
    regions: RegionCache<H>,
    level_data: LevelData,
    /// r.<x>.<z>.<ext>
    region_pattern: Regex,
}

impl<C: ChunkCodec, H: RegionHandle> RegionLevelProvider<C, H> {
    /// Открыть существующий мир
    pub fn open(path: impl Into<PathBuf>, codec: C, config: StorageConfig) -> Result<Self, StorageError> {
        let path = path.into();
        config.validate()?;
        config
            .format
            .probe(&path)
            .map_err(|reason| StorageError::Validation { path: path.clone(), reason })?;

        let level_data = LevelData::load(&path.join(LEVEL_DAT))?;
        let extension = config.format.extension();
        let region_pattern = Regex::new(&format!(r"^r\.(-?\d+)\.(-?\d+)\.{}$", regex::escape(extension)))
            .map_err(|e| StorageError::Config(e.to_string()))?;
        let regions = RegionCache::new(path.join(REGION_DIR), extension, config.region_options());

        log::debug!("Opened world '{}' at {}", level_data.level_name, path.display());
        Ok(Self {
            path,
            config,
            codec,
            regions,
            level_data,
            region_pattern,
        })
    }

    /// Подменить часы кэша регионов
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.regions.set_clock(Box::new(clock));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn regions(&self) -> &RegionCache<H> {
        &self.regions
    }

    #[cfg(test)]
    pub(crate) fn regions_mut(&mut self) -> &mut RegionCache<H> {
        &mut self.regions
    }

    pub fn level_data(&self) -> &LevelData {
        &self.level_data
    }

    pub fn level_data_mut(&mut self) -> &mut LevelData {
        &mut self.level_data
    }

    // ============================================
    // Chunk IO
    // ============================================

    /// Прочитать чанк. None если слот пуст.
    /// Ошибка декодирования касается только этого чанка.
    pub fn read_chunk(&mut self, x: i32, z: i32) -> Result<Option<C::Chunk>, StorageError> {
        let pos = ChunkPos::new(x, z);
        let handle = self.regions.get(pos.region())?;

        let data = match handle.read_slot(pos.local()) {
            Ok(Some(data)) => data,
            Ok(None) => return Ok(None),
            Err(RegionError::CorruptedSlot { reason, .. }) => {
                return Err(StorageError::Decode { x, z, reason });
            }
            Err(source) => {
                return Err(StorageError::Region {
                    path: handle.path().to_path_buf(),
                    source,
                });
            }
        };

        self.codec
            .decode(&data)
            .map(Some)
            .map_err(|e| StorageError::Decode { x, z, reason: e.0 })
    }

    /// Записать чанк по его собственным координатам
    pub fn write_chunk(&mut self, chunk: &C::Chunk) -> Result<(), StorageError> {
        let pos = ChunkPos::new(chunk.chunk_x(), chunk.chunk_z());
        let data = self.codec.encode(chunk).map_err(|e| StorageError::Encode {
            x: pos.x,
            z: pos.z,
            reason: e.0,
        })?;

        let handle = self.regions.get(pos.region())?;
        handle
            .write_slot(pos.local(), &data)
            .map_err(|source| StorageError::Region {
                path: handle.path().to_path_buf(),
                source,
            })
    }

    /// Все чанки всех регионов на диске (ленивый, однопроходный)
    pub fn all_chunks(&mut self) -> AllChunks<'_, C, H> {
        let pattern = self.region_pattern.clone();
        AllChunks::new(self, pattern)
    }

    // ============================================
    // Maintenance
    // ============================================

    /// Закрыть регионы без обращений дольше idle_timeout_secs
    pub fn do_garbage_collection(&mut self) -> Result<usize, StorageError> {
        let now = self.regions.now();
        let evicted = self.regions.evict_idle(now, self.config.idle_timeout())?;
        if evicted > 0 {
            log::info!("Garbage collection closed {} idle regions", evicted);
        }
        Ok(evicted)
    }

    /// Записать level.dat
    pub fn save_level_data(&self) -> Result<(), StorageError> {
        self.level_data
            .save(&self.path.join(LEVEL_DAT), self.config.compression_level)?;
        log::info!("Saved level data for '{}'", self.level_data.level_name);
        Ok(())
    }

    /// Закрыть все регионы (с flush)
    pub fn close(&mut self) -> Result<(), StorageError> {
        self.regions.close_all()
    }

    // ============================================
    // Level data
    // ============================================

    pub fn generator(&self) -> &str {
        &self.level_data.generator_name
    }

    pub fn generator_options(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("preset".to_string(), self.level_data.generator_options.clone())])
    }

    pub fn difficulty(&self) -> Difficulty {
        self.level_data.difficulty()
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.level_data.set_difficulty(difficulty);
    }

    pub fn rain_time(&self) -> i32 {
        self.level_data.rain_time
    }

    pub fn set_rain_time(&mut self, ticks: i32) {
        self.level_data.rain_time = ticks;
    }

    pub fn rain_level(&self) -> f32 {
        self.level_data.rain_level()
    }

    pub fn set_rain_level(&mut self, level: f32) {
        self.level_data.set_rain_level(level);
    }

    pub fn lightning_time(&self) -> i32 {
        self.level_data.thunder_time
    }

    pub fn set_lightning_time(&mut self, ticks: i32) {
        self.level_data.thunder_time = ticks;
    }

    pub fn lightning_level(&self) -> f32 {
        self.level_data.lightning_level()
    }

    pub fn set_lightning_level(&mut self, level: f32) {
        self.level_data.set_lightning_level(level);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::region::cache::tests::ManualClock;
    use crate::region::file::HEADER_BYTES;
    use crate::region::LocalSlot;
    use crate::save::{BincodeChunkCodec, Chunk};
    use serde_json::json;
    use tempfile::TempDir;

    pub(crate) type Provider = RegionLevelProvider<BincodeChunkCodec>;

    pub(crate) fn new_world(dir: &TempDir, clock: &ManualClock) -> Provider {
        let config = StorageConfig::default();
        generate(dir.path(), "Test", 42, "normal", &Map::new(), &config).unwrap();
        Provider::open(dir.path(), BincodeChunkCodec, config)
            .unwrap()
            .with_clock(clock.clone())
    }

    pub(crate) fn chunk_at(x: i32, z: i32) -> Chunk {
        let mut chunk = Chunk::new(x, z);
        chunk.set_block((x & 15) as usize, 64, (z & 15) as usize, 7);
        chunk
    }

    #[test]
    fn test_generate_writes_level_data() {
        let dir = TempDir::new().unwrap();
        let options = json!({ "hardcore": true, "difficulty": "hard", "preset": "2;7,2x3,2;1", "trees": false });
        let options = options.as_object().unwrap();
        let config = StorageConfig::with_format(RegionFormat::McRegion);

        generate(dir.path(), "Skyblock", -7, "flat", options, &config).unwrap();
        assert!(dir.path().join(REGION_DIR).is_dir());
        assert!(is_valid(dir.path(), RegionFormat::McRegion));

        let data = LevelData::load(&dir.path().join(LEVEL_DAT)).unwrap();
        assert!(data.hardcore);
        assert!(data.initialized);
        assert_eq!(data.difficulty(), Difficulty::Hard);
        assert_eq!(data.version, 19132);
        assert_eq!(data.random_seed, -7);
        assert_eq!(data.level_name, "Skyblock");
        assert_eq!(data.generator_name, "flat");
        assert_eq!(data.generator_options, "2;7,2x3,2;1");
        assert_eq!((data.spawn_x, data.spawn_y, data.spawn_z), (256, 70, 256));
        assert_eq!((data.day_time, data.time, data.size_on_disk), (0, 0, 0));
        assert!(data.game_rules.is_empty());
    }

    #[test]
    fn test_generate_defaults() {
        let dir = TempDir::new().unwrap();
        let options = json!({ "hardcore": "yes", "difficulty": "impossible" });
        let data = generate(
            dir.path(),
            "W",
            1,
            "normal",
            options.as_object().unwrap(),
            &StorageConfig::default(),
        )
        .unwrap();

        assert!(!data.hardcore);
        assert_eq!(data.difficulty(), Difficulty::Normal);
        assert_eq!(data.generator_options, "");
    }

    #[test]
    fn test_open_rejects_wrong_format() {
        let dir = TempDir::new().unwrap();
        generate(dir.path(), "W", 1, "normal", &Map::new(), &StorageConfig::default()).unwrap();
        fs::write(dir.path().join(REGION_DIR).join("r.0.0.mcr"), b"").unwrap();

        let result = Provider::open(dir.path(), BincodeChunkCodec, StorageConfig::default());
        assert!(matches!(result, Err(StorageError::Validation { .. })));
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(100);
        let mut world = new_world(&dir, &clock);

        let chunk = chunk_at(-33, 65);
        world.write_chunk(&chunk).unwrap();
        assert_eq!(world.read_chunk(-33, 65).unwrap(), Some(chunk));
        assert_eq!(world.read_chunk(-33, 66).unwrap(), None);
        assert!(world.regions().contains(crate::region::RegionPos::new(-2, 2)));
    }

    #[test]
    fn test_read_after_eviction() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(100);
        let mut world = new_world(&dir, &clock);

        let chunk = chunk_at(5, -1);
        world.write_chunk(&chunk).unwrap();
        assert_eq!(world.regions_mut().evict_idle(100, 0).unwrap(), 1);
        assert!(world.regions().is_empty());

        assert_eq!(world.read_chunk(5, -1).unwrap(), Some(chunk));
    }

    #[test]
    fn test_garbage_collection_uses_idle_timeout() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(1_000);
        let mut world = new_world(&dir, &clock);

        world.write_chunk(&chunk_at(0, 0)).unwrap();
        clock.set(1_299);
        assert_eq!(world.do_garbage_collection().unwrap(), 0);
        clock.set(1_300);
        assert_eq!(world.do_garbage_collection().unwrap(), 1);
        assert!(world.regions().is_empty());
        assert!(world.read_chunk(0, 0).unwrap().is_some());
    }

    #[test]
    fn test_decode_failure_is_chunk_scoped() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(100);
        let mut world = new_world(&dir, &clock);

        world.write_chunk(&chunk_at(1, 1)).unwrap();
        world
            .regions_mut()
            .get(crate::region::RegionPos::new(0, 0))
            .unwrap()
            .write_slot(LocalSlot::new(2, 2), b"\x01\x02")
            .unwrap();

        let err = world.read_chunk(2, 2).unwrap_err();
        assert!(matches!(err, StorageError::Decode { x: 2, z: 2, .. }));
        assert!(world.read_chunk(1, 1).unwrap().is_some());
    }

    #[test]
    fn test_corrupted_region_is_transparent() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(1_700_000_123);
        let mut world = new_world(&dir, &clock);

        let path = dir.path().join(REGION_DIR).join("r.-1.-1.mca");
        fs::write(&path, b"broken").unwrap();

        assert_eq!(world.read_chunk(-1, -1).unwrap(), None);
        let chunk = chunk_at(-1, -1);
        world.write_chunk(&chunk).unwrap();
        assert_eq!(world.read_chunk(-1, -1).unwrap(), Some(chunk));

        let backup = dir.path().join(REGION_DIR).join("r.-1.-1.mca.bak.1700000123");
        assert_eq!(fs::read(backup).unwrap(), b"broken");
        assert!(fs::metadata(&path).unwrap().len() >= HEADER_BYTES as u64);
    }

    #[test]
    fn test_level_data_parity_operations() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(100);
        let mut world = new_world(&dir, &clock);

        assert_eq!(world.generator(), "normal");
        assert_eq!(world.generator_options().get("preset").map(String::as_str), Some(""));
        assert_eq!(world.difficulty(), Difficulty::Normal);
        assert_eq!(world.rain_time(), 0);
        assert_eq!(world.rain_level(), 0.0);

        world.set_difficulty(Difficulty::Peaceful);
        world.set_rain_time(1200);
        world.set_rain_level(0.6);
        world.set_lightning_time(40);
        world.set_lightning_level(0.2);
        world.save_level_data().unwrap();
        world.close().unwrap();

        let reopened = Provider::open(dir.path(), BincodeChunkCodec, StorageConfig::default()).unwrap();
        assert_eq!(reopened.difficulty(), Difficulty::Peaceful);
        assert_eq!(reopened.rain_time(), 1200);
        assert_eq!(reopened.rain_level(), 0.6);
        assert_eq!(reopened.level_data().raining, 1);
        assert_eq!(reopened.lightning_time(), 40);
        assert_eq!(reopened.lightning_level(), 0.2);
        assert_eq!(reopened.level_data().thundering, 1);
    }

    #[test]
    fn test_close_persists_chunks() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(100);
        let mut world = new_world(&dir, &clock);
        let chunk = chunk_at(40, 40);
        world.write_chunk(&chunk).unwrap();
        world.close().unwrap();
        assert!(world.regions().is_empty());

        let mut reopened = Provider::open(dir.path(), BincodeChunkCodec, StorageConfig::default()).unwrap();
        assert_eq!(reopened.read_chunk(40, 40).unwrap(), Some(chunk));
    }
}
