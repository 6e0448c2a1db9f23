// ============================================
// Region Storage - Регионы 32x32 чанка на диске
// ============================================
// coords   - арифметика чанк/регион/слот
// handle   - интерфейс открытого файла региона
// file     - секторный файл региона (ZSTD)
// format   - McRegion / Anvil и проверка директории
// cache    - ленивое открытие, вытеснение по простою
// recovery - карантин повреждённых файлов

pub mod coords;
pub mod handle;
pub mod file;
pub mod format;
pub mod cache;
pub mod recovery;

pub use coords::{ChunkPos, LocalSlot, RegionKey, RegionPos, REGION_SIZE};
pub use handle::{RegionHandle, RegionOptions};
pub use file::RegionFile;
pub use format::{RegionFormat, LEVEL_DAT, REGION_DIR};
pub use cache::{Clock, RegionCache, SystemClock, DEFAULT_IDLE_TIMEOUT};
