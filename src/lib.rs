// ============================================
// Voxel Region - Хранилище чанков в файлах регионов
// ============================================
// Мир хранится как <root>/level.dat + <root>/region/r.<x>.<z>.<ext>,
// один файл на 32x32 чанка.

pub mod config;
pub mod error;
pub mod region;
pub mod save;
pub mod provider;

pub use config::StorageConfig;
pub use error::{CodecError, RegionError, StorageError};
pub use provider::{generate, is_valid, AllChunks, RegionLevelProvider};
pub use region::{ChunkPos, RegionCache, RegionFile, RegionFormat, RegionPos};
pub use save::{BincodeChunkCodec, Chunk, ChunkCodec, Difficulty, LevelData};
