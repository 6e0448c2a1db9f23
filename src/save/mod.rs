// ============================================
// Save - Чанки и метаданные мира
// ============================================
// chunk/palette - представление чанка с палитрой
// codec         - чанк <-> байты слота
// header        - заголовок level.dat
// level_data    - метаданные мира и погода

mod header;
mod chunk;
mod palette;
mod codec;
mod level_data;

pub use header::{LevelHeader, MAGIC_NUMBER, LEVEL_VERSION};
pub use chunk::{Chunk, ChunkSection, SECTION_SIZE, SECTION_VOLUME, CHUNK_HEIGHT};
pub use palette::{BlockPalette, BlockId, AIR};
pub use codec::{BincodeChunkCodec, ChunkCodec, ChunkPosition};
pub use level_data::{Difficulty, LevelData, DEFAULT_SPAWN};
