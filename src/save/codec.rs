// ============================================
// Chunk Codec - Чанк <-> байты слота
// ============================================
// Сжатие делает файл региона, кодек отвечает только за структуру.

use crate::error::CodecError;
use super::chunk::{Chunk, CHUNK_HEIGHT, SECTION_SIZE, SECTION_VOLUME};

/// Чанк знает свои координаты
pub trait ChunkPosition {
    fn chunk_x(&self) -> i32;
    fn chunk_z(&self) -> i32;
}

/// Пара encode/decode для одного слота региона
pub trait ChunkCodec {
    type Chunk: ChunkPosition;

    fn encode(&self, chunk: &Self::Chunk) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, data: &[u8]) -> Result<Self::Chunk, CodecError>;
}

/// Bincode-кодек для [`Chunk`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeChunkCodec;

impl ChunkCodec for BincodeChunkCodec {
    type Chunk = Chunk;

    fn encode(&self, chunk: &Chunk) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(chunk)?)
    }

    fn decode(&self, data: &[u8]) -> Result<Chunk, CodecError> {
        let chunk: Chunk = bincode::deserialize(data)?;

        for section in &chunk.sections {
            if section.section_y < 0
                || section.section_y as usize >= CHUNK_HEIGHT
                || section.section_y as usize % SECTION_SIZE != 0
            {
                return Err(CodecError(format!("invalid section y {}", section.section_y)));
            }
            if section.indices.len() != SECTION_VOLUME {
                return Err(CodecError(format!(
                    "section {} has {} blocks, expected {}",
                    section.section_y,
                    section.indices.len(),
                    SECTION_VOLUME
                )));
            }
            if let Some(&bad) = section.indices.iter().find(|&&idx| !section.palette.contains_index(idx)) {
                return Err(CodecError(format!(
                    "section {} references palette entry {} of {}",
                    section.section_y,
                    bad,
                    section.palette.len()
                )));
            }
        }

        Ok(chunk)
    }
}
