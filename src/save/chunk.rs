// ============================================
// Chunk - Колонна данных мира для хранения
// ============================================
// Секции 16x16x16 с палитрой; пустые секции не храним

use serde::{Serialize, Deserialize};

use crate::region::ChunkPos;
use super::codec::ChunkPosition;
use super::palette::{BlockId, BlockPalette, AIR};

/// Размер секции чанка (16x16x16)
pub const SECTION_SIZE: usize = 16;
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;
/// Высота мира в блоках
pub const CHUNK_HEIGHT: usize = 256;

/// Чанк с секциями
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Координаты чанка (X, Z)
    pub chunk_x: i32,
    pub chunk_z: i32,
    /// Генератор уже заселил чанк (деревья, руды)
    pub populated: bool,
    /// Секции чанка по высоте (каждая 16x16x16)
    pub sections: Vec<ChunkSection>,
}

/// Секция 16x16x16
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSection {
    /// Y-координата секции (в блоках, кратно 16)
    pub section_y: i32,
    /// Палитра блоков для этой секции
    pub palette: BlockPalette,
    /// Индексы блоков (ссылки на палитру)
    pub indices: Vec<u16>,
}

impl Chunk {
    pub fn new(chunk_x: i32, chunk_z: i32) -> Self {
        Self {
            chunk_x,
            chunk_z,
            populated: false,
            sections: Vec::new(),
        }
    }

    pub fn pos(&self) -> ChunkPos {
        ChunkPos::new(self.chunk_x, self.chunk_z)
    }

    /// Добавить секцию (заменяет секцию с тем же Y)
    pub fn add_section(&mut self, section: ChunkSection) {
        match self.sections.iter_mut().find(|s| s.section_y == section.section_y) {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
    }

    /// Получить секцию по Y
    pub fn get_section(&self, section_y: i32) -> Option<&ChunkSection> {
        self.sections.iter().find(|s| s.section_y == section_y)
    }

    /// Проверить пустой ли чанк
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.is_air_only())
    }

    /// Блок по локальным координатам (x, z: 0..16, y: 0..256)
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> BlockId {
        if x >= SECTION_SIZE || z >= SECTION_SIZE || y >= CHUNK_HEIGHT {
            return AIR;
        }
        let section_y = section_base(y);
        self.get_section(section_y)
            .map(|s| s.get(x, y % SECTION_SIZE, z))
            .unwrap_or(AIR)
    }

    /// Поставить блок; секция создаётся при первой записи не-воздуха
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockId) {
        if x >= SECTION_SIZE || z >= SECTION_SIZE || y >= CHUNK_HEIGHT {
            return;
        }
        let section_y = section_base(y);
        let pos = self.sections.iter().position(|s| s.section_y == section_y);
        let section = match pos {
            Some(i) => &mut self.sections[i],
            None if block == AIR => return,
            None => {
                self.sections.push(ChunkSection::empty(section_y));
                let last = self.sections.len() - 1;
                &mut self.sections[last]
            }
        };
        section.set(x, y % SECTION_SIZE, z, block);
    }
}

impl ChunkPosition for Chunk {
    fn chunk_x(&self) -> i32 {
        self.chunk_x
    }

    fn chunk_z(&self) -> i32 {
        self.chunk_z
    }
}

impl ChunkSection {
    /// Секция из одного воздуха
    pub fn empty(section_y: i32) -> Self {
        Self {
            section_y,
            palette: BlockPalette::with_air(),
            indices: vec![0; SECTION_VOLUME],
        }
    }

    /// Создать секцию из массива блоков 16x16x16
    pub fn from_blocks(section_y: i32, blocks: &[BlockId; SECTION_VOLUME]) -> Self {
        let mut palette = BlockPalette::new();
        let mut indices = Vec::with_capacity(SECTION_VOLUME);

        for &block in blocks {
            indices.push(palette.index_or_insert(block));
        }

        Self {
            section_y,
            palette,
            indices,
        }
    }

    /// Распаковать секцию в массив блоков
    pub fn decompress(&self) -> [BlockId; SECTION_VOLUME] {
        let mut blocks = [AIR; SECTION_VOLUME];

        for (i, &idx) in self.indices.iter().enumerate() {
            if let Some(block) = self.palette.block(idx) {
                blocks[i] = block;
            }
        }

        blocks
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.indices
            .get(section_index(x, y, z))
            .and_then(|&idx| self.palette.block(idx))
            .unwrap_or(AIR)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: BlockId) {
        let idx = self.palette.index_or_insert(block);
        self.indices[section_index(x, y, z)] = idx;
    }

    /// Проверить содержит ли секция только воздух
    pub fn is_air_only(&self) -> bool {
        self.indices.iter().all(|&idx| self.palette.block(idx) == Some(AIR))
    }
}

/// Y секции (в блоках) для высоты y
#[inline]
fn section_base(y: usize) -> i32 {
    (y - y % SECTION_SIZE) as i32
}

/// Индекс блока внутри секции
#[inline]
pub fn section_index(x: usize, y: usize, z: usize) -> usize {
    y * SECTION_SIZE * SECTION_SIZE + z * SECTION_SIZE + x
}

/// Координаты из индекса секции
#[inline]
pub fn index_to_coords(index: usize) -> (usize, usize, usize) {
    let y = index / (SECTION_SIZE * SECTION_SIZE);
    let rem = index % (SECTION_SIZE * SECTION_SIZE);
    let z = rem / SECTION_SIZE;
    let x = rem % SECTION_SIZE;
    (x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_block() {
        let mut chunk = Chunk::new(-3, 7);
        chunk.set_block(1, 70, 15, 4);
        chunk.set_block(1, 71, 15, 4);
        chunk.set_block(0, 0, 0, 9);

        assert_eq!(chunk.get_block(1, 70, 15), 4);
        assert_eq!(chunk.get_block(1, 72, 15), AIR);
        assert_eq!(chunk.get_block(0, 0, 0), 9);
        assert_eq!(chunk.sections.len(), 2);
        assert!(chunk.get_section(64).is_some());
        assert_eq!(chunk.get_section(64).map(|s| s.palette.len()), Some(2));
    }

    #[test]
    fn test_air_does_not_allocate_section() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_block(3, 100, 3, AIR);
        assert!(chunk.sections.is_empty());
        assert!(chunk.is_empty());

        chunk.set_block(3, 100, 3, 1);
        chunk.set_block(3, 100, 3, AIR);
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_block(16, 0, 0, 1);
        chunk.set_block(0, 256, 0, 1);
        assert!(chunk.sections.is_empty());
        assert_eq!(chunk.get_block(0, 300, 0), AIR);
    }

    #[test]
    fn test_section_from_blocks() {
        let mut blocks = [AIR; SECTION_VOLUME];
        blocks[section_index(2, 3, 4)] = 12;
        let section = ChunkSection::from_blocks(32, &blocks);

        assert_eq!(section.palette.len(), 2);
        assert_eq!(section.get(2, 3, 4), 12);
        assert_eq!(index_to_coords(section_index(2, 3, 4)), (2, 3, 4));
        assert_eq!(section.decompress()[..], blocks[..]);
    }
}
