// ============================================
// Block Palette - Палитра блоков секции
// ============================================
// Секция хранит u16-индексы в палитру, палитра хранит id блоков.
// На диск уходит только список id; индекс поиска строится при загрузке.

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

/// Числовой id блока
pub type BlockId = u16;

/// Воздух
pub const AIR: BlockId = 0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<BlockId>", into = "Vec<BlockId>")]
pub struct BlockPalette {
    entries: Vec<BlockId>,
    lookup: HashMap<BlockId, u16>,
}

impl BlockPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Палитра, где индекс 0 это воздух
    pub fn with_air() -> Self {
        Self::from(vec![AIR])
    }

    /// Индекс блока; новый id дописывается в конец
    pub fn index_or_insert(&mut self, block: BlockId) -> u16 {
        let next = self.entries.len() as u16;
        let entries = &mut self.entries;
        *self.lookup.entry(block).or_insert_with(|| {
            entries.push(block);
            next
        })
    }

    pub fn index_of(&self, block: BlockId) -> Option<u16> {
        self.lookup.get(&block).copied()
    }

    pub fn block(&self, index: u16) -> Option<BlockId> {
        self.entries.get(index as usize).copied()
    }

    pub fn contains_index(&self, index: u16) -> bool {
        (index as usize) < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.entries.iter().copied()
    }
}

impl From<Vec<BlockId>> for BlockPalette {
    fn from(entries: Vec<BlockId>) -> Self {
        let mut lookup = HashMap::with_capacity(entries.len());
        for (index, &block) in entries.iter().enumerate() {
            // При повторе id ищем по первому вхождению
            lookup.entry(block).or_insert(index as u16);
        }
        Self { entries, lookup }
    }
}

impl From<BlockPalette> for Vec<BlockId> {
    fn from(palette: BlockPalette) -> Self {
        palette.entries
    }
}

impl PartialEq for BlockPalette {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for BlockPalette {}
