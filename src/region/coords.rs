// ============================================
// Coords - Чанк <-> регион <-> локальный слот
// ============================================
// Регион = 32x32 чанка. Деление через арифметический сдвиг,
// поэтому x = -33 попадает в регион -2 со слотом 31.

use ndshape::{ConstShape, ConstShape2u32};

/// Сторона региона в чанках
pub const REGION_SIZE: i32 = 32;
/// Бит на локальную координату
pub const REGION_SHIFT: u32 = 5;
/// Маска локальной координаты
pub const REGION_MASK: i32 = REGION_SIZE - 1;
/// Чанков в одном регионе
pub const REGION_CHUNK_COUNT: usize = (REGION_SIZE * REGION_SIZE) as usize;

/// Форма таблицы слотов: индекс = x + 32 * z
pub type RegionShape = ConstShape2u32<32, 32>;

/// Глобальные координаты чанка
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    #[inline]
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    #[inline]
    pub fn region(&self) -> RegionPos {
        region_of(self.x, self.z)
    }

    #[inline]
    pub fn local(&self) -> LocalSlot {
        local_of(self.x, self.z)
    }
}

/// Координаты региона
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    #[inline]
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Ключ для карты кэша
    #[inline]
    pub fn key(&self) -> RegionKey {
        key(self.x, self.z)
    }

    /// Первый чанк региона. None если регион вне диапазона i32 чанков
    pub fn chunk_origin(&self) -> Option<ChunkPos> {
        Some(ChunkPos::new(
            self.x.checked_mul(REGION_SIZE)?,
            self.z.checked_mul(REGION_SIZE)?,
        ))
    }

    /// Глобальный чанк по локальному слоту
    #[inline]
    pub fn chunk_at(&self, local: LocalSlot) -> ChunkPos {
        ChunkPos::new(
            (self.x << REGION_SHIFT) | local.x as i32,
            (self.z << REGION_SHIFT) | local.z as i32,
        )
    }

    pub fn file_name(&self, extension: &str) -> String {
        file_name(self.x, self.z, extension)
    }
}

/// Позиция чанка внутри файла региона, каждая ось в [0, 31]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LocalSlot {
    pub x: u8,
    pub z: u8,
}

impl LocalSlot {
    #[inline]
    pub fn new(x: u8, z: u8) -> Self {
        debug_assert!(x < 32 && z < 32);
        Self { x, z }
    }

    /// Индекс в таблице смещений (0..1024)
    #[inline]
    pub fn index(&self) -> usize {
        RegionShape::linearize([self.x as u32, self.z as u32]) as usize
    }

    /// Из индекса в таблице смещений
    #[inline]
    pub fn from_index(index: usize) -> Self {
        let [x, z] = RegionShape::delinearize(index as u32);
        Self { x: x as u8, z: z as u8 }
    }
}

/// Упакованные координаты региона: rx в старшей половине, rz в младшей.
/// Инъективно на всём диапазоне i32 x i32.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionKey(u64);

impl RegionKey {
    #[inline]
    pub fn unpack(self) -> RegionPos {
        RegionPos::new((self.0 >> 32) as u32 as i32, self.0 as u32 as i32)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Регион чанка (floor-деление на 32)
#[inline]
pub fn region_of(x: i32, z: i32) -> RegionPos {
    RegionPos::new(x >> REGION_SHIFT, z >> REGION_SHIFT)
}

/// Локальный слот чанка (младшие 5 бит)
#[inline]
pub fn local_of(x: i32, z: i32) -> LocalSlot {
    LocalSlot {
        x: (x & REGION_MASK) as u8,
        z: (z & REGION_MASK) as u8,
    }
}

/// "r.{rx}.{rz}.{ext}"
pub fn file_name(region_x: i32, region_z: i32, extension: &str) -> String {
    format!("r.{}.{}.{}", region_x, region_z, extension)
}

#[inline]
pub fn key(region_x: i32, region_z: i32) -> RegionKey {
    RegionKey(((region_x as u32 as u64) << 32) | region_z as u32 as u64)
}
