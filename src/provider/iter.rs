// ============================================
// All Chunks - Обход всех чанков на диске
// ============================================
// Ленивый однопроходный итератор: директория region/ читается по
// одному файлу, регион открывается только когда до него дошли.
// Внутри региона порядок x (внешний цикл), затем z.
// Порядок регионов не определён (как отдаёт файловая система).
// Если директорию меняют во время обхода, поведение не определено.

use std::fs::{self, ReadDir};
use std::io;
use std::iter::FusedIterator;

use regex::Regex;

use crate::error::StorageError;
use crate::region::coords::REGION_CHUNK_COUNT;
use crate::region::{ChunkPos, RegionHandle, RegionPos, REGION_SIZE};
use crate::save::ChunkCodec;
use super::RegionLevelProvider;

/// Текущий обходимый регион
struct RegionScan {
    origin: ChunkPos,
    next: usize,
}

/// Итератор по всем чанкам мира.
///
/// Ошибка декодирования отдаётся как `Err` для одного чанка, обход
/// продолжается. Ошибка открытия региона отдаётся один раз, остаток
/// региона пропускается.
pub struct AllChunks<'a, C: ChunkCodec, H: RegionHandle> {
    provider: &'a mut RegionLevelProvider<C, H>,
    pattern: Regex,
    entries: Option<ReadDir>,
    current: Option<RegionScan>,
    done: bool,
}

impl<'a, C: ChunkCodec, H: RegionHandle> AllChunks<'a, C, H> {
    pub(super) fn new(provider: &'a mut RegionLevelProvider<C, H>, pattern: Regex) -> Self {
        Self {
            provider,
            pattern,
            entries: None,
            current: None,
            done: false,
        }
    }

    /// Следующий файл региона; Some(Err) при ошибке чтения директории
    fn next_region(&mut self) -> Option<Result<RegionPos, StorageError>> {
        let region_dir = self.provider.regions().region_dir().to_path_buf();
        let extension = self.provider.regions().extension();

        if self.entries.is_none() {
            match fs::read_dir(&region_dir) {
                Ok(entries) => self.entries = Some(entries),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
                Err(e) => return Some(Err(StorageError::io(region_dir, e))),
            }
        }

        let entries = self.entries.as_mut()?;
        for entry in entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(StorageError::io(region_dir, e))),
            };
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(pos) = parse_region(&self.pattern, extension, name) {
                return Some(Ok(pos));
            }
        }
        None
    }
}

/// Координаты региона из имени файла. Неканонические имена
/// (r.-0.0, r.01.0) пропускаются: они дублируют r.0.0
fn parse_region(pattern: &Regex, extension: &str, name: &str) -> Option<RegionPos> {
    let caps = pattern.captures(name)?;
    let x = caps.get(1)?.as_str().parse().ok()?;
    let z = caps.get(2)?.as_str().parse().ok()?;
    let pos = RegionPos::new(x, z);
    (pos.file_name(extension) == name).then_some(pos)
}

impl<C: ChunkCodec, H: RegionHandle> Iterator for AllChunks<'_, C, H> {
    type Item = Result<C::Chunk, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Some(scan) = self.current.as_mut() {
                while scan.next < REGION_CHUNK_COUNT {
                    let i = scan.next as i32;
                    scan.next += 1;
                    let x = scan.origin.x + i / REGION_SIZE;
                    let z = scan.origin.z + i % REGION_SIZE;

                    match self.provider.read_chunk(x, z) {
                        Ok(Some(chunk)) => return Some(Ok(chunk)),
                        Ok(None) => continue,
                        Err(e) if e.is_chunk_scoped() => return Some(Err(e)),
                        Err(e) => {
                            // Регион не открылся: остаток пропускаем
                            scan.next = REGION_CHUNK_COUNT;
                            return Some(Err(e));
                        }
                    }
                }
                self.current = None;
            }

            match self.next_region() {
                Some(Ok(pos)) => match pos.chunk_origin() {
                    Some(origin) => self.current = Some(RegionScan { origin, next: 0 }),
                    None => log::debug!("Skipping region {:?}: outside chunk coordinate range", pos),
                },
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    self.entries = None;
                    return None;
                }
            }
        }
    }
}

impl<C: ChunkCodec, H: RegionHandle> FusedIterator for AllChunks<'_, C, H> {}

#[cfg(test)]
mod tests {
    use super::super::tests::{chunk_at, new_world};
    use crate::region::cache::tests::ManualClock;
    use crate::region::{RegionHandle, RegionPos, LocalSlot, REGION_DIR};
    use crate::error::StorageError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_iterates_only_region_files() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(100);
        let mut world = new_world(&dir, &clock);

        let coords = [(0, 0), (31, 5), (12, 31), (-1, 0), (-32, 17), (-20, 31)];
        for &(x, z) in &coords {
            world.write_chunk(&chunk_at(x, z)).unwrap();
        }
        world.close().unwrap();

        let stray = dir.path().join(REGION_DIR).join("notaregion.txt");
        fs::write(&stray, b"leave me alone").unwrap();
        fs::write(dir.path().join(REGION_DIR).join("r.0.0.mca.bak.5"), b"old").unwrap();

        let mut found: Vec<(i32, i32)> = world
            .all_chunks()
            .map(|c| c.map(|c| (c.chunk_x, c.chunk_z)))
            .collect::<Result<_, _>>()
            .unwrap();
        found.sort();

        let mut expected = coords.to_vec();
        expected.sort();
        assert_eq!(found, expected);
        assert_eq!(fs::read(&stray).unwrap(), b"leave me alone");
        assert_eq!(world.regions().len(), 2);
    }

    #[test]
    fn test_order_within_region_is_x_then_z() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(100);
        let mut world = new_world(&dir, &clock);

        for &(x, z) in &[(1, 0), (0, 5), (0, 2)] {
            world.write_chunk(&chunk_at(x, z)).unwrap();
        }

        let order: Vec<(i32, i32)> = world
            .all_chunks()
            .map(|c| c.map(|c| (c.chunk_x, c.chunk_z)).unwrap())
            .collect();
        assert_eq!(order, vec![(0, 2), (0, 5), (1, 0)]);
    }

    #[test]
    fn test_decode_failure_does_not_stop_iteration() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(100);
        let mut world = new_world(&dir, &clock);

        world.write_chunk(&chunk_at(0, 0)).unwrap();
        world.write_chunk(&chunk_at(3, 3)).unwrap();
        world
            .regions_mut()
            .get(RegionPos::new(0, 0))
            .unwrap()
            .write_slot(LocalSlot::new(1, 1), b"junk")
            .unwrap();

        let items: Vec<_> = world.all_chunks().collect();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[1], Err(StorageError::Decode { x: 1, z: 1, .. })));
        assert!(items[0].is_ok() && items[2].is_ok());
    }

    #[test]
    fn test_empty_world_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(100);
        let mut world = new_world(&dir, &clock);

        let mut chunks = world.all_chunks();
        assert!(chunks.next().is_none());
        assert!(chunks.next().is_none());
    }

    #[test]
    fn test_non_canonical_names_are_skipped() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(100);
        let mut world = new_world(&dir, &clock);
        world.write_chunk(&chunk_at(4, 4)).unwrap();
        world.close().unwrap();

        let region_dir = dir.path().join(REGION_DIR);
        for alias in ["r.-0.0.mca", "r.01.0.mca", "r.0.-00.mca"] {
            fs::copy(region_dir.join("r.0.0.mca"), region_dir.join(alias)).unwrap();
        }

        let found: Vec<(i32, i32)> = world
            .all_chunks()
            .map(|c| c.map(|c| (c.chunk_x, c.chunk_z)).unwrap())
            .collect();
        assert_eq!(found, vec![(4, 4)]);
    }

    #[test]
    fn test_parse_region_names() {
        let pattern = regex::Regex::new(r"^r\.(-?\d+)\.(-?\d+)\.mca$").unwrap();
        assert_eq!(super::parse_region(&pattern, "mca", "r.-3.12.mca"), Some(RegionPos::new(-3, 12)));
        assert_eq!(super::parse_region(&pattern, "mca", "r.-0.0.mca"), None);
        assert_eq!(super::parse_region(&pattern, "mca", "r.0.007.mca"), None);
        assert_eq!(super::parse_region(&pattern, "mca", "r.0.0.mcr"), None);
        assert_eq!(super::parse_region(&pattern, "mca", "r.99999999999.0.mca"), None);
    }
}
