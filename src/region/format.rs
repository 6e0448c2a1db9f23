// ============================================
// Region Format - McRegion / Anvil
// ============================================
// Форматы отличаются только расширением и версией.
// Смешивать их в одной директории region/ нельзя.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Имя файла метаданных мира
pub const LEVEL_DAT: &str = "level.dat";
/// Поддиректория с файлами регионов
pub const REGION_DIR: &str = "region";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionFormat {
    McRegion,
    #[default]
    Anvil,
}

impl RegionFormat {
    pub const ALL: [RegionFormat; 2] = [RegionFormat::McRegion, RegionFormat::Anvil];

    /// Расширение файлов регионов
    pub fn extension(self) -> &'static str {
        match self {
            RegionFormat::McRegion => "mcr",
            RegionFormat::Anvil => "mca",
        }
    }

    /// Версия формата мира (PC)
    pub fn pc_version(self) -> i32 {
        match self {
            RegionFormat::McRegion => 19132,
            RegionFormat::Anvil => 19133,
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.extension() == extension)
    }

    /// Проверка директории мира:
    /// есть level.dat, есть region/, и все файлы вида *.mc* имеют наше расширение
    pub fn is_valid(self, world_root: &Path) -> bool {
        self.probe(world_root).is_ok()
    }

    /// То же что [`is_valid`](Self::is_valid), но с причиной отказа
    pub fn probe(self, world_root: &Path) -> Result<(), String> {
        if !world_root.join(LEVEL_DAT).is_file() {
            return Err(format!("{} is missing", LEVEL_DAT));
        }
        let region_dir = world_root.join(REGION_DIR);
        if !region_dir.is_dir() {
            return Err(format!("{}/ is not a directory", REGION_DIR));
        }

        let entries = fs::read_dir(&region_dir).map_err(|e| format!("cannot list {}/: {}", REGION_DIR, e))?;
        let expected = self.extension();
        for entry in entries {
            let entry = entry.map_err(|e| format!("cannot list {}/: {}", REGION_DIR, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(ext) = extension_of(&name) else {
                continue;
            };
            if ext.starts_with("mc") && ext != expected {
                return Err(format!("{} does not use the .{} extension", name, expected));
            }
        }
        Ok(())
    }
}

/// Всё после последней точки
fn extension_of(name: &str) -> Option<&str> {
    name.rfind('.').map(|dot| &name[dot + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn world_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LEVEL_DAT), b"").unwrap();
        fs::create_dir(dir.path().join(REGION_DIR)).unwrap();
        for f in files {
            fs::write(dir.path().join(REGION_DIR).join(f), b"").unwrap();
        }
        dir
    }

    #[test]
    fn test_probe_accepts_matching_extension() {
        let dir = world_with(&["r.0.0.mca", "r.-1.0.mca", "notes.txt"]);
        assert!(RegionFormat::Anvil.is_valid(dir.path()));
        assert!(!RegionFormat::McRegion.is_valid(dir.path()));
    }

    #[test]
    fn test_single_mismatch_disqualifies() {
        let dir = world_with(&["r.0.0.mcr", "r.1.0.mcr", "r.2.0.mca"]);
        assert!(!RegionFormat::McRegion.is_valid(dir.path()));
        assert!(!RegionFormat::Anvil.is_valid(dir.path()));
    }

    #[test]
    fn test_empty_region_dir_fits_both() {
        let dir = world_with(&[]);
        assert!(RegionFormat::McRegion.is_valid(dir.path()));
        assert!(RegionFormat::Anvil.is_valid(dir.path()));
    }

    #[test]
    fn test_missing_parts_fail() {
        let dir = TempDir::new().unwrap();
        assert!(RegionFormat::Anvil.probe(dir.path()).unwrap_err().contains(LEVEL_DAT));

        fs::write(dir.path().join(LEVEL_DAT), b"").unwrap();
        assert!(RegionFormat::Anvil.probe(dir.path()).unwrap_err().contains(REGION_DIR));
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(RegionFormat::from_extension("mcr"), Some(RegionFormat::McRegion));
        assert_eq!(RegionFormat::from_extension("mca"), Some(RegionFormat::Anvil));
        assert_eq!(RegionFormat::from_extension("dat"), None);
    }
}
