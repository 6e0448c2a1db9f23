// ============================================
// Corruption Recovery - Карантин повреждённого региона
// ============================================
// 1. Закрываем хэндл без записи
// 2. Переименовываем файл в <path>.bak.<unix_time> (если имя занято, ошибка)
// 3. Открываем на старом месте новый пустой регион
//
// Данные чанков этого региона теряются, но мир остаётся доступным.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{RegionError, StorageError};
use super::handle::RegionHandle;

/// Путь бэкапа повреждённого файла
pub fn backup_path(path: &Path, timestamp: i64) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".bak.{}", timestamp));
    PathBuf::from(name)
}

/// Заменить повреждённый регион пустым. Возвращает новый открытый хэндл.
pub fn recover<H: RegionHandle>(
    mut failed: H,
    cause: &RegionError,
    timestamp: i64,
) -> Result<H, StorageError> {
    let path = failed.path().to_path_buf();
    let pos = failed.pos();
    let options = failed.options();
    log::error!("Corrupted region file detected: {}", cause);

    // Закрытие без flush ничего не пишет на диск
    if let Err(e) = failed.close(false) {
        log::warn!("Failed to release corrupted region {}: {}", path.display(), e);
    }

    // Существующий бэкап не затирается
    let backup = backup_path(&path, timestamp);
    match backup.try_exists() {
        Ok(false) => {}
        Ok(true) => {
            return Err(StorageError::io(
                &backup,
                io::Error::new(io::ErrorKind::AlreadyExists, "backup of a corrupted region already exists"),
            ));
        }
        Err(e) => return Err(StorageError::io(&backup, e)),
    }
    fs::rename(&path, &backup).map_err(|e| StorageError::io(&path, e))?;
    log::error!(
        "Corrupted region file {} has been backed up to {}",
        path.display(),
        backup.display()
    );

    let mut fresh = H::new(path.clone(), pos, options);
    fresh
        .open()
        .map_err(|source| StorageError::Region { path, source })?;
    Ok(fresh)
}
