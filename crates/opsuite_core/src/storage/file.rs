use crate::error::AppError;
use crate::storage::KeyValueStorage;
use std::path::PathBuf;

const STORE_DIR_ENV_VAR: &str = "OPSUITE_STORE_DIR";
const APP_DIR_NAME: &str = "opsuite";
const ITEM_EXTENSION: &str = "json";

pub fn store_dir() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_DIR_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(store_dir()?))
    }

    pub fn item_path(&self, key: &str) -> Result<PathBuf, AppError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !valid {
            return Err(AppError::invalid_input(format!(
                "storage key '{key}' must be alphanumeric"
            )));
        }
        Ok(self.dir.join(format!("{key}.{ITEM_EXTENSION}")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.item_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        let path = self.item_path(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|err| AppError::io(err.to_string()))?;
        std::fs::write(&path, value)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, permissions)
                .map_err(|err| AppError::io(err.to_string()))?;
        }

        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AppError> {
        let path = self.item_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::io(format!("{}: {}", path.display(), err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FileStorage;
    use crate::storage::KeyValueStorage;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("opsuite-{nanos}-{name}"))
    }

    #[test]
    fn writes_one_file_per_key() {
        let dir = temp_dir("file-storage");
        let storage = FileStorage::new(&dir);

        storage.set_item("activityLogs", "[]").unwrap();
        let loaded = storage.get_item("activityLogs").unwrap();
        let on_disk = dir.join("activityLogs.json").exists();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(loaded.as_deref(), Some("[]"));
        assert!(on_disk);
    }

    #[test]
    fn missing_key_reads_as_none() {
        let dir = temp_dir("file-storage-missing");
        let storage = FileStorage::new(&dir);

        assert_eq!(storage.get_item("tasks").unwrap(), None);
        storage.remove_item("tasks").unwrap();
    }

    #[test]
    fn rejects_path_like_keys() {
        let storage = FileStorage::new(temp_dir("file-storage-keys"));

        let err = storage.set_item("../tasks", "[]").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert!(storage.get_item("").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn items_are_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_dir("file-storage-mode");
        let storage = FileStorage::new(&dir);
        storage.set_item("tasks", "[]").unwrap();
        let mode = std::fs::metadata(dir.join("tasks.json"))
            .unwrap()
            .permissions()
            .mode();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(mode & 0o777, 0o600);
    }
}
