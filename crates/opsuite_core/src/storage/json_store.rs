use crate::error::AppError;
use crate::storage::KeyValueStorage;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::rc::Rc;
use tracing::warn;

/// JSON encode/decode over a [`KeyValueStorage`].
///
/// `get` and `set` never fail from the caller's point of view: decode errors
/// fall back to the supplied default and write errors are logged. `try_get`
/// and `try_set` expose the underlying error for callers that want it.
pub struct JsonStore<S: KeyValueStorage> {
    storage: Rc<S>,
}

impl<S: KeyValueStorage> Clone for JsonStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Rc::clone(&self.storage),
        }
    }
}

impl<S: KeyValueStorage> JsonStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Rc::new(storage),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(err) => {
                warn!(key, error = %err, "falling back to default value");
                default
            }
        }
    }

    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let Some(content) = self.storage.get_item(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| AppError::invalid_data(format!("invalid JSON under '{key}': {err}")))
    }

    /// Writes `value` under `key`. Returns whether the value reached storage.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_set(key, value) {
            Ok(()) => true,
            Err(err) => {
                warn!(key, error = %err, "value not persisted; keeping in-memory state");
                false
            }
        }
    }

    pub fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let content =
            serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
        self.storage.set_item(key, &content)
    }
}
