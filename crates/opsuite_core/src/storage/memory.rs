use crate::error::AppError;
use crate::storage::KeyValueStorage;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// In-process storage. Can be switched off to behave like a disabled medium.
#[derive(Debug)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
    available: Cell<bool>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            items: RefCell::new(HashMap::new()),
            available: Cell::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    fn ensure_available(&self) -> Result<(), AppError> {
        if self.available.get() {
            Ok(())
        } else {
            Err(AppError::storage_unavailable("memory storage is disabled"))
        }
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        self.ensure_available()?;
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.ensure_available()?;
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AppError> {
        self.ensure_available()?;
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}
