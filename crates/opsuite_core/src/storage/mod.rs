//! Synchronous string key-value storage and the JSON adapter on top of it.

mod file;
pub mod json_store;
mod memory;

use crate::error::AppError;

pub use file::{FileStorage, store_dir};
pub use json_store::JsonStore;
pub use memory::MemoryStorage;

pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError>;

    fn remove_item(&self, key: &str) -> Result<(), AppError>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for std::rc::Rc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), AppError> {
        (**self).remove_item(key)
    }
}
