pub mod document;
pub mod file_store;

pub use crate::file_store::JsonFileStore;
