//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `KeyValueStore` using an SQLite table (`SqliteKeyValueStore`)
//! - `KeyValueStore` held in process memory (`MemoryKeyValueStore`)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{default_database_path, SqliteKeyValueStore};
//! use bridge_traits::KeyValueStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let path = default_database_path().expect("no data directory");
//!     let store = SqliteKeyValueStore::new(path).await.unwrap();
//!     let keys = store.list_keys().await.unwrap();
//! }
//! ```

mod kv_store;
mod memory;

pub use kv_store::SqliteKeyValueStore;
pub use memory::MemoryKeyValueStore;

use std::path::PathBuf;

/// Directory created beneath the platform data directory.
const APP_DIR_NAME: &str = "genre-shelf";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "library.sqlite";

/// Resolve the platform-specific location of the library database.
///
/// Returns `None` when the platform exposes no data directory.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME).join(DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_database_path_layout() {
        if let Some(path) = default_database_path() {
            assert!(path.ends_with("genre-shelf/library.sqlite"));
        }
    }
}
