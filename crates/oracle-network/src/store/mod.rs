//! Snapshot stores for the oracle network
//!
//! This module provides the store trait and implementations.

mod file;
mod memory;
mod traits;

pub use file::JsonFileStateStore;
pub use memory::InMemoryStateStore;
pub use traits::*;

use tracing::info;

/// Create a store from an optional snapshot path: a path selects the JSON
/// file store, no path the in-memory store
pub fn create_store(snapshot_path: Option<&str>) -> Box<dyn StateStore> {
    match snapshot_path {
        Some(path) => {
            info!(path, "Creating JSON file state store");
            Box::new(JsonFileStateStore::new(path))
        }
        None => {
            info!("Creating in-memory state store");
            Box::new(InMemoryStateStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_store_backend() {
        assert_eq!(create_store(None).backend(), "memory");
        assert_eq!(create_store(Some("/tmp/state.json")).backend(), "json_file");
    }
}
