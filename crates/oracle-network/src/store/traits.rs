//! Store traits for network snapshots

use async_trait::async_trait;

use crate::network::NetworkSnapshot;

/// Errors that can occur in the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Store error: {0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for the network state image
///
/// The network itself stays authoritative in memory; a store only loads the
/// image at start and saves it on request.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the last saved snapshot, if any
    async fn load(&self) -> StoreResult<Option<NetworkSnapshot>>;

    /// Replace the saved snapshot
    async fn save(&self, snapshot: &NetworkSnapshot) -> StoreResult<()>;

    /// Name of the backend for logs
    fn backend(&self) -> &'static str;
}
