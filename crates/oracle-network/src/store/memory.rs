//! In-memory snapshot store

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::network::NetworkSnapshot;
use crate::store::traits::{StateStore, StoreResult};

/// Keeps the latest snapshot in memory; lost on restart
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    snapshot: RwLock<Option<NetworkSnapshot>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> StoreResult<Option<NetworkSnapshot>> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, snapshot: &NetworkSnapshot) -> StoreResult<()> {
        *self.snapshot.write().await = Some(snapshot.clone());
        debug!(events = snapshot.events.len(), "Snapshot stored in memory");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
