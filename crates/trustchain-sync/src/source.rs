// crates/trustchain-sync/src/source.rs
//
// In-process chain source: serves a fixed block list. Used to mirror a
// chain between engines in the same process and in tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use trustchain_core::{Block, ChainSource, TrustchainError};

/// A `ChainSource` over a block list held in memory.
#[derive(Debug)]
pub struct StaticChainSource {
    name: String,
    blocks: RwLock<Vec<Block>>,
}

impl StaticChainSource {
    pub fn new(name: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            name: name.into(),
            blocks: RwLock::new(blocks),
        }
    }

    /// Replace the served block list.
    pub async fn set_blocks(&self, blocks: Vec<Block>) {
        *self.blocks.write().await = blocks;
    }
}

#[async_trait]
impl ChainSource for StaticChainSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_blocks(&self) -> Result<Vec<Block>, TrustchainError> {
        Ok(self.blocks.read().await.clone())
    }
}
