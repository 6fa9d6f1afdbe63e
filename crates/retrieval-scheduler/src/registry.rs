//! Protocol adapter lookup by [`ProtocolTag`]
//!
//! Built once at worker startup from the three concrete adapters in
//! `retrieval-protocols` and handed to [`crate::executor::FileCheckExecutor`].

use std::collections::HashMap;
use std::sync::Arc;

use retrieval_core::domain::ProtocolTag;
use retrieval_core::ports::ProtocolAdapter;

#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<ProtocolTag, Arc<dyn ProtocolAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_adapter(mut self, tag: ProtocolTag, adapter: Arc<dyn ProtocolAdapter>) -> Self {
        self.adapters.insert(tag, adapter);
        self
    }

    /// Looks up the adapter registered for `tag`.
    ///
    /// # Errors
    /// Returns an error if the worker was started without wiring an
    /// adapter for this protocol.
    pub fn resolve(&self, tag: ProtocolTag) -> anyhow::Result<Arc<dyn ProtocolAdapter>> {
        self.adapters
            .get(&tag)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no adapter registered for protocol {tag:?}"))
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
