use std::collections::HashMap;
use std::sync::Arc;

use flowgate_domain::ProviderAdapter;

use crate::integration_ports::ProviderClient;

/// Provider adapters available to the dispatcher.
///
/// Built once at process start and injected, so tests and tenants never share hidden state.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<ProviderAdapter, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the client handling one adapter, replacing any previous one.
    #[must_use]
    pub fn with_client(mut self, adapter: ProviderAdapter, client: Arc<dyn ProviderClient>) -> Self {
        self.clients.insert(adapter, client);
        self
    }

    /// Returns the client for an adapter.
    #[must_use]
    pub fn client_for(&self, adapter: &ProviderAdapter) -> Option<Arc<dyn ProviderClient>> {
        self.clients.get(adapter).cloned()
    }

    /// Returns registered adapter keys in stable order.
    #[must_use]
    pub fn adapters(&self) -> Vec<ProviderAdapter> {
        let mut adapters: Vec<ProviderAdapter> = self.clients.keys().cloned().collect();
        adapters.sort();
        adapters
    }
}
