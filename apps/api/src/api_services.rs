mod database;
mod redis;
mod state_builder;

pub use database::{connect_and_migrate, provision_webhook_endpoints};
pub use state_builder::{
    StorageAdapters, build_app_state, build_provider_registry, build_storage_adapters,
};
