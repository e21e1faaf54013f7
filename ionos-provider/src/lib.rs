//! IONOS Cloud Provider
//!
//! Manages IONOS Cloud resources over the service REST APIs.
//!
//! ## Module Structure
//!
//! - `config` - Credentials, endpoints and wait settings
//! - `client` - REST client for one service endpoint
//! - `bundle` - One client per IONOS service
//! - `resources` - Resource type definitions and configurations
//! - `data_sources` - Data source definitions
//! - `provider` - IonosProvider, the generic CRUD driver
//! - `utils` - Helper functions for value conversion and paths

pub mod bundle;
pub mod client;
pub mod config;
pub mod data_sources;
pub mod provider;
pub mod resources;
pub mod utils;

// Re-export main types
pub use bundle::{SdkBundle, Service};
pub use config::{Config, Credentials, Timeouts};
pub use provider::IonosProvider;

use ionos_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use ionos_core::resource::{Attributes, Resource, ResourceId, State};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for IonosProvider {
    fn name(&self) -> &'static str {
        "ionoscloud"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resources::resource_types()
    }

    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        data_sources::data_source_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
        scope: &Attributes,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        let scope = scope.clone();
        Box::pin(async move {
            self.read_resource(&id, identifier.as_deref(), &scope)
                .await
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(id, &identifier, &from, to).await })
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        Box::pin(async move { self.delete_resource(&id, &identifier, &from).await })
    }

    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let import_id = import_id.to_string();
        Box::pin(async move { self.import_resource(&id, &import_id).await })
    }

    fn read_data_source(&self, query: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let query = query.clone();
        Box::pin(async move { self.read_data_source_query(query).await })
    }
}
