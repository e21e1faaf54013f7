//! Provider - Trait abstracting resource operations
//!
//! A Provider defines operations for a specific cloud (IONOS, ...).
//! It is responsible for turning desired state into actual API calls
//! and reporting the observed state back.

use std::future::Future;
use std::pin::Pin;

use crate::resource::{Attributes, Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    /// Attach the resource address unless one is already set
    pub fn for_resource(mut self, id: ResourceId) -> Self {
        if self.resource_id.is_none() {
            self.resource_id = Some(id);
        }
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Prefix the message with the operation that failed
    pub fn context(mut self, operation: impl std::fmt::Display) -> Self {
        self.message = format!("{}: {}", operation, self.message);
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types (or data sources) that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Type name (e.g., "ionoscloud_dns_zone")
    fn name(&self) -> &'static str;

    /// Attribute schema for this type
    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
    }
}

/// Main Provider trait
///
/// All operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "ionoscloud")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can manage
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// List of data sources this Provider can read
    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a resource
    ///
    /// `scope` carries the attributes needed to locate the resource, such
    /// as parent ids (`datacenter_id`, `zone_id`).
    /// Returns `State::not_found()` if the resource does not exist.
    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
        scope: &Attributes,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource and wait until it is ready
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place and wait until it is ready
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource and wait until it is gone
    ///
    /// A resource that is already gone is not an error.
    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
    ) -> BoxFuture<'_, ProviderResult<()>>;

    /// Adopt an existing resource by its import id
    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>>;

    /// Resolve a data source query into a single state
    fn read_data_source(&self, query: &Resource) -> BoxFuture<'_, ProviderResult<State>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).data_source_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
        scope: &Attributes,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(id, identifier, scope)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, identifier, from, to)
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(id, identifier, from)
    }

    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, import_id)
    }

    fn read_data_source(&self, query: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read_data_source(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock Provider for testing
    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![]
        }

        fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![]
        }

        fn read(
            &self,
            id: &ResourceId,
            _identifier: Option<&str>,
            _scope: &Attributes,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            Box::pin(async move { Ok(State::not_found(id)) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            let attrs = resource.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs).with_identifier("mock-id-123")) })
        }

        fn update(
            &self,
            id: &ResourceId,
            _identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            let attrs = to.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs)) })
        }

        fn delete(
            &self,
            _id: &ResourceId,
            _identifier: &str,
            _from: &State,
        ) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            let import_id = import_id.to_string();
            Box::pin(async move { Ok(State::existing(id, Attributes::new()).with_identifier(import_id)) })
        }

        fn read_data_source(&self, query: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = query.id.clone();
            Box::pin(async move { Err(ProviderError::new("no data sources").for_resource(id)) })
        }
    }

    #[tokio::test]
    async fn mock_provider_read_returns_not_found() {
        let provider = MockProvider;
        let id = ResourceId::new("test", "example");
        let state = provider.read(&id, None, &Attributes::new()).await.unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn mock_provider_create_returns_existing() {
        let provider = MockProvider;
        let resource = Resource::new("test", "example");
        let state = provider.create(&resource).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier, Some("mock-id-123".to_string()));
    }

    #[tokio::test]
    async fn boxed_provider_dispatches() {
        let provider: Box<dyn Provider> = Box::new(MockProvider);
        let id = ResourceId::new("test", "example");
        let state = provider.import(&id, "abc").await.unwrap();
        assert_eq!(provider.name(), "mock");
        assert_eq!(state.identifier.as_deref(), Some("abc"));
    }

    #[test]
    fn error_display_includes_resource() {
        let err = ProviderError::new("boom")
            .context("create")
            .for_resource(ResourceId::new("ionoscloud_lan", "public"));
        assert_eq!(err.to_string(), "[ionoscloud_lan.public] create: boom");
    }

    #[test]
    fn for_resource_keeps_first_address() {
        let err = ProviderError::new("boom")
            .for_resource(ResourceId::new("a", "b"))
            .for_resource(ResourceId::new("c", "d"));
        assert_eq!(err.resource_id, Some(ResourceId::new("a", "b")));
    }
}
