//! IONOS Cloud Provider implementation
//!
//! One generic driver interprets the resource and data source definition
//! tables: it renders collection paths, maps attributes to and from the API
//! documents, and follows every mutating call with the readiness poller.

use std::collections::HashSet;
use std::time::Duration;

use ionos_core::filter::{self, FilterError, Lookup};
use ionos_core::provider::{ProviderError, ProviderResult};
use ionos_core::resource::{Attributes, Resource, ResourceId, State, Value};
use ionos_core::schema::TypeError;
use ionos_core::wait::{self, Observation, WaitConfig, WaitError};
use serde_json::json;
use tokio::time::Instant;

use crate::bundle::{SdkBundle, Service};
use crate::client::{ApiClient, ApiError};
use crate::config::{Config, ConfigError};
use crate::data_sources::{self, Cardinality, DataSourceDefinition};
use crate::resources::{self, AttrMapping, PatchBody, ResourceDefinition, UpdateMethod};
use crate::utils::{get_path, json_to_value, parse_import_id, render_path, set_path, value_to_json};

const REQUEST_PENDING: [&str; 2] = ["QUEUED", "RUNNING"];
const REQUEST_DONE: &str = "DONE";
const REQUEST_FAILED: &str = "FAILED";

impl From<ApiError> for ProviderError {
    fn from(err: ApiError) -> Self {
        ProviderError::new(err.to_string()).with_cause(err)
    }
}

fn validation_error(errors: Vec<TypeError>) -> ProviderError {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    ProviderError::new(format!("invalid attributes: {}", messages.join("; ")))
}

/// IONOS Cloud Provider
pub struct IonosProvider {
    bundle: SdkBundle,
    config: Config,
}

impl IonosProvider {
    pub fn new(config: Config) -> Self {
        Self {
            bundle: SdkBundle::new(&config),
            config,
        }
    }

    /// Create a provider configured from `IONOS_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(Config::from_env()?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn client(&self, service: Service) -> &ApiClient {
        self.bundle.client(service)
    }

    fn definition(&self, id: &ResourceId) -> ProviderResult<&'static ResourceDefinition> {
        resources::definition(&id.resource_type).ok_or_else(|| {
            ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
                .for_resource(id.clone())
        })
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Read a resource by its identifier
    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
        scope: &Attributes,
    ) -> ProviderResult<State> {
        let def = self.definition(id)?;
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };

        let path = object_path(def, scope, identifier).map_err(|e| e.for_resource(id.clone()))?;
        let doc = match self
            .client(def.service)
            .get(&format!("{}?depth=1", path))
            .await
        {
            Ok(doc) => doc,
            Err(e) if e.is_not_found() => {
                log::debug!("{} ({}) no longer exists", id, identifier);
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => {
                return Err(ProviderError::from(e).context("read").for_resource(id.clone()));
            }
        };

        let mut attributes = doc_attributes(def.attributes, &doc);
        for mapping in def.attributes {
            if (mapping.is_parent() || mapping.write_only)
                && let Some(value) = scope.get(mapping.name)
            {
                attributes.insert(mapping.name.to_string(), value.clone());
            }
        }
        attributes.insert("id".to_string(), Value::String(identifier.to_string()));

        Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
    }

    /// Create a resource and wait until it is ready
    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        let started = Instant::now();
        let id = resource.id.clone();
        let def = self.definition(&id)?;
        def.schema()
            .validate(&resource.attributes)
            .map_err(|e| validation_error(e).for_resource(id.clone()))?;

        let collection = render_path(def.collection_path, &resource.attributes)
            .map_err(|e| ProviderError::new(e).for_resource(id.clone()))?;
        let body = properties_body(def.attributes.iter(), &resource.attributes);

        log::info!("Creating {}", id);
        let client = self.client(def.service);
        let response = client
            .post(&collection, &body)
            .await
            .map_err(|e| ProviderError::from(e).context("create").for_resource(id.clone()))?;

        let identifier = response
            .body
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ProviderError::new("create: response carries no id").for_resource(id.clone())
            })?;
        log::debug!("{} created with id {}", id, identifier);

        let timeout = self.config.timeouts.create;
        if def.tracks_requests
            && let Some(location) = response.location.as_deref()
        {
            self.wait_for_request(client, location, timeout)
                .await
                .map_err(|e| e.context("create").for_resource(id.clone()))?;
        }

        let path = format!("{}/{}", collection, identifier);
        let left = time_left(started, timeout, def.lifecycle.ready)
            .map_err(|e| e.context("create").for_resource(id.clone()))?;
        self.wait_until_ready(def, &path, left)
            .await
            .map_err(|e| e.context("create").for_resource(id.clone()))?;

        self.read_resource(&id, Some(&identifier), &resource.attributes)
            .await
    }

    /// Update a resource in place
    pub async fn update_resource(
        &self,
        id: ResourceId,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let started = Instant::now();
        let def = self.definition(&id)?;
        let schema = def.schema();
        schema
            .validate(&to.attributes)
            .map_err(|e| validation_error(e).for_resource(id.clone()))?;

        let changed: Vec<&AttrMapping> = def
            .attributes
            .iter()
            .filter(|m| !m.computed)
            .filter(|m| {
                to.attributes
                    .get(m.name)
                    .is_some_and(|wanted| from.attributes.get(m.name) != Some(wanted))
            })
            .collect();
        if changed.is_empty() {
            log::debug!("{} is up to date", id);
            return Ok(State::existing(id, from.attributes.clone()).with_identifier(identifier));
        }

        let force_new: HashSet<&str> = schema
            .force_new_attributes()
            .map(|a| a.name.as_str())
            .collect();
        let replacing: Vec<&str> = changed
            .iter()
            .filter(|m| force_new.contains(m.name) || def.update_method == UpdateMethod::Replace)
            .map(|m| m.name)
            .collect();
        if !replacing.is_empty() {
            return Err(ProviderError::new(format!(
                "update: changing {} requires replacement",
                replacing.join(", ")
            ))
            .for_resource(id));
        }

        let path = object_path(def, &to.attributes, identifier).map_err(|e| e.for_resource(id.clone()))?;
        let client = self.client(def.service);

        log::info!("Updating {} ({})", id, identifier);
        let sent = match def.update_method {
            UpdateMethod::Put => {
                let body = properties_body(def.attributes.iter(), &to.attributes);
                client.put(&path, &body).await
            }
            _ => {
                let body = properties_body(changed.iter().copied(), &to.attributes);
                let body = match def.patch_body {
                    PatchBody::Wrapped => body,
                    PatchBody::Bare => body["properties"].clone(),
                };
                client.patch(&path, &body).await
            }
        };
        let response =
            sent.map_err(|e| ProviderError::from(e).context("update").for_resource(id.clone()))?;

        let timeout = self.config.timeouts.update;
        if def.tracks_requests
            && let Some(location) = response.location.as_deref()
        {
            self.wait_for_request(client, location, timeout)
                .await
                .map_err(|e| e.context("update").for_resource(id.clone()))?;
        }
        let left = time_left(started, timeout, def.lifecycle.ready)
            .map_err(|e| e.context("update").for_resource(id.clone()))?;
        self.wait_until_ready(def, &path, left)
            .await
            .map_err(|e| e.context("update").for_resource(id.clone()))?;

        self.read_resource(&id, Some(identifier), &to.attributes).await
    }

    /// Delete a resource and wait until it is gone
    pub async fn delete_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
    ) -> ProviderResult<()> {
        let started = Instant::now();
        let def = self.definition(id)?;
        let path =
            object_path(def, &from.attributes, identifier).map_err(|e| e.for_resource(id.clone()))?;
        let client = self.client(def.service);

        log::info!("Deleting {} ({})", id, identifier);
        let response = match client.delete(&path).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                log::debug!("{} was already gone", id);
                return Ok(());
            }
            Err(e) => {
                return Err(ProviderError::from(e).context("delete").for_resource(id.clone()));
            }
        };

        let timeout = self.config.timeouts.delete;
        if def.tracks_requests
            && let Some(location) = response.location.as_deref()
        {
            self.wait_for_request(client, location, timeout)
                .await
                .map_err(|e| e.context("delete").for_resource(id.clone()))?;
        }
        let left = time_left(started, timeout, &[])
            .map_err(|e| e.context("delete").for_resource(id.clone()))?;
        self.wait_until_gone(def, &path, left)
            .await
            .map_err(|e| e.context("delete").for_resource(id.clone()))
    }

    /// Adopt an existing resource, `<parent>/.../<id>`
    pub async fn import_resource(&self, id: &ResourceId, import_id: &str) -> ProviderResult<State> {
        let def = self.definition(id)?;
        let (scope, identifier) = parse_import_id(def.collection_path, import_id)
            .map_err(|e| ProviderError::new(e).context("import").for_resource(id.clone()))?;

        let state = self.read_resource(id, Some(&identifier), &scope).await?;
        if !state.exists {
            return Err(ProviderError::new(format!(
                "import: no {} with id '{}' exists",
                def.type_name, identifier
            ))
            .for_resource(id.clone()));
        }
        Ok(state)
    }

    // =========================================================================
    // Data Sources
    // =========================================================================

    /// Resolve a data source query
    pub async fn read_data_source_query(&self, query: Resource) -> ProviderResult<State> {
        let id = query.id.clone();
        let def = data_sources::data_source(&id.resource_type).ok_or_else(|| {
            ProviderError::new(format!("Unknown data source: {}", id.resource_type))
                .for_resource(id.clone())
        })?;

        let result = match def.cardinality {
            Cardinality::Single => self.read_single(def, &query).await,
            Cardinality::List(items_attr) => self.read_list(def, &query, items_attr).await,
        };
        result.map_err(|e| e.for_resource(id))
    }

    async fn read_single(
        &self,
        def: &'static DataSourceDefinition,
        query: &Resource,
    ) -> ProviderResult<State> {
        let lookup = Lookup::from_query(&query.attributes, "id", def.name_attr)?;
        if let Lookup::ByName(m) = &lookup
            && m.partial
            && !def.partial_match_allowed
        {
            return Err(ProviderError::new(format!(
                "partial_match is not supported by {}",
                def.type_name
            )));
        }
        def.schema().validate(&query.attributes).map_err(validation_error)?;

        let collection = render_path(def.collection_path, &query.attributes).map_err(ProviderError::new)?;
        let client = self.client(def.service);
        let kind = def.kind();

        let doc = match &lookup {
            Lookup::ById(object_id) => {
                match client.get(&format!("{}/{}?depth=1", collection, object_id)).await {
                    Ok(doc) => doc,
                    Err(e) if e.is_not_found() => {
                        return Err(FilterError::NoMatch {
                            kind,
                            criteria: format!("id '{}'", object_id),
                        }
                        .into());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Lookup::ByName(name) => {
                let items = client.list(&collection).await?;
                let mut criteria = vec![name.to_string()];
                criteria.extend(filter_criteria(def, &query.attributes));
                filter::select_one(items, &kind, &criteria.join(", "), |item| {
                    get_path(item, def.name_path)
                        .and_then(|v| v.as_str())
                        .is_some_and(|candidate| name.matches(candidate))
                        && passes_filters(def, &query.attributes, item)
                })?
            }
        };

        let object_id = doc
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::new(format!("{} without an id", kind)))?
            .to_string();

        let mut attributes = query.attributes.clone();
        attributes.extend(doc_attributes(def.attributes, &doc));
        if let Some(state_path) = def.state_path
            && let Some(state) = get_path(&doc, state_path).and_then(json_to_value)
        {
            attributes.insert("state".to_string(), state);
        }
        attributes.insert("id".to_string(), Value::String(object_id.clone()));

        Ok(State::existing(query.id.clone(), attributes).with_identifier(object_id))
    }

    async fn read_list(
        &self,
        def: &'static DataSourceDefinition,
        query: &Resource,
        items_attr: &str,
    ) -> ProviderResult<State> {
        def.schema().validate(&query.attributes).map_err(validation_error)?;

        let collection = render_path(def.collection_path, &query.attributes).map_err(ProviderError::new)?;
        let items = self.client(def.service).list(&collection).await?;
        let total = items.len();
        let kept = filter::filter_items(items, |item| passes_filters(def, &query.attributes, item));
        log::debug!("{}: kept {} of {} items", def.type_name, kept.len(), total);

        let values = kept
            .iter()
            .map(|item| {
                let mut entry = doc_attributes(def.attributes, item);
                if let Some(item_id) = item.get("id").and_then(json_to_value) {
                    entry.insert("id".to_string(), item_id);
                }
                Value::Map(entry)
            })
            .collect();

        let mut attributes = query.attributes.clone();
        attributes.insert(items_attr.to_string(), Value::List(values));
        Ok(State::existing(query.id.clone(), attributes))
    }

    // =========================================================================
    // Waiting
    // =========================================================================

    fn wait_config<P, T>(&self, pending: P, target: T, timeout: Duration) -> WaitConfig
    where
        P: IntoIterator<Item = &'static str>,
        T: IntoIterator<Item = &'static str>,
    {
        WaitConfig::new(pending, target)
            .with_timeout(timeout)
            .with_poll_interval(self.config.poll_interval)
    }

    /// Wait for a compute request-status resource to reach DONE
    async fn wait_for_request(
        &self,
        client: &ApiClient,
        location: &str,
        timeout: Duration,
    ) -> ProviderResult<()> {
        log::debug!("Waiting for request {}", location);
        let config = self.wait_config(REQUEST_PENDING, [REQUEST_DONE], timeout);
        wait::wait_until_ready(&config, || async move {
            let doc = match client.get_url(location).await {
                Ok(doc) => doc,
                Err(e) => return Err(ProviderError::from(e)),
            };
            let Some(status) = get_path(&doc, "metadata.status").and_then(|v| v.as_str()) else {
                return Err(ProviderError::from(ApiError::Decode(format!(
                    "request status at {} carries no metadata.status",
                    location
                ))));
            };
            if status == REQUEST_FAILED {
                let message = get_path(&doc, "metadata.message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("request failed");
                return Ok(Observation::failed(message));
            }
            Ok(Observation::state(status))
        })
        .await?;
        Ok(())
    }

    async fn wait_until_ready(
        &self,
        def: &'static ResourceDefinition,
        path: &str,
        timeout: Duration,
    ) -> ProviderResult<()> {
        let client = self.client(def.service);
        let lifecycle = def.lifecycle;
        let config = self.wait_config(
            lifecycle.pending.iter().copied(),
            lifecycle.ready.iter().copied(),
            timeout,
        );
        let state = wait::wait_until_ready(&config, || async move {
            match client.get(path).await {
                Ok(doc) => Ok(observe(def, &doc)),
                Err(e) if e.is_not_found() => Ok(Observation::NotFound),
                Err(e) => Err(ProviderError::from(e)),
            }
        })
        .await?;
        log::debug!("{} reached {}", path, state);
        Ok(())
    }

    async fn wait_until_gone(
        &self,
        def: &'static ResourceDefinition,
        path: &str,
        timeout: Duration,
    ) -> ProviderResult<()> {
        let client = self.client(def.service);
        let config = self.wait_config(
            def.lifecycle.deleting.iter().copied(),
            std::iter::empty::<&'static str>(),
            timeout,
        );
        wait::wait_until_deleted(&config, || async move {
            match client.get(path).await {
                Ok(doc) => Ok(observe(def, &doc)),
                Err(e) if e.is_not_found() => Ok(Observation::NotFound),
                Err(e) => Err(ProviderError::from(e)),
            }
        })
        .await?;
        Ok(())
    }
}

// =============================================================================
// Document Helpers
// =============================================================================

/// What remains of an operation's timeout once the request-status wait is done
fn time_left(started: Instant, timeout: Duration, target: &[&str]) -> ProviderResult<Duration> {
    let left = timeout.saturating_sub(started.elapsed());
    if left.is_zero() {
        let mut target: Vec<String> = target.iter().map(|s| s.to_string()).collect();
        target.sort();
        return Err(WaitError::TimedOut {
            target,
            last_state: None,
            timeout,
        }
        .into());
    }
    Ok(left)
}

/// `<collection>/<identifier>` with parent placeholders filled in
fn object_path(
    def: &ResourceDefinition,
    attributes: &Attributes,
    identifier: &str,
) -> ProviderResult<String> {
    let collection = render_path(def.collection_path, attributes).map_err(ProviderError::new)?;
    Ok(format!("{}/{}", collection, identifier))
}

/// Classify a fetched document by its provisioning state
fn observe(def: &ResourceDefinition, doc: &serde_json::Value) -> Observation {
    let Some(state) = get_path(doc, def.state_path).and_then(|v| v.as_str()) else {
        // No state reported: the object is usable as soon as it is visible
        return match def.lifecycle.ready.first() {
            Some(ready) => Observation::state(*ready),
            None => Observation::NotFound,
        };
    };

    if def.lifecycle.failed.contains(&state) {
        let reason = match get_path(doc, def.message_path).and_then(|v| v.as_str()) {
            Some(message) if !message.is_empty() => format!("{}: {}", state, message),
            _ => state.to_string(),
        };
        return Observation::failed(reason);
    }
    Observation::state(state)
}

/// Attributes found in an API document
fn doc_attributes(mappings: &[AttrMapping], doc: &serde_json::Value) -> Attributes {
    mappings
        .iter()
        .filter(|m| !m.is_parent())
        .filter_map(|m| {
            get_path(doc, m.api_path)
                .and_then(json_to_value)
                .map(|v| (m.name.to_string(), v))
        })
        .collect()
}

/// `{"properties": ...}` body for the writable mappings given.
/// Mappings without a value are left out.
fn properties_body<'a>(
    mappings: impl Iterator<Item = &'a AttrMapping>,
    attributes: &Attributes,
) -> serde_json::Value {
    let mut body = json!({ "properties": {} });
    for mapping in mappings.filter(|m| m.is_writable()) {
        if let Some(value) = attributes.get(mapping.name) {
            set_path(&mut body, mapping.api_path, value_to_json(value));
        }
    }
    body
}

fn passes_filters(def: &DataSourceDefinition, query: &Attributes, item: &serde_json::Value) -> bool {
    def.filters.iter().all(|f| match query.get(f.attr).and_then(Value::as_str) {
        None | Some("") => true,
        Some(wanted) => get_path(item, f.api_path)
            .and_then(|v| v.as_str())
            .is_some_and(|actual| actual.eq_ignore_ascii_case(wanted)),
    })
}

fn filter_criteria(def: &DataSourceDefinition, query: &Attributes) -> Vec<String> {
    def.filters
        .iter()
        .filter_map(|f| {
            query
                .get(f.attr)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{} '{}'", f.attr, v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{DATACENTER, DNS_ZONE, PG_CLUSTER};

    #[test]
    fn observe_classifies_states() {
        let doc = json!({"metadata": {"state": "PROVISIONING"}});
        assert_eq!(observe(&DNS_ZONE, &doc), Observation::state("PROVISIONING"));

        let doc = json!({"metadata": {"state": "FAILED", "message": "quota exceeded"}});
        assert_eq!(
            observe(&DNS_ZONE, &doc),
            Observation::failed("FAILED: quota exceeded")
        );

        assert_eq!(observe(&DATACENTER, &json!({"id": "dc"})), Observation::state("AVAILABLE"));
    }

    #[tokio::test(start_paused = true)]
    async fn spent_budget_times_out_before_the_second_wait() {
        let started = Instant::now();
        let timeout = Duration::from_secs(60);
        assert_eq!(
            time_left(started, timeout, DATACENTER.lifecycle.ready).unwrap(),
            timeout
        );

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(
            time_left(started, timeout, DATACENTER.lifecycle.ready).unwrap(),
            Duration::from_secs(15)
        );

        tokio::time::advance(Duration::from_secs(15)).await;
        let err = time_left(started, timeout, DATACENTER.lifecycle.ready).unwrap_err();
        assert!(err.message.contains("'ACTIVE, AVAILABLE'"), "{}", err);
    }

    #[test]
    fn body_contains_only_writable_properties() {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Value::String("example.com".to_string()));
        attrs.insert("enabled".to_string(), Value::Bool(true));
        attrs.insert("nameservers".to_string(), Value::List(vec![]));

        let body = properties_body(DNS_ZONE.attributes.iter(), &attrs);
        assert_eq!(
            body,
            json!({"properties": {"zoneName": "example.com", "enabled": true}})
        );
    }

    #[test]
    fn nested_properties_are_built() {
        let mut attrs = Attributes::new();
        attrs.insert("username".to_string(), Value::String("admin".to_string()));
        attrs.insert("password".to_string(), Value::String("s3cret".to_string()));

        let body = properties_body(
            PG_CLUSTER
                .attributes
                .iter()
                .filter(|m| m.name == "username" || m.name == "password"),
            &attrs,
        );
        assert_eq!(
            body,
            json!({"properties": {"credentials": {"username": "admin", "password": "s3cret"}}})
        );
    }

    #[test]
    fn document_is_mapped_back() {
        let doc = json!({
            "id": "z-1",
            "properties": {"zoneName": "example.com", "enabled": false},
            "metadata": {"state": "AVAILABLE", "nameservers": ["ns1", "ns2"]}
        });
        let attrs = doc_attributes(DNS_ZONE.attributes, &doc);
        assert_eq!(attrs.get("name"), Some(&Value::String("example.com".to_string())));
        assert_eq!(attrs.get("enabled"), Some(&Value::Bool(false)));
        assert!(matches!(attrs.get("nameservers"), Some(Value::List(ns)) if ns.len() == 2));
        assert!(!attrs.contains_key("description"));
    }

    #[test]
    fn filters_compare_case_insensitively() {
        let def = &data_sources::DATACENTER;
        let item = json!({"properties": {"name": "web", "location": "de/fra"}});

        let mut query = Attributes::new();
        assert!(passes_filters(def, &query, &item));

        query.insert("location".to_string(), Value::String("DE/FRA".to_string()));
        assert!(passes_filters(def, &query, &item));
        assert_eq!(filter_criteria(def, &query), vec!["location 'DE/FRA'"]);

        query.insert("location".to_string(), Value::String("us/las".to_string()));
        assert!(!passes_filters(def, &query, &item));
    }
}
