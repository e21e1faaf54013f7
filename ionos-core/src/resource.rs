//! Resource - Representing resources and their state

use std::collections::HashMap;

/// Attribute map of a resource or data source
pub type Attributes = HashMap<String, Value>;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "ionoscloud_dns_zone", "ionoscloud_volume")
    pub resource_type: String,
    /// Resource name (the address given in configuration)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Desired state declared in configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: Attributes,
    /// If true, this is a data source (read-only) that won't be modified
    pub read_only: bool,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
            read_only: false,
        }
    }

    /// Create a data source query
    pub fn data_source(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(resource_type, name).with_read_only(true)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Returns true if this resource is a data source (read-only)
    pub fn is_data_source(&self) -> bool {
        self.read_only
    }
}

/// Current state fetched from the cloud
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Cloud-side identifier (a UUID for most IONOS resources)
    pub identifier: Option<String>,
    pub attributes: Attributes,
    /// Whether this state exists. `false` means the resource is gone and
    /// should be dropped from state.
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: Attributes) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_builder_collects_attributes() {
        let resource = Resource::new("ionoscloud_dns_zone", "main")
            .with_attribute("zone_name", "example.com")
            .with_attribute("enabled", true);

        assert_eq!(
            resource.attributes.get("zone_name"),
            Some(&Value::String("example.com".to_string()))
        );
        assert_eq!(resource.attributes.get("enabled"), Some(&Value::Bool(true)));
        assert!(!resource.is_data_source());
    }

    #[test]
    fn data_source_is_read_only() {
        let query = Resource::data_source("ionoscloud_datacenter", "lookup");
        assert!(query.is_data_source());
    }

    #[test]
    fn not_found_state_has_no_identifier() {
        let state = State::not_found(ResourceId::new("ionoscloud_lan", "public"));
        assert!(!state.exists);
        assert!(state.identifier.is_none());
        assert_eq!(state.id.to_string(), "ionoscloud_lan.public");
    }
}
