//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type and data source,
//! enabling validation before any API call is made.

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("'{first}' and '{second}' cannot be both specified")]
    Conflict { first: String, second: String },

    #[error("Exactly one of {} must be specified", names.join(", "))]
    MissingOneOf { names: Vec<String> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the cloud, never by the user
    pub computed: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// API-side property path (e.g., "properties.zoneName")
    pub provider_name: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            default: None,
            description: None,
            provider_name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }
}

/// Cross-attribute rule
#[derive(Debug, Clone)]
pub enum AttributeRule {
    /// The two attributes may not be set together
    Conflicts(String, String),
    /// Exactly one of the attributes must be set
    ExactlyOneOf(Vec<String>),
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub rules: Vec<AttributeRule>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            rules: Vec::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn conflicting(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.rules
            .push(AttributeRule::Conflicts(first.into(), second.into()));
        self
    }

    pub fn exactly_one_of(mut self, names: &[&str]) -> Self {
        self.rules.push(AttributeRule::ExactlyOneOf(
            names.iter().map(|n| n.to_string()).collect(),
        ));
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        for (name, value) in attributes {
            let Some(schema) = self.attributes.get(name) else {
                // Unknown attributes are allowed (parent ids, timeouts, ...)
                continue;
            };
            if schema.computed {
                errors.push(TypeError::ComputedAttribute { name: name.clone() });
            } else if let Err(e) = schema.attr_type.validate(value) {
                errors.push(e);
            }
        }

        for rule in &self.rules {
            match rule {
                AttributeRule::Conflicts(first, second) => {
                    if attributes.contains_key(first) && attributes.contains_key(second) {
                        errors.push(TypeError::Conflict {
                            first: first.clone(),
                            second: second.clone(),
                        });
                    }
                }
                AttributeRule::ExactlyOneOf(names) => {
                    let set = names.iter().filter(|n| attributes.contains_key(*n)).count();
                    if set != 1 {
                        errors.push(TypeError::MissingOneOf {
                            names: names.clone(),
                        });
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.attributes.values().filter(|a| a.force_new)
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// UUID type (e.g., "0b5b9d8a-4ad4-4bd5-a4cd-8ba1ec1ab5c2")
    pub fn uuid() -> AttributeType {
        AttributeType::Custom {
            name: "Uuid".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_uuid(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }

    /// CIDR block type (e.g., "10.0.0.0/16")
    pub fn cidr() -> AttributeType {
        AttributeType::Custom {
            name: "Cidr".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_cidr(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }
}

/// Validate the 8-4-4-4-12 hex layout of a UUID
pub fn validate_uuid(s: &str) -> Result<(), String> {
    let groups: Vec<&str> = s.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];
    if groups.len() != lengths.len() {
        return Err(format!("Invalid UUID '{}'", s));
    }
    for (group, len) in groups.iter().zip(lengths) {
        if group.len() != len || !group.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Invalid UUID '{}'", s));
        }
    }
    Ok(())
}

/// Validate CIDR block format (e.g., "10.0.0.0/16")
pub fn validate_cidr(cidr: &str) -> Result<(), String> {
    let parts: Vec<&str> = cidr.split('/').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid CIDR format '{}': expected IP/prefix",
            cidr
        ));
    }

    let ip = parts[0];
    let prefix = parts[1];

    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(format!("Invalid IP address '{}': expected 4 octets", ip));
    }

    for octet in &octets {
        if octet.parse::<u8>().is_err() {
            return Err(format!(
                "Invalid octet '{}' in IP address: must be 0-255",
                octet
            ));
        }
    }

    match prefix.parse::<u8>() {
        Ok(p) if p <= 32 => Ok(()),
        Ok(p) => Err(format!("Invalid prefix length '{}': must be 0-32", p)),
        Err(_) => Err(format!(
            "Invalid prefix length '{}': must be a number",
            prefix
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::Enum(vec!["HDD".to_string(), "SSD".to_string()]);
        assert!(t.validate(&Value::String("SSD".to_string())).is_ok());
        assert!(t.validate(&Value::String("NVME".to_string())).is_err());
    }

    #[test]
    fn validate_positive_int() {
        let t = types::positive_int();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(-1)).is_err());
        assert!(t.validate(&Value::String("1".to_string())).is_err());
    }

    #[test]
    fn validate_uuid_type() {
        let t = types::uuid();
        assert!(
            t.validate(&Value::String(
                "0b5b9d8a-4ad4-4bd5-a4cd-8ba1ec1ab5c2".to_string()
            ))
            .is_ok()
        );
        assert!(t.validate(&Value::String("not-a-uuid".to_string())).is_err());
        assert!(
            t.validate(&Value::String(
                "0b5b9d8a-4ad4-4bd5-a4cd-8ba1ec1ab5cz".to_string()
            ))
            .is_err()
        );
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("ionoscloud_volume")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("size", types::positive_int()))
            .attribute(AttributeSchema::new("bus", AttributeType::Bool));

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("data".to_string()));
        attrs.insert("size".to_string(), Value::Int(5));
        attrs.insert("bus".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("ionoscloud_dns_zone")
            .attribute(AttributeSchema::new("zone_name", AttributeType::String).required());

        let errors = schema.validate(&HashMap::new()).unwrap_err();
        assert_eq!(
            errors,
            vec![TypeError::MissingRequired {
                name: "zone_name".to_string()
            }]
        );
    }

    #[test]
    fn computed_attribute_cannot_be_set() {
        let schema = ResourceSchema::new("ionoscloud_pg_cluster")
            .attribute(AttributeSchema::new("dns_name", AttributeType::String).computed());

        let mut attrs = HashMap::new();
        attrs.insert("dns_name".to_string(), Value::String("x".to_string()));
        assert!(matches!(
            schema.validate(&attrs).unwrap_err()[0],
            TypeError::ComputedAttribute { .. }
        ));
    }

    #[test]
    fn conflicting_attributes_are_rejected() {
        let schema = ResourceSchema::new("ionoscloud_datacenter")
            .attribute(AttributeSchema::new("id", AttributeType::String))
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .conflicting("id", "name");

        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), Value::String("a".to_string()));
        attrs.insert("name".to_string(), Value::String("b".to_string()));

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "'id' and 'name' cannot be both specified"
        );
    }

    #[test]
    fn exactly_one_of_requires_a_value() {
        let schema = ResourceSchema::new("ionoscloud_datacenter").exactly_one_of(&["id", "name"]);

        assert!(schema.validate(&HashMap::new()).is_err());

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("b".to_string()));
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn validate_cidr_type() {
        let t = types::cidr();

        assert!(
            t.validate(&Value::String("10.0.0.0/16".to_string()))
                .is_ok()
        );
        assert!(t.validate(&Value::String("0.0.0.0/0".to_string())).is_ok());

        assert!(t.validate(&Value::String("10.0.0.0".to_string())).is_err());
        assert!(
            t.validate(&Value::String("10.0.0.0/33".to_string()))
                .is_err()
        );
        assert!(
            t.validate(&Value::String("10.0.0.256/16".to_string()))
                .is_err()
        );
        assert!(t.validate(&Value::Int(42)).is_err());
    }
}
