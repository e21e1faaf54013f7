//! Data source configurations
//!
//! A data source resolves a query (id, name, extra filters) into the
//! attributes of one existing object, or into a list of objects.

use ionos_core::provider::ResourceType;
use ionos_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use crate::bundle::Service;
use crate::resources::{
    AttrKind, AttrMapping, CERTIFICATE_ATTRIBUTES, CONTAINER_REGISTRY_ATTRIBUTES,
    DATACENTER_ATTRIBUTES, DNS_RECORD_ATTRIBUTES, DNS_ZONE_ATTRIBUTES, PG_CLUSTER_ATTRIBUTES,
};

/// Exact-match filter on one property of the listed objects
#[derive(Debug, Clone, Copy)]
pub struct Filter {
    pub attr: &'static str,
    pub api_path: &'static str,
}

/// Shape of the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one object, looked up by `id` or by name
    Single,
    /// Every object that passes the filters, stored under the given attribute
    List(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct DataSourceDefinition {
    pub type_name: &'static str,
    pub service: Service,
    pub collection_path: &'static str,
    /// Attributes reported for a matched object
    pub attributes: &'static [AttrMapping],
    /// Attribute compared against by name lookups
    pub name_attr: &'static str,
    pub name_path: &'static str,
    pub partial_match_allowed: bool,
    pub filters: &'static [Filter],
    /// Dotted path to the provisioning state, reported as `state`
    pub state_path: Option<&'static str>,
    pub cardinality: Cardinality,
}

impl DataSourceDefinition {
    /// Human-readable object kind used in error messages (e.g. "dns zone")
    pub fn kind(&self) -> String {
        self.type_name
            .trim_start_matches("ionoscloud_")
            .replace('_', " ")
    }

    pub fn is_filter(&self, attr: &str) -> bool {
        self.filters.iter().any(|f| f.attr == attr)
    }

    pub fn schema(&self) -> ResourceSchema {
        let mut schema = ResourceSchema::new(self.type_name);

        for mapping in self.attributes {
            let input = mapping.is_parent() || self.is_filter(mapping.name);
            let attr = if input {
                AttributeSchema::new(mapping.name, mapping.attribute_type())
            } else if self.cardinality == Cardinality::Single && mapping.name == self.name_attr {
                AttributeSchema::new(mapping.name, AttributeType::String)
            } else {
                AttributeSchema::new(mapping.name, mapping.attribute_type()).computed()
            };
            schema = schema.attribute(attr);
        }
        for filter in self.filters {
            if !self.attributes.iter().any(|a| a.name == filter.attr) {
                schema = schema.attribute(AttributeSchema::new(filter.attr, AttributeType::String));
            }
        }

        match self.cardinality {
            Cardinality::Single => {
                schema = schema
                    .attribute(AttributeSchema::new("id", AttributeType::String))
                    .exactly_one_of(&["id", self.name_attr])
                    .conflicting("id", self.name_attr);
                if self.partial_match_allowed {
                    schema = schema.attribute(
                        AttributeSchema::new("partial_match", AttributeType::Bool)
                            .with_default(false.into())
                            .with_description("Match the name as a substring"),
                    );
                }
                if self.state_path.is_some() {
                    schema =
                        schema.attribute(AttributeSchema::new("state", AttributeType::String).computed());
                }
            }
            Cardinality::List(items) => {
                schema = schema.attribute(
                    AttributeSchema::new(
                        items,
                        AttributeType::List(Box::new(AttributeType::Map(Box::new(
                            AttributeType::String,
                        )))),
                    )
                    .computed(),
                );
            }
        }
        schema
    }
}

/// `ResourceType` view of a data source definition
pub struct DataSourceType(pub &'static DataSourceDefinition);

impl ResourceType for DataSourceType {
    fn name(&self) -> &'static str {
        self.0.type_name
    }

    fn schema(&self) -> ResourceSchema {
        self.0.schema()
    }
}

pub static DATA_SOURCES: &[&DataSourceDefinition] = &[
    &DATACENTER,
    &DNS_ZONE,
    &DNS_RECORD,
    &PG_CLUSTER,
    &PG_BACKUPS,
    &CONTAINER_REGISTRY,
    &CERTIFICATE,
];

pub fn data_source(type_name: &str) -> Option<&'static DataSourceDefinition> {
    DATA_SOURCES.iter().copied().find(|d| d.type_name == type_name)
}

pub fn data_source_types() -> Vec<Box<dyn ResourceType>> {
    DATA_SOURCES
        .iter()
        .map(|d| Box::new(DataSourceType(d)) as Box<dyn ResourceType>)
        .collect()
}

pub const DATACENTER: DataSourceDefinition = DataSourceDefinition {
    type_name: "ionoscloud_datacenter",
    service: Service::Compute,
    collection_path: "/datacenters",
    attributes: DATACENTER_ATTRIBUTES,
    name_attr: "name",
    name_path: "properties.name",
    partial_match_allowed: false,
    filters: &[Filter {
        attr: "location",
        api_path: "properties.location",
    }],
    state_path: Some("metadata.state"),
    cardinality: Cardinality::Single,
};

pub const DNS_ZONE: DataSourceDefinition = DataSourceDefinition {
    type_name: "ionoscloud_dns_zone",
    service: Service::Dns,
    collection_path: "/zones",
    attributes: DNS_ZONE_ATTRIBUTES,
    name_attr: "name",
    name_path: "properties.zoneName",
    partial_match_allowed: true,
    filters: &[],
    state_path: Some("metadata.state"),
    cardinality: Cardinality::Single,
};

pub const DNS_RECORD: DataSourceDefinition = DataSourceDefinition {
    type_name: "ionoscloud_dns_record",
    service: Service::Dns,
    collection_path: "/zones/{zone_id}/records",
    attributes: DNS_RECORD_ATTRIBUTES,
    name_attr: "name",
    name_path: "properties.name",
    partial_match_allowed: true,
    filters: &[],
    state_path: Some("metadata.state"),
    cardinality: Cardinality::Single,
};

pub const PG_CLUSTER: DataSourceDefinition = DataSourceDefinition {
    type_name: "ionoscloud_pg_cluster",
    service: Service::Postgres,
    collection_path: "/clusters",
    attributes: PG_CLUSTER_ATTRIBUTES,
    name_attr: "display_name",
    name_path: "properties.displayName",
    partial_match_allowed: false,
    filters: &[],
    state_path: Some("metadata.state"),
    cardinality: Cardinality::Single,
};

const PG_BACKUP_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::computed("cluster_id", "properties.clusterId", AttrKind::String),
    AttrMapping::computed("version", "properties.version", AttrKind::String),
    AttrMapping::computed("is_active", "properties.isActive", AttrKind::Bool),
    AttrMapping::computed(
        "earliest_recovery_target_time",
        "properties.earliestRecoveryTargetTime",
        AttrKind::String,
    ),
    AttrMapping::computed("location", "properties.location", AttrKind::String),
];

pub const PG_BACKUPS: DataSourceDefinition = DataSourceDefinition {
    type_name: "ionoscloud_pg_backups",
    service: Service::Postgres,
    collection_path: "/clusters/backups",
    attributes: PG_BACKUP_ATTRIBUTES,
    name_attr: "",
    name_path: "",
    partial_match_allowed: false,
    filters: &[Filter {
        attr: "cluster_id",
        api_path: "properties.clusterId",
    }],
    state_path: None,
    cardinality: Cardinality::List("cluster_backups"),
};

pub const CONTAINER_REGISTRY: DataSourceDefinition = DataSourceDefinition {
    type_name: "ionoscloud_container_registry",
    service: Service::ContainerRegistry,
    collection_path: "/registries",
    attributes: CONTAINER_REGISTRY_ATTRIBUTES,
    name_attr: "name",
    name_path: "properties.name",
    partial_match_allowed: true,
    filters: &[Filter {
        attr: "location",
        api_path: "properties.location",
    }],
    state_path: Some("metadata.state"),
    cardinality: Cardinality::Single,
};

pub const CERTIFICATE: DataSourceDefinition = DataSourceDefinition {
    type_name: "ionoscloud_certificate",
    service: Service::CertManager,
    collection_path: "/certificates",
    attributes: CERTIFICATE_ATTRIBUTES,
    name_attr: "name",
    name_path: "properties.name",
    partial_match_allowed: false,
    filters: &[],
    state_path: Some("metadata.state"),
    cardinality: Cardinality::Single,
};

#[cfg(test)]
mod tests {
    use super::*;
    use ionos_core::resource::Value;
    use ionos_core::schema::TypeError;
    use std::collections::HashMap;

    #[test]
    fn every_data_source_is_registered() {
        assert_eq!(data_source_types().len(), DATA_SOURCES.len());
        assert!(data_source("ionoscloud_pg_backups").is_some());
        assert!(data_source("ionoscloud_volume").is_none());
    }

    #[test]
    fn kind_reads_like_prose() {
        assert_eq!(DNS_ZONE.kind(), "dns zone");
        assert_eq!(PG_BACKUPS.kind(), "pg backups");
    }

    #[test]
    fn single_schema_wants_id_or_name() {
        let schema = DNS_ZONE.schema();

        let mut query = HashMap::new();
        query.insert("name".to_string(), Value::String("example.com".to_string()));
        query.insert("partial_match".to_string(), Value::Bool(true));
        assert!(schema.validate(&query).is_ok());

        query.insert("id".to_string(), Value::String("z-1".to_string()));
        let errors = schema.validate(&query).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, TypeError::Conflict { .. })));

        let errors = schema.validate(&HashMap::new()).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, TypeError::MissingOneOf { .. })));
    }

    #[test]
    fn filters_are_inputs_and_the_rest_is_computed() {
        let schema = DATACENTER.schema();
        assert!(!schema.attributes["location"].computed);
        assert!(schema.attributes["description"].computed);
        assert!(schema.attributes["state"].computed);
        assert!(!schema.attributes.contains_key("partial_match"));
    }

    #[test]
    fn list_schema_exposes_items() {
        let schema = PG_BACKUPS.schema();
        assert!(schema.attributes["cluster_backups"].computed);
        assert!(!schema.attributes["cluster_id"].computed);
        assert!(!schema.attributes.contains_key("id"));
    }
}
