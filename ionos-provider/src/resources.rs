//! Resource type configurations for the IONOS APIs
//!
//! This module defines:
//! - The declarative definition of every managed resource type
//! - Mapping between attribute names and API property paths
//! - The provisioning states each API reports while it works

use ionos_core::provider::ResourceType;
use ionos_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::bundle::Service;

// =============================================================================
// Definition Types
// =============================================================================

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    String,
    Int,
    /// Integer greater than zero (sizes, counts)
    PositiveInt,
    Bool,
    StringList,
    /// List of IPv4 CIDR blocks
    CidrList,
    StringMap,
}

/// Attribute mapping between the resource and its API representation
#[derive(Debug, Clone, Copy)]
pub struct AttrMapping {
    /// Attribute name (e.g. "zone_name")
    pub name: &'static str,
    /// Dotted path in the API document (e.g. "properties.zoneName").
    /// Empty for parent ids that only appear in the URL.
    pub api_path: &'static str,
    pub kind: AttrKind,
    pub required: bool,
    pub computed: bool,
    pub force_new: bool,
    /// Accepted on writes but never returned by the API (passwords, keys)
    pub write_only: bool,
    /// Allowed values (empty: any)
    pub allowed: &'static [&'static str],
}

impl AttrMapping {
    pub const fn optional(name: &'static str, api_path: &'static str, kind: AttrKind) -> Self {
        Self {
            name,
            api_path,
            kind,
            required: false,
            computed: false,
            force_new: false,
            write_only: false,
            allowed: &[],
        }
    }

    pub const fn required(name: &'static str, api_path: &'static str, kind: AttrKind) -> Self {
        Self {
            required: true,
            ..Self::optional(name, api_path, kind)
        }
    }

    pub const fn computed(name: &'static str, api_path: &'static str, kind: AttrKind) -> Self {
        Self {
            computed: true,
            ..Self::optional(name, api_path, kind)
        }
    }

    /// Id of the parent object, filled into the collection path
    pub const fn parent(name: &'static str) -> Self {
        Self {
            required: true,
            force_new: true,
            ..Self::optional(name, "", AttrKind::String)
        }
    }

    pub const fn force_new(self) -> Self {
        Self {
            force_new: true,
            ..self
        }
    }

    pub const fn write_only(self) -> Self {
        Self {
            write_only: true,
            ..self
        }
    }

    pub const fn one_of(self, allowed: &'static [&'static str]) -> Self {
        Self { allowed, ..self }
    }

    pub fn is_parent(&self) -> bool {
        self.api_path.is_empty()
    }

    /// Whether the attribute goes into request bodies
    pub fn is_writable(&self) -> bool {
        !self.computed && !self.is_parent()
    }

    pub fn attribute_type(&self) -> AttributeType {
        if !self.allowed.is_empty() {
            return AttributeType::Enum(self.allowed.iter().map(|s| s.to_string()).collect());
        }
        match self.kind {
            AttrKind::String if self.is_parent() => types::uuid(),
            AttrKind::String => AttributeType::String,
            AttrKind::Int => AttributeType::Int,
            AttrKind::PositiveInt => types::positive_int(),
            AttrKind::Bool => AttributeType::Bool,
            AttrKind::StringList => AttributeType::List(Box::new(AttributeType::String)),
            AttrKind::CidrList => AttributeType::List(Box::new(types::cidr())),
            AttrKind::StringMap => AttributeType::Map(Box::new(AttributeType::String)),
        }
    }

    pub fn schema(&self) -> AttributeSchema {
        let mut schema = AttributeSchema::new(self.name, self.attribute_type());
        if !self.is_parent() {
            schema = schema.with_provider_name(self.api_path);
        }
        if self.required {
            schema = schema.required();
        }
        if self.computed {
            schema = schema.computed();
        }
        if self.force_new {
            schema = schema.force_new();
        }
        schema
    }
}

/// Provisioning state labels reported by an API
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    /// Work in progress after create/update
    pub pending: &'static [&'static str],
    /// Done
    pub ready: &'static [&'static str],
    /// The operation failed for good
    pub failed: &'static [&'static str],
    /// Work in progress after delete
    pub deleting: &'static [&'static str],
}

/// How in-place updates are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMethod {
    /// Full properties document
    Put,
    /// Only the changed properties
    Patch,
    /// No in-place update; every change forces a new resource
    Replace,
}

/// Shape of a PATCH request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchBody {
    /// `{"properties": {...}}`
    Wrapped,
    /// The properties object itself (Cloud API, container registry)
    Bare,
}

/// Declarative definition of a managed resource type
#[derive(Debug, Clone, Copy)]
pub struct ResourceDefinition {
    pub type_name: &'static str,
    pub service: Service,
    /// Collection path, may contain `{parent}` placeholders
    pub collection_path: &'static str,
    pub attributes: &'static [AttrMapping],
    /// Dotted path to the provisioning state
    pub state_path: &'static str,
    /// Dotted path to a failure message
    pub message_path: &'static str,
    pub lifecycle: Lifecycle,
    pub update_method: UpdateMethod,
    pub patch_body: PatchBody,
    /// Writes return a request-status link that must complete first
    pub tracks_requests: bool,
}

impl ResourceDefinition {
    pub fn schema(&self) -> ResourceSchema {
        self.attributes.iter().fold(
            ResourceSchema::new(self.type_name).attribute(
                AttributeSchema::new("id", AttributeType::String)
                    .computed()
                    .with_provider_name("id"),
            ),
            |schema, mapping| schema.attribute(mapping.schema()),
        )
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrMapping> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

// =============================================================================
// Resource Type Registry
// =============================================================================

/// `ResourceType` view of a definition
pub struct DefinitionType(pub &'static ResourceDefinition);

impl ResourceType for DefinitionType {
    fn name(&self) -> &'static str {
        self.0.type_name
    }

    fn schema(&self) -> ResourceSchema {
        self.0.schema()
    }
}

/// All managed resource definitions
pub static DEFINITIONS: &[&ResourceDefinition] = &[
    &DATACENTER,
    &LAN,
    &VOLUME,
    &DNS_ZONE,
    &DNS_RECORD,
    &PG_CLUSTER,
    &MONGO_CLUSTER,
    &CONTAINER_REGISTRY,
    &CERTIFICATE,
    &LOGGING_PIPELINE,
    &KAFKA_CLUSTER,
];

/// Get the definition for a resource type
pub fn definition(type_name: &str) -> Option<&'static ResourceDefinition> {
    DEFINITIONS.iter().copied().find(|d| d.type_name == type_name)
}

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    DEFINITIONS
        .iter()
        .map(|d| Box::new(DefinitionType(d)) as Box<dyn ResourceType>)
        .collect()
}

// =============================================================================
// Lifecycles
// =============================================================================

use AttrKind::{Bool, CidrList, Int, PositiveInt, String as Str, StringList, StringMap};

/// Cloud API (compute) `metadata.state`
pub const COMPUTE_LIFECYCLE: Lifecycle = Lifecycle {
    pending: &["BUSY", "INACTIVE", "DEPLOYING", "UPDATING"],
    ready: &["AVAILABLE", "ACTIVE"],
    failed: &["FAILED", "FAILED_UPDATING", "FAILED_SUSPENDED"],
    deleting: &["BUSY", "DESTROYING", "AVAILABLE", "ACTIVE", "INACTIVE"],
};

/// DNS, certificate manager, logging, Kafka `metadata.state`
pub const PROVISIONING_LIFECYCLE: Lifecycle = Lifecycle {
    pending: &["PROVISIONING", "DEPLOYING", "UPDATING"],
    ready: &["AVAILABLE", "READY"],
    failed: &["FAILED"],
    deleting: &["DESTROYING", "AVAILABLE", "READY", "PROVISIONING"],
};

/// DBaaS (PostgreSQL, MongoDB) `metadata.state`
pub const DBAAS_LIFECYCLE: Lifecycle = Lifecycle {
    pending: &["BUSY", "CREATING", "UPDATING", "DEPLOYING"],
    ready: &["AVAILABLE"],
    failed: &["FAILED"],
    deleting: &["DESTROYING", "BUSY", "AVAILABLE"],
};

/// Container registry `metadata.state`
pub const REGISTRY_LIFECYCLE: Lifecycle = Lifecycle {
    pending: &["New", "Creating", "Updating"],
    ready: &["Running"],
    failed: &["Failed"],
    deleting: &["Deleting", "Running"],
};

// =============================================================================
// Compute Resources
// =============================================================================

pub const DATACENTER_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::required("name", "properties.name", Str),
    AttrMapping::required("location", "properties.location", Str).force_new(),
    AttrMapping::optional("description", "properties.description", Str),
    AttrMapping::optional("sec_auth_protection", "properties.secAuthProtection", Bool),
    AttrMapping::computed("version", "properties.version", Int),
    AttrMapping::computed("cpu_architecture", "properties.cpuArchitecture", StringList),
];

pub const DATACENTER: ResourceDefinition = ResourceDefinition {
    type_name: "ionoscloud_datacenter",
    service: Service::Compute,
    collection_path: "/datacenters",
    attributes: DATACENTER_ATTRIBUTES,
    state_path: "metadata.state",
    message_path: "metadata.message",
    lifecycle: COMPUTE_LIFECYCLE,
    update_method: UpdateMethod::Patch,
    patch_body: PatchBody::Bare,
    tracks_requests: true,
};

pub const LAN_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::parent("datacenter_id"),
    AttrMapping::optional("name", "properties.name", Str),
    AttrMapping::optional("public", "properties.public", Bool),
    AttrMapping::optional("pcc", "properties.pcc", Str),
];

pub const LAN: ResourceDefinition = ResourceDefinition {
    type_name: "ionoscloud_lan",
    service: Service::Compute,
    collection_path: "/datacenters/{datacenter_id}/lans",
    attributes: LAN_ATTRIBUTES,
    state_path: "metadata.state",
    message_path: "metadata.message",
    lifecycle: COMPUTE_LIFECYCLE,
    update_method: UpdateMethod::Patch,
    patch_body: PatchBody::Bare,
    tracks_requests: true,
};

pub const VOLUME_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::parent("datacenter_id"),
    AttrMapping::optional("name", "properties.name", Str),
    AttrMapping::required("disk_type", "properties.type", Str)
        .force_new()
        .one_of(&["HDD", "SSD", "SSD Standard", "SSD Premium", "DAS", "ISO"]),
    AttrMapping::required("size", "properties.size", PositiveInt),
    AttrMapping::optional("availability_zone", "properties.availabilityZone", Str)
        .force_new()
        .one_of(&["AUTO", "ZONE_1", "ZONE_2", "ZONE_3"]),
    AttrMapping::optional("image_alias", "properties.imageAlias", Str).force_new(),
    AttrMapping::optional("licence_type", "properties.licenceType", Str)
        .force_new()
        .one_of(&["LINUX", "RHEL", "WINDOWS", "WINDOWS2016", "WINDOWS2022", "UNKNOWN", "OTHER"]),
    AttrMapping::optional("bus", "properties.bus", Str).one_of(&["VIRTIO", "IDE"]),
    AttrMapping::computed("device_number", "properties.deviceNumber", Int),
];

pub const VOLUME: ResourceDefinition = ResourceDefinition {
    type_name: "ionoscloud_volume",
    service: Service::Compute,
    collection_path: "/datacenters/{datacenter_id}/volumes",
    attributes: VOLUME_ATTRIBUTES,
    state_path: "metadata.state",
    message_path: "metadata.message",
    lifecycle: COMPUTE_LIFECYCLE,
    update_method: UpdateMethod::Patch,
    patch_body: PatchBody::Bare,
    tracks_requests: true,
};

// =============================================================================
// DNS Resources
// =============================================================================

pub const DNS_ZONE_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::required("name", "properties.zoneName", Str).force_new(),
    AttrMapping::optional("description", "properties.description", Str),
    AttrMapping::optional("enabled", "properties.enabled", Bool),
    AttrMapping::computed("nameservers", "metadata.nameservers", StringList),
];

pub const DNS_ZONE: ResourceDefinition = ResourceDefinition {
    type_name: "ionoscloud_dns_zone",
    service: Service::Dns,
    collection_path: "/zones",
    attributes: DNS_ZONE_ATTRIBUTES,
    state_path: "metadata.state",
    message_path: "metadata.message",
    lifecycle: PROVISIONING_LIFECYCLE,
    update_method: UpdateMethod::Put,
    patch_body: PatchBody::Wrapped,
    tracks_requests: false,
};

pub const DNS_RECORD_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::parent("zone_id"),
    AttrMapping::required("name", "properties.name", Str),
    AttrMapping::required("type", "properties.type", Str)
        .force_new()
        .one_of(&["A", "AAAA", "CNAME", "MX", "NS", "SRV", "TXT", "CAA", "SSHFP", "TLSA", "SMIMEA", "URI", "HTTPS", "SVCB"]),
    AttrMapping::required("content", "properties.content", Str),
    AttrMapping::optional("ttl", "properties.ttl", Int),
    AttrMapping::optional("priority", "properties.priority", Int),
    AttrMapping::optional("enabled", "properties.enabled", Bool),
    AttrMapping::computed("fqdn", "metadata.fqdn", Str),
];

pub const DNS_RECORD: ResourceDefinition = ResourceDefinition {
    type_name: "ionoscloud_dns_record",
    service: Service::Dns,
    collection_path: "/zones/{zone_id}/records",
    attributes: DNS_RECORD_ATTRIBUTES,
    state_path: "metadata.state",
    message_path: "metadata.message",
    lifecycle: PROVISIONING_LIFECYCLE,
    update_method: UpdateMethod::Put,
    patch_body: PatchBody::Wrapped,
    tracks_requests: false,
};

// =============================================================================
// DBaaS Resources
// =============================================================================

pub const PG_CLUSTER_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::required("display_name", "properties.displayName", Str),
    AttrMapping::required("postgres_version", "properties.postgresVersion", Str),
    AttrMapping::required("instances", "properties.instances", PositiveInt),
    AttrMapping::required("cores", "properties.cores", PositiveInt),
    AttrMapping::required("ram", "properties.ram", PositiveInt),
    AttrMapping::required("storage_size", "properties.storageSize", PositiveInt),
    AttrMapping::required("storage_type", "properties.storageType", Str)
        .force_new()
        .one_of(&["HDD", "SSD", "SSD Standard", "SSD Premium"]),
    AttrMapping::required("location", "properties.location", Str).force_new(),
    AttrMapping::required("synchronization_mode", "properties.synchronizationMode", Str)
        .force_new()
        .one_of(&["ASYNCHRONOUS", "SYNCHRONOUS", "STRICTLY_SYNCHRONOUS"]),
    AttrMapping::optional("username", "properties.credentials.username", Str).force_new(),
    AttrMapping::optional("password", "properties.credentials.password", Str)
        .force_new()
        .write_only(),
    AttrMapping::computed("dns_name", "properties.dnsName", Str),
];

pub const PG_CLUSTER: ResourceDefinition = ResourceDefinition {
    type_name: "ionoscloud_pg_cluster",
    service: Service::Postgres,
    collection_path: "/clusters",
    attributes: PG_CLUSTER_ATTRIBUTES,
    state_path: "metadata.state",
    message_path: "metadata.message",
    lifecycle: DBAAS_LIFECYCLE,
    update_method: UpdateMethod::Patch,
    patch_body: PatchBody::Wrapped,
    tracks_requests: false,
};

pub const MONGO_CLUSTER_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::required("display_name", "properties.displayName", Str),
    AttrMapping::required("mongodb_version", "properties.mongoDBVersion", Str),
    AttrMapping::required("instances", "properties.instances", PositiveInt),
    AttrMapping::required("location", "properties.location", Str).force_new(),
    AttrMapping::optional("template_id", "properties.templateID", Str),
    AttrMapping::optional("type", "properties.type", Str)
        .force_new()
        .one_of(&["replicaset", "sharded-cluster"]),
    AttrMapping::computed("connection_string", "properties.connectionString", Str),
];

pub const MONGO_CLUSTER: ResourceDefinition = ResourceDefinition {
    type_name: "ionoscloud_mongo_cluster",
    service: Service::Mongo,
    collection_path: "/clusters",
    attributes: MONGO_CLUSTER_ATTRIBUTES,
    state_path: "metadata.state",
    message_path: "metadata.message",
    lifecycle: DBAAS_LIFECYCLE,
    update_method: UpdateMethod::Patch,
    patch_body: PatchBody::Wrapped,
    tracks_requests: false,
};

// =============================================================================
// Other Services
// =============================================================================

pub const CONTAINER_REGISTRY_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::required("name", "properties.name", Str).force_new(),
    AttrMapping::required("location", "properties.location", Str).force_new(),
    AttrMapping::optional("api_subnet_allow_list", "properties.apiSubnetAllowList", CidrList),
    AttrMapping::computed("hostname", "properties.hostname", Str),
];

pub const CONTAINER_REGISTRY: ResourceDefinition = ResourceDefinition {
    type_name: "ionoscloud_container_registry",
    service: Service::ContainerRegistry,
    collection_path: "/registries",
    attributes: CONTAINER_REGISTRY_ATTRIBUTES,
    state_path: "metadata.state",
    message_path: "metadata.message",
    lifecycle: REGISTRY_LIFECYCLE,
    update_method: UpdateMethod::Patch,
    patch_body: PatchBody::Bare,
    tracks_requests: false,
};

pub const CERTIFICATE_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::required("name", "properties.name", Str),
    AttrMapping::required("certificate", "properties.certificate", Str).force_new(),
    AttrMapping::optional("certificate_chain", "properties.certificateChain", Str).force_new(),
    AttrMapping::required("private_key", "properties.privateKey", Str)
        .force_new()
        .write_only(),
];

pub const CERTIFICATE: ResourceDefinition = ResourceDefinition {
    type_name: "ionoscloud_certificate",
    service: Service::CertManager,
    collection_path: "/certificates",
    attributes: CERTIFICATE_ATTRIBUTES,
    state_path: "metadata.state",
    message_path: "metadata.message",
    lifecycle: PROVISIONING_LIFECYCLE,
    update_method: UpdateMethod::Patch,
    patch_body: PatchBody::Wrapped,
    tracks_requests: false,
};

pub const LOGGING_PIPELINE_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::required("name", "properties.name", Str),
    AttrMapping::optional("labels", "properties.labels", StringMap),
    AttrMapping::computed("grafana_address", "properties.grafanaAddress", Str),
];

pub const LOGGING_PIPELINE: ResourceDefinition = ResourceDefinition {
    type_name: "ionoscloud_logging_pipeline",
    service: Service::Logging,
    collection_path: "/pipelines",
    attributes: LOGGING_PIPELINE_ATTRIBUTES,
    state_path: "metadata.state",
    message_path: "metadata.message",
    lifecycle: PROVISIONING_LIFECYCLE,
    update_method: UpdateMethod::Patch,
    patch_body: PatchBody::Wrapped,
    tracks_requests: false,
};

pub const KAFKA_CLUSTER_ATTRIBUTES: &[AttrMapping] = &[
    AttrMapping::required("name", "properties.name", Str),
    AttrMapping::required("version", "properties.version", Str),
    AttrMapping::required("size", "properties.size", Str).one_of(&["XS", "S", "M", "L", "XL"]),
    AttrMapping::computed("broker_addresses", "properties.brokerAddresses", StringList),
];

pub const KAFKA_CLUSTER: ResourceDefinition = ResourceDefinition {
    type_name: "ionoscloud_kafka_cluster",
    service: Service::Kafka,
    collection_path: "/clusters",
    attributes: KAFKA_CLUSTER_ATTRIBUTES,
    state_path: "metadata.state",
    message_path: "metadata.message",
    lifecycle: PROVISIONING_LIFECYCLE,
    update_method: UpdateMethod::Replace,
    patch_body: PatchBody::Wrapped,
    tracks_requests: false,
};

#[cfg(test)]
mod tests {
    use super::*;
    use ionos_core::resource::Value;
    use std::collections::HashMap;

    #[test]
    fn type_names_are_unique() {
        let mut names: Vec<&str> = DEFINITIONS.iter().map(|d| d.type_name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), DEFINITIONS.len());
    }

    #[test]
    fn placeholders_have_parent_attributes() {
        for def in DEFINITIONS {
            for param in crate::utils::path_params(def.collection_path) {
                let attr = def
                    .attribute(param)
                    .unwrap_or_else(|| panic!("{} lacks {}", def.type_name, param));
                assert!(attr.is_parent(), "{}.{} is not a parent", def.type_name, param);
            }
        }
    }

    #[test]
    fn lookup_by_type_name() {
        assert_eq!(
            definition("ionoscloud_dns_zone").map(|d| d.service),
            Some(Service::Dns)
        );
        assert!(definition("ionoscloud_unknown").is_none());
        assert_eq!(resource_types().len(), DEFINITIONS.len());
    }

    #[test]
    fn schema_validates_enum_and_parent() {
        let schema = VOLUME.schema();
        let mut attrs = HashMap::new();
        attrs.insert(
            "datacenter_id".to_string(),
            Value::String("0b5b9d8a-4ad4-4bd5-a4cd-8ba1ec1ab5c2".to_string()),
        );
        attrs.insert("disk_type".to_string(), Value::String("SSD".to_string()));
        attrs.insert("size".to_string(), Value::Int(10));
        assert!(schema.validate(&attrs).is_ok());

        attrs.insert("disk_type".to_string(), Value::String("TAPE".to_string()));
        attrs.insert("datacenter_id".to_string(), Value::String("dc".to_string()));
        assert_eq!(schema.validate(&attrs).unwrap_err().len(), 2);
    }

    #[test]
    fn computed_attributes_are_not_writable() {
        let nameservers = DNS_ZONE.attribute("nameservers").unwrap();
        assert!(!nameservers.is_writable());
        assert!(!LAN.attribute("datacenter_id").unwrap().is_writable());
        assert!(DNS_ZONE.attribute("enabled").unwrap().is_writable());
    }

    #[test]
    fn compute_and_registry_patch_bare_properties() {
        for def in [&DATACENTER, &LAN, &VOLUME, &CONTAINER_REGISTRY] {
            assert_eq!(def.patch_body, PatchBody::Bare, "{}", def.type_name);
        }
        assert_eq!(PG_CLUSTER.patch_body, PatchBody::Wrapped);
        assert_eq!(LOGGING_PIPELINE.patch_body, PatchBody::Wrapped);
    }
}
