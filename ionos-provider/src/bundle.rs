//! SDK bundle
//!
//! One API client per IONOS service, built once from the provider
//! configuration. Resource definitions name the service they talk to and
//! the driver looks the client up here.

use crate::client::ApiClient;
use crate::config::Config;

/// IONOS service APIs the provider talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Compute,
    Dns,
    Postgres,
    Mongo,
    MariaDb,
    InMemoryDb,
    ContainerRegistry,
    CertManager,
    Cdn,
    Dataplatform,
    Autoscaling,
    Kafka,
    Logging,
    ApiGateway,
}

impl Service {
    pub const ALL: [Service; 14] = [
        Service::Compute,
        Service::Dns,
        Service::Postgres,
        Service::Mongo,
        Service::MariaDb,
        Service::InMemoryDb,
        Service::ContainerRegistry,
        Service::CertManager,
        Service::Cdn,
        Service::Dataplatform,
        Service::Autoscaling,
        Service::Kafka,
        Service::Logging,
        Service::ApiGateway,
    ];

    /// Short name used in env vars and log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Compute => "compute",
            Service::Dns => "dns",
            Service::Postgres => "psql",
            Service::Mongo => "mongo",
            Service::MariaDb => "mariadb",
            Service::InMemoryDb => "inmemorydb",
            Service::ContainerRegistry => "containerregistry",
            Service::CertManager => "cert",
            Service::Cdn => "cdn",
            Service::Dataplatform => "dataplatform",
            Service::Autoscaling => "autoscaling",
            Service::Kafka => "kafka",
            Service::Logging => "logging",
            Service::ApiGateway => "apigateway",
        }
    }

    /// Public endpoint used when no override is configured
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Service::Compute => "https://api.ionos.com/cloudapi/v6",
            Service::Dns => "https://dns.de-fra.ionos.com",
            Service::Postgres => "https://api.ionos.com/databases/postgresql",
            Service::Mongo => "https://api.ionos.com/databases/mongodb",
            Service::MariaDb => "https://mariadb.de-txl.ionos.com",
            Service::InMemoryDb => "https://in-memory-db.de-fra.ionos.com",
            Service::ContainerRegistry => "https://api.ionos.com/containerregistries",
            Service::CertManager => "https://certificate-manager.de-fra.ionos.com",
            Service::Cdn => "https://cdn.de-fra.ionos.com",
            Service::Dataplatform => "https://api.ionos.com/dataplatform",
            Service::Autoscaling => "https://api.ionos.com/autoscaling",
            Service::Kafka => "https://kafka.de-fra.ionos.com",
            Service::Logging => "https://logging.de-txl.ionos.com",
            Service::ApiGateway => "https://apigateway.de-txl.ionos.com",
        }
    }

    /// Env var overriding the endpoint (e.g. `IONOS_API_URL_DNS`)
    pub fn endpoint_env(&self) -> String {
        format!("IONOS_API_URL_{}", self.as_str().to_uppercase())
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initialized API clients, one per service
#[derive(Debug, Clone)]
pub struct SdkBundle {
    compute: ApiClient,
    dns: ApiClient,
    postgres: ApiClient,
    mongo: ApiClient,
    mariadb: ApiClient,
    inmemorydb: ApiClient,
    container_registry: ApiClient,
    cert_manager: ApiClient,
    cdn: ApiClient,
    dataplatform: ApiClient,
    autoscaling: ApiClient,
    kafka: ApiClient,
    logging: ApiClient,
    api_gateway: ApiClient,
}

impl SdkBundle {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::new();
        let build = |service: Service| {
            ApiClient::with_http(
                http.clone(),
                config.endpoint(service),
                config.credentials.clone(),
            )
        };

        Self {
            compute: build(Service::Compute),
            dns: build(Service::Dns),
            postgres: build(Service::Postgres),
            mongo: build(Service::Mongo),
            mariadb: build(Service::MariaDb),
            inmemorydb: build(Service::InMemoryDb),
            container_registry: build(Service::ContainerRegistry),
            cert_manager: build(Service::CertManager),
            cdn: build(Service::Cdn),
            dataplatform: build(Service::Dataplatform),
            autoscaling: build(Service::Autoscaling),
            kafka: build(Service::Kafka),
            logging: build(Service::Logging),
            api_gateway: build(Service::ApiGateway),
        }
    }

    pub fn client(&self, service: Service) -> &ApiClient {
        match service {
            Service::Compute => &self.compute,
            Service::Dns => &self.dns,
            Service::Postgres => &self.postgres,
            Service::Mongo => &self.mongo,
            Service::MariaDb => &self.mariadb,
            Service::InMemoryDb => &self.inmemorydb,
            Service::ContainerRegistry => &self.container_registry,
            Service::CertManager => &self.cert_manager,
            Service::Cdn => &self.cdn,
            Service::Dataplatform => &self.dataplatform,
            Service::Autoscaling => &self.autoscaling,
            Service::Kafka => &self.kafka,
            Service::Logging => &self.logging,
            Service::ApiGateway => &self.api_gateway,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    #[test]
    fn clients_use_configured_endpoints() {
        let config = Config::new(Credentials::Token("t".to_string()))
            .with_endpoint(Service::Dns, "http://localhost:9000/");
        let bundle = SdkBundle::new(&config);

        assert_eq!(bundle.client(Service::Dns).base_url(), "http://localhost:9000");
        assert_eq!(
            bundle.client(Service::Kafka).base_url(),
            "https://kafka.de-fra.ionos.com"
        );
    }

    #[test]
    fn endpoint_env_names() {
        assert_eq!(Service::Dns.endpoint_env(), "IONOS_API_URL_DNS");
        assert_eq!(
            Service::ContainerRegistry.endpoint_env(),
            "IONOS_API_URL_CONTAINERREGISTRY"
        );
    }
}
