//! IONOS REST API client
//!
//! One `ApiClient` talks to one service endpoint. All IONOS APIs share
//! the same conventions: JSON bodies, `{"properties": ...}` payloads,
//! `items` collections and a `messages` array on errors.

use reqwest::Method;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Credentials;

const USER_AGENT: &str = concat!("ionos-provider/", env!("CARGO_PKG_VERSION"));

/// Items requested per collection page
pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the API answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Body and the headers the driver cares about
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
    /// `Location` header; compute writes point it at a request-status resource
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    messages: Vec<ErrorMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorMessage {
    #[serde(default, rename = "errorCode")]
    error_code: Option<String>,
    #[serde(default)]
    message: String,
}

/// Client for one IONOS service endpoint
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, credentials)
    }

    /// Share one connection pool between several clients
    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a single object
    pub async fn get(&self, path: &str) -> ApiResult<serde_json::Value> {
        let url = self.url(path);
        self.get_url(&url).await
    }

    /// GET an absolute URL (e.g. a request-status link)
    pub async fn get_url(&self, url: &str) -> ApiResult<serde_json::Value> {
        Ok(self.send(Method::GET, url, None).await?.body)
    }

    /// GET every page of a collection and return the concatenated `items`.
    ///
    /// Pages are requested with `offset`/`limit`; paging stops once a page
    /// is short and carries no `_links.next`.
    pub async fn list(&self, path: &str) -> ApiResult<Vec<serde_json::Value>> {
        let base = self.url(path);
        let mut all = Vec::new();

        loop {
            let url = format!(
                "{}?depth=1&offset={}&limit={}",
                base,
                all.len(),
                PAGE_SIZE
            );
            let body = self.send(Method::GET, &url, None).await?.body;
            let items = match body.get("items") {
                Some(serde_json::Value::Array(items)) => items.clone(),
                None => Vec::new(),
                Some(other) => {
                    return Err(ApiError::Decode(format!(
                        "expected 'items' to be an array, got {}",
                        other
                    )));
                }
            };

            let count = items.len();
            all.extend(items);
            let has_next = body
                .get("_links")
                .and_then(|links| links.get("next"))
                .is_some_and(|next| !next.is_null());
            if count == 0 || (count < PAGE_SIZE && !has_next) {
                break;
            }
            log::debug!("{}: fetched {} items, requesting next page", base, all.len());
        }

        Ok(all)
    }

    pub async fn post(&self, path: &str, body: &serde_json::Value) -> ApiResult<ApiResponse> {
        self.send(Method::POST, &self.url(path), Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &serde_json::Value) -> ApiResult<ApiResponse> {
        self.send(Method::PUT, &self.url(path), Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: &serde_json::Value) -> ApiResult<ApiResponse> {
        self.send(Method::PATCH, &self.url(path), Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.send(Method::DELETE, &self.url(path), None).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> ApiResult<ApiResponse> {
        log::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(reqwest::header::USER_AGENT, USER_AGENT);
        request = match &self.credentials {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
            log::debug!("{} {} failed with {}: {}", method, url, status, message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?
        };

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
            location,
        })
    }
}

/// Extract the first message of an IONOS error body
fn error_message(text: &str) -> Option<String> {
    let body: ErrorBody = serde_json::from_str(text).ok()?;
    let first = body.messages.into_iter().next()?;
    match first.error_code {
        Some(code) if !code.is_empty() => Some(format!("[{}] {}", code, first.message)),
        _ => Some(first.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri(), Credentials::Token("secret".to_string()))
    }

    #[test]
    fn extracts_error_message() {
        let text = r#"{"httpStatus":422,"messages":[{"errorCode":"100","message":"size too small"}]}"#;
        assert_eq!(error_message(text), Some("[100] size too small".to_string()));
        assert_eq!(error_message("not json"), None);
    }

    #[tokio::test]
    async fn get_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/zones/z1"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "z1"})))
            .mount(&server)
            .await;

        let body = client(&server).get("/zones/z1").await.unwrap();
        assert_eq!(body["id"], "z1");
    }

    #[tokio::test]
    async fn not_found_is_detected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/zones/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "httpStatus": 404,
                "messages": [{"errorCode": "309", "message": "Resource does not exist"}]
            })))
            .mount(&server)
            .await;

        let err = client(&server).get("/zones/gone").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "API error: 404 - [309] Resource does not exist"
        );
    }

    #[tokio::test]
    async fn list_returns_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/datacenters"))
            .and(query_param("depth", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "a"}, {"id": "b"}]
            })))
            .mount(&server)
            .await;

        let items = client(&server).list("/datacenters").await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn list_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/zones"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "z-1"}, {"id": "z-2"}],
                "offset": 0,
                "limit": 100,
                "_links": {"next": "/zones?offset=2&limit=100"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/zones"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "z-3"}],
                "offset": 2,
                "limit": 100,
                "_links": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = client(&server).list("/zones").await.unwrap();
        let ids: Vec<&str> = items.iter().filter_map(|i| i["id"].as_str()).collect();
        assert_eq!(ids, vec!["z-1", "z-2", "z-3"]);
    }

    #[tokio::test]
    async fn delete_exposes_location_and_tolerates_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/datacenters/dc1"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("location", "https://api.example/requests/r1/status"),
            )
            .mount(&server)
            .await;

        let response = client(&server).delete("/datacenters/dc1").await.unwrap();
        assert_eq!(response.status, 202);
        assert!(response.body.is_null());
        assert_eq!(
            response.location.as_deref(),
            Some("https://api.example/requests/r1/status")
        );
    }
}
