use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use couchlayer_core::{
    client::{DocumentBody, FindRequest, StoreClient, StoreClientBuilder, StoreResponse, StoreStatus},
    config::ConnectionConfig,
    error::{DocumentStoreError, DocumentStoreResult},
};

#[derive(Debug, Clone)]
pub struct CouchDbClient {
    http: Client,
    base: Url,
    config: ConnectionConfig,
}

impl CouchDbClient {
    pub fn new(http: Client, config: ConnectionConfig) -> DocumentStoreResult<Self> {
        let base = Url::parse(&config.base_url())
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        Ok(Self { http, base, config })
    }

    pub fn builder(config: ConnectionConfig) -> CouchDbClientBuilder {
        CouchDbClientBuilder::new(config)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Joins percent-encoded path segments onto the server URL.
    fn url(&self, segments: &[&str]) -> DocumentStoreResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DocumentStoreError::Initialization(format!("{} cannot be a base URL", self.base))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);

        if self.config.has_credentials() {
            request.basic_auth(&self.config.username, Some(&self.config.password))
        } else {
            request
        }
    }

    async fn send(&self, request: RequestBuilder) -> DocumentStoreResult<StoreResponse> {
        let response = request
            .send()
            .await
            .map_err(transport_error)?;
        let status = StoreStatus::from_code(response.status().as_u16());
        let bytes = response
            .bytes()
            .await
            .map_err(transport_error)?;

        Ok(StoreResponse::new(status, decode_body(&bytes)?))
    }
}

/// Wraps a request failure together with its whole cause chain.
fn transport_error(err: reqwest::Error) -> DocumentStoreError {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    DocumentStoreError::Transport(message)
}

/// Decodes a response body. An empty body is an empty object.
pub(crate) fn decode_body(bytes: &[u8]) -> DocumentStoreResult<DocumentBody> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(DocumentBody::new());
    }

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(body)) => Ok(body),
        Ok(other) => Err(DocumentStoreError::MalformedResponse(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(DocumentStoreError::MalformedResponse(format!(
            "undecodable body: {e}"
        ))),
    }
}

#[async_trait]
impl StoreClient for CouchDbClient {
    async fn get(&self, database: &str, id: &str) -> DocumentStoreResult<StoreResponse> {
        debug!(database, id, "GET document");
        let url = self.url(&[database, id])?;

        self.send(self.request(Method::GET, url)).await
    }

    async fn create(
        &self,
        database: &str,
        id: Option<&str>,
        document: DocumentBody,
    ) -> DocumentStoreResult<StoreResponse> {
        let request = match id {
            Some(id) => {
                debug!(database, id, "PUT new document");
                self.request(Method::PUT, self.url(&[database, id])?)
            }
            None => {
                debug!(database, "POST new document");
                self.request(Method::POST, self.url(&[database])?)
            }
        };

        self.send(request.json(&document)).await
    }

    async fn update(
        &self,
        database: &str,
        id: &str,
        document: DocumentBody,
        revision: &str,
    ) -> DocumentStoreResult<StoreResponse> {
        debug!(database, id, revision, "PUT document revision");
        let mut request = self.request(Method::PUT, self.url(&[database, id])?);
        if !revision.is_empty() {
            request = request.query(&[("rev", revision)]);
        }

        self.send(request.json(&document)).await
    }

    async fn delete(
        &self,
        database: &str,
        id: &str,
        revision: &str,
    ) -> DocumentStoreResult<StoreResponse> {
        debug!(database, id, revision, "DELETE document");
        let request = self
            .request(Method::DELETE, self.url(&[database, id])?)
            .query(&[("rev", revision)]);

        self.send(request).await
    }

    async fn find(&self, database: &str, request: FindRequest) -> DocumentStoreResult<StoreResponse> {
        debug!(database, limit = request.limit, skip = request.skip, "POST _find");
        let url = self.url(&[database, "_find"])?;

        self.send(self.request(Method::POST, url).json(&request.to_body()))
            .await
    }

    async fn create_database(&self, name: &str) -> DocumentStoreResult<StoreStatus> {
        debug!(database = name, "PUT database");
        let url = self.url(&[name])?;

        Ok(self.send(self.request(Method::PUT, url)).await?.status)
    }
}

pub struct CouchDbClientBuilder {
    config: ConnectionConfig,
    timeout: Option<Duration>,
}

impl CouchDbClientBuilder {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config, timeout: None }
    }

    /// Bounds every request, from connecting to reading the body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl StoreClientBuilder for CouchDbClientBuilder {
    type Client = CouchDbClient;

    async fn build(self) -> DocumentStoreResult<Self::Client> {
        self.config.validate()?;

        let mut http = Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }

        CouchDbClient::new(
            http.build()
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.config,
        )
    }
}
