use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, header};
use serde::Serialize;
use serde_json::Value;

use crate::{client::Resource, error::CouchError};

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    name: &'a str,
    password: &'a str,
}

/// Facade over the server `/_session` endpoint.
#[derive(Debug, Clone)]
pub struct Session {
    resource: Resource,
}

impl Session {
    /// Creates a session facade; the resource path must already end with the
    /// `_session` segment.
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }

    /// Opens a session for the given credentials.
    pub async fn open(&self, name: &str, password: &str) -> Result<Value, CouchError> {
        let body = Bytes::from(serde_json::to_vec(&Credentials { name, password })?);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let mut response = self
            .resource
            .request(Method::POST, Vec::new(), headers, Some(body))
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }

    /// Fetches information about the active session.
    pub async fn info(&self) -> Result<Value, CouchError> {
        let mut response = self.resource.simple(Method::GET).await?.ensure_success().await?;
        response.json().await
    }

    /// Closes the active session.
    pub async fn close(&self) -> Result<Value, CouchError> {
        let mut response = self.resource.simple(Method::DELETE).await?.ensure_success().await?;
        response.json().await
    }
}
