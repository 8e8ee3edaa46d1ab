use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;

use crate::{client::Resource, error::CouchError};

/// Facade over the server `/_config` endpoint.
#[derive(Debug, Clone)]
pub struct Config {
    resource: Resource,
}

impl Config {
    /// Creates a config facade; the resource path must already end with the
    /// `_config` segment.
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }

    /// Fetches the whole server configuration.
    pub async fn get(&self) -> Result<Value, CouchError> {
        let mut response = self.resource.simple(Method::GET).await?.ensure_success().await?;
        response.json().await
    }

    /// Fetches one configuration section.
    pub async fn section(&self, section: &str) -> Result<Value, CouchError> {
        let mut response = self
            .resource
            .join([section])
            .simple(Method::GET)
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }

    /// Fetches one configuration value.
    pub async fn get_value(&self, section: &str, key: &str) -> Result<Value, CouchError> {
        let mut response = self
            .resource
            .join([section, key])
            .simple(Method::GET)
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }

    /// Checks whether a configuration key is set; 404 maps to `false`.
    pub async fn exists(&self, section: &str, key: &str) -> Result<bool, CouchError> {
        let response = self.resource.join([section, key]).simple(Method::HEAD).await?;

        if response.status.is_success() {
            return Ok(true);
        }
        if response.status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Err(response.into_error().await)
    }

    /// Sets a configuration value, returning the previous one.
    pub async fn update(&self, section: &str, key: &str, value: &str) -> Result<Value, CouchError> {
        let body = Bytes::from(serde_json::to_vec(&Value::from(value))?);
        let mut response = self
            .resource
            .join([section, key])
            .request(Method::PUT, Vec::new(), HeaderMap::new(), Some(body))
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }

    /// Removes a configuration key, returning the previous value.
    pub async fn delete(&self, section: &str, key: &str) -> Result<Value, CouchError> {
        let mut response = self
            .resource
            .join([section, key])
            .simple(Method::DELETE)
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }
}
