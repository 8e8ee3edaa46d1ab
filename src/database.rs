use http::{Method, StatusCode};
use serde_json::Value;

use crate::{
    client::Resource, designdoc::DesignDocument, document::Document, error::CouchError,
};

/// Facade over one database resource.
#[derive(Debug, Clone)]
pub struct Database {
    resource: Resource,
}

impl Database {
    /// Creates a database facade over the given resource.
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }

    /// Returns the database name from the resource path.
    pub fn name(&self) -> Option<&str> {
        self.resource.last_segment()
    }

    /// Checks whether the database exists; 403 and 404 map to `false`.
    pub async fn exists(&self) -> Result<bool, CouchError> {
        let response = self.resource.simple(Method::HEAD).await?;

        if response.status.is_success() {
            return Ok(true);
        }
        if matches!(
            response.status,
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            return Ok(false);
        }
        Err(response.into_error().await)
    }

    /// Fetches database metadata.
    pub async fn info(&self) -> Result<Value, CouchError> {
        let mut response = self.resource.simple(Method::GET).await?.ensure_success().await?;
        response.json().await
    }

    /// Creates the database.
    pub async fn create(&self) -> Result<Value, CouchError> {
        let mut response = self.resource.simple(Method::PUT).await?.ensure_success().await?;
        response.json().await
    }

    /// Deletes the database.
    pub async fn delete(&self) -> Result<Value, CouchError> {
        let mut response = self.resource.simple(Method::DELETE).await?.ensure_success().await?;
        response.json().await
    }

    /// Returns the document facade for the given id.
    pub fn doc(&self, id: &str) -> Document {
        Document::new(self.resource.join([id]))
    }

    /// Returns the design document facade for the given name.
    pub fn ddoc(&self, name: &str) -> DesignDocument {
        DesignDocument::new(self.resource.join(["_design", name]))
    }
}
