use http::Method;
use serde_json::Value;

use crate::{client::Resource, document::Document, error::CouchError};

/// Facade over one design document (`_design/<name>`).
///
/// Shares the regular document contract through [`DesignDocument::doc`];
/// only the path semantics and the `_info` endpoint differ.
#[derive(Debug, Clone)]
pub struct DesignDocument {
    document: Document,
}

impl DesignDocument {
    /// Creates a design document facade; the resource path must already end
    /// with the `_design/<name>` segments.
    pub fn new(resource: Resource) -> Self {
        Self {
            document: Document::new(resource),
        }
    }

    /// Returns the design document name (the segment after `_design`).
    pub fn name(&self) -> Option<&str> {
        self.document.resource().last_segment()
    }

    /// Returns the full document id, `_design/<name>`.
    pub fn id(&self) -> Option<String> {
        self.name().map(|name| format!("_design/{name}"))
    }

    /// Returns the underlying document facade.
    pub fn doc(&self) -> &Document {
        &self.document
    }

    /// Fetches view index information from the `_info` endpoint.
    pub async fn info(&self) -> Result<Value, CouchError> {
        let mut response = self
            .document
            .resource()
            .join(["_info"])
            .simple(Method::GET)
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }
}
