use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use serde_json::Value;

use crate::{
    client::{HttpResponse, Resource},
    document::{etag_rev, if_none_match},
    error::CouchError,
};

/// Factory seam for attachment facades.
///
/// [`crate::Document::att`] builds attachments through this trait, so any
/// capability-compatible type can be swapped in at construction instead of
/// subclassing the default [`Attachment`].
pub trait AttachmentSlot {
    /// Builds the attachment facade over its resource.
    fn from_resource(resource: Resource) -> Self;
}

/// Facade over one document attachment resource.
#[derive(Debug, Clone)]
pub struct Attachment {
    resource: Resource,
}

impl AttachmentSlot for Attachment {
    fn from_resource(resource: Resource) -> Self {
        Self::new(resource)
    }
}

impl Attachment {
    /// Creates an attachment facade over the given resource.
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }

    /// Returns the attachment name from the resource path.
    pub fn name(&self) -> Option<&str> {
        self.resource.last_segment()
    }

    /// Checks whether the attachment exists; 403 and 404 map to `false`.
    pub async fn exists(&self, rev: Option<&str>) -> Result<bool, CouchError> {
        let response = self
            .resource
            .request(Method::HEAD, rev_query(rev), HeaderMap::new(), None)
            .await?;

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

    /// Checks whether the attachment changed relative to the given digest.
    pub async fn modified(&self, digest: &str) -> Result<bool, CouchError> {
        let response = self
            .resource
            .request(Method::HEAD, Vec::new(), if_none_match(digest)?, None)
            .await?;

        if response.status == StatusCode::NOT_MODIFIED {
            return Ok(false);
        }
        if response.status.is_success() {
            return Ok(true);
        }
        Err(response.into_error().await)
    }

    /// Returns the attachment's current revision from the `ETag` header.
    pub async fn rev(&self) -> Result<String, CouchError> {
        let response = self.resource.simple(Method::HEAD).await?.ensure_success().await?;
        etag_rev(&response.headers)
    }

    /// Fetches the attachment; the body stays streamed on the response.
    pub async fn get(&self, rev: Option<&str>) -> Result<HttpResponse, CouchError> {
        self.resource
            .request(Method::GET, rev_query(rev), HeaderMap::new(), None)
            .await?
            .ensure_success()
            .await
    }

    /// Stores the attachment body under the given content type.
    pub async fn update(
        &self,
        body: Bytes,
        content_type: &str,
        rev: Option<&str>,
    ) -> Result<Value, CouchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(content_type)
                .map_err(|_| CouchError::invalid_argument("invalid attachment content type"))?,
        );

        let mut response = self
            .resource
            .request(Method::PUT, rev_query(rev), headers, Some(body))
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }

    /// Deletes the attachment from the given document revision.
    pub async fn delete(&self, rev: &str) -> Result<Value, CouchError> {
        let mut response = self
            .resource
            .request(
                Method::DELETE,
                rev_query(Some(rev)),
                HeaderMap::new(),
                None,
            )
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }
}

fn rev_query(rev: Option<&str>) -> Vec<(String, String)> {
    rev.map(|rev| vec![("rev".to_owned(), rev.to_owned())])
        .unwrap_or_default()
}
