use std::{fmt, pin::Pin, sync::Arc};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, stream};
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::CouchError;

/// Chunked response body as yielded by the HTTP collaborator.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, CouchError>> + Send>>;

/// Returns the non-standard `COPY` verb used by document copy operations.
pub fn copy_method() -> Method {
    Method::from_bytes(b"COPY").expect("COPY is a valid HTTP method token")
}

/// One outgoing HTTP request, fully described.
#[derive(Debug)]
pub struct HttpRequest {
    /// HTTP method, including the non-standard `COPY` verb.
    pub method: Method,
    /// Path segments, joined with `/` and individually escaped by the transport.
    pub path: Vec<String>,
    /// Query string pairs, in insertion order.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Creates a request with no query, headers or body.
    pub fn new(method: Method, path: Vec<String>) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// One incoming HTTP response with a streamed body.
pub struct HttpResponse {
    /// Response status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Chunked response body.
    pub body: BodyStream,
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    /// Creates a response from a status, headers and a body stream.
    pub fn new(status: StatusCode, headers: HeaderMap, body: BodyStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Creates a response whose whole body is already in memory.
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self::new(
            status,
            headers,
            Box::pin(stream::iter([Ok::<Bytes, CouchError>(body)])),
        )
    }

    /// Reads the remaining body into one buffer.
    pub async fn bytes(&mut self) -> Result<Bytes, CouchError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    /// Reads the remaining body and decodes it as JSON.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T, CouchError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fails with [`CouchError::UnexpectedStatus`] unless the status is 2xx.
    pub async fn ensure_success(self) -> Result<Self, CouchError> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(self.into_error().await)
    }

    /// Converts this response into the error it represents, draining the
    /// body for the server-provided error payload.
    pub async fn into_error(mut self) -> CouchError {
        let body = self.bytes().await.unwrap_or_default();
        CouchError::UnexpectedStatus {
            status: self.status,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }
}

/// Injected HTTP transport collaborator.
///
/// The crate never owns a socket; every facade call goes through one
/// implementation of this trait, which makes the whole surface testable
/// against a canned transport.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issues one HTTP request and resolves to its streamed response.
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, CouchError>;
}

/// A server-relative path bound to an HTTP transport.
#[derive(Clone)]
pub struct Resource {
    client: Arc<dyn HttpClient>,
    path: Vec<String>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Resource {
    /// Creates a root resource over the given transport.
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            path: Vec::new(),
        }
    }

    /// Derives a child resource by appending path segments.
    pub fn join<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = self.path.clone();
        path.extend(segments.into_iter().map(Into::into));
        Self {
            client: Arc::clone(&self.client),
            path,
        }
    }

    /// Returns the accumulated path segments.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Returns the last path segment, if any.
    pub fn last_segment(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    /// Issues one request against this resource's path.
    pub async fn request(
        &self,
        method: Method,
        query: Vec<(String, String)>,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<HttpResponse, CouchError> {
        tracing::debug!(method = %method, path = ?self.path, "issuing request");

        let mut request = HttpRequest::new(method, self.path.clone());
        request.query = query;
        request.headers = headers;
        request.body = body;
        self.client.request(request).await
    }

    /// Issues a request with no query, headers or body.
    pub async fn simple(&self, method: Method) -> Result<HttpResponse, CouchError> {
        self.request(method, Vec::new(), HeaderMap::new(), None).await
    }
}
