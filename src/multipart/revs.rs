use bytes::{Bytes, BytesMut};
use futures::stream;
use http::HeaderMap;
use serde_json::Value;

use crate::{
    client::BodyStream,
    error::{CouchError, DecodeError},
    multipart::reader::{MultipartReader, Part, PartBody, PartReader},
};

/// Decoder for an open-revs response (`multipart/mixed`).
///
/// Each top-level part is one document revision: either a bare JSON document
/// or a nested `multipart/related` body whose first sub-part is the JSON
/// document and whose siblings are its attachments.
#[derive(Debug)]
pub struct OpenRevsMultipartReader {
    inner: MultipartReader,
}

impl OpenRevsMultipartReader {
    /// Creates a reader from a response's headers and body stream.
    pub fn from_response(headers: &HeaderMap, body: BodyStream) -> Result<Self, CouchError> {
        Ok(Self {
            inner: MultipartReader::from_response(headers, body)?,
        })
    }

    /// Pulls the next revision as a `(document, attachments)` pair.
    ///
    /// For a revision carrying attachments the second element is
    /// [`PartBody::Multipart`], positioned at the first attachment. For a
    /// bare JSON revision it is an already exhausted [`PartBody::Raw`]
    /// reader. `None` marks the terminal boundary, permanently.
    pub async fn next(&mut self) -> Result<Option<(Value, PartBody)>, CouchError> {
        let Some(part) = self.inner.next().await? else {
            return Ok(None);
        };

        match part.body {
            PartBody::Multipart(mut sub) => {
                let document = read_document_part(sub.next().await?).await?;
                Ok(Some((document, PartBody::Multipart(sub))))
            }
            PartBody::Raw(mut reader) => {
                let document = serde_json::from_slice(&reader.bytes().await?)?;
                Ok(Some((document, PartBody::Raw(reader))))
            }
        }
    }

    /// True once the terminal boundary has been consumed.
    pub fn at_eof(&self) -> bool {
        self.inner.at_eof()
    }
}

/// One attachment sibling within a document-with-attachments response.
#[derive(Debug)]
pub struct AttachmentPart {
    /// Attachment part headers.
    pub headers: HeaderMap,
    /// Filename from `Content-Disposition`, when the server provided one.
    pub filename: Option<String>,
    /// Streamed attachment body.
    pub reader: PartReader,
}

/// Decoder for a document-with-attachments response (`multipart/related`).
///
/// The first part is the JSON document; every following sibling part is one
/// attachment keyed by its `Content-Disposition` filename.
#[derive(Debug)]
pub struct DocAttachmentsMultipartReader {
    inner: MultipartReader,
}

impl DocAttachmentsMultipartReader {
    /// Creates a reader from a response's headers and body stream.
    pub fn from_response(headers: &HeaderMap, body: BodyStream) -> Result<Self, CouchError> {
        Ok(Self {
            inner: MultipartReader::from_response(headers, body)?,
        })
    }

    /// Wraps a plain `application/json` response body in a synthesized
    /// single-part multipart envelope.
    ///
    /// The server may answer a "document with attachments" request with bare
    /// JSON when there is nothing to split out; wrapping keeps the result
    /// shape uniform. The payload bytes are spliced in verbatim.
    pub fn from_json_bytes(payload: Bytes) -> Self {
        let boundary = uuid::Uuid::new_v4().simple().to_string();

        let mut body = BytesMut::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
        body.extend_from_slice(&payload);
        body.extend_from_slice(format!("\r\n--{boundary}--").as_bytes());

        let stream: BodyStream =
            Box::pin(stream::iter([Ok::<Bytes, CouchError>(body.freeze())]));
        Self {
            inner: MultipartReader::new(boundary, stream),
        }
    }

    /// Reads the leading JSON document part.
    pub async fn document(&mut self) -> Result<Value, CouchError> {
        read_document_part(self.inner.next().await?).await
    }

    /// Pulls the next attachment part, or `None` at the terminal boundary.
    pub async fn next_attachment(&mut self) -> Result<Option<AttachmentPart>, CouchError> {
        let Some(part) = self.inner.next().await? else {
            return Ok(None);
        };

        let Part { headers, body } = part;
        let filename = crate::multipart::headers::disposition_filename(&headers);
        match body {
            PartBody::Raw(reader) => Ok(Some(AttachmentPart {
                headers,
                filename,
                reader,
            })),
            PartBody::Multipart(_) => {
                Err(DecodeError::new("attachment part cannot be multipart").into())
            }
        }
    }

    /// True once the terminal boundary has been consumed.
    pub fn at_eof(&self) -> bool {
        self.inner.at_eof()
    }
}

async fn read_document_part(part: Option<Part>) -> Result<Value, CouchError> {
    let part = part.ok_or_else(|| DecodeError::new("missing document part"))?;
    match part.body {
        PartBody::Raw(mut reader) => Ok(serde_json::from_slice(&reader.bytes().await?)?),
        PartBody::Multipart(_) => {
            Err(DecodeError::new("document part cannot be multipart").into())
        }
    }
}
