use std::marker::PhantomData;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use serde_json::Value;

use crate::{
    attachment::{Attachment, AttachmentSlot},
    client::{Resource, copy_method},
    error::{CouchError, DecodeError},
    multipart::{
        DocAttachmentsMultipartReader, OpenRevsMultipartReader, boundary::content_type_value,
        is_multipart,
    },
};

const ACCEPT_MULTIPART: &str = "multipart/*";
const ACCEPT_MULTIPART_OR_JSON: &str = "multipart/*, application/json";

/// Recognized query flags for document retrieval.
#[derive(Debug, Clone, Default)]
pub struct GetParams {
    /// Include attachment bodies inline.
    pub attachments: Option<bool>,
    /// Include attachment encoding information.
    pub att_encoding_info: Option<bool>,
    /// Only include attachments changed since these revisions.
    pub atts_since: Option<Vec<String>>,
    /// Include conflicting revisions.
    pub conflicts: Option<bool>,
    /// Include deleted conflicting revisions.
    pub deleted_conflicts: Option<bool>,
    /// Include the document's local sequence number.
    pub local_seq: Option<bool>,
    /// Include all metadata fields.
    pub meta: Option<bool>,
    /// Fetch these open revisions.
    pub open_revs: Option<Vec<String>>,
    /// Fetch this specific revision.
    pub rev: Option<String>,
    /// Include the revision history.
    pub revs: Option<bool>,
    /// Include detailed revision information.
    pub revs_info: Option<bool>,
}

impl GetParams {
    fn into_query(self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        push_bool(&mut query, "att_encoding_info", self.att_encoding_info);
        push_bool(&mut query, "attachments", self.attachments);
        push_list(&mut query, "atts_since", self.atts_since);
        push_bool(&mut query, "conflicts", self.conflicts);
        push_bool(&mut query, "deleted_conflicts", self.deleted_conflicts);
        push_bool(&mut query, "local_seq", self.local_seq);
        push_bool(&mut query, "meta", self.meta);
        push_list(&mut query, "open_revs", self.open_revs);
        if let Some(rev) = self.rev {
            query.push(("rev".to_owned(), rev));
        }
        push_bool(&mut query, "revs", self.revs);
        push_bool(&mut query, "revs_info", self.revs_info);
        query
    }
}

/// Recognized query flags for document updates.
#[derive(Debug, Clone, Default)]
pub struct UpdateParams {
    /// Batch mode marker (`batch=ok`).
    pub batch: Option<String>,
    /// Whether the update is a regular edit.
    pub new_edits: Option<bool>,
    /// Revision being updated.
    pub rev: Option<String>,
}

impl UpdateParams {
    fn into_query(self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(batch) = self.batch {
            query.push(("batch".to_owned(), batch));
        }
        push_bool(&mut query, "new_edits", self.new_edits);
        if let Some(rev) = self.rev {
            query.push(("rev".to_owned(), rev));
        }
        query
    }
}

fn push_bool(query: &mut Vec<(String, String)>, key: &str, value: Option<bool>) {
    if let Some(value) = value {
        query.push((key.to_owned(), value.to_string()));
    }
}

/// List-valued flags go over the wire as JSON arrays.
fn push_list(query: &mut Vec<(String, String)>, key: &str, value: Option<Vec<String>>) {
    if let Some(value) = value {
        query.push((key.to_owned(), Value::from(value).to_string()));
    }
}

/// Facade over one document resource.
///
/// The attachment type is a strategy parameter: any [`AttachmentSlot`]
/// implementation can stand in for [`Attachment`] at construction.
pub struct Document<A = Attachment> {
    resource: Resource,
    _attachment: PhantomData<fn() -> A>,
}

impl<A> std::fmt::Debug for Document<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("resource", &self.resource)
            .finish()
    }
}

impl<A> Clone for Document<A> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            _attachment: PhantomData,
        }
    }
}

impl<A> Document<A> {
    /// Creates a document facade over the given resource.
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            _attachment: PhantomData,
        }
    }

    /// Returns the document id from the resource path.
    pub fn id(&self) -> Option<&str> {
        self.resource.last_segment()
    }

    /// Returns the underlying resource.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Checks whether the document (optionally a specific revision) exists.
    ///
    /// 403 and 404 are absorbed into `false`; other failures propagate.
    pub async fn exists(&self, rev: Option<&str>) -> Result<bool, CouchError> {
        let query = rev_query(rev);
        let response = self
            .resource
            .request(Method::HEAD, query, HeaderMap::new(), None)
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

    /// Checks whether the document changed relative to the given revision.
    pub async fn modified(&self, rev: &str) -> Result<bool, CouchError> {
        let response = self
            .resource
            .request(Method::HEAD, Vec::new(), if_none_match(rev)?, None)
            .await?;

        if response.status == StatusCode::NOT_MODIFIED {
            return Ok(false);
        }
        if response.status.is_success() {
            return Ok(true);
        }
        Err(response.into_error().await)
    }

    /// Returns the document's current revision from the `ETag` header.
    pub async fn rev(&self) -> Result<String, CouchError> {
        let response = self.resource.simple(Method::HEAD).await?.ensure_success().await?;
        etag_rev(&response.headers)
    }

    /// Fetches the document as JSON.
    pub async fn get(&self, params: GetParams) -> Result<Value, CouchError> {
        let mut response = self
            .resource
            .request(Method::GET, params.into_query(), HeaderMap::new(), None)
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }

    /// Fetches multiple open revisions as a multipart stream.
    ///
    /// An empty `revs` slice requests all open revisions.
    pub async fn get_open_revs(
        &self,
        revs: &[&str],
        params: GetParams,
    ) -> Result<OpenRevsMultipartReader, CouchError> {
        if params.open_revs.is_some() {
            return Err(CouchError::invalid_argument(
                "open_revs is set by get_open_revs, not by params",
            ));
        }

        let mut query = params.into_query();
        if revs.is_empty() {
            query.push(("open_revs".to_owned(), "all".to_owned()));
        } else {
            let revs: Vec<String> = revs.iter().map(|rev| (*rev).to_owned()).collect();
            query.push(("open_revs".to_owned(), Value::from(revs).to_string()));
        }

        let response = self
            .resource
            .request(Method::GET, query, accept(ACCEPT_MULTIPART), None)
            .await?
            .ensure_success()
            .await?;

        OpenRevsMultipartReader::from_response(&response.headers, response.body)
    }

    /// Fetches the document together with its attachments.
    ///
    /// The server may answer with `multipart/related` or, when there is
    /// nothing to split out, plain JSON; the latter is wrapped in a
    /// synthesized single-part envelope so the result shape is uniform.
    pub async fn get_with_atts(
        &self,
        params: GetParams,
    ) -> Result<DocAttachmentsMultipartReader, CouchError> {
        let mut params = params;
        params.attachments = Some(true);

        let mut response = self
            .resource
            .request(
                Method::GET,
                params.into_query(),
                accept(ACCEPT_MULTIPART_OR_JSON),
                None,
            )
            .await?
            .ensure_success()
            .await?;

        if is_multipart(content_type_value(&response.headers)?) {
            DocAttachmentsMultipartReader::from_response(&response.headers, response.body)
        } else {
            let payload = response.bytes().await?;
            Ok(DocAttachmentsMultipartReader::from_json_bytes(payload))
        }
    }

    /// Stores a new revision of the document.
    ///
    /// Rejected locally, before any request is issued, when the body is not
    /// a JSON object or carries an `_id` that conflicts with the target id.
    pub async fn update(&self, doc: &Value, params: UpdateParams) -> Result<Value, CouchError> {
        let Some(fields) = doc.as_object() else {
            return Err(CouchError::invalid_argument(
                "document body must be a JSON object",
            ));
        };

        if let Some(doc_id) = fields.get("_id") {
            if doc_id.as_str() != self.id() {
                return Err(CouchError::invalid_argument(
                    "document body _id conflicts with the target document id",
                ));
            }
        }

        let body = Bytes::from(serde_json::to_vec(doc)?);
        let mut response = self
            .resource
            .request(Method::PUT, params.into_query(), json_content(), Some(body))
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }

    /// Deletes the given revision of the document.
    pub async fn delete(&self, rev: &str) -> Result<Value, CouchError> {
        let mut response = self
            .resource
            .request(Method::DELETE, rev_query(Some(rev)), HeaderMap::new(), None)
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }

    /// Deletes the document while keeping its remaining fields readable.
    ///
    /// Fetches the revision, strips `_rev`, flags it `_deleted` and stores it
    /// back, so every field other than the deletion marker survives in the
    /// tombstone. The revision goes over the wire as the `rev` query param.
    pub async fn delete_preserving_content(&self, rev: &str) -> Result<Value, CouchError> {
        let mut doc = self
            .get(GetParams {
                rev: Some(rev.to_owned()),
                ..GetParams::default()
            })
            .await?;

        let Some(fields) = doc.as_object_mut() else {
            return Err(DecodeError::new("document body is not a JSON object").into());
        };
        fields.remove("_rev");
        fields.insert("_deleted".to_owned(), Value::Bool(true));

        self.update(
            &doc,
            UpdateParams {
                rev: Some(rev.to_owned()),
                ..UpdateParams::default()
            },
        )
        .await
    }

    /// Copies the document to another id via the `COPY` verb.
    pub async fn copy(&self, dest_id: &str, dest_rev: Option<&str>) -> Result<Value, CouchError> {
        let destination = match dest_rev {
            Some(rev) => format!("{dest_id}?rev={rev}"),
            None => dest_id.to_owned(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("destination"),
            HeaderValue::from_str(&destination)
                .map_err(|_| CouchError::invalid_argument("invalid copy destination"))?,
        );

        let mut response = self
            .resource
            .request(copy_method(), Vec::new(), headers, None)
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }
}

impl<A: AttachmentSlot> Document<A> {
    /// Returns the attachment facade for the given name.
    pub fn att(&self, name: &str) -> A {
        A::from_resource(self.resource.join([name]))
    }
}

fn rev_query(rev: Option<&str>) -> Vec<(String, String)> {
    rev.map(|rev| vec![("rev".to_owned(), rev.to_owned())])
        .unwrap_or_default()
}

fn accept(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(value));
    headers
}

fn json_content() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers
}

pub(crate) fn if_none_match(rev: &str) -> Result<HeaderMap, CouchError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::IF_NONE_MATCH,
        HeaderValue::from_str(&format!("\"{rev}\""))
            .map_err(|_| CouchError::invalid_argument("revision is not a valid header value"))?,
    );
    Ok(headers)
}

pub(crate) fn etag_rev(headers: &HeaderMap) -> Result<String, CouchError> {
    let etag = headers
        .get(header::ETAG)
        .ok_or_else(|| DecodeError::new("response is missing an ETag header"))?;
    let etag = etag
        .to_str()
        .map_err(|_| DecodeError::new("ETag header must be ASCII"))?;
    Ok(etag.trim_matches('"').to_owned())
}
