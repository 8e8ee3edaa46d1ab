#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Async client for the CouchDB HTTP API.
//!
//! The core of the crate is an incremental `multipart/mixed` and
//! `multipart/related` stream decoder that yields document revisions and
//! their attachment byte streams in wire order, without buffering whole
//! responses. Resource facades wrap the server's REST surface on top of an
//! injected [`client::HttpClient`] transport.

/// Document attachment facade.
pub mod attachment;
/// HTTP transport collaborator and resource paths.
pub mod client;
/// Server configuration endpoint facade.
pub mod config;
/// Database facade.
pub mod database;
/// Design document facade.
pub mod designdoc;
/// Document facade and retrieval parameters.
pub mod document;
/// Error types exposed by this crate.
pub mod error;
/// Streaming multipart decoder.
pub mod multipart;
/// Server root facade.
pub mod server;
/// Session endpoint facade.
pub mod session;

pub use attachment::{Attachment, AttachmentSlot};
pub use client::{BodyStream, HttpClient, HttpRequest, HttpResponse, Resource};
pub use config::Config;
pub use database::Database;
pub use designdoc::DesignDocument;
pub use document::{Document, GetParams, UpdateParams};
pub use error::{CouchError, DecodeError};
pub use multipart::{
    AttachmentPart, DocAttachmentsMultipartReader, MultipartReader, OpenRevsMultipartReader, Part,
    PartBody, PartReader,
};
pub use server::Server;
pub use session::Session;
