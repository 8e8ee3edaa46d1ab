/// Boundary extraction from `Content-Type` values.
pub mod boundary;
/// Part header block parsing helpers.
pub mod headers;
/// Incremental multipart stream reader.
pub mod reader;
/// Document-oriented reader specializations.
pub mod revs;

pub use boundary::{extract_boundary, is_multipart};
pub use headers::disposition_filename;
pub use reader::{MultipartReader, Part, PartBody, PartReader};
pub use revs::{AttachmentPart, DocAttachmentsMultipartReader, OpenRevsMultipartReader};
