use http::{HeaderMap, header};

use crate::error::DecodeError;

const MAX_BOUNDARY_LEN: usize = 70;

/// Extracts and validates the `boundary` parameter from a `Content-Type` value.
///
/// Any `multipart/*` subtype is accepted; the server uses `multipart/mixed`
/// for open-revs responses and `multipart/related` for document-plus-
/// attachments responses.
pub fn extract_boundary(content_type: &str) -> Result<String, DecodeError> {
    let mime = content_type
        .parse::<mime::Mime>()
        .map_err(|_| DecodeError::new("invalid Content-Type header"))?;

    if mime.type_() != mime::MULTIPART {
        return Err(DecodeError::new("Content-Type must be multipart/*"));
    }

    let boundary = mime
        .get_param(mime::BOUNDARY)
        .map(|value| value.as_str())
        .ok_or_else(|| DecodeError::new("missing multipart boundary parameter"))?;

    // the server quotes boundary tokens that are not plain tokens, e.g. ":"
    let boundary = boundary
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .unwrap_or(boundary);

    validate_boundary(boundary)?;
    Ok(boundary.to_owned())
}

/// Returns true when the header value names a `multipart/*` media type.
pub fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(.."multipart/".len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
}

/// Reads the `Content-Type` header value out of a header map.
pub fn content_type_value(headers: &HeaderMap) -> Result<&str, DecodeError> {
    headers
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| DecodeError::new("missing Content-Type header"))?
        .to_str()
        .map_err(|_| DecodeError::new("Content-Type header must be ASCII"))
}

fn validate_boundary(boundary: &str) -> Result<(), DecodeError> {
    if boundary.is_empty() {
        return Err(DecodeError::new("multipart boundary cannot be empty"));
    }

    if boundary.len() > MAX_BOUNDARY_LEN {
        return Err(DecodeError::new(
            "multipart boundary cannot exceed 70 characters",
        ));
    }

    if boundary.contains('\r') || boundary.contains('\n') {
        return Err(DecodeError::new("multipart boundary cannot contain CRLF"));
    }

    Ok(())
}
