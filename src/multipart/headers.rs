use http::{HeaderMap, HeaderName, HeaderValue, header};

use crate::error::DecodeError;

/// Parses the raw CRLF-separated lines of a part header block.
///
/// Header names are case-insensitive by construction of [`HeaderMap`]; an
/// empty block is legal (a part may carry no headers at all).
pub fn parse_header_lines(lines: &[Vec<u8>]) -> Result<HeaderMap, DecodeError> {
    let mut headers = HeaderMap::new();

    for raw in lines {
        let line = std::str::from_utf8(raw)
            .map_err(|_| DecodeError::new("part headers must be UTF-8"))?;
        if line.is_empty() {
            continue;
        }

        let Some((raw_name, raw_value)) = line.split_once(':') else {
            return Err(DecodeError::new("invalid part header line"));
        };

        let name = raw_name
            .trim()
            .parse::<HeaderName>()
            .map_err(|_| DecodeError::new("invalid part header name"))?;
        let value = HeaderValue::from_str(raw_value.trim())
            .map_err(|_| DecodeError::new("invalid part header value"))?;
        headers.append(name, value);
    }

    Ok(headers)
}

/// Extracts the attachment filename from a part's `Content-Disposition`.
pub fn disposition_filename(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::CONTENT_DISPOSITION)?.to_str().ok()?;

    for segment in split_semicolon_aware(value).into_iter().skip(1) {
        let trimmed = segment.trim();
        let Some((raw_key, raw_value)) = trimmed.split_once('=') else {
            continue;
        };

        if raw_key.trim().eq_ignore_ascii_case("filename") {
            return parse_parameter_value(raw_value.trim()).ok();
        }
    }

    None
}

fn parse_parameter_value(raw: &str) -> Result<String, DecodeError> {
    if let Some(stripped) = raw.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        return unescape_quoted_string(stripped);
    }

    if raw.contains('"') {
        return Err(DecodeError::new("invalid quoted parameter value"));
    }

    Ok(raw.trim().to_owned())
}

fn unescape_quoted_string(value: &str) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let escaped = chars
                .next()
                .ok_or_else(|| DecodeError::new("dangling escape in quoted parameter"))?;
            out.push(escaped);
            continue;
        }
        out.push(ch);
    }

    Ok(out)
}

fn split_semicolon_aware(value: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in value.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }

        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                current.push(ch);
                in_quotes = !in_quotes;
            }
            ';' if !in_quotes => {
                segments.push(current);
                current = String::new();
            }
            _ => current.push(ch),
        }
    }

    segments.push(current);
    segments
}
