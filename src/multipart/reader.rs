use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http::{HeaderMap, header};
use tokio::sync::Mutex;

use crate::{
    client::BodyStream,
    error::{CouchError, DecodeError},
    multipart::{
        boundary::{content_type_value, extract_boundary, is_multipart},
        headers::{disposition_filename, parse_header_lines},
    },
};

/// Byte-stream cursor shared between a reader and its live child.
///
/// Exactly one reader advances the cursor at a time; the parent regains it
/// once the child is exhausted or explicitly drained.
pub(crate) struct Cursor {
    stream: BodyStream,
    buffer: BytesMut,
    upstream_done: bool,
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("buffered", &self.buffer.len())
            .field("upstream_done", &self.upstream_done)
            .finish_non_exhaustive()
    }
}

impl Cursor {
    fn new(stream: BodyStream) -> Self {
        Self {
            stream,
            buffer: BytesMut::new(),
            upstream_done: false,
        }
    }

    /// Pulls one more chunk into the buffer; false once upstream is exhausted.
    async fn fill(&mut self) -> Result<bool, CouchError> {
        if self.upstream_done {
            return Ok(false);
        }

        match self.stream.next().await {
            Some(chunk) => {
                self.buffer.extend_from_slice(&chunk?);
                Ok(true)
            }
            None => {
                self.upstream_done = true;
                Ok(false)
            }
        }
    }

    fn find(&self, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() || self.buffer.len() < needle.len() {
            return None;
        }
        self.buffer
            .windows(needle.len())
            .position(|window| window == needle)
    }

    fn consume(&mut self, count: usize) {
        let _ = self.buffer.split_to(count);
    }
}

pub(crate) type SharedCursor = Arc<Mutex<Cursor>>;

/// Reads one CRLF-terminated line; at upstream EOF a trailing unterminated
/// line is returned as-is, and `None` means the stream is fully consumed.
async fn read_line(cur: &mut Cursor) -> Result<Option<Vec<u8>>, CouchError> {
    loop {
        if let Some(pos) = cur.find(b"\r\n") {
            let line = cur.buffer[..pos].to_vec();
            cur.consume(pos + 2);
            return Ok(Some(line));
        }

        if !cur.fill().await? {
            if cur.buffer.is_empty() {
                return Ok(None);
            }
            let line = cur.buffer[..].to_vec();
            cur.consume(line.len());
            return Ok(Some(line));
        }
    }
}

/// Discards bytes up to the next delimiter occurrence, leaving the cursor at
/// the start of the boundary line that follows it.
async fn skip_to_delimiter(cur: &mut Cursor, delimiter: &[u8]) -> Result<(), CouchError> {
    loop {
        if let Some(pos) = cur.find(delimiter) {
            cur.consume(pos + 2);
            return Ok(());
        }

        let hold = partial_suffix_len(&cur.buffer, delimiter);
        let discard = cur.buffer.len() - hold;
        if discard > 0 {
            cur.consume(discard);
        }

        if !cur.fill().await? {
            return Err(CouchError::IncompleteStream);
        }
    }
}

/// Length of the longest buffer suffix that could still grow into the
/// delimiter once more bytes arrive.
fn partial_suffix_len(buffer: &[u8], delimiter: &[u8]) -> usize {
    let max = delimiter.len().saturating_sub(1).min(buffer.len());
    (1..=max)
        .rev()
        .find(|&len| delimiter.starts_with(&buffer[buffer.len() - len..]))
        .unwrap_or(0)
}

/// Body of one decoded part: raw bytes or a nested multipart stream.
#[derive(Debug)]
pub enum PartBody {
    /// Plain part body, pulled chunk by chunk.
    Raw(PartReader),
    /// Nested `multipart/*` body scoped to its own boundary.
    Multipart(MultipartReader),
}

/// One headers-plus-body unit within a multipart body.
#[derive(Debug)]
pub struct Part {
    /// Part headers, names case-insensitive.
    pub headers: HeaderMap,
    /// Part body.
    pub body: PartBody,
}

impl Part {
    /// Returns the part's `Content-Type` header value, if present and ASCII.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Returns the attachment filename from `Content-Disposition`.
    pub fn filename(&self) -> Option<String> {
        disposition_filename(&self.headers)
    }
}

/// Reads one part's raw body up to the parent boundary.
#[derive(Debug)]
pub struct PartReader {
    cursor: SharedCursor,
    delimiter: Vec<u8>,
    exhausted: Arc<AtomicBool>,
}

impl PartReader {
    pub(crate) fn new(cursor: SharedCursor, delimiter: Vec<u8>, exhausted: Arc<AtomicBool>) -> Self {
        Self {
            cursor,
            delimiter,
            exhausted,
        }
    }

    /// Pulls the next body chunk, or `None` once the part boundary is reached.
    ///
    /// The framing CRLF preceding the boundary is consumed, never yielded:
    /// it belongs to the wire format, not the payload. After the boundary is
    /// detected every further call keeps returning `None`.
    pub async fn next(&mut self) -> Result<Option<Bytes>, CouchError> {
        if self.at_eof() {
            return Ok(None);
        }

        let mut cur = self.cursor.lock().await;
        loop {
            if let Some(pos) = cur.find(&self.delimiter) {
                if pos == 0 {
                    cur.consume(2);
                    self.exhausted.store(true, Ordering::Relaxed);
                    return Ok(None);
                }

                let chunk = Bytes::copy_from_slice(&cur.buffer[..pos]);
                cur.consume(pos + 2);
                self.exhausted.store(true, Ordering::Relaxed);
                return Ok(Some(chunk));
            }

            let hold = partial_suffix_len(&cur.buffer, &self.delimiter);
            let available = cur.buffer.len() - hold;
            if available > 0 {
                let chunk = Bytes::copy_from_slice(&cur.buffer[..available]);
                cur.consume(available);
                return Ok(Some(chunk));
            }

            if !cur.fill().await? {
                return Err(CouchError::IncompleteStream);
            }
        }
    }

    /// True once this part's boundary has been consumed.
    pub fn at_eof(&self) -> bool {
        self.exhausted.load(Ordering::Relaxed)
    }

    /// Drains the remaining body into one buffer.
    pub async fn bytes(&mut self) -> Result<Bytes, CouchError> {
        let mut out = BytesMut::new();
        while let Some(chunk) = self.next().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }
}

enum Advance {
    Terminal,
    Headers(HeaderMap),
}

/// Incremental decoder for one multipart body.
///
/// Parts come out strictly in wire order. Pulling the reader again while the
/// previously returned part is unconsumed first drains that part's remaining
/// bytes, so consumption is always forward-only and single-pass.
#[derive(Debug)]
pub struct MultipartReader {
    cursor: SharedCursor,
    boundary_line: Vec<u8>,
    boundary_end_line: Vec<u8>,
    delimiter: Vec<u8>,
    started: bool,
    eof: bool,
    exhausted: Option<Arc<AtomicBool>>,
    live: Option<Arc<AtomicBool>>,
}

impl MultipartReader {
    /// Creates a reader from a response's headers and body stream, taking
    /// the boundary from the `Content-Type` header.
    pub fn from_response(headers: &HeaderMap, body: BodyStream) -> Result<Self, CouchError> {
        let boundary = extract_boundary(content_type_value(headers)?)?;
        Ok(Self::from_parts(
            boundary,
            Arc::new(Mutex::new(Cursor::new(body))),
            None,
        ))
    }

    /// Creates a reader from an already extracted boundary token.
    pub fn new(boundary: impl Into<String>, body: BodyStream) -> Self {
        Self::from_parts(
            boundary.into(),
            Arc::new(Mutex::new(Cursor::new(body))),
            None,
        )
    }

    fn from_parts(
        boundary: String,
        cursor: SharedCursor,
        exhausted: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            cursor,
            boundary_line: format!("--{boundary}").into_bytes(),
            boundary_end_line: format!("--{boundary}--").into_bytes(),
            delimiter: format!("\r\n--{boundary}").into_bytes(),
            started: false,
            eof: false,
            exhausted,
            live: None,
        }
    }

    /// Pulls the next part, or `None` once the terminal boundary is consumed.
    pub async fn next(&mut self) -> Result<Option<Part>, CouchError> {
        if self.eof {
            return Ok(None);
        }

        let cursor = Arc::clone(&self.cursor);
        let mut cur = cursor.lock().await;
        let headers = match self.advance(&mut cur).await? {
            Advance::Terminal => {
                self.eof = true;
                if let Some(flag) = &self.exhausted {
                    flag.store(true, Ordering::Relaxed);
                }
                tracing::trace!("multipart reader reached terminal boundary");
                return Ok(None);
            }
            Advance::Headers(headers) => headers,
        };
        drop(cur);

        let flag = Arc::new(AtomicBool::new(false));
        let body = match self.sub_boundary(&headers)? {
            Some(sub_boundary) => PartBody::Multipart(Self::from_parts(
                sub_boundary,
                Arc::clone(&self.cursor),
                Some(Arc::clone(&flag)),
            )),
            None => PartBody::Raw(PartReader::new(
                Arc::clone(&self.cursor),
                self.delimiter.clone(),
                Arc::clone(&flag),
            )),
        };

        self.live = Some(flag);
        Ok(Some(Part { headers, body }))
    }

    /// True once the terminal boundary has been consumed.
    pub fn at_eof(&self) -> bool {
        self.eof
    }

    async fn advance(&mut self, cur: &mut Cursor) -> Result<Advance, CouchError> {
        if let Some(flag) = self.live.take() {
            if !flag.load(Ordering::Relaxed) {
                skip_to_delimiter(cur, &self.delimiter).await?;
            }
        }

        let Some(line) = read_line(cur).await? else {
            return Err(CouchError::IncompleteStream);
        };

        if line == self.boundary_end_line {
            return Ok(Advance::Terminal);
        }

        if line != self.boundary_line {
            let message = if self.started {
                "malformed multipart boundary"
            } else {
                "missing opening boundary"
            };
            return Err(DecodeError::new(message).into());
        }
        self.started = true;

        let mut lines = Vec::new();
        loop {
            let Some(line) = read_line(cur).await? else {
                return Err(CouchError::IncompleteStream);
            };
            if line.is_empty() {
                break;
            }
            lines.push(line);
        }

        Ok(Advance::Headers(parse_header_lines(&lines)?))
    }

    fn sub_boundary(&self, headers: &HeaderMap) -> Result<Option<String>, CouchError> {
        let Some(value) = headers.get(header::CONTENT_TYPE) else {
            return Ok(None);
        };
        let value = value
            .to_str()
            .map_err(|_| DecodeError::new("Content-Type header must be ASCII"))?;

        if !is_multipart(value) {
            return Ok(None);
        }

        Ok(Some(extract_boundary(value)?))
    }
}
