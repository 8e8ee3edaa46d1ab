#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use couchstream::{CouchError, HttpClient, HttpRequest, HttpResponse};

/// One request as seen by the mock transport.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: Vec<String>,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

struct CannedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

/// Canned HTTP transport: answers from a queue and records every request.
///
/// When the queue is empty it answers `200` with an empty JSON object, so
/// tests only queue the responses they care about.
#[derive(Default)]
pub struct MockClient {
    responses: Mutex<VecDeque<CannedResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, status: u16, headers: &[(&str, &str)], body: &[u8]) {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                name.parse::<HeaderName>().expect("valid header name"),
                HeaderValue::from_str(value).expect("valid header value"),
            );
        }

        self.responses
            .lock()
            .expect("responses lock")
            .push_back(CannedResponse {
                status: StatusCode::from_u16(status).expect("valid status code"),
                headers: map,
                body: Bytes::copy_from_slice(body),
            });
    }

    pub fn push_json(&self, status: u16, body: &str) {
        self.push(
            status,
            &[("content-type", "application/json")],
            body.as_bytes(),
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests()
            .last()
            .cloned()
            .expect("at least one request was issued")
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, CouchError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(RecordedRequest {
                method: request.method.clone(),
                path: request.path.clone(),
                query: request.query.clone(),
                headers: request.headers.clone(),
                body: request.body.clone(),
            });

        let canned = self.responses.lock().expect("responses lock").pop_front();
        Ok(match canned {
            Some(canned) => HttpResponse::from_bytes(canned.status, canned.headers, canned.body),
            None => {
                let mut headers = HeaderMap::new();
                headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                HttpResponse::from_bytes(StatusCode::OK, headers, Bytes::from_static(b"{}"))
            }
        })
    }
}
