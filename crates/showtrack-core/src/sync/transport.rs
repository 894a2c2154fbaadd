//! Transport layer abstraction for sync operations.
//!
//! Every call the engine makes to the sync server is one [`ApiRequest`]
//! variant. A [`SyncTransport`] turns it into an [`ApiResponse`], or a
//! [`TransportError`] when the server could not be reached at all. HTTP
//! status handling is left to the caller, so a non-2xx answer is still an
//! `Ok` response here.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Header carrying the device id on every request
pub const DEVICE_ID_HEADER: &str = "X-DEVICE-ID";

/// Errors raised before a response is received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server URL couldn't be parsed or extended
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client couldn't be built
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Connection, timeout or body read failure
    #[error("request failed: {0}")]
    Request(String),
}

/// A request to the sync server
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    /// `POST /documents`
    PushDocument { device_id: String, document: Value },
    /// `DELETE /documents/{id}`
    DeleteDocument { device_id: String, id: String },
    /// `GET /documents/all`
    AllDocuments { device_id: String },
    /// `GET /documents/pending`
    PendingDocuments { device_id: String },
    /// `DELETE /documents/{id}/pending`
    ClearPending { device_id: String, id: String },
    /// `PUT /devices/{name}`
    RegisterDevice { device_id: String, name: String },
    /// `DELETE /devices/{id}`
    UnregisterDevice { device_id: String },
}

impl ApiRequest {
    pub fn method(&self) -> Method {
        match self {
            ApiRequest::PushDocument { .. } => Method::POST,
            ApiRequest::AllDocuments { .. } | ApiRequest::PendingDocuments { .. } => Method::GET,
            ApiRequest::RegisterDevice { .. } => Method::PUT,
            ApiRequest::DeleteDocument { .. }
            | ApiRequest::ClearPending { .. }
            | ApiRequest::UnregisterDevice { .. } => Method::DELETE,
        }
    }

    /// Unencoded path segments below the server base URL
    pub fn path_segments(&self) -> Vec<&str> {
        match self {
            ApiRequest::PushDocument { .. } => vec!["documents"],
            ApiRequest::DeleteDocument { id, .. } => vec!["documents", id.as_str()],
            ApiRequest::AllDocuments { .. } => vec!["documents", "all"],
            ApiRequest::PendingDocuments { .. } => vec!["documents", "pending"],
            ApiRequest::ClearPending { id, .. } => vec!["documents", id.as_str(), "pending"],
            ApiRequest::RegisterDevice { name, .. } => vec!["devices", name.as_str()],
            ApiRequest::UnregisterDevice { device_id } => vec!["devices", device_id.as_str()],
        }
    }

    /// Path for logging and display
    pub fn path(&self) -> String {
        format!("/{}", self.path_segments().join("/"))
    }

    /// Value sent in the `X-DEVICE-ID` header
    pub fn device_id(&self) -> &str {
        match self {
            ApiRequest::PushDocument { device_id, .. }
            | ApiRequest::DeleteDocument { device_id, .. }
            | ApiRequest::AllDocuments { device_id }
            | ApiRequest::PendingDocuments { device_id }
            | ApiRequest::ClearPending { device_id, .. }
            | ApiRequest::RegisterDevice { device_id, .. }
            | ApiRequest::UnregisterDevice { device_id } => device_id,
        }
    }

    /// JSON body, for requests that carry one
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiRequest::PushDocument { document, .. } => Some(document),
            _ => None,
        }
    }
}

/// What the server answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    /// Content digest from the `Etag` header, as sent (possibly quoted)
    pub etag: Option<String>,
    /// `Location` header, used by device registration
    pub location: Option<String>,
    pub body: String,
}

impl ApiResponse {
    /// Empty response with the given status and its canonical reason phrase
    pub fn with_status(status: u16) -> Self {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self {
            status,
            status_text,
            etag: None,
            location: None,
            body: String::new(),
        }
    }

    /// Empty `200 OK`
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `"404 (Not Found)"`
    pub fn status_line(&self) -> String {
        format!("{} ({})", self.status, self.status_text)
    }
}

/// A sync transport handles network communication with the sync server.
///
/// This trait abstracts the network layer so the engines can run against
/// the reqwest-backed `HttpTransport` or a `MockTransport` in tests.
#[async_trait(?Send)]
pub trait SyncTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync>;

/// A scripted transport for testing.
///
/// Answers every request with the handler's result and records the
/// request. Each call yields to the runtime once before answering, so
/// requests issued together really are in flight together.
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// Creates a mock answering with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock answering `200 OK` to everything.
    pub fn ok() -> Self {
        Self::new(|_| Ok(ApiResponse::ok()))
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait(?Send)]
impl SyncTransport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        tokio::task::yield_now().await;
        (self.handler)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_routes() {
        let device_id = "dev-1".to_string();
        let cases = vec![
            (
                ApiRequest::PushDocument {
                    device_id: device_id.clone(),
                    document: serde_json::json!({}),
                },
                Method::POST,
                "/documents",
            ),
            (
                ApiRequest::DeleteDocument {
                    device_id: device_id.clone(),
                    id: "7".into(),
                },
                Method::DELETE,
                "/documents/7",
            ),
            (
                ApiRequest::AllDocuments {
                    device_id: device_id.clone(),
                },
                Method::GET,
                "/documents/all",
            ),
            (
                ApiRequest::PendingDocuments {
                    device_id: device_id.clone(),
                },
                Method::GET,
                "/documents/pending",
            ),
            (
                ApiRequest::ClearPending {
                    device_id: device_id.clone(),
                    id: "7".into(),
                },
                Method::DELETE,
                "/documents/7/pending",
            ),
            (
                ApiRequest::RegisterDevice {
                    device_id: device_id.clone(),
                    name: "laptop".into(),
                },
                Method::PUT,
                "/devices/laptop",
            ),
            (
                ApiRequest::UnregisterDevice {
                    device_id: device_id.clone(),
                },
                Method::DELETE,
                "/devices/dev-1",
            ),
        ];

        for (request, method, path) in cases {
            assert_eq!(request.method(), method);
            assert_eq!(request.path(), path);
            assert_eq!(request.device_id(), "dev-1");
        }
    }

    #[test]
    fn only_push_has_body() {
        let push = ApiRequest::PushDocument {
            device_id: String::new(),
            document: serde_json::json!({ "id": "1" }),
        };
        let pull = ApiRequest::AllDocuments {
            device_id: String::new(),
        };
        assert!(push.body().is_some());
        assert!(pull.body().is_none());
    }

    #[test]
    fn response_status_line() {
        let response = ApiResponse::with_status(404);
        assert!(!response.is_success());
        assert_eq!(response.status_line(), "404 (Not Found)");
        assert!(ApiResponse::ok().is_success());
        assert!(ApiResponse::with_status(204).is_success());
    }

    #[tokio::test]
    async fn mock_transport_records_requests() {
        let transport = MockTransport::new(|request| match request {
            ApiRequest::AllDocuments { .. } => Ok(ApiResponse::ok().body("[]")),
            _ => Err(TransportError::Request("offline".into())),
        });

        let ok = transport
            .send(&ApiRequest::AllDocuments {
                device_id: "d".into(),
            })
            .await
            .unwrap();
        assert_eq!(ok.body, "[]");

        let err = transport
            .send(&ApiRequest::UnregisterDevice {
                device_id: "d".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Request("offline".into()));
        assert_eq!(transport.request_count(), 2);
    }
}
