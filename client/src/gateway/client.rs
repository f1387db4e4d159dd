use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, StatusCode, header};
use serde::Serialize;
use serde_json::Value;
use shared::types::{Envelope, Payload};
use tracing::{debug, warn};

use super::multipart::Multipart;
use super::transport::Transport;
use crate::error::{ApiError, ApiResult};
use crate::session::Session;

/// Request body variants.
#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(Value),
    Multipart(Multipart),
}

/// Shared request executor. Cheap to clone; every clone reads the token
/// from the same [`Session`].
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    base_url: String,
    transport: Arc<dyn Transport>,
    session: Session,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>, session: Session) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            inner: Arc::new(ApiClientInner {
                base_url,
                transport,
                session,
            }),
        }
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Absolute URL for a stored relative asset path such as
    /// `/uploads/avatars/1.png`. Absolute URLs pass through unchanged.
    pub fn asset_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.inner.base_url, path)
        } else {
            format!("{}/{}", self.inner.base_url, path)
        }
    }

    // -----------------------------------------------------------------------
    // Verb helpers
    // -----------------------------------------------------------------------

    pub async fn get(&self, path: &str) -> ApiResult<Payload> {
        self.execute(Method::GET, path, Body::Empty).await
    }

    /// GET with a form-url-encoded query string. Empty values are dropped.
    pub async fn get_query(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Payload> {
        let path = with_query(path, query);
        self.execute(Method::GET, &path, Body::Empty).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ApiResult<Payload> {
        self.execute(Method::POST, path, json_body(body)?).await
    }

    pub async fn patch_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ApiResult<Payload> {
        self.execute(Method::PATCH, path, json_body(body)?).await
    }

    pub async fn post_empty(&self, path: &str) -> ApiResult<Payload> {
        self.execute(Method::POST, path, Body::Empty).await
    }

    pub async fn post_multipart(&self, path: &str, form: Multipart) -> ApiResult<Payload> {
        self.execute(Method::POST, path, Body::Multipart(form)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Payload> {
        self.execute(Method::DELETE, path, Body::Empty).await
    }

    // -----------------------------------------------------------------------
    // Core
    // -----------------------------------------------------------------------

    /// Send one request and normalize whatever comes back.
    pub async fn execute(&self, method: Method, path: &str, body: Body) -> ApiResult<Payload> {
        let request = self.build_request(method.clone(), path, body)?;

        debug!("{} {}", method, path);
        let response = self.inner.transport.send(request).await?;

        let result = normalize(response.status, &response.body);
        if let Err(e) = &result {
            warn!("{} {} failed: {}", method, path, e);
        }
        result
    }

    fn build_request(&self, method: Method, path: &str, body: Body) -> ApiResult<Request<Full<Bytes>>> {
        let uri = format!("{}{}", self.inner.base_url, path);
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::ACCEPT, "application/json");

        if let Some(token) = self.inner.session.token() {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let bytes = match body {
            Body::Empty => Bytes::new(),
            Body::Json(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Bytes::from(value.to_string())
            }
            Body::Multipart(form) => {
                builder = builder.header(header::CONTENT_TYPE, form.content_type());
                form.encode()
            }
        };

        builder
            .body(Full::new(bytes))
            .map_err(|e| ApiError::Validation(format!("invalid request for {}: {}", path, e)))
    }
}

fn json_body<T: Serialize + ?Sized>(body: &T) -> ApiResult<Body> {
    serde_json::to_value(body)
        .map(Body::Json)
        .map_err(|e| ApiError::Validation(format!("could not encode request: {}", e)))
}

fn with_query(path: &str, query: &[(&str, &str)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in query.iter().filter(|(_, v)| !v.is_empty()) {
        serializer.append_pair(key, value);
        any = true;
    }

    if any {
        format!("{}?{}", path, serializer.finish())
    } else {
        path.to_string()
    }
}

/// Fold a status and body into the success/failure shape every caller
/// branches on.
///
/// * body isn't JSON → [`ApiError::MalformedResponse`]
/// * `success: true` → payload
/// * `success: false` or a non-2xx status → [`ApiError::Rejected`] with the
///   backend's `error` or `message` text
/// * 2xx without `success` (schedule endpoints) → the body is the payload
pub fn normalize(status: StatusCode, body: &[u8]) -> ApiResult<Payload> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            debug!("Response with status {} is not JSON: {}", status, e);
            return Err(ApiError::MalformedResponse);
        }
    };

    if !value.is_object() {
        return if status.is_success() {
            Ok(Payload::from_value(value))
        } else {
            Err(ApiError::rejected(status, default_failure(status)))
        };
    }

    let envelope: Envelope =
        serde_json::from_value(value).map_err(|_| ApiError::MalformedResponse)?;
    let failure = envelope.failure_text();

    match envelope.success {
        Some(true) => Ok(Payload::new(envelope.payload)),
        Some(false) => Err(ApiError::rejected(
            status,
            failure.unwrap_or_else(|| default_failure(status)),
        )),
        None if status.is_success() && envelope.error.is_none() => {
            Ok(Payload::new(envelope.payload))
        }
        None => Err(ApiError::rejected(
            status,
            failure.unwrap_or_else(|| default_failure(status)),
        )),
    }
}

fn default_failure(status: StatusCode) -> String {
    match status {
        StatusCode::UNAUTHORIZED => "Authentication required".to_string(),
        StatusCode::FORBIDDEN => "Access denied".to_string(),
        StatusCode::NOT_FOUND => "Not found".to_string(),
        s if s.is_success() => "Request failed".to_string(),
        s => format!("Request failed with status {}", s.as_u16()),
    }
}
