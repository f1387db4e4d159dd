#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cafe_client::App;
use cafe_client::error::{ApiError, ApiResult};
use cafe_client::gateway::{RawResponse, Transport};
use cafe_client::storage::{MemoryStorage, Storage};
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode, header};
use serde_json::Value;
use shared::config::parse_config;
use shared::types::{AppConfig, Role, User};

pub const CONFIG: &str = r#"
[api]
base_url = "http://cafe.test"

[storage]
path = "unused.json"
token_key = "authToken"
user_key = "userData"

[admin]
primary_creator = "founder"
"#;

pub fn config() -> AppConfig {
    parse_config(CONFIG).unwrap()
}

/// One request as the transport saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<ApiResult<RawResponse>>>,
    requests: Mutex<Vec<Recorded>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, status: u16, body: Value) {
        self.responses.lock().unwrap().push_back(Ok(RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: Bytes::from(body.to_string()),
        }));
    }

    pub fn reply_raw(&self, status: u16, body: &'static [u8]) {
        self.responses.lock().unwrap().push_back(Ok(RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: Bytes::from_static(body),
        }));
    }

    /// Hold every answer back for `delay`, so callers overlap.
    pub fn delay_replies(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn fail(&self, error: ApiError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> Recorded {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: Request<Full<Bytes>>) -> ApiResult<RawResponse> {
        let (parts, body) = request.into_parts();
        let header_str = |name: header::HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let recorded = Recorded {
            method: parts.method.clone(),
            path: parts
                .uri
                .path_and_query()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
            authorization: header_str(header::AUTHORIZATION),
            content_type: header_str(header::CONTENT_TYPE),
            body: body.collect().await.unwrap().to_bytes(),
        };
        self.requests.lock().unwrap().push(recorded);

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no response queued".into())));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

pub fn app_with_storage(storage: Arc<dyn Storage>) -> (App, Arc<FakeTransport>) {
    let transport = FakeTransport::new();
    let app = App::with_parts(&config(), storage, transport.clone());
    (app, transport)
}

pub fn signed_out_app() -> (App, Arc<FakeTransport>) {
    app_with_storage(Arc::new(MemoryStorage::new()))
}

pub fn signed_in_app(id: &str, username: &str, role: Role) -> (App, Arc<FakeTransport>) {
    let (app, transport) = signed_out_app();
    app.session()
        .login(User::new(id, username, role), "tok123".into())
        .unwrap();
    (app, transport)
}

pub fn user_json(id: &str, username: &str, role: &str, reputation: i64) -> Value {
    serde_json::json!({
        "id": id,
        "username": username,
        "role": role,
        "reputation": reputation
    })
}
