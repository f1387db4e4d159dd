use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Status and fully-buffered body of a response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// One HTTP round trip. Implementations map every transport-level failure to
/// [`ApiError::Transport`] or [`ApiError::Timeout`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request<Full<Bytes>>) -> ApiResult<RawResponse>;
}

/// Plain-HTTP transport on the hyper legacy client.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl HyperTransport {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self { client, timeout }
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: Request<Full<Bytes>>) -> ApiResult<RawResponse> {
        let method = request.method().clone();
        let uri = request.uri().clone();

        let round_trip = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;

            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?
                .to_bytes();

            Ok::<_, ApiError>(RawResponse { status, body })
        };

        match tokio::time::timeout(self.timeout, round_trip).await {
            Ok(Ok(resp)) => {
                debug!("{} {} -> {} ({} bytes)", method, uri, resp.status, resp.body.len());
                Ok(resp)
            }
            Ok(Err(e)) => {
                warn!("{} {} failed: {}", method, uri, e);
                Err(e)
            }
            Err(_) => {
                warn!("{} {} timed out after {:?}", method, uri, self.timeout);
                Err(ApiError::Timeout)
            }
        }
    }
}
