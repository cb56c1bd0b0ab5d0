//! `reqwest`-backed HTTP transport.

use std::time::Duration;

use async_trait::async_trait;
use olladeck_core::ports::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
use reqwest::{Client, Method};
use tracing::trace;

/// Connect timeout applied to every request; the per-request timeout from
/// [`HttpRequest`] bounds the whole exchange.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared-client transport. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }
}

const fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        trace!(method = %request.method, url = %request.url, "Sending request");
        let mut builder = self
            .client
            .request(method(request.method), &request.url)
            .timeout(request.timeout);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| classify(&e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| classify(&e))?;
        Ok(HttpResponse::new(status, body))
    }
}
