//! Network transport: the external collaborator that performs real fetches.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use thiserror::Error;

use crate::request::Request;
use crate::response::{Response, ResponseKind};

/// Any transport failure, treated uniformly as "network unreachable".
///
/// Offline, DNS failure, connection refused and timeouts all land here; the
/// fetch policy does not distinguish between them.
#[derive(Debug, Error)]
#[error("network unreachable: {reason}")]
pub struct TransportError {
  reason: String,
}

impl TransportError {
  pub fn new(reason: impl Into<String>) -> Self {
    Self {
      reason: reason.into(),
    }
  }
}

impl From<reqwest::Error> for TransportError {
  fn from(err: reqwest::Error) -> Self {
    Self::new(err.to_string())
  }
}

/// Performs the actual HTTP fetch for an eligible request.
#[async_trait]
pub trait NetworkTransport: Send + Sync {
  /// Fetch the request over the network.
  ///
  /// A returned response may have any status or kind; the policy decides what
  /// to persist. An `Err` means the network was unreachable.
  async fn fetch(&self, request: &Request) -> std::result::Result<Response, TransportError>;
}

/// HTTP transport backed by reqwest.
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl NetworkTransport for HttpTransport {
  async fn fetch(&self, request: &Request) -> std::result::Result<Response, TransportError> {
    let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
      .map_err(|e| TransportError::new(e.to_string()))?;

    let mut builder = self.client.request(method, request.url.clone());
    for (name, value) in &request.headers {
      builder = builder.header(name, value);
    }

    let resp = builder.send().await?;

    let status = resp.status().as_u16();
    // Same origin after redirects -> fully visible; anything else is opaque
    let kind = if resp.url().origin() == request.url.origin() {
      ResponseKind::Basic
    } else {
      ResponseKind::Opaque
    };

    let headers = resp
      .headers()
      .iter()
      .map(|(name, value)| {
        (
          name.as_str().to_string(),
          String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
      })
      .collect();

    let body = resp.bytes().await?.to_vec();

    Ok(Response {
      status,
      kind,
      headers,
      body,
    })
  }
}
