//! Response types and the cacheability predicate.

use serde::{Deserialize, Serialize};

/// How a response relates to the requesting application's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
  /// Same-origin response, body and headers fully visible.
  Basic,
  /// Cross-origin response; not persisted.
  Opaque,
}

/// A fetched or stored response: status line, headers and body bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
  pub status: u16,
  pub kind: ResponseKind,
  /// Response headers, in order.
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl Response {
  /// Whether this response qualifies for persisting.
  ///
  /// Only a same-origin 200 goes into the store; redirects, error statuses
  /// and opaque cross-origin responses are returned to the caller untouched
  /// but never written.
  pub fn is_cacheable(&self) -> bool {
    self.status == 200 && self.kind == ResponseKind::Basic
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn basic(status: u16) -> Response {
    Response {
      status,
      kind: ResponseKind::Basic,
      headers: vec![("content-type".into(), "text/css".into())],
      body: b"body { margin: 0 }".to_vec(),
    }
  }

  #[test]
  fn test_basic_200_is_cacheable() {
    assert!(basic(200).is_cacheable());
  }

  #[test]
  fn test_non_200_is_not_cacheable() {
    assert!(!basic(404).is_cacheable());
    assert!(!basic(301).is_cacheable());
    assert!(!basic(500).is_cacheable());
  }

  #[test]
  fn test_opaque_is_not_cacheable() {
    let mut resp = basic(200);
    resp.kind = ResponseKind::Opaque;
    assert!(!resp.is_cacheable());
  }
}
