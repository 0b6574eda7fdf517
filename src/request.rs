//! Request types, the eligibility filter and the cache identity.

use sha2::{Digest, Sha256};
use url::{Origin, Url};

/// HTTP method of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Delete,
  Patch,
  Options,
}

impl Method {
  /// Parse from the wire form, case-insensitively.
  pub fn parse(s: &str) -> Option<Self> {
    if s.eq_ignore_ascii_case("GET") {
      Some(Method::Get)
    } else if s.eq_ignore_ascii_case("HEAD") {
      Some(Method::Head)
    } else if s.eq_ignore_ascii_case("POST") {
      Some(Method::Post)
    } else if s.eq_ignore_ascii_case("PUT") {
      Some(Method::Put)
    } else if s.eq_ignore_ascii_case("DELETE") {
      Some(Method::Delete)
    } else if s.eq_ignore_ascii_case("PATCH") {
      Some(Method::Patch)
    } else if s.eq_ignore_ascii_case("OPTIONS") {
      Some(Method::Options)
    } else {
      None
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Head => "HEAD",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
      Method::Patch => "PATCH",
      Method::Options => "OPTIONS",
    }
  }
}

/// An intercepted outgoing request.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  /// Headers to forward on the network fetch, in order.
  pub headers: Vec<(String, String)>,
}

impl Request {
  /// Create a GET request for the given URL with no extra headers.
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::Get,
      url,
      headers: Vec::new(),
    }
  }

  /// Whether this request qualifies for proxying.
  ///
  /// Only GET requests over http/https whose origin matches the application's
  /// own origin are proxied. Everything else passes through untouched.
  pub fn is_eligible(&self, app_origin: &Origin) -> bool {
    if self.method != Method::Get {
      return false;
    }
    if !matches!(self.url.scheme(), "http" | "https") {
      return false;
    }
    self.url.origin() == *app_origin
  }

  /// The cache identity of this request.
  pub fn identity(&self) -> RequestIdentity {
    RequestIdentity {
      method: self.method,
      url: self.url.clone(),
    }
  }
}

/// The method + URL pair that addresses a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity {
  method: Method,
  url: Url,
}

impl RequestIdentity {
  pub fn new(method: Method, url: Url) -> Self {
    Self { method, url }
  }

  pub fn method(&self) -> Method {
    self.method
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  /// Stable, fixed-length storage key for this identity.
  ///
  /// SHA256 hex over "METHOD URL" so stores never deal with arbitrary-length
  /// or oddly-escaped URLs as primary keys.
  pub fn storage_key(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(self.url.as_str().as_bytes());
    hex::encode(hasher.finalize())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn origin_of(url: &str) -> Origin {
    Url::parse(url).unwrap().origin()
  }

  #[test]
  fn test_get_same_origin_is_eligible() {
    let req = Request::get(Url::parse("https://app.example/app.css").unwrap());
    assert!(req.is_eligible(&origin_of("https://app.example/")));
  }

  #[test]
  fn test_post_is_not_eligible() {
    let mut req = Request::get(Url::parse("https://app.example/api/data").unwrap());
    req.method = Method::Post;
    assert!(!req.is_eligible(&origin_of("https://app.example/")));
  }

  #[test]
  fn test_cross_origin_is_not_eligible() {
    let req = Request::get(Url::parse("https://cdn.example/lib.js").unwrap());
    assert!(!req.is_eligible(&origin_of("https://app.example/")));
  }

  #[test]
  fn test_non_http_scheme_is_not_eligible() {
    let req = Request::get(Url::parse("chrome-extension://abcdef/page.html").unwrap());
    assert!(!req.is_eligible(&origin_of("https://app.example/")));
    let req = Request::get(Url::parse("ftp://app.example/file").unwrap());
    assert!(!req.is_eligible(&origin_of("https://app.example/")));
  }

  #[test]
  fn test_storage_key_is_stable_and_distinct() {
    let a = Request::get(Url::parse("https://app.example/a").unwrap()).identity();
    let a2 = Request::get(Url::parse("https://app.example/a").unwrap()).identity();
    let b = Request::get(Url::parse("https://app.example/b").unwrap()).identity();

    assert_eq!(a.storage_key(), a2.storage_key());
    assert_ne!(a.storage_key(), b.storage_key());
    // fixed length hex
    assert_eq!(a.storage_key().len(), 64);
  }

  #[test]
  fn test_method_parse_is_case_insensitive() {
    assert_eq!(Method::parse("get"), Some(Method::Get));
    assert_eq!(Method::parse("Post"), Some(Method::Post));
    assert_eq!(Method::parse("BREW"), None);
  }
}
