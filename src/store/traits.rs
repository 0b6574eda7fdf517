//! Store contracts the proxy depends on.

use chrono::{DateTime, Utc};
use color_eyre::Result;

use crate::request::RequestIdentity;
use crate::response::Response;

/// A stored response together with when it was written.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub response: Response,
  pub cached_at: DateTime<Utc>,
}

/// A single named store: identity -> most recently stored response.
///
/// Operations are atomic at identity-key granularity; concurrent writes to
/// the same identity resolve as last write wins.
pub trait Store: Send + Sync {
  /// Look up the response stored for an identity, if any.
  fn get(&self, identity: &RequestIdentity) -> Result<Option<CachedResponse>>;

  /// Insert or overwrite the response for an identity.
  fn put(&self, identity: &RequestIdentity, response: &Response) -> Result<()>;
}

/// A provider of named stores.
///
/// This is the whole contract the proxy has with persistence: open-by-name,
/// enumerate-names, delete-by-name, and get/put through the opened [`Store`].
pub trait StoreProvider: Send + Sync {
  type Store: Store;

  /// Open a store handle by name.
  ///
  /// Opening alone creates nothing; the store only starts existing (and
  /// appears in [`names`](Self::names)) once the first entry is written.
  fn open(&self, name: &str) -> Result<Self::Store>;

  /// Names of all stores that currently exist.
  fn names(&self) -> Result<Vec<String>>;

  /// Delete a store and all of its entries. Deleting a store that does not
  /// exist is a no-op.
  fn delete(&self, name: &str) -> Result<()>;
}
