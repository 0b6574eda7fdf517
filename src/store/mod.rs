//! Persistent key-value stores mapping request identities to responses.
//!
//! A provider owns a family of named stores; exactly one (named after the
//! current version tag) is written by the proxy, and activation deletes every
//! other one. Stores are created lazily on first write and entries are
//! upserted with last-write-wins semantics.

mod memory;
mod sqlite;
mod traits;

pub use memory::{MemoryStore, MemoryStoreProvider};
pub use sqlite::{SqliteStore, SqliteStoreProvider};
pub use traits::{CachedResponse, Store, StoreProvider};
