//! Network-first fetch proxy with persistent offline cache fallback.
//!
//! The proxy sits between an application and the network. Eligible requests
//! (GET, http/https, same origin) are fetched from the network first; fresh
//! same-origin 200 responses are persisted into a single version-tagged store,
//! and when the network is unreachable the last stored response is served
//! instead. Activating a new version deletes every store carrying a stale tag.
//!
//! The component boundary is three lifecycle operations on
//! [`OfflineCacheProxy`]: [`on_install`](proxy::OfflineCacheProxy::on_install),
//! [`on_activate`](proxy::OfflineCacheProxy::on_activate) and
//! [`handle_fetch`](proxy::OfflineCacheProxy::handle_fetch). The host runtime
//! that intercepts requests, the network transport and the persistent store
//! are all external collaborators behind traits.

pub mod config;
pub mod host;
pub mod proxy;
pub mod request;
pub mod response;
pub mod store;
pub mod transport;

pub use config::ProxyConfig;
pub use host::HostRuntime;
pub use proxy::{FetchOutcome, OfflineCacheProxy};
pub use request::{Method, Request, RequestIdentity};
pub use response::{Response, ResponseKind};
pub use store::{MemoryStoreProvider, SqliteStoreProvider, Store, StoreProvider};
pub use transport::{HttpTransport, NetworkTransport, TransportError};
