//! The offline cache proxy: lifecycle handlers and the fetch policy.
//!
//! Network-first with cache fallback. Eligible requests hit the network;
//! fresh same-origin 200s are written to the current-version store by a
//! detached task, and when the network is unreachable the last stored
//! response for the request identity is served instead.

use color_eyre::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Origin;

use crate::config::ProxyConfig;
use crate::host::HostRuntime;
use crate::request::{Request, RequestIdentity};
use crate::response::Response;
use crate::store::{Store, StoreProvider};
use crate::transport::NetworkTransport;

/// What the proxy decided for one intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  /// Fresh response straight from the network.
  Fresh(Response),
  /// Network was unreachable; this is the last stored response.
  Cached(Response),
  /// Network was unreachable and nothing was ever stored for this identity.
  /// No synthetic error response is fabricated; the host maps this to its
  /// own failure mode.
  Unresolved,
  /// Ineligible request; the proxy did not observe or alter it.
  PassThrough,
}

impl FetchOutcome {
  /// The response to hand back to the caller, if the proxy produced one.
  pub fn response(&self) -> Option<&Response> {
    match self {
      FetchOutcome::Fresh(resp) | FetchOutcome::Cached(resp) => Some(resp),
      FetchOutcome::Unresolved | FetchOutcome::PassThrough => None,
    }
  }
}

/// The proxy component. Holds the configuration, the store provider and the
/// network transport; the host runtime forwards lifecycle and fetch events
/// into it.
pub struct OfflineCacheProxy<P: StoreProvider, T: NetworkTransport> {
  config: ProxyConfig,
  app_origin: Origin,
  provider: Arc<P>,
  transport: T,
}

impl<P, T> OfflineCacheProxy<P, T>
where
  P: StoreProvider + 'static,
  P::Store: 'static,
  T: NetworkTransport,
{
  pub fn new(config: ProxyConfig, provider: P, transport: T) -> Self {
    let app_origin = config.app_origin();
    Self {
      config,
      app_origin,
      provider: Arc::new(provider),
      transport,
    }
  }

  /// Install: request immediate activation. No store is touched here.
  pub fn on_install(&self, host: &impl HostRuntime) {
    info!(version = %self.config.version_tag, "installing");
    host.skip_waiting();
  }

  /// Activate: delete every store whose name differs from the current version
  /// tag, then claim all open application instances.
  ///
  /// The host must not treat the proxy as fully active until this returns.
  pub async fn on_activate(&self, host: &impl HostRuntime) -> Result<()> {
    for name in self.provider.names()? {
      if name != self.config.version_tag {
        info!(store = %name, "deleting stale store");
        self.provider.delete(&name)?;
      }
    }

    host.claim_clients().await?;

    info!(version = %self.config.version_tag, "active");
    Ok(())
  }

  /// Apply the fetch policy to one intercepted request.
  ///
  /// Only a store read error in the fallback path surfaces as `Err`; a
  /// network failure is recovered via the store, and a failure of the
  /// detached cache write never reaches the caller.
  pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome> {
    if !request.is_eligible(&self.app_origin) {
      return Ok(FetchOutcome::PassThrough);
    }

    match self.transport.fetch(request).await {
      Ok(response) => {
        if response.is_cacheable() {
          self.spawn_cache_write(request.identity(), response.clone());
        }
        Ok(FetchOutcome::Fresh(response))
      }
      Err(err) => {
        debug!(url = %request.url, %err, "network fetch failed, trying store");

        let store = self.provider.open(&self.config.version_tag)?;
        match store.get(&request.identity())? {
          Some(cached) => Ok(FetchOutcome::Cached(cached.response)),
          None => Ok(FetchOutcome::Unresolved),
        }
      }
    }
  }

  /// Upsert the response into the current-version store without holding up
  /// the fetch path. Fire-and-forget: a failure is logged and dropped, never
  /// retried.
  fn spawn_cache_write(&self, identity: RequestIdentity, response: Response) {
    let provider = Arc::clone(&self.provider);
    let store_name = self.config.version_tag.clone();

    tokio::spawn(async move {
      let result = provider
        .open(&store_name)
        .and_then(|store| store.put(&identity, &response));

      if let Err(err) = result {
        warn!(%err, "cache write failed");
      }
    });
  }
}
