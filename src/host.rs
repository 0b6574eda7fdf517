//! Host runtime interface: lifecycle signalling to whatever intercepts
//! requests and runs the proxy.

use async_trait::async_trait;
use color_eyre::Result;

/// The host's lifecycle-signalling surface.
///
/// The proxy never intercepts requests itself; the host does, and forwards
/// lifecycle and fetch events to the proxy. These two signals flow the other
/// way.
#[async_trait]
pub trait HostRuntime: Send + Sync {
  /// Ask the host to activate this proxy instance immediately instead of
  /// waiting for prior instances to drain.
  fn skip_waiting(&self);

  /// Take control of all open application instances right away, rather than
  /// waiting for them to reload.
  async fn claim_clients(&self) -> Result<()>;
}
