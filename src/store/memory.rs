//! In-memory store provider.
//!
//! Same lazy-creation and last-write-wins semantics as the SQLite provider,
//! without persistence. Used by tests and by embedders that only want the
//! fetch policy.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::request::RequestIdentity;
use crate::response::Response;

use super::traits::{CachedResponse, Store, StoreProvider};

type Stores = HashMap<String, HashMap<String, CachedResponse>>;

/// Store provider keeping all named stores in a process-local map.
#[derive(Default, Clone)]
pub struct MemoryStoreProvider {
  stores: Arc<Mutex<Stores>>,
}

/// Handle to one named store inside the provider's map.
pub struct MemoryStore {
  stores: Arc<Mutex<Stores>>,
  name: String,
}

impl MemoryStoreProvider {
  pub fn new() -> Self {
    Self::default()
  }
}

impl StoreProvider for MemoryStoreProvider {
  type Store = MemoryStore;

  fn open(&self, name: &str) -> Result<MemoryStore> {
    Ok(MemoryStore {
      stores: Arc::clone(&self.stores),
      name: name.to_string(),
    })
  }

  fn names(&self) -> Result<Vec<String>> {
    let stores = self
      .stores
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut names: Vec<String> = stores.keys().cloned().collect();
    names.sort();
    Ok(names)
  }

  fn delete(&self, name: &str) -> Result<()> {
    let mut stores = self
      .stores
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    stores.remove(name);
    Ok(())
  }
}

impl Store for MemoryStore {
  fn get(&self, identity: &RequestIdentity) -> Result<Option<CachedResponse>> {
    let stores = self
      .stores
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(
      stores
        .get(&self.name)
        .and_then(|entries| entries.get(&identity.storage_key()))
        .cloned(),
    )
  }

  fn put(&self, identity: &RequestIdentity, response: &Response) -> Result<()> {
    let mut stores = self
      .stores
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    // Lazily create the store on first write
    stores.entry(self.name.clone()).or_default().insert(
      identity.storage_key(),
      CachedResponse {
        response: response.clone(),
        cached_at: Utc::now(),
      },
    );

    Ok(())
  }
}
