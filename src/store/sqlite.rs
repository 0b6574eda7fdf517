//! SQLite-backed store provider.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::ProxyConfig;
use crate::request::RequestIdentity;
use crate::response::{Response, ResponseKind};

use super::traits::{CachedResponse, Store, StoreProvider};

/// Store provider keeping all named stores in a single SQLite database.
///
/// A store is a row in `stores` plus its entries; it comes into existence on
/// the first `put` and disappears wholesale on `delete`.
pub struct SqliteStoreProvider {
  conn: Arc<Mutex<Connection>>,
}

/// Handle to one named store inside the provider's database.
pub struct SqliteStore {
  conn: Arc<Mutex<Connection>>,
  name: String,
}

impl SqliteStoreProvider {
  /// Open (or create) the provider database at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open the provider database where the configuration points, falling back
  /// to the default location when `store_path` is unset.
  pub fn from_config(config: &ProxyConfig) -> Result<Self> {
    match &config.store_path {
      Some(path) => Self::open_at(path),
      None => Self::open(),
    }
  }

  /// Open (or create) the provider database at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create store directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open store database at {}: {}", path.display(), e))?;

    let provider = Self {
      conn: Arc::new(Mutex::new(conn)),
    };
    provider.run_migrations()?;

    Ok(provider)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("cachefall").join("stores.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run store migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for store tables.
const STORE_SCHEMA: &str = r#"
-- Named stores; a row exists only once the store holds at least one entry
CREATE TABLE IF NOT EXISTS stores (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Response entries, keyed per store by request identity
CREATE TABLE IF NOT EXISTS entries (
    store_name TEXT NOT NULL,
    identity_key TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    kind TEXT NOT NULL,
    headers BLOB NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (store_name, identity_key)
);

CREATE INDEX IF NOT EXISTS idx_entries_store ON entries(store_name);
"#;

impl StoreProvider for SqliteStoreProvider {
  type Store = SqliteStore;

  fn open(&self, name: &str) -> Result<SqliteStore> {
    Ok(SqliteStore {
      conn: Arc::clone(&self.conn),
      name: name.to_string(),
    })
  }

  fn names(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM stores ORDER BY name")
      .map_err(|e| eyre!("Failed to prepare store listing: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list stores: {}", e))?
      .collect::<std::result::Result<Vec<String>, _>>()
      .map_err(|e| eyre!("Failed to read store name: {}", e))?;

    Ok(names)
  }

  fn delete(&self, name: &str) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    // Scoped transaction: rolls back on drop if anything below fails, so the
    // shared connection never stays inside an open transaction
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute("DELETE FROM entries WHERE store_name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete store entries: {}", e))?;

    tx.execute("DELETE FROM stores WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete store: {}", e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }
}

impl Store for SqliteStore {
  fn get(&self, identity: &RequestIdentity) -> Result<Option<CachedResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT status, kind, headers, body, cached_at FROM entries
         WHERE store_name = ? AND identity_key = ?",
      )
      .map_err(|e| eyre!("Failed to prepare entry lookup: {}", e))?;

    let row: Option<(u16, String, Vec<u8>, Vec<u8>, String)> = stmt
      .query_row(params![self.name, identity.storage_key()], |row| {
        Ok((
          row.get(0)?,
          row.get(1)?,
          row.get(2)?,
          row.get(3)?,
          row.get(4)?,
        ))
      })
      .optional()
      .map_err(|e| eyre!("Failed to read entry: {}", e))?;

    let (status, kind, headers, body, cached_at_str) = match row {
      Some(row) => row,
      None => return Ok(None),
    };

    let headers: Vec<(String, String)> = serde_json::from_slice(&headers)
      .map_err(|e| eyre!("Failed to deserialize entry headers: {}", e))?;

    Ok(Some(CachedResponse {
      response: Response {
        status,
        kind: kind_from_str(&kind)?,
        headers,
        body,
      },
      cached_at: parse_datetime(&cached_at_str)?,
    }))
  }

  fn put(&self, identity: &RequestIdentity, response: &Response) -> Result<()> {
    let headers = serde_json::to_vec(&response.headers)
      .map_err(|e| eyre!("Failed to serialize entry headers: {}", e))?;

    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    // Rolls back on drop if either insert fails
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    // Lazily register the store on first write
    tx.execute(
      "INSERT OR IGNORE INTO stores (name) VALUES (?)",
      params![self.name],
    )
    .map_err(|e| eyre!("Failed to register store: {}", e))?;

    tx.execute(
      "INSERT OR REPLACE INTO entries
         (store_name, identity_key, method, url, status, kind, headers, body, cached_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))",
      params![
        self.name,
        identity.storage_key(),
        identity.method().as_str(),
        identity.url().as_str(),
        response.status,
        kind_to_str(response.kind),
        headers,
        response.body,
      ],
    )
    .map_err(|e| eyre!("Failed to store entry: {}", e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }
}

fn kind_to_str(kind: ResponseKind) -> &'static str {
  match kind {
    ResponseKind::Basic => "basic",
    ResponseKind::Opaque => "opaque",
  }
}

fn kind_from_str(s: &str) -> Result<ResponseKind> {
  match s {
    "basic" => Ok(ResponseKind::Basic),
    "opaque" => Ok(ResponseKind::Opaque),
    other => Err(eyre!("Unknown response kind in store: {}", other)),
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::request::Request;
  use url::Url;

  fn provider() -> (tempfile::TempDir, SqliteStoreProvider) {
    let dir = tempfile::tempdir().unwrap();
    let provider = SqliteStoreProvider::open_at(&dir.path().join("stores.db")).unwrap();
    (dir, provider)
  }

  fn identity(path: &str) -> RequestIdentity {
    Request::get(Url::parse(&format!("https://app.example{}", path)).unwrap()).identity()
  }

  fn response(body: &str) -> Response {
    Response {
      status: 200,
      kind: ResponseKind::Basic,
      headers: vec![("content-type".into(), "text/css".into())],
      body: body.as_bytes().to_vec(),
    }
  }

  #[test]
  fn test_store_does_not_exist_until_first_write() {
    let (_dir, provider) = provider();

    let store = provider.open("v1").unwrap();
    assert!(provider.names().unwrap().is_empty());

    store.put(&identity("/app.css"), &response("a")).unwrap();
    assert_eq!(provider.names().unwrap(), vec!["v1".to_string()]);
  }

  #[test]
  fn test_put_then_get_round_trips() {
    let (_dir, provider) = provider();
    let store = provider.open("v1").unwrap();
    let id = identity("/app.css");
    let resp = response("body { margin: 0 }");

    store.put(&id, &resp).unwrap();

    let cached = store.get(&id).unwrap().unwrap();
    assert_eq!(cached.response, resp);
  }

  #[test]
  fn test_put_overwrites_by_identity() {
    let (_dir, provider) = provider();
    let store = provider.open("v1").unwrap();
    let id = identity("/app.css");

    store.put(&id, &response("old")).unwrap();
    store.put(&id, &response("new")).unwrap();

    let cached = store.get(&id).unwrap().unwrap();
    assert_eq!(cached.response.body, b"new".to_vec());
  }

  #[test]
  fn test_get_missing_entry_is_none() {
    let (_dir, provider) = provider();
    let store = provider.open("v1").unwrap();
    assert!(store.get(&identity("/missing")).unwrap().is_none());
  }

  #[test]
  fn test_delete_removes_store_and_entries() {
    let (_dir, provider) = provider();
    let v1 = provider.open("v1").unwrap();
    let v2 = provider.open("v2").unwrap();
    v1.put(&identity("/a"), &response("a")).unwrap();
    v2.put(&identity("/a"), &response("a")).unwrap();

    provider.delete("v1").unwrap();

    assert_eq!(provider.names().unwrap(), vec!["v2".to_string()]);
    assert!(v1.get(&identity("/a")).unwrap().is_none());
    assert!(v2.get(&identity("/a")).unwrap().is_some());
  }

  #[test]
  fn test_delete_missing_store_is_noop() {
    let (_dir, provider) = provider();
    provider.delete("nope").unwrap();
  }

  #[test]
  fn test_from_config_honors_store_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom").join("stores.db");

    let mut config = ProxyConfig::new("v1", Url::parse("https://app.example").unwrap());
    config.store_path = Some(path.clone());

    let provider = SqliteStoreProvider::from_config(&config).unwrap();
    provider
      .open("v1")
      .unwrap()
      .put(&identity("/a"), &response("a"))
      .unwrap();

    assert!(path.exists());
  }

  #[test]
  fn test_failed_write_rolls_back_and_connection_stays_usable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stores.db");
    let provider = SqliteStoreProvider::open_at(&path).unwrap();
    let store = provider.open("v1").unwrap();
    store.put(&identity("/a"), &response("a")).unwrap();

    // A second connection holding the write lock makes the next put fail
    // mid-transaction
    let blocker = Connection::open(&path).unwrap();
    blocker.execute_batch("BEGIN IMMEDIATE").unwrap();
    assert!(store.put(&identity("/b"), &response("b")).is_err());
    blocker.execute_batch("COMMIT").unwrap();

    // The failed write must not leave an open transaction behind
    store.put(&identity("/b"), &response("b")).unwrap();
    assert!(store.get(&identity("/b")).unwrap().is_some());
  }

  #[test]
  fn test_stores_are_isolated_by_name() {
    let (_dir, provider) = provider();
    let v1 = provider.open("v1").unwrap();
    let v2 = provider.open("v2").unwrap();
    let id = identity("/app.css");

    v1.put(&id, &response("one")).unwrap();

    assert!(v2.get(&id).unwrap().is_none());
  }
}
