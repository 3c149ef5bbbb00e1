use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Nominal capacity reported by [`Namespace::usage`]
pub const STORAGE_LIMIT_BYTES: u64 = 5 * 1024 * 1024;

/// Key-value store with optional expiry, backed by SQLite
pub struct KvStore {
    conn: Connection,
}

/// Bytes used by a namespace against [`STORAGE_LIMIT_BYTES`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageUsage {
    pub used: u64,
    pub total: u64,
    pub percentage: u32,
}

impl KvStore {
    /// Open or create a store at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                expires INTEGER
            );
        "#,
        )?;
        Ok(())
    }

    /// A view of every key starting with `prefix`
    pub fn namespace(&self, prefix: impl Into<String>) -> Namespace<'_> {
        Namespace {
            store: self,
            prefix: prefix.into(),
        }
    }

    fn put_raw(&self, key: &str, value: &str, expires: Option<i64>) -> Result<()> {
        self.conn.execute(
            r#"INSERT INTO kv (key, value, timestamp, expires)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   timestamp = excluded.timestamp,
                   expires = excluded.expires"#,
            (key, value, Utc::now().timestamp_millis(), expires),
        )?;
        Ok(())
    }

    fn get_raw(&self, key: &str) -> Result<Option<(String, Option<i64>)>> {
        let row = self
            .conn
            .query_row(
                "SELECT value, expires FROM kv WHERE key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    fn delete_raw(&self, key: &str) -> Result<bool> {
        let n = self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(n > 0)
    }

    /// (key, value, expires) for every row under `prefix`, ordered by key
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String, Option<i64>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value, expires FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let rows = stmt
            .query_map([prefix], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Keys of one prefix, e.g. `navdir_prefs_theme`
pub struct Namespace<'a> {
    store: &'a KvStore,
    prefix: String,
}

fn is_expired(expires: Option<i64>, now: i64) -> bool {
    matches!(expires, Some(at) if now > at)
}

impl<'a> Namespace<'a> {
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Store `value` without expiry
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.write(key, value, None)
    }

    /// Store `value`, expiring `ttl` from now
    pub fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let expires = Utc::now().timestamp_millis() + ttl.num_milliseconds();
        self.write(key, value, Some(expires))
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T, expires: Option<i64>) -> Result<()> {
        let json = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize value for key: {key}"))?;
        self.store.put_raw(&self.full_key(key), &json, expires)
    }

    /// Read a value. Expired entries are deleted and read as absent;
    /// entries that fail to parse as `T` are also absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full = self.full_key(key);
        let Some((raw, expires)) = self.store.get_raw(&full)? else {
            return Ok(None);
        };
        if is_expired(expires, Utc::now().timestamp_millis()) {
            self.store.delete_raw(&full)?;
            return Ok(None);
        }
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = %full, "Ignoring unreadable stored value: {}", e);
                Ok(None)
            }
        }
    }

    /// Read a value or fall back to `default`
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        self.store.delete_raw(&self.full_key(key))
    }

    /// Keys in this namespace with the prefix stripped
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .scan_prefix(&self.prefix)?
            .into_iter()
            .map(|(key, _, _)| key[self.prefix.len()..].to_string())
            .collect())
    }

    /// Delete every key in this namespace, returning how many were removed
    pub fn clear(&self) -> Result<usize> {
        let keys = self.keys()?;
        for key in &keys {
            self.remove(key)?;
        }
        Ok(keys.len())
    }

    /// Bytes of stored JSON in this namespace
    pub fn size(&self) -> Result<u64> {
        Ok(self
            .store
            .scan_prefix(&self.prefix)?
            .iter()
            .map(|(_, value, _)| value.len() as u64)
            .sum())
    }

    pub fn usage(&self) -> Result<StorageUsage> {
        let used = self.size()?;
        Ok(StorageUsage {
            used,
            total: STORAGE_LIMIT_BYTES,
            percentage: ((used as f64 / STORAGE_LIMIT_BYTES as f64) * 100.0).round() as u32,
        })
    }

    /// Remove expired and unparsable entries; returns the count removed
    pub fn cleanup(&self) -> Result<usize> {
        let now = Utc::now().timestamp_millis();
        let mut removed = 0;
        for (key, value, expires) in self.store.scan_prefix(&self.prefix)? {
            let unreadable = serde_json::from_str::<serde_json::Value>(&value).is_err();
            if unreadable || is_expired(expires, now) {
                self.store.delete_raw(&key)?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(prefix = %self.prefix, removed, "Cleaned up storage");
        }
        Ok(removed)
    }

    /// Every live value, keyed without the prefix
    pub fn export(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        let mut out = BTreeMap::new();
        for key in self.keys()? {
            if let Some(value) = self.get::<serde_json::Value>(&key)? {
                out.insert(key, value);
            }
        }
        Ok(out)
    }

    /// Write every entry of `data`, without expiry
    pub fn import(&self, data: &BTreeMap<String, serde_json::Value>) -> Result<usize> {
        for (key, value) in data {
            self.set(key, value)?;
        }
        Ok(data.len())
    }
}

/// Human-readable byte count, e.g. "1.50 KB"
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_set_get_roundtrip_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let store = KvStore::open(&path).unwrap();
            store.namespace("p_").set("theme", "dark").unwrap();
        }
        let store = KvStore::open(&path).unwrap();
        let theme: Option<String> = store.namespace("p_").get("theme").unwrap();
        assert_eq!(theme.as_deref(), Some("dark"));
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let store = KvStore::open_in_memory().unwrap();
        let a = store.namespace("a_");
        let b = store.namespace("b_");
        a.set("key", &1).unwrap();
        b.set("key", &2).unwrap();
        assert_eq!(a.get::<i32>("key").unwrap(), Some(1));
        assert_eq!(b.get::<i32>("key").unwrap(), Some(2));

        assert_eq!(a.clear().unwrap(), 1);
        assert!(a.get::<i32>("key").unwrap().is_none());
        assert_eq!(b.get::<i32>("key").unwrap(), Some(2));
    }

    #[test]
    fn test_expired_value_is_removed_on_read() {
        let store = KvStore::open_in_memory().unwrap();
        let ns = store.namespace("p_");
        ns.set_with_ttl("old", "x", Duration::milliseconds(-10)).unwrap();
        assert!(store.get_raw("p_old").unwrap().is_some());
        assert!(ns.get::<String>("old").unwrap().is_none());
        assert!(store.get_raw("p_old").unwrap().is_none());

        ns.set_with_ttl("fresh", "y", Duration::days(7)).unwrap();
        assert_eq!(ns.get::<String>("fresh").unwrap().as_deref(), Some("y"));
    }

    #[test]
    fn test_get_or_default_and_type_mismatch() {
        let store = KvStore::open_in_memory().unwrap();
        let ns = store.namespace("p_");
        assert_eq!(ns.get_or("missing", 20usize).unwrap(), 20);
        ns.set("count", "not a number").unwrap();
        assert_eq!(ns.get_or("count", 5usize).unwrap(), 5);
    }

    #[test]
    fn test_cleanup_removes_expired_and_malformed() {
        let store = KvStore::open_in_memory().unwrap();
        let ns = store.namespace("p_");
        ns.set("keep", &true).unwrap();
        ns.set_with_ttl("gone", &true, Duration::milliseconds(-1)).unwrap();
        store.put_raw("p_broken", "{not json", None).unwrap();

        assert_eq!(ns.cleanup().unwrap(), 2);
        assert_eq!(ns.keys().unwrap(), vec!["keep"]);
    }

    #[test]
    fn test_keys_size_and_usage() {
        let store = KvStore::open_in_memory().unwrap();
        let ns = store.namespace("p_");
        ns.set("b", "xy").unwrap();
        ns.set("a", &1).unwrap();
        store.namespace("q_").set("c", &1).unwrap();

        assert_eq!(ns.keys().unwrap(), vec!["a", "b"]);
        // "1" plus "\"xy\""
        assert_eq!(ns.size().unwrap(), 5);
        let usage = ns.usage().unwrap();
        assert_eq!(usage.used, 5);
        assert_eq!(usage.total, STORAGE_LIMIT_BYTES);
        assert_eq!(usage.percentage, 0);
        assert_eq!(store.namespace("q_").keys().unwrap(), vec!["c"]);
    }

    #[test]
    fn test_prefix_with_like_wildcards() {
        let store = KvStore::open_in_memory().unwrap();
        store.namespace("navdir_prefs_").set("theme", "dark").unwrap();
        store.namespace("navdirXprefsX").set("theme", "light").unwrap();
        assert_eq!(store.namespace("navdir_prefs_").keys().unwrap().len(), 1);
    }

    #[test]
    fn test_export_import() {
        let store = KvStore::open_in_memory().unwrap();
        let ns = store.namespace("p_");
        ns.set("theme", "dark").unwrap();
        ns.set("favorites", &vec!["nav_1"]).unwrap();
        let exported = ns.export().unwrap();
        assert_eq!(exported["favorites"], json!(["nav_1"]));

        let other = KvStore::open_in_memory().unwrap();
        let target = other.namespace("p_");
        assert_eq!(target.import(&exported).unwrap(), 2);
        assert_eq!(target.get::<String>("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
