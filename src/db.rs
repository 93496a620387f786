use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS subscriptions (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL,
    url        TEXT NOT NULL CHECK(url <> ''),
    title      TEXT,
    last_price INTEGER CHECK(last_price IS NULL OR last_price >= 0),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
);
CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id);
";

const COLUMNS: &str = "id, user_id, url, title, last_price, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: i64,
    pub owner: i64,
    pub url: String,
    pub title: Option<String>,
    pub last_price: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Subscription {
    /// Title when known, url otherwise.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            url: row.get(2)?,
            title: row.get(3)?,
            last_price: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

/// Durable subscription state consumed by the pipeline.
///
/// Listings are ordered by ascending id. Writes touch a single row.
pub trait SubscriptionStore: Send + Sync {
    /// Insert a subscription and return its id.
    fn add(&self, owner: i64, url: &str, title: Option<&str>, price: Option<i64>) -> Result<i64>;

    fn get(&self, id: i64) -> Result<Option<Subscription>>;

    fn list_for_owner(&self, owner: i64) -> Result<Vec<Subscription>>;

    fn list_all(&self) -> Result<Vec<Subscription>>;

    /// Partial update. `None` fields keep their stored value; both `None` is a no-op.
    fn update(&self, id: i64, title: Option<&str>, price: Option<i64>) -> Result<()>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection mutex poisoned"))
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Subscription::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl SubscriptionStore for SqliteStore {
    fn add(&self, owner: i64, url: &str, title: Option<&str>, price: Option<i64>) -> Result<i64> {
        if url.trim().is_empty() {
            bail!("subscription url must not be empty");
        }
        if matches!(price, Some(p) if p < 0) {
            bail!("price must not be negative");
        }
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO subscriptions (user_id, url, title, last_price) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![owner, url, title, price],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<Subscription>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM subscriptions WHERE id = ?1"),
                [id],
                Subscription::from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn list_for_owner(&self, owner: i64) -> Result<Vec<Subscription>> {
        self.query(
            &format!("SELECT {COLUMNS} FROM subscriptions WHERE user_id = ?1 ORDER BY id"),
            [owner],
        )
    }

    fn list_all(&self) -> Result<Vec<Subscription>> {
        self.query(&format!("SELECT {COLUMNS} FROM subscriptions ORDER BY id"), [])
    }

    fn update(&self, id: i64, title: Option<&str>, price: Option<i64>) -> Result<()> {
        if title.is_none() && price.is_none() {
            return Ok(());
        }
        if matches!(price, Some(p) if p < 0) {
            bail!("price must not be negative");
        }
        let conn = self.conn()?;
        conn.execute(
            "UPDATE subscriptions
             SET title = COALESCE(?1, title),
                 last_price = COALESCE(?2, last_price),
                 updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
             WHERE id = ?3",
            rusqlite::params![title, price, id],
        )?;
        Ok(())
    }
}
