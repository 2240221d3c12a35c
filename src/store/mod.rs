//! Generic key-value storage over sqlite.
//!
//! Each record type maps itself to and from a stored item via
//! [`KvRecord`] rather than subclassing some datastore base — the
//! store stays generic and the serialization lives with the type.

pub mod models;

use anyhow::{Error, Result};
use tokio_rusqlite::Connection;

pub use models::{QuotaRecord, StoredCredential};

/// Serialization seam between a typed record and a stored kv item.
pub trait KvRecord {
    /// Namespace for this record type, e.g. `"quota"`.
    const KEY_SPACE: &'static str;

    fn key(&self) -> String;
    fn to_item(&self) -> Result<String, Error>;
    fn from_item(item: &str) -> Result<Self, Error>
    where
        Self: Sized;
}

#[derive(Clone)]
pub struct KvStore {
    db: Connection,
}

impl KvStore {
    pub fn new(db: Connection) -> Self {
        Self { db }
    }

    pub async fn get<R: KvRecord>(&self, key: &str) -> Result<Option<R>, Error> {
        let key_space = R::KEY_SPACE;
        let key = key.to_owned();
        let item: Option<String> = self
            .db
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT value FROM kv_item WHERE key_space = ? AND key = ?")?;
                let mut rows = stmt.query_map([key_space, key.as_str()], |row| row.get(0))?;
                Ok(rows.next().transpose()?)
            })
            .await?;
        item.as_deref().map(R::from_item).transpose()
    }

    pub async fn put<R: KvRecord>(&self, record: &R) -> Result<(), Error> {
        let key_space = R::KEY_SPACE;
        let key = record.key();
        let value = record.to_item()?;
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO kv_item (key_space, key, value) VALUES (?, ?, ?)
                     ON CONFLICT (key_space, key) DO UPDATE SET value = excluded.value",
                    [key_space, key.as_str(), value.as_str()],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Persist a quota count, keeping whichever count is larger if a
    /// concurrent run already wrote a higher one. Two overlapping runs
    /// can't regress the counter this way.
    pub async fn put_quota(&self, record: &QuotaRecord) -> Result<(), Error> {
        let key = record.key();
        let value = record.to_item()?;
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO kv_item (key_space, key, value) VALUES (?, ?, ?)
                     ON CONFLICT (key_space, key) DO UPDATE SET value = excluded.value
                     WHERE json_extract(excluded.value, '$.count')
                         > json_extract(kv_item.value, '$.count')",
                    [QuotaRecord::KEY_SPACE, key.as_str(), value.as_str()],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
