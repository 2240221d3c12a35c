use anyhow::{Error, Result};
use rusqlite::Connection as SyncConnection;
use tokio_rusqlite::Connection;

/// Open the sqlite database used for run state (quota counts and the
/// stored Google credential).
pub async fn async_db(storage_path: &str) -> Result<Connection, Error> {
    let db_path = format!("{}/headsup.db", storage_path);
    let conn = Connection::open(db_path).await?;
    Ok(conn)
}

/// Create tables if they don't exist. Safe to run on every startup.
pub fn initialize_db(conn: &SyncConnection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_item (
            key_space TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (key_space, key)
        )",
        [],
    )?;
    Ok(())
}
