/// SQLite seed backend.
///
/// One table keyed by seed name; every record carries a SHA-256 checksum
/// verified on read so silent corruption surfaces as an absent seed rather
/// than bad entropy. Sessions run inside an immediate transaction and the
/// write-ahead log is checkpointed on close.
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use super::SeedBackend;

pub struct SqliteBackend {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<SqliteBackend> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating seed database directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening seed database {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .context("enabling WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("setting synchronous mode")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS seeds (
                name TEXT PRIMARY KEY,
                record BLOB NOT NULL,
                checksum BLOB NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("creating seeds table")?;

        tracing::debug!(path = %path.display(), "seed database open");

        Ok(SqliteBackend {
            conn,
            in_transaction: false,
        })
    }
}

impl SeedBackend for SqliteBackend {
    fn get_raw(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT record, checksum FROM seeds WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("reading seed record")?;

        match row {
            Some((record, checksum)) => {
                if Sha256::digest(&record).as_slice() != checksum.as_slice() {
                    // Surface as corruption; the session removes it.
                    return Ok(Some(Vec::new()));
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put_raw(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let checksum = Sha256::digest(bytes).to_vec();
        self.conn
            .execute(
                "INSERT OR REPLACE INTO seeds (name, record, checksum, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, bytes, checksum, chrono::Utc::now().to_rfc3339()],
            )
            .context("writing seed record")?;
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM seeds WHERE name = ?1", params![name])
            .context("removing seed record")?;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(anyhow!("session transaction already open"));
        }
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .context("opening transaction")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.conn.execute_batch("COMMIT").context("committing transaction")?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.in_transaction {
            self.in_transaction = false;
            let _ = self.conn.execute_batch("COMMIT");
        }
        self.conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            .context("checkpointing WAL")?;
        Ok(())
    }
}
