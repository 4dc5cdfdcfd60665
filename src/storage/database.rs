// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded auth database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `sessions`: session_id → serialized Session
//! - `sessions_by_identifier`: composite key (identifier|!created_at|session_id) → session_id
//! - `users` / `users_by_address`: user_id → User, lowercase address → user_id
//! - `devs` / `devs_by_email`: dev_id → Dev, normalized email → dev_id
//! - `sdk_users` / `sdk_users_by_app_address`: sdk_user_id → SdkUser, `app|address` → sdk_user_id
//! - `apps` / `apps_by_api_key` / `apps_by_client_id`: app_id → App, credential → app_id
//! - `apps_by_owner`: composite key (owner|!created_at|app_id) → app_id
//! - `app_logs`: composite key (app_id|!timestamp|log_id) → serialized AppLog

use std::path::Path;

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: session_id → serialized Session (JSON bytes).
pub(crate) const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Index: `identifier|!created_at_be|session_id` → session_id, newest first.
pub(crate) const SESSIONS_BY_IDENTIFIER: TableDefinition<&[u8], &str> =
    TableDefinition::new("sessions_by_identifier");

pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Map: lowercase wallet address → user_id.
pub(crate) const USERS_BY_ADDRESS: TableDefinition<&str, &str> =
    TableDefinition::new("users_by_address");

pub(crate) const DEVS: TableDefinition<&str, &[u8]> = TableDefinition::new("devs");

/// Map: normalized email → dev_id. Enforces email uniqueness.
pub(crate) const DEVS_BY_EMAIL: TableDefinition<&str, &str> = TableDefinition::new("devs_by_email");

pub(crate) const SDK_USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("sdk_users");

/// Map: `app_id|address` → sdk_user_id.
pub(crate) const SDK_USERS_BY_APP_ADDRESS: TableDefinition<&str, &str> =
    TableDefinition::new("sdk_users_by_app_address");

pub(crate) const APPS: TableDefinition<&str, &[u8]> = TableDefinition::new("apps");

pub(crate) const APPS_BY_API_KEY: TableDefinition<&str, &str> =
    TableDefinition::new("apps_by_api_key");

pub(crate) const APPS_BY_CLIENT_ID: TableDefinition<&str, &str> =
    TableDefinition::new("apps_by_client_id");

/// Index: `owner|!created_at_be|app_id` → app_id.
pub(crate) const APPS_BY_OWNER: TableDefinition<&[u8], &str> =
    TableDefinition::new("apps_by_owner");

/// Per-app request log: `app_id|!timestamp_be|log_id` → serialized AppLog.
pub(crate) const APP_LOGS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("app_logs");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key `owner | inverted_timestamp_be_bytes | id`.
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
pub(crate) fn make_index_key(owner: &str, timestamp_millis: i64, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner.len() + 1 + 8 + 1 + id.len());
    key.extend_from_slice(owner.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!timestamp_millis as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(id.as_bytes());
    key
}

/// Prefix covering every composite key of one owner.
pub(crate) fn make_prefix(owner: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(owner.len() + 1);
    prefix.extend_from_slice(owner.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Upper bound for a prefix range scan.
pub(crate) fn make_prefix_end(owner: &str) -> Vec<u8> {
    let mut end = make_prefix(owner);
    end.extend_from_slice(&[0xFF; 20]);
    end
}

// =============================================================================
// AuthDatabase
// =============================================================================

/// Embedded ACID store for sessions, principals, apps and app logs.
pub struct AuthDatabase {
    db: Database,
}

impl AuthDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::with_tables(db)
    }

    /// A throwaway database that lives only in memory.
    pub fn in_memory() -> DbResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::with_tables(db)
    }

    fn with_tables(db: Database) -> DbResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSIONS)?;
            let _ = write_txn.open_table(SESSIONS_BY_IDENTIFIER)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERS_BY_ADDRESS)?;
            let _ = write_txn.open_table(DEVS)?;
            let _ = write_txn.open_table(DEVS_BY_EMAIL)?;
            let _ = write_txn.open_table(SDK_USERS)?;
            let _ = write_txn.open_table(SDK_USERS_BY_APP_ADDRESS)?;
            let _ = write_txn.open_table(APPS)?;
            let _ = write_txn.open_table(APPS_BY_API_KEY)?;
            let _ = write_txn.open_table(APPS_BY_CLIENT_ID)?;
            let _ = write_txn.open_table(APPS_BY_OWNER)?;
            let _ = write_txn.open_table(APP_LOGS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(crate) fn begin_read(&self) -> DbResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    pub(crate) fn begin_write(&self) -> DbResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // =========================================================================
    // Record helpers
    // =========================================================================

    /// Read one JSON record from a primary table.
    pub(crate) fn get_record<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<'static, &'static str, &'static [u8]>,
        key: &str,
    ) -> DbResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(definition)?;
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Resolve a secondary key to a primary key, then read the record.
    pub(crate) fn get_record_by_index<T: DeserializeOwned>(
        &self,
        index: TableDefinition<'static, &'static str, &'static str>,
        definition: TableDefinition<'static, &'static str, &'static [u8]>,
        index_key: &str,
    ) -> DbResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let index_table = read_txn.open_table(index)?;
        let id = match index_table.get(index_key)? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };
        let table = read_txn.open_table(definition)?;
        match table.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Overwrite one JSON record in a primary table.
    pub(crate) fn put_record<T: Serialize>(
        &self,
        definition: TableDefinition<'static, &'static str, &'static [u8]>,
        key: &str,
        record: &T,
    ) -> DbResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(definition)?;
            table.insert(key, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Read every record of a primary table. Only used on small tables.
    pub(crate) fn scan_records<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<'static, &'static str, &'static [u8]>,
    ) -> DbResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(definition)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.redb");
        {
            let db = AuthDatabase::open(&path).unwrap();
            db.put_record(USERS, "u1", &Named { name: "alice".into() }).unwrap();
        }
        let db = AuthDatabase::open(&path).unwrap();
        let record: Option<Named> = db.get_record(USERS, "u1").unwrap();
        assert_eq!(record, Some(Named { name: "alice".into() }));
    }

    #[test]
    fn missing_record_is_none() {
        let db = AuthDatabase::in_memory().unwrap();
        let record: Option<Named> = db.get_record(APPS, "nope").unwrap();
        assert!(record.is_none());
        let record: Option<Named> = db.get_record_by_index(APPS_BY_API_KEY, APPS, "nope").unwrap();
        assert!(record.is_none());
    }

    #[test]
    fn make_index_key_ordering() {
        let key_old = make_index_key("owner", 1000, "a");
        let key_new = make_index_key("owner", 2000, "b");
        assert!(key_new < key_old, "Newer timestamps should sort first");
        assert!(key_old.as_slice() < make_prefix_end("owner").as_slice());
        assert!(key_new.as_slice() > make_prefix("owner").as_slice());
    }
}
