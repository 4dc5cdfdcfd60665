// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session records: the durable "this principal is logged in" fact.
//!
//! A session's role never changes after creation and `is_active` only ever
//! goes from `true` to `false`. Sessions are never deleted.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::storage::database::{
    make_index_key, make_prefix, make_prefix_end, AuthDatabase, DbResult, SESSIONS,
    SESSIONS_BY_IDENTIFIER,
};

/// A login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// Principal id (user, dev or SDK user)
    pub identifier: String,
    pub role: Role,
    pub is_active: bool,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session Manager over the auth database.
pub struct SessionRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> SessionRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Start a new active session for a principal.
    pub fn create(
        &self,
        identifier: &str,
        role: Role,
        user_agent: Option<String>,
    ) -> DbResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            identifier: identifier.to_string(),
            role,
            is_active: true,
            user_agent,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_vec(&session)?;
        let index_key = make_index_key(identifier, now.timestamp_millis(), &session.id);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            table.insert(session.id.as_str(), json.as_slice())?;

            let mut idx = write_txn.open_table(SESSIONS_BY_IDENTIFIER)?;
            idx.insert(index_key.as_slice(), session.id.as_str())?;
        }
        write_txn.commit()?;

        tracing::debug!(session_id = %session.id, role = %role, "Session created");
        Ok(session)
    }

    pub fn find(&self, session_id: &str) -> DbResult<Option<Session>> {
        self.db.get_record(SESSIONS, session_id)
    }

    /// Mark a session inactive.
    ///
    /// Returns `false` when there was nothing to do (unknown or already
    /// inactive session).
    pub fn invalidate(&self, session_id: &str) -> DbResult<bool> {
        let write_txn = self.db.begin_write()?;
        let changed = {
            let mut table = write_txn.open_table(SESSIONS)?;

            let existing_bytes = match table.get(session_id)? {
                Some(existing) => existing.value().to_vec(),
                None => return Ok(false),
            };

            let mut session: Session = serde_json::from_slice(&existing_bytes)?;
            if !session.is_active {
                false
            } else {
                session.is_active = false;
                session.updated_at = Utc::now();
                let json = serde_json::to_vec(&session)?;
                table.insert(session_id, json.as_slice())?;
                true
            }
        };
        write_txn.commit()?;

        if changed {
            tracing::info!(session_id = %session_id, "Session invalidated");
        }
        Ok(changed)
    }

    /// Active sessions of a principal, newest first.
    pub fn list_active_for(&self, identifier: &str) -> DbResult<Vec<Session>> {
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(SESSIONS_BY_IDENTIFIER)?;
        let table = read_txn.open_table(SESSIONS)?;

        let prefix = make_prefix(identifier);
        let prefix_end = make_prefix_end(identifier);

        let mut sessions = Vec::new();
        for entry in idx.range(prefix.as_slice()..prefix_end.as_slice())? {
            let (_, session_id) = entry?;
            if let Some(value) = table.get(session_id.value())? {
                let session: Session = serde_json::from_slice(value.value())?;
                if session.is_active {
                    sessions.push(session);
                }
            }
        }
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_find() {
        let db = AuthDatabase::in_memory().unwrap();
        let repo = SessionRepository::new(&db);

        let session = repo
            .create("user-1", Role::User, Some("curl/8".into()))
            .unwrap();
        assert!(session.is_active);

        let found = repo.find(&session.id).unwrap().unwrap();
        assert_eq!(found, session);
        assert!(repo.find("missing").unwrap().is_none());
    }

    #[test]
    fn invalidate_is_one_way() {
        let db = AuthDatabase::in_memory().unwrap();
        let repo = SessionRepository::new(&db);
        let session = repo.create("dev-1", Role::Dev, None).unwrap();

        assert!(repo.invalidate(&session.id).unwrap());
        assert!(!repo.invalidate(&session.id).unwrap());
        assert!(!repo.invalidate("missing").unwrap());

        let found = repo.find(&session.id).unwrap().unwrap();
        assert!(!found.is_active);
        assert_eq!(found.role, Role::Dev);
    }

    #[test]
    fn list_active_skips_inactive_and_other_principals() {
        let db = AuthDatabase::in_memory().unwrap();
        let repo = SessionRepository::new(&db);

        let first = repo.create("user-1", Role::User, None).unwrap();
        let second = repo.create("user-1", Role::User, None).unwrap();
        repo.create("user-2", Role::User, None).unwrap();
        repo.invalidate(&first.id).unwrap();

        let active = repo.list_active_for("user-1").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
    }
}
