// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-app request log.
//!
//! Every SDK-scoped request is recorded against the app that made it, so
//! developers can see successes, failures and latency for their app. Writes
//! are fire-and-forget from the caller's point of view.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::database::{make_index_key, make_prefix, make_prefix_end, AuthDatabase, DbResult, APP_LOGS};

/// Outcome of a logged request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Successful,
    Failed,
}

/// One app log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppLog {
    pub id: String,
    /// App the request was made through
    pub app: String,
    /// Developer owning the app
    pub dev: String,
    pub status: LogStatus,
    pub route: String,
    /// Failure reason, absent on success
    pub detail: Option<String>,
    pub response_time_ms: u64,
    pub date: DateTime<Utc>,
}

impl AppLog {
    /// Start a successful entry; `started` is when request handling began.
    pub fn new(
        app: impl Into<String>,
        dev: impl Into<String>,
        route: impl Into<String>,
        started: Instant,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            app: app.into(),
            dev: dev.into(),
            status: LogStatus::Successful,
            route: route.into(),
            detail: None,
            response_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            date: Utc::now(),
        }
    }

    /// Mark as failed with a reason.
    pub fn failed(mut self, detail: impl Into<String>) -> Self {
        self.status = LogStatus::Failed;
        self.detail = Some(detail.into());
        self
    }
}

/// Repository for app logs.
pub struct AuditRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> AuditRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    pub fn append(&self, log: &AppLog) -> DbResult<()> {
        let key = make_index_key(&log.app, log.date.timestamp_millis(), &log.id);
        let json = serde_json::to_vec(log)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(APP_LOGS)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Append, swallowing storage errors. Logging must never fail a request.
    pub fn append_quietly(&self, log: &AppLog) {
        if let Err(e) = self.append(log) {
            tracing::warn!(error = %e, app = %log.app, route = %log.route, "Failed to write app log");
        }
    }

    /// Most recent entries for an app, newest first.
    pub fn list_for_app(&self, app_id: &str, limit: usize) -> DbResult<Vec<AppLog>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(APP_LOGS)?;

        let prefix = make_prefix(app_id);
        let prefix_end = make_prefix_end(app_id);

        let mut logs = Vec::new();
        for entry in table.range(prefix.as_slice()..prefix_end.as_slice())? {
            let (_, value) = entry?;
            logs.push(serde_json::from_slice(value.value())?);
            if logs.len() >= limit {
                break;
            }
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_sets_status_and_detail() {
        let log = AppLog::new("app-1", "dev-1", "/sdk/login", Instant::now()).failed("nope");
        assert_eq!(log.status, LogStatus::Failed);
        assert_eq!(log.detail.as_deref(), Some("nope"));
    }

    #[test]
    fn list_is_newest_first_and_scoped() {
        let db = AuthDatabase::in_memory().unwrap();
        let repo = AuditRepository::new(&db);

        let mut older = AppLog::new("app-1", "dev-1", "/sdk/login", Instant::now());
        older.date = Utc::now() - chrono::Duration::seconds(10);
        let newer = AppLog::new("app-1", "dev-1", "/sdk/whoami", Instant::now()).failed("x");
        let other = AppLog::new("app-2", "dev-1", "/sdk/login", Instant::now());

        repo.append(&older).unwrap();
        repo.append(&newer).unwrap();
        repo.append_quietly(&other);

        let logs = repo.list_for_app("app-1", 10).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, newer.id);
        assert_eq!(logs[1].id, older.id);

        assert_eq!(repo.list_for_app("app-1", 1).unwrap().len(), 1);
    }
}
