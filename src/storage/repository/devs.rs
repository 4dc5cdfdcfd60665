// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Developer accounts (email + password).
//!
//! Emails are NFKC-normalized, trimmed and lower-cased before they are
//! stored or looked up, so visually identical addresses collide.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

use crate::storage::database::{AuthDatabase, DbError, DbResult, DEVS, DEVS_BY_EMAIL};

/// Stored developer record. Holds the password hash, never serialize it to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dev {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Developer profile returned to API clients (never includes the password hash).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Dev> for DevResponse {
    fn from(dev: Dev) -> Self {
        Self {
            id: dev.id,
            email: dev.email,
            first_name: dev.first_name,
            last_name: dev.last_name,
            company: dev.company,
            created_at: dev.created_at,
        }
    }
}

/// Fields required to register a developer.
#[derive(Debug, Clone)]
pub struct NewDev {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub password_hash: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

pub struct DevRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> DevRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    pub fn find_by_id(&self, dev_id: &str) -> DbResult<Option<Dev>> {
        self.db.get_record(DEVS, dev_id)
    }

    pub fn find_by_email(&self, email: &str) -> DbResult<Option<Dev>> {
        self.db
            .get_record_by_index(DEVS_BY_EMAIL, DEVS, &normalize_email(email))
    }

    /// Register a developer. Fails with `DbError::Conflict` if the email is taken.
    pub fn create(&self, new_dev: NewDev) -> DbResult<Dev> {
        let email = normalize_email(&new_dev.email);
        let now = Utc::now();
        let dev = Dev {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            first_name: new_dev.first_name,
            last_name: new_dev.last_name,
            company: new_dev.company,
            password_hash: new_dev.password_hash,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_vec(&dev)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut idx = write_txn.open_table(DEVS_BY_EMAIL)?;
            if idx.get(dev.email.as_str())?.is_some() {
                return Err(DbError::Conflict(
                    "Email address already in use by another account".to_string(),
                ));
            }
            idx.insert(dev.email.as_str(), dev.id.as_str())?;

            let mut table = write_txn.open_table(DEVS)?;
            table.insert(dev.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;

        tracing::info!(dev_id = %dev.id, "Developer registered");
        Ok(dev)
    }
}
