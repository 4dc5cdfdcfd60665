// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Marketplace end users, keyed by wallet address.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::database::{AuthDatabase, DbResult, USERS, USERS_BY_ADDRESS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Wallet address as first seen at login
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct UserRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    pub fn find_by_id(&self, user_id: &str) -> DbResult<Option<User>> {
        self.db.get_record(USERS, user_id)
    }

    /// Look up by address, case-insensitively.
    pub fn find_by_address(&self, address: &str) -> DbResult<Option<User>> {
        let key = address.to_lowercase();
        self.db.get_record_by_index(USERS_BY_ADDRESS, USERS, &key)
    }

    /// Return the user owning `address`, creating it on first login.
    pub fn upsert_by_address(&self, address: &str) -> DbResult<User> {
        let key = address.to_lowercase();

        let write_txn = self.db.begin_write()?;
        let user = {
            let mut idx = write_txn.open_table(USERS_BY_ADDRESS)?;
            let mut table = write_txn.open_table(USERS)?;

            let existing_id = idx.get(key.as_str())?.map(|v| v.value().to_string());
            let existing = match existing_id {
                Some(id) => {
                    let bytes = table.get(id.as_str())?.map(|v| v.value().to_vec());
                    match bytes {
                        Some(bytes) => Some(serde_json::from_slice::<User>(&bytes)?),
                        None => None,
                    }
                }
                None => None,
            };

            match existing {
                Some(user) => user,
                None => {
                    let now = Utc::now();
                    let user = User {
                        id: uuid::Uuid::new_v4().to_string(),
                        address: address.to_string(),
                        created_at: now,
                        updated_at: now,
                    };
                    let json = serde_json::to_vec(&user)?;
                    table.insert(user.id.as_str(), json.as_slice())?;
                    idx.insert(key.as_str(), user.id.as_str())?;
                    tracing::info!(user_id = %user.id, "New user registered");
                    user
                }
            }
        };
        write_txn.commit()?;
        Ok(user)
    }
}
