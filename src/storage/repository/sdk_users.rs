// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet holders that signed in through an SDK app.
//!
//! The same address signing in through two apps yields two records.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::database::{AuthDatabase, DbResult, SDK_USERS, SDK_USERS_BY_APP_ADDRESS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SdkUser {
    pub id: String,
    /// Owning app id
    pub app: String,
    pub address: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn app_address_key(app_id: &str, address: &str) -> String {
    format!("{app_id}|{address}")
}

pub struct SdkUserRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> SdkUserRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    pub fn find_by_id(&self, sdk_user_id: &str) -> DbResult<Option<SdkUser>> {
        self.db.get_record(SDK_USERS, sdk_user_id)
    }

    /// Like `find_by_id`, but disconnected users are treated as absent.
    pub fn find_active(&self, sdk_user_id: &str) -> DbResult<Option<SdkUser>> {
        Ok(self.find_by_id(sdk_user_id)?.filter(|user| user.is_active))
    }

    /// Return the (app, address) user, creating or reactivating it.
    pub fn upsert(&self, app_id: &str, address: &str) -> DbResult<SdkUser> {
        let key = app_address_key(app_id, address);
        let now = Utc::now();

        let write_txn = self.db.begin_write()?;
        let user = {
            let mut idx = write_txn.open_table(SDK_USERS_BY_APP_ADDRESS)?;
            let mut table = write_txn.open_table(SDK_USERS)?;

            let existing_id = idx.get(key.as_str())?.map(|v| v.value().to_string());
            let existing_bytes = match &existing_id {
                Some(id) => table.get(id.as_str())?.map(|v| v.value().to_vec()),
                None => None,
            };

            let user = match existing_bytes {
                Some(bytes) => {
                    let mut user: SdkUser = serde_json::from_slice(&bytes)?;
                    if !user.is_active {
                        user.is_active = true;
                        user.updated_at = now;
                    }
                    user
                }
                None => SdkUser {
                    id: uuid::Uuid::new_v4().to_string(),
                    app: app_id.to_string(),
                    address: address.to_string(),
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                },
            };

            let json = serde_json::to_vec(&user)?;
            table.insert(user.id.as_str(), json.as_slice())?;
            idx.insert(key.as_str(), user.id.as_str())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    /// Disconnect a user from its app. Returns `false` if it was not active.
    pub fn deactivate(&self, sdk_user_id: &str) -> DbResult<bool> {
        let write_txn = self.db.begin_write()?;
        let changed = {
            let mut table = write_txn.open_table(SDK_USERS)?;

            let existing_bytes = match table.get(sdk_user_id)? {
                Some(existing) => existing.value().to_vec(),
                None => return Ok(false),
            };

            let mut user: SdkUser = serde_json::from_slice(&existing_bytes)?;
            if !user.is_active {
                false
            } else {
                user.is_active = false;
                user.updated_at = Utc::now();
                let json = serde_json::to_vec(&user)?;
                table.insert(sdk_user_id, json.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(changed)
    }

    /// Active users of one app.
    pub fn list_active_for_app(&self, app_id: &str) -> DbResult<Vec<SdkUser>> {
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(SDK_USERS_BY_APP_ADDRESS)?;
        let table = read_txn.open_table(SDK_USERS)?;

        let prefix = format!("{app_id}|");
        let mut users = Vec::new();
        for entry in idx.range(prefix.as_str()..)? {
            let (key, id) = entry?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            if let Some(value) = table.get(id.value())? {
                let user: SdkUser = serde_json::from_slice(value.value())?;
                if user.is_active {
                    users.push(user);
                }
            }
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";

    #[test]
    fn upsert_is_scoped_per_app() {
        let db = AuthDatabase::in_memory().unwrap();
        let repo = SdkUserRepository::new(&db);

        let a = repo.upsert("app-a", ADDRESS).unwrap();
        let again = repo.upsert("app-a", ADDRESS).unwrap();
        let b = repo.upsert("app-b", ADDRESS).unwrap();

        assert_eq!(a.id, again.id);
        assert_ne!(a.id, b.id);
        assert_eq!(repo.list_active_for_app("app-a").unwrap().len(), 1);
    }

    #[test]
    fn deactivated_users_are_hidden_until_next_login() {
        let db = AuthDatabase::in_memory().unwrap();
        let repo = SdkUserRepository::new(&db);

        let user = repo.upsert("app-a", ADDRESS).unwrap();
        assert!(repo.deactivate(&user.id).unwrap());
        assert!(!repo.deactivate(&user.id).unwrap());
        assert!(repo.find_active(&user.id).unwrap().is_none());
        assert!(repo.list_active_for_app("app-a").unwrap().is_empty());

        let back = repo.upsert("app-a", ADDRESS).unwrap();
        assert_eq!(back.id, user.id);
        assert!(repo.find_active(&user.id).unwrap().is_some());
    }

    #[test]
    fn concurrent_disconnects_change_state_once() {
        let db = AuthDatabase::in_memory().unwrap();
        let user = SdkUserRepository::new(&db).upsert("app-a", ADDRESS).unwrap();

        let changed = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| SdkUserRepository::new(&db).deactivate(&user.id).unwrap()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|changed| *changed)
                .count()
        });
        assert_eq!(changed, 1);
        assert!(!SdkUserRepository::new(&db).deactivate("missing").unwrap());
    }
}
