// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SDK tenant apps registered by developers.
//!
//! An app is resolved either by its secret `api_key` (server-to-server) or
//! by its public `client_id` (browser / mobile embeds, further restricted by
//! allowed domains and bundle ids).

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::database::{
    make_index_key, make_prefix, make_prefix_end, AuthDatabase, DbError, DbResult, APPS,
    APPS_BY_API_KEY, APPS_BY_CLIENT_ID, APPS_BY_OWNER,
};

/// Address and origin restrictions of an app.
///
/// `None` means "not configured". An empty list is treated the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppGating {
    pub allowed_domains: Option<Vec<String>>,
    #[serde(rename = "allowedBundleIDs")]
    pub allowed_bundle_ids: Option<Vec<String>>,
    pub blacklisted_addresses: Option<Vec<String>>,
    pub whitelisted_addresses: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    /// Owning developer id
    pub owner: String,
    pub api_key: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(flatten)]
    pub gating: AppGating,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the developer when registering an app.
#[derive(Debug, Clone)]
pub struct NewApp {
    pub owner: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub gating: AppGating,
}

pub struct AppRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> AppRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    pub fn find_by_id(&self, app_id: &str) -> DbResult<Option<App>> {
        self.db.get_record(APPS, app_id)
    }

    pub fn find_by_api_key(&self, api_key: &str) -> DbResult<Option<App>> {
        self.db.get_record_by_index(APPS_BY_API_KEY, APPS, api_key)
    }

    pub fn find_by_client_id(&self, client_id: &str) -> DbResult<Option<App>> {
        self.db.get_record_by_index(APPS_BY_CLIENT_ID, APPS, client_id)
    }

    /// Register an app and mint its credentials.
    ///
    /// App names are unique among one developer's active apps.
    pub fn create(&self, new_app: NewApp) -> DbResult<App> {
        let duplicate = self
            .list_by_owner(&new_app.owner)?
            .into_iter()
            .any(|app| app.name == new_app.name);
        if duplicate {
            return Err(DbError::Conflict(format!(
                "App registered as '{}' already exist on your account",
                new_app.name
            )));
        }

        let now = Utc::now();
        let app = App {
            id: uuid::Uuid::new_v4().to_string(),
            name: new_app.name,
            url: new_app.url,
            description: new_app.description,
            owner: new_app.owner,
            api_key: uuid::Uuid::new_v4().to_string(),
            client_id: uuid::Uuid::new_v4().simple().to_string(),
            gating: new_app.gating,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_vec(&app)?;
        let owner_key = make_index_key(&app.owner, now.timestamp_millis(), &app.id);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(APPS)?;
            table.insert(app.id.as_str(), json.as_slice())?;

            let mut by_owner = write_txn.open_table(APPS_BY_OWNER)?;
            by_owner.insert(owner_key.as_slice(), app.id.as_str())?;

            let mut by_key = write_txn.open_table(APPS_BY_API_KEY)?;
            by_key.insert(app.api_key.as_str(), app.id.as_str())?;

            let mut by_client = write_txn.open_table(APPS_BY_CLIENT_ID)?;
            by_client.insert(app.client_id.as_str(), app.id.as_str())?;
        }
        write_txn.commit()?;

        tracing::info!(app_id = %app.id, owner = %app.owner, "App registered");
        Ok(app)
    }

    /// Active apps owned by a developer, oldest first.
    pub fn list_by_owner(&self, owner: &str) -> DbResult<Vec<App>> {
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(APPS_BY_OWNER)?;
        let table = read_txn.open_table(APPS)?;

        let prefix = make_prefix(owner);
        let prefix_end = make_prefix_end(owner);

        let mut apps = Vec::new();
        // Index is newest first
        for entry in idx.range(prefix.as_slice()..prefix_end.as_slice())?.rev() {
            let (_, app_id) = entry?;
            if let Some(value) = table.get(app_id.value())? {
                let app: App = serde_json::from_slice(value.value())?;
                if app.is_active {
                    apps.push(app);
                }
            }
        }
        Ok(apps)
    }

    /// Replace an app's gating lists.
    ///
    /// Returns `None` when the app does not exist, is inactive, or belongs
    /// to someone else.
    pub fn update_gating(
        &self,
        app_id: &str,
        owner: &str,
        gating: AppGating,
    ) -> DbResult<Option<App>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(APPS)?;
            let existing_bytes = match table.get(app_id)? {
                Some(existing) => existing.value().to_vec(),
                None => return Ok(None),
            };

            let mut app: App = serde_json::from_slice(&existing_bytes)?;
            if app.owner != owner || !app.is_active {
                return Ok(None);
            }
            app.gating = gating;
            app.updated_at = Utc::now();

            let json = serde_json::to_vec(&app)?;
            table.insert(app_id, json.as_slice())?;
            app
        };
        write_txn.commit()?;
        Ok(Some(updated))
    }

    /// Retire an app owned by `owner`. Its credentials stop resolving to an
    /// active app.
    ///
    /// Returns `None` when the app does not exist or belongs to someone
    /// else, `Some(false)` when it was already inactive.
    pub fn deactivate(&self, app_id: &str, owner: &str) -> DbResult<Option<bool>> {
        let write_txn = self.db.begin_write()?;
        let changed = {
            let mut table = write_txn.open_table(APPS)?;
            let existing_bytes = match table.get(app_id)? {
                Some(existing) => existing.value().to_vec(),
                None => return Ok(None),
            };

            let mut app: App = serde_json::from_slice(&existing_bytes)?;
            if app.owner != owner {
                return Ok(None);
            }
            if !app.is_active {
                false
            } else {
                app.is_active = false;
                app.updated_at = Utc::now();
                let json = serde_json::to_vec(&app)?;
                table.insert(app_id, json.as_slice())?;
                true
            }
        };
        write_txn.commit()?;

        if changed {
            tracing::info!(app_id = %app_id, owner = %owner, "App deactivated");
        }
        Ok(Some(changed))
    }
}
