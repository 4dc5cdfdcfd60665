// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{LruNonceStore, NonceService, NonceStore, TokenIssuer};
use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::storage::AuthDatabase;

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<AuthDatabase>,
    pub nonces: Arc<NonceService>,
    pub tokens: Arc<TokenIssuer>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<ServerConfig>,
    /// Parsed once from `config.dev_base_url`
    pub dev_dashboard_host: Option<Arc<str>>,
}

impl AppState {
    pub fn new(config: ServerConfig, db: AuthDatabase, tokens: TokenIssuer) -> Self {
        let store: Arc<dyn NonceStore> = Arc::new(LruNonceStore::new(config.nonce_cache_capacity));
        Self::with_parts(config, db, tokens, store, Arc::new(SystemClock))
    }

    /// Assemble from explicit parts (shared nonce store, fake clock).
    pub fn with_parts(
        config: ServerConfig,
        db: AuthDatabase,
        tokens: TokenIssuer,
        nonce_store: Arc<dyn NonceStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let nonces = NonceService::new(nonce_store, clock.clone(), config.nonce_ttl);
        let dev_dashboard_host = config.dev_dashboard_host().map(Arc::from);

        Self {
            db: Arc::new(db),
            nonces: Arc::new(nonces),
            tokens: Arc::new(tokens),
            clock,
            config: Arc::new(config),
            dev_dashboard_host,
        }
    }
}
