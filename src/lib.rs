// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Quyx Auth Server - wallet sign-in, sessions and SDK app gating
//!
//! Users prove wallet ownership by signing a server-issued nonce. A verified
//! signature opens a session and yields an access / refresh token pair.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Nonces, sign-in messages, signature checks, tokens and the access gate
//! - `storage` - Embedded redb database (sessions, users, developers, apps, app logs)
//! - `config` - Environment configuration

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod tls;
