// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Auth Storage Module
//!
//! Persistent state of the auth service lives in a single embedded redb
//! database: sessions, the principals they belong to, SDK apps and the
//! per-app request log.
//!
//! Nonces are deliberately NOT stored here. They are short-lived and
//! single-use and live in the in-process nonce store (`auth::nonce`).

pub mod audit;
pub mod database;
pub mod repository;

pub use audit::{AppLog, AuditRepository, LogStatus};
pub use database::{AuthDatabase, DbError, DbResult};
pub use repository::{
    App, AppGating, AppRepository, Dev, DevRepository, DevResponse, NewApp, NewDev, SdkUser,
    SdkUserRepository, Session, SessionRepository, User, UserRepository,
};
