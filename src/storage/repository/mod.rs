// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the auth database.
//!
//! Each repository borrows the `AuthDatabase` and owns the tables of one
//! entity type.

pub mod apps;
pub mod devs;
pub mod sdk_users;
pub mod sessions;
pub mod users;

pub use apps::{App, AppGating, AppRepository, NewApp};
pub use devs::{normalize_email, Dev, DevRepository, DevResponse, NewDev};
pub use sdk_users::{SdkUser, SdkUserRepository};
pub use sessions::{Session, SessionRepository};
pub use users::{User, UserRepository};
