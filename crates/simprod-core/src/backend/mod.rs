// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Job backend adapters.
//!
//! The grid job system is an external service; the daemon only needs
//! find/create/status/destroy semantics from it.

pub mod command;
pub mod mock;
mod traits;

pub use command::CommandBackend;
pub use mock::MockBackend;
pub use traits::*;
