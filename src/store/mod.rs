// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for account cookies on disk.
//!
//! Each account maps to one `<account>.cookie` file under the configured cookie directory; the
//! file holds the raw cookie blob and nothing else.

pub mod cookie_store;

pub use cookie_store::{CookieStore, StoreError, WriteDurability};
