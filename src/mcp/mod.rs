// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Model Context Protocol (MCP) server surface.
//!
//! Publishing, login and account lookups are exposed as tools; the current user and notes are
//! exposed as resources.

mod server;
mod types;

pub use server::{XhsMcp, MAX_VERIFY_ATTEMPTS};
pub use types::*;
