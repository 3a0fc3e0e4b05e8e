// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! xhs-publisher: an MCP server that publishes notes to Xiaohongshu.
//!
//! Layers, bottom up: `model` (plain data), `store` (cookie files), `platform` (the platform
//! HTTP API behind a trait), `session` (login state machine), `stage` (remote image staging),
//! `dispatch` (publish routing) and `mcp` (tools and resources).

pub mod config;
pub mod dispatch;
pub mod mcp;
pub mod model;
pub mod platform;
pub mod session;
pub mod stage;
pub mod store;
pub mod telemetry;
