// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! Accounts own a cookie; publish requests come in three note variants and always resolve to a
//! single [`PublishResult`] envelope.

pub mod cookie;
pub mod ids;
pub mod login;
pub mod note;
pub mod status;

pub use cookie::{Cookie, REQUIRED_COOKIE_TOKENS};
pub use ids::{AccountId, IdError};
pub use login::{mask_phone, PhoneLogin, QrCheck, QrCode, QrStatus};
pub use note::{ImageRef, NoteDraft, NoteKind, PublishRequest, PublishResult};
pub use status::Status;
