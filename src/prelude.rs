// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for convenient use.
//! Users of the library can import everything they need with:
//!
//! ```rust
//! use routeros_client::prelude::*;
//! ```

// Core types
pub use crate::config::{Config, SessionConfig};
pub use crate::error::{AppError, Result};

// RouterOS client
pub use crate::routeros::{
    Attributes, ReplyBuckets, ReplyWord, Session, SessionPool, TlsVerify, Word, translate,
};
