// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! # RouterOS Client
//!
//! Client library for the MikroTik RouterOS API: a length-prefixed, binary,
//! session-oriented protocol spoken over TCP (optionally TLS-wrapped) on
//! ports 8728/8729.
//!
//! A [`Session`] connects, authenticates (plain or legacy challenge/response
//! login) and executes CLI-style command strings, collecting `!re` replies
//! into per-command stdout buckets and `!trap` replies into stderr buckets.
//!
//! ## Main modules
//! - `config`: configuration management
//! - `error`: error types
//! - `routeros`: wire framing, command translation, session and pool
//! - `prelude`: commonly used types and traits

mod config;
mod error;
mod routeros;
pub mod prelude;

// Re-export commonly used types
/// Application configuration
pub use config::{Config, SessionConfig};

/// Application error and result type
pub use error::{AppError, Result};

/// RouterOS session, pool and reply types
pub use routeros::{
    Attributes, Reply, ReplyBuckets, ReplyWord, Session, SessionPool, TlsVerify, Word,
};

/// CLI-to-wire command translation
pub use routeros::translate;

/// RouterOS wire protocol length encoding (public for tests)
pub use routeros::{MAX_WORD_LEN, encode_length};
