//! `RouterOS` API client module
//!
//! This module speaks the `MikroTik` `RouterOS` API: length-prefixed words,
//! sentence framing, challenge/response login, and the CLI-to-wire command
//! translator.

mod command;
mod pool;
mod protocol;
mod reply;
mod session;
mod transport;

// Re-export public types and functions
pub use command::translate;
pub use pool::SessionPool;
pub use protocol::{MAX_WORD_LEN, encode_length};
pub use reply::{Attributes, Reply, ReplyWord, Word};
pub use session::{ReplyBuckets, Session};
pub use transport::TlsVerify;
