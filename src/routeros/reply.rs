// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Typed reply sentences
//!
//! Inbound sentences open with one of four reply words. Keeping them as an
//! enum makes the dispatcher's match exhaustive instead of comparing free
//! strings.

use std::collections::HashMap;

use crate::error::{AppError, Result};

/// Attribute bag of one reply sentence, keys stripped of the leading `=`.
pub type Attributes = HashMap<String, String>;

/// The first word of an inbound sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyWord {
    /// `!re` - one result record
    Re,
    /// `!done` - command finished
    Done,
    /// `!trap` - command failed, details in the attributes
    Trap,
    /// `!fatal` - session-level failure, the peer closes after sending it
    Fatal,
}

impl ReplyWord {
    pub(crate) fn parse(word: &str) -> Result<Self> {
        match word {
            "!re" => Ok(Self::Re),
            "!done" => Ok(Self::Done),
            "!trap" => Ok(Self::Trap),
            "!fatal" => Ok(Self::Fatal),
            other => Err(AppError::Protocol(format!(
                "unexpected reply word {other:?}"
            ))),
        }
    }
}

/// A single protocol word as read off the wire.
///
/// Payloads whose first byte is `0x80` or above are not valid UTF-8 command
/// text; they are kept as raw bytes so binary values survive unmangled.
/// Everything else is decoded with the replacement policy, so malformed text
/// never aborts the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    Text(String),
    Raw(Vec<u8>),
}

impl Word {
    #[must_use]
    pub fn from_wire(bytes: Vec<u8>) -> Self {
        match bytes.first() {
            Some(&b) if b >= 0x80 => Self::Raw(bytes),
            _ => Self::Text(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    /// The word as text, lossily decoded for raw payloads.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Raw(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

/// One parsed inbound sentence.
#[derive(Debug, Clone)]
pub struct Reply {
    pub kind: ReplyWord,
    pub attributes: Attributes,
}

impl Reply {
    /// Parses the words of one non-empty sentence.
    ///
    /// The first word must be a reply word; `=name=value` words fill the
    /// attribute bag. Bare trailing words (the reason text of a `!fatal`)
    /// are collected under the `message` key.
    pub(crate) fn parse(words: &[Vec<u8>]) -> Result<Self> {
        let first = words
            .first()
            .ok_or_else(|| AppError::Protocol("empty sentence has no reply word".into()))?;
        let first = match Word::from_wire(first.clone()) {
            Word::Text(s) => s,
            Word::Raw(_) => {
                return Err(AppError::Protocol(
                    "sentence does not open with a reply word".into(),
                ));
            }
        };
        let kind = ReplyWord::parse(&first)?;

        let mut attributes = Attributes::new();
        let mut message = String::new();
        for word in &words[1..] {
            let text = Word::from_wire(word.clone()).to_text();
            if let Some(stripped) = text.strip_prefix('=') {
                if let Some((k, v)) = stripped.split_once('=') {
                    attributes.insert(k.to_string(), v.to_string());
                }
            } else if text.starts_with('.') || text.starts_with('?') {
                // .tag= and query words carry no attribute data here
                continue;
            } else if !text.is_empty() {
                if !message.is_empty() {
                    message.push(' ');
                }
                message.push_str(&text);
            }
        }
        if !message.is_empty() {
            attributes.entry("message".to_string()).or_insert(message);
        }

        Ok(Self { kind, attributes })
    }
}
