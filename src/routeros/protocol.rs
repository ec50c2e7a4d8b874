// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS wire framing: length codec, word I/O, sentence I/O
//!
//! Every word on the wire is a length prefix followed by that many payload
//! bytes. A zero-length word terminates a sentence. The routines here are
//! generic over the byte stream so they run identically on `TcpStream`, a TLS
//! stream or an in-memory buffer.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{AppError, Result};

/// Longest word the protocol can frame (2^28 - 1 bytes).
pub const MAX_WORD_LEN: u32 = 0x0FFF_FFFF;

// RouterOS protocol length encoding - intentional truncation is part of the wire format
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn encode_length(len: u32) -> Vec<u8> {
    if len < 0x80 {
        vec![len as u8]
    } else if len < 0x4000 {
        vec![((len >> 8) as u8) | 0x80, (len & 0xFF) as u8]
    } else if len < 0x0020_0000 {
        vec![
            ((len >> 16) as u8) | 0xC0,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    } else if len < 0x1000_0000 {
        vec![
            ((len >> 24) as u8) | 0xE0,
            ((len >> 16) & 0xFF) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    } else {
        vec![
            0xF0,
            ((len >> 24) & 0xFF) as u8,
            ((len >> 16) & 0xFF) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    }
}

/// Decodes a length prefix from the stream.
///
/// The number of continuation bytes is determined by the high bits of the
/// first byte; in the five-byte form the first byte carries no length bits.
pub(crate) async fn read_length<R>(stream: &mut R) -> Result<u32>
where
    R: AsyncRead + Unpin,
{
    let first = stream.read_u8().await.map_err(map_eof)?;
    let len = if first & 0x80 == 0 {
        u32::from(first)
    } else if first & 0xC0 == 0x80 {
        let second = stream.read_u8().await.map_err(map_eof)?;
        (u32::from(first & 0x3F) << 8) + u32::from(second)
    } else if first & 0xE0 == 0xC0 {
        let second = stream.read_u8().await.map_err(map_eof)?;
        let third = stream.read_u8().await.map_err(map_eof)?;
        (u32::from(first & 0x1F) << 16) + (u32::from(second) << 8) + u32::from(third)
    } else if first & 0xF0 == 0xE0 {
        let second = stream.read_u8().await.map_err(map_eof)?;
        let third = stream.read_u8().await.map_err(map_eof)?;
        let fourth = stream.read_u8().await.map_err(map_eof)?;
        (u32::from(first & 0x0F) << 24)
            + (u32::from(second) << 16)
            + (u32::from(third) << 8)
            + u32::from(fourth)
    } else if first & 0xF8 == 0xF0 {
        // five byte length: the first byte is discarded entirely
        let b2 = stream.read_u8().await.map_err(map_eof)?;
        let b3 = stream.read_u8().await.map_err(map_eof)?;
        let b4 = stream.read_u8().await.map_err(map_eof)?;
        let b5 = stream.read_u8().await.map_err(map_eof)?;
        u32::from(b2) << 24 | u32::from(b3) << 16 | u32::from(b4) << 8 | u32::from(b5)
    } else {
        // 0xF8..=0xFF is reserved for control bytes
        return Err(AppError::Protocol(format!(
            "invalid length prefix byte {first:#04x}"
        )));
    };
    Ok(len)
}

/// Writes one word: length prefix followed by the payload bytes.
pub(crate) async fn write_word<W>(stream: &mut W, word: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(word.len())
        .ok()
        .filter(|&l| l <= MAX_WORD_LEN)
        .ok_or_else(|| {
            AppError::Protocol(format!("word of {} bytes exceeds wire maximum", word.len()))
        })?;
    stream.write_all(&encode_length(len)).await?;
    stream.write_all(word).await?;
    Ok(())
}

/// Reads one word. A zero length prefix yields the empty word.
pub(crate) async fn read_word<R>(stream: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let len = read_length(stream).await?;
    if len == 0 {
        return Ok(Vec::new());
    }
    if len > MAX_WORD_LEN {
        return Err(AppError::Protocol(format!(
            "declared word length {len:#x} exceeds wire maximum"
        )));
    }
    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf).await.map_err(map_eof)?;
    Ok(buf)
}

/// Writes the words of one sentence followed by the empty terminator word.
/// Returns the number of words written (terminator excluded).
pub(crate) async fn write_sentence<W, S>(stream: &mut W, words: &[S]) -> Result<usize>
where
    W: AsyncWrite + Unpin,
    S: AsRef<[u8]>,
{
    for w in words {
        write_word(stream, w.as_ref()).await?;
    }
    // zero length word terminator
    stream.write_all(&[0]).await?;
    // TLS streams may hold ciphertext until flushed
    stream.flush().await?;
    Ok(words.len())
}

/// Reads words until the empty terminator word arrives.
///
/// An immediate terminator is valid and yields an empty sentence.
pub(crate) async fn read_sentence<R>(stream: &mut R) -> Result<Vec<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut words = Vec::new();
    loop {
        let word = read_word(stream).await?;
        if word.is_empty() {
            return Ok(words);
        }
        words.push(word);
    }
}

/// A short read means the peer went away mid-frame.
fn map_eof(e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        AppError::ConnectionClosed
    } else {
        AppError::Io(e)
    }
}
