// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Shared mock RouterOS server pieces for integration tests

use routeros_client::SessionConfig;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads one length prefix. The mock only ever sees short test words, so
/// the one and two byte forms are enough.
pub async fn read_len<S>(stream: &mut S) -> Option<usize>
where
    S: AsyncRead + Unpin,
{
    let first = stream.read_u8().await.ok()?;
    if first & 0x80 == 0 {
        Some(first as usize)
    } else if first & 0xC0 == 0x80 {
        let second = stream.read_u8().await.ok()?;
        Some((((first & 0x3F) as usize) << 8) + second as usize)
    } else {
        panic!("mock server got an unexpectedly long word");
    }
}

/// Reads one sentence; `None` once the peer hangs up.
pub async fn read_sentence<S>(stream: &mut S) -> Option<Vec<String>>
where
    S: AsyncRead + Unpin,
{
    let mut words = Vec::new();
    loop {
        let len = read_len(stream).await?;
        if len == 0 {
            return Some(words);
        }
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await.ok()?;
        words.push(String::from_utf8_lossy(&buf).into_owned());
    }
}

pub async fn write_sentence<S>(stream: &mut S, words: &[&str])
where
    S: AsyncWrite + Unpin,
{
    for word in words {
        let bytes = word.as_bytes();
        assert!(bytes.len() < 0x80, "mock reply word too long");
        stream.write_all(&[bytes.len() as u8]).await.unwrap();
        stream.write_all(bytes).await.unwrap();
    }
    stream.write_all(&[0]).await.unwrap();
    stream.flush().await.unwrap();
}

/// Serves login plus a canned command set on one accepted connection:
/// `/system/identity/print` answers with one `!re`, anything else traps.
pub async fn serve_commands<S>(stream: &mut S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(words) = read_sentence(stream).await {
        match words.first().map(String::as_str) {
            Some("/login") => write_sentence(stream, &["!done"]).await,
            Some("/system/identity/print") => {
                write_sentence(stream, &["!re", "=name=MikroTik"]).await;
                write_sentence(stream, &["!done"]).await;
            }
            Some(_) => {
                write_sentence(stream, &["!trap", "=message=no such command prefix"]).await;
                write_sentence(stream, &["!done"]).await;
            }
            None => break,
        }
    }
}

/// Session config pointed at a mock listener.
pub fn session_config(address: &str) -> SessionConfig {
    SessionConfig {
        name: "mock".to_string(),
        address: address.to_string(),
        username: "admin".to_string(),
        password: "secret".to_string(),
        use_tls: false,
        tls_ca: None,
        recv_timeout_secs: 5.0,
    }
}
