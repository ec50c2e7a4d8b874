// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS authentication

use md5::compute as md5_compute;

use crate::error::{AppError, Result};
use crate::routeros::reply::{Reply, ReplyWord};

use super::Session;

impl Session {
    /// Runs the login exchange on a freshly opened stream.
    ///
    /// Post-6.43 routers accept name and password in the first sentence and
    /// answer `!done`. Pre-6.43 routers answer `!done` with a `=ret=` hex
    /// challenge instead; the client then proves the password with
    /// `MD5(0x00 || password || challenge)` in a second `/login`. Both paths
    /// leave the session in the same authenticated state.
    pub(crate) async fn login(&mut self) -> Result<()> {
        let username = self.config.username.clone();
        let password = self.config.password.clone();
        tracing::trace!("Attempting login for user: {}", username);

        let replies = self
            .exchange(&[
                "/login".to_string(),
                format!("=name={username}"),
                format!("=password={password}"),
            ])
            .await?;
        check_trap(&replies)?;

        let challenge_hex = replies
            .iter()
            .find_map(|r| r.attributes.get("ret").cloned());
        let Some(challenge_hex) = challenge_hex else {
            tracing::debug!("Login successful");
            return Ok(());
        };

        // Legacy challenge-response (pre-6.43)
        tracing::trace!("Challenge received, length: {}", challenge_hex.len());
        let challenge = hex::decode(&challenge_hex)
            .map_err(|e| AppError::Protocol(format!("malformed login challenge: {e}")))?;

        // MD5 hash of 0 + password + challenge
        let mut data = Vec::with_capacity(1 + password.len() + challenge.len());
        data.push(0u8);
        data.extend_from_slice(password.as_bytes());
        data.extend_from_slice(&challenge);
        let digest = md5_compute(&data);
        let mut response = String::from("00");
        response.push_str(&hex::encode(digest.0));

        let replies = self
            .exchange(&[
                "/login".to_string(),
                format!("=name={username}"),
                format!("=response={response}"),
            ])
            .await?;
        check_trap(&replies)?;

        tracing::debug!("Login successful (legacy method)");
        Ok(())
    }
}

/// A `!trap` anywhere in the login exchange means refused credentials.
fn check_trap(replies: &[Reply]) -> Result<()> {
    for reply in replies {
        if reply.kind == ReplyWord::Trap {
            let message = reply
                .attributes
                .get("message")
                .cloned()
                .unwrap_or_else(|| "login refused".to_string());
            return Err(AppError::Auth(message));
        }
    }
    Ok(())
}
