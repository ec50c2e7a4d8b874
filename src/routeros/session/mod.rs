// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS API session and command dispatcher
//!
//! A `Session` exclusively owns one byte stream. Every operation takes
//! `&mut self`, so the single-caller contract is enforced at compile time:
//! two tasks cannot interleave sentences on the same session.

mod auth;

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::config::SessionConfig;
use crate::error::{AppError, Result};

use super::command::translate;
use super::protocol;
use super::reply::{Attributes, Reply, ReplyWord};
use super::transport::ApiStream;

/// Connection timeout (5 seconds)
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Receive timeout while probing liveness (2 seconds)
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Short command used as the liveness probe
const PROBE_COMMAND: &str = "/system/identity/print";

/// Per-command reply buckets of the most recent `execute` call.
///
/// The three sequences always have one slot per submitted command: `stdin`
/// echoes the translated words, `stdout` collects `!re` attributes, `stderr`
/// collects `!trap` attributes.
#[derive(Debug, Clone, Default)]
pub struct ReplyBuckets {
    pub stdin: Vec<Vec<String>>,
    pub stdout: Vec<Vec<Attributes>>,
    pub stderr: Vec<Vec<Attributes>>,
}

/// One authenticated RouterOS API session
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    stream: Option<ApiStream>,
    recv_timeout: Duration,
    error_log: Vec<String>,
    buckets: ReplyBuckets,
}

impl Session {
    /// Creates a session in the disconnected state.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let recv_timeout = config.recv_timeout();
        Self {
            config,
            stream: None,
            recv_timeout,
            error_log: Vec::new(),
            buckets: ReplyBuckets::default(),
        }
    }

    /// Whether the session currently holds a stream.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Opens the transport and authenticates.
    ///
    /// # Errors
    ///
    /// Configuration problems surface as `AppError::Config` before any I/O;
    /// transport and login failures release the stream, append a diagnostic
    /// to the error log and return the underlying error.
    pub async fn connect(&mut self) -> Result<()> {
        if let Err(e) = self.config.validate() {
            return Err(AppError::Config(e));
        }
        let (host, port) = self.config.endpoint()?;

        let tls = self.config.tls();
        match ApiStream::open(&host, port, tls.as_ref(), CONNECTION_TIMEOUT).await {
            Ok(stream) => self.stream = Some(stream),
            Err(e) => {
                self.log_error(format!("connect to {host}:{port} failed: {e}"));
                return Err(e);
            }
        }

        if let Err(e) = self.login().await {
            self.log_error(format!(
                "login as '{}' on {host}:{port} failed: {e}",
                self.config.username
            ));
            self.release_stream().await;
            return Err(e);
        }

        tracing::debug!(
            "Session '{}' connected to {}:{}",
            self.config.name,
            host,
            port
        );
        Ok(())
    }

    /// Closes the stream. Idempotent; a close error is logged but the
    /// stream is released regardless.
    pub async fn disconnect(&mut self) {
        self.release_stream().await;
    }

    /// Probes the router with a short command under a 2 second receive
    /// timeout. Returns false and releases the stream on any failure.
    pub async fn is_alive(&mut self) -> bool {
        if self.stream.is_none() {
            return false;
        }
        let saved = self.recv_timeout;
        self.recv_timeout = PROBE_TIMEOUT;
        let probe = self.probe().await;
        self.recv_timeout = saved;

        match probe {
            Ok(seen) => seen,
            Err(e) => {
                self.log_error(format!("liveness probe failed: {e}"));
                self.release_stream().await;
                false
            }
        }
    }

    async fn probe(&mut self) -> Result<bool> {
        self.write_words(&[PROBE_COMMAND.to_string()]).await?;
        let mut seen = false;
        loop {
            let reply = self.read_reply().await?;
            seen = true;
            match reply.kind {
                ReplyWord::Done => return Ok(seen),
                ReplyWord::Fatal => return Err(fatal_error(&reply)),
                ReplyWord::Re | ReplyWord::Trap => {}
            }
        }
    }

    /// Translates and runs each command in order, collecting `!re` replies
    /// into stdout buckets and `!trap` replies into stderr buckets.
    ///
    /// Reconnects first when the liveness probe fails; if that reconnect
    /// fails the buckets stay cleared and false is returned. Returns true
    /// iff every command completed without a trap. Transport and protocol
    /// failures release the stream, are appended to the error log, and the
    /// remaining commands are attempted over a fresh connection.
    pub async fn execute<S: AsRef<str>>(&mut self, commands: &[S]) -> bool {
        self.buckets = ReplyBuckets::default();

        if !self.is_alive().await {
            self.disconnect().await;
            if self.connect().await.is_err() {
                return false;
            }
        }

        let mut ok = true;
        for command in commands {
            let command = command.as_ref();
            let words = translate(command);
            self.buckets.stdin.push(words.clone());
            self.buckets.stdout.push(Vec::new());
            self.buckets.stderr.push(Vec::new());
            let slot = self.buckets.stdout.len() - 1;

            // empty translation is a no-op, never an empty sentence
            if words.is_empty() {
                continue;
            }

            if self.stream.is_none() && self.connect().await.is_err() {
                ok = false;
                continue;
            }

            match self.run_command(slot, &words).await {
                Ok(clean) => ok &= clean,
                Err(e) => {
                    self.log_error(format!("command '{command}' failed: {e}"));
                    self.release_stream().await;
                    ok = false;
                }
            }
        }
        ok
    }

    /// Convenience wrapper for a single command string.
    pub async fn execute_one(&mut self, command: &str) -> bool {
        self.execute(&[command]).await
    }

    /// The stdout and stderr buckets of the most recent `execute`.
    #[must_use]
    pub fn outputs(&self) -> (&[Vec<Attributes>], &[Vec<Attributes>]) {
        (&self.buckets.stdout, &self.buckets.stderr)
    }

    /// All three reply buckets of the most recent `execute`.
    #[must_use]
    pub fn buckets(&self) -> &ReplyBuckets {
        &self.buckets
    }

    /// Session-level diagnostics accumulated since creation.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.error_log
    }

    async fn run_command(&mut self, slot: usize, words: &[String]) -> Result<bool> {
        tracing::debug!("Executing: {}", words[0]);
        self.write_words(words).await?;

        let mut clean = true;
        loop {
            let reply = self.read_reply().await?;
            match reply.kind {
                ReplyWord::Re => self.buckets.stdout[slot].push(reply.attributes),
                ReplyWord::Trap => {
                    tracing::debug!(
                        "Trap for {}: {:?}",
                        words[0],
                        reply.attributes.get("message")
                    );
                    self.buckets.stderr[slot].push(reply.attributes);
                    clean = false;
                }
                ReplyWord::Done => return Ok(clean),
                // the router closes the stream after !fatal
                ReplyWord::Fatal => return Err(fatal_error(&reply)),
            }
        }
    }

    /// Writes one sentence, reads replies until `!done` and returns all of
    /// them (the `!done` sentence included, it may carry attributes).
    pub(super) async fn exchange(&mut self, words: &[String]) -> Result<Vec<Reply>> {
        self.write_words(words).await?;
        let mut replies = Vec::new();
        loop {
            let reply = self.read_reply().await?;
            match reply.kind {
                ReplyWord::Done => {
                    replies.push(reply);
                    return Ok(replies);
                }
                ReplyWord::Fatal => return Err(fatal_error(&reply)),
                ReplyWord::Re | ReplyWord::Trap => replies.push(reply),
            }
        }
    }

    pub(super) async fn write_words(&mut self, words: &[String]) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(AppError::ConnectionClosed)?;
        for w in words {
            tracing::trace!("Sending word: {}", w);
        }
        protocol::write_sentence(stream, words).await
    }

    /// Reads the next non-empty sentence, bounded by the receive timeout.
    pub(super) async fn read_reply(&mut self) -> Result<Reply> {
        let deadline = self.recv_timeout;
        let stream = self.stream.as_mut().ok_or(AppError::ConnectionClosed)?;
        loop {
            let words = timeout(deadline, protocol::read_sentence(stream))
                .await
                .map_err(|_| AppError::Timeout(deadline))??;
            if words.is_empty() {
                continue;
            }
            let reply = Reply::parse(&words)?;
            tracing::trace!("Received {:?} with {} attributes", reply.kind, reply.attributes.len());
            return Ok(reply);
        }
    }

    async fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                self.error_log.push(format!("error closing stream: {e}"));
                tracing::debug!("Stream shutdown error: {}", e);
            }
        }
    }

    fn log_error(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.error_log.push(message);
    }
}

fn fatal_error(reply: &Reply) -> AppError {
    let message = reply
        .attributes
        .get("message")
        .cloned()
        .unwrap_or_else(|| "no reason given".to_string());
    AppError::Protocol(format!("fatal reply from router: {message}"))
}
