// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Configuration module for the RouterOS API client
//!
//! Loads and parses configuration from environment variables and JSON.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::routeros::TlsVerify;


/// Default configuration values
pub mod defaults {
    /// RouterOS API port, cleartext
    pub const API_PORT: u16 = 8728;
    /// RouterOS API port, TLS
    pub const API_TLS_PORT: u16 = 8729;
    pub const ROUTEROS_USERNAME: &str = "admin";
    pub const ROUTEROS_PASSWORD: &str = "";
    pub const RECV_TIMEOUT_SECS: f64 = 30.0;
}

/// Environment variable names used by the application
pub mod env_vars {
    pub const SESSIONS_CONFIG: &str = "SESSIONS_CONFIG";
    pub const ROUTEROS_ADDRESS: &str = "ROUTEROS_ADDRESS";
    pub const ROUTEROS_USERNAME: &str = "ROUTEROS_USERNAME";
    pub const ROUTEROS_PASSWORD: &str = "ROUTEROS_PASSWORD";
    pub const ROUTEROS_USE_TLS: &str = "ROUTEROS_USE_TLS";
    pub const ROUTEROS_TLS_CA: &str = "ROUTEROS_TLS_CA";
    pub const ROUTEROS_RECV_TIMEOUT_SECS: &str = "ROUTEROS_RECV_TIMEOUT_SECS";
}

fn default_recv_timeout() -> f64 {
    defaults::RECV_TIMEOUT_SECS
}

/// Configuration for a single RouterOS API session
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub name: String,
    /// `host`, `host:port`, `[v6]` or `[v6]:port`; the port defaults to
    /// 8728, or 8729 when TLS is enabled
    pub address: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub use_tls: bool,
    /// PEM trust roots; when absent a TLS session accepts any certificate
    /// (the RouterOS self-signed default)
    #[serde(default)]
    pub tls_ca: Option<PathBuf>,
    #[serde(default = "default_recv_timeout")]
    pub recv_timeout_secs: f64,
}

impl SessionConfig {
    /// Validates session configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Session name cannot be empty".to_string());
        }

        if self.address.trim().is_empty() {
            return Err(format!("Address cannot be empty for session '{}'", self.name));
        }

        if self.username.trim().is_empty() {
            return Err(format!(
                "Username cannot be empty for session '{}'",
                self.name
            ));
        }

        if self.recv_timeout_secs <= 0.0 {
            return Err(format!(
                "Receive timeout must be positive for session '{}'",
                self.name
            ));
        }

        // surface address errors at validation time, not at connect
        if let Err(e) = self.endpoint() {
            return Err(e.to_string());
        }

        Ok(())
    }

    /// Splits `address` into host and port, applying the default API port.
    ///
    /// Accepts IPv4, hostnames, bracketed IPv6 (`[::1]:8728`) and bare IPv6
    /// literals (which cannot carry a port).
    pub fn endpoint(&self) -> Result<(String, u16)> {
        let addr = self.address.trim();
        if addr.is_empty() {
            return Err(AppError::Config("empty address".to_string()));
        }

        if let Some(rest) = addr.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(|| {
                AppError::Config(format!("unclosed '[' in address '{addr}'"))
            })?;
            let port = match tail.strip_prefix(':') {
                Some(p) => p.parse::<u16>().map_err(|_| {
                    AppError::Config(format!("invalid port in address '{addr}'"))
                })?,
                None if tail.is_empty() => self.default_port(),
                None => {
                    return Err(AppError::Config(format!(
                        "unexpected trailing characters in address '{addr}'"
                    )));
                }
            };
            return Ok((host.to_string(), port));
        }

        // exactly one ':' means host:port; more means a bare IPv6 literal
        if addr.matches(':').count() == 1 {
            let (host, port) = addr.split_once(':').unwrap_or((addr, ""));
            let port = port
                .parse::<u16>()
                .map_err(|_| AppError::Config(format!("invalid port in address '{addr}'")))?;
            Ok((host.to_string(), port))
        } else {
            Ok((addr.to_string(), self.default_port()))
        }
    }

    fn default_port(&self) -> u16 {
        if self.use_tls {
            defaults::API_TLS_PORT
        } else {
            defaults::API_PORT
        }
    }

    /// The TLS policy for this session, `None` for cleartext.
    #[must_use]
    pub fn tls(&self) -> Option<TlsVerify> {
        if !self.use_tls {
            return None;
        }
        Some(match &self.tls_ca {
            Some(path) => TlsVerify::CaFile(path.clone()),
            None => TlsVerify::AcceptAny,
        })
    }

    /// Receive timeout as a `Duration`.
    #[must_use]
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.recv_timeout_secs)
    }
}

/// Application-wide configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub sessions: Vec<SessionConfig>,
}

impl Config {
    /// Loads configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        // Load session configuration from JSON
        let sessions = if let Ok(config_json) = std::env::var(env_vars::SESSIONS_CONFIG) {
            serde_json::from_str(&config_json).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse SESSIONS_CONFIG: {}. Using empty list.", e);
                vec![]
            })
        } else {
            // Fallback: use plain environment variables for a single session
            let address = std::env::var(env_vars::ROUTEROS_ADDRESS).ok();
            let username = std::env::var(env_vars::ROUTEROS_USERNAME)
                .unwrap_or_else(|_| defaults::ROUTEROS_USERNAME.to_string());
            let password = std::env::var(env_vars::ROUTEROS_PASSWORD)
                .unwrap_or_else(|_| defaults::ROUTEROS_PASSWORD.to_string());
            let use_tls = std::env::var(env_vars::ROUTEROS_USE_TLS)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
            let tls_ca = std::env::var(env_vars::ROUTEROS_TLS_CA).ok().map(Into::into);
            let recv_timeout_secs = std::env::var(env_vars::ROUTEROS_RECV_TIMEOUT_SECS)
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(defaults::RECV_TIMEOUT_SECS);

            if let Some(addr) = address {
                vec![SessionConfig {
                    name: "default".to_string(),
                    address: addr,
                    username,
                    password,
                    use_tls,
                    tls_ca,
                    recv_timeout_secs,
                }]
            } else {
                tracing::warn!("No session configuration found. Set ROUTEROS_ADDRESS.");
                vec![]
            }
        };

        // Validate all session configurations
        for session in &sessions {
            if let Err(e) = session.validate() {
                tracing::error!("Invalid session configuration: {}", e);
                tracing::warn!("Skipping invalid session: {}", session.name);
            }
        }

        Config { sessions }
    }
}
