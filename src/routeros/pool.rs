// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Session pool for reusing authenticated RouterOS sessions
//!
//! Sessions are checked out exclusively and returned after use, so the
//! single-caller contract of `Session` carries over: a pooled session is
//! never visible to two tasks at once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::SessionConfig;
use crate::error::{AppError, Result};

use super::session::Session;

/// Pool of idle authenticated sessions, keyed by `address:username`
pub struct SessionPool {
    sessions: Arc<Mutex<HashMap<String, PooledSession>>>,
    session_states: Arc<Mutex<HashMap<String, SessionState>>>,
    max_idle_time: Duration,
}

struct PooledSession {
    session: Session,
    last_used: tokio::time::Instant,
}

/// Tracks session health and error state
#[derive(Clone)]
struct SessionState {
    consecutive_errors: u32,
    last_error_time: Option<tokio::time::Instant>,
    last_success_time: Option<tokio::time::Instant>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            consecutive_errors: 0,
            last_error_time: None,
            last_success_time: None,
        }
    }

    fn record_success(&mut self) {
        self.consecutive_errors = 0;
        self.last_success_time = Some(tokio::time::Instant::now());
    }

    fn record_error(&mut self) {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.last_error_time = Some(tokio::time::Instant::now());
    }

    fn backoff_delay(&self) -> Duration {
        // Exponential backoff: 2^n seconds, max 5 minutes
        let base_delay = 2u64.pow(self.consecutive_errors.min(8));
        Duration::from_secs(base_delay.min(300))
    }

    fn should_skip_attempt(&self) -> bool {
        // Skip if we've had many consecutive errors and not enough time has passed
        if self.consecutive_errors < 3 {
            return false;
        }

        if let Some(last_error) = self.last_error_time {
            last_error.elapsed() < self.backoff_delay()
        } else {
            false
        }
    }
}

fn pool_key(config: &SessionConfig) -> String {
    format!("{}:{}", config.address, config.username)
}

impl Default for SessionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionPool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            session_states: Arc::new(Mutex::new(HashMap::new())),
            max_idle_time: Duration::from_secs(300), // 5 minutes
        }
    }

    /// Checks out an authenticated session, reusing an idle one when fresh
    /// enough and connecting a new one otherwise.
    ///
    /// Endpoints with three or more consecutive failures are skipped until
    /// their exponential backoff delay has passed.
    ///
    /// # Errors
    ///
    /// Returns the connect/login error, or `AppError::Session` while the
    /// endpoint is in backoff.
    pub async fn get_session(&self, config: &SessionConfig) -> Result<Session> {
        let key = pool_key(config);

        tracing::trace!("Requesting session for key: {}", key);

        // Check session state and apply backoff if needed
        {
            let mut states = self.session_states.lock().await;
            let state = states.entry(key.clone()).or_insert_with(SessionState::new);

            if state.should_skip_attempt() {
                let delay = state.backoff_delay();
                tracing::debug!(
                    "Skipping connection attempt to {} (backoff: {} consecutive errors, delay: {:?})",
                    config.address,
                    state.consecutive_errors,
                    delay
                );
                return Err(AppError::Session(format!(
                    "Connection to {} temporarily disabled due to {} consecutive errors",
                    config.address, state.consecutive_errors
                )));
            }
        }

        // Check if we have an idle session that has not expired
        {
            let mut pool = self.sessions.lock().await;
            if let Some(pooled) = pool.get(&key) {
                if pooled.last_used.elapsed() < self.max_idle_time {
                    tracing::debug!("Reusing session from pool for {}", config.address);
                    if let Some(pooled) = pool.remove(&key) {
                        return Ok(pooled.session);
                    }
                } else {
                    tracing::debug!("Session expired for {}, removing", config.address);
                    pool.remove(&key);
                }
            }
        }

        // Create a new session
        tracing::debug!("Creating new session for {}", config.address);
        let mut session = Session::new(config.clone());
        match session.connect().await {
            Ok(()) => {
                tracing::trace!("Login successful, session ready");
                let mut states = self.session_states.lock().await;
                if let Some(state) = states.get_mut(&key) {
                    state.record_success();
                }
                Ok(session)
            }
            Err(e) => {
                tracing::trace!("Connection failed: {}", e);
                let mut states = self.session_states.lock().await;
                if let Some(state) = states.get_mut(&key) {
                    state.record_error();
                    tracing::trace!(
                        "Connection error recorded, consecutive errors: {}",
                        state.consecutive_errors
                    );
                }
                Err(e)
            }
        }
    }

    /// Record successful operation
    pub async fn record_success(&self, config: &SessionConfig) {
        let mut states = self.session_states.lock().await;
        let state = states
            .entry(pool_key(config))
            .or_insert_with(SessionState::new);
        state.record_success();
    }

    /// Record failed operation
    pub async fn record_error(&self, config: &SessionConfig) {
        let mut states = self.session_states.lock().await;
        let state = states
            .entry(pool_key(config))
            .or_insert_with(SessionState::new);
        state.record_error();
    }

    /// Get session state (consecutive errors, ever succeeded)
    pub async fn get_session_state(&self, config: &SessionConfig) -> Option<(u32, bool)> {
        let states = self.session_states.lock().await;
        states
            .get(&pool_key(config))
            .map(|state| (state.consecutive_errors, state.last_success_time.is_some()))
    }

    /// Number of idle sessions currently pooled
    pub async fn idle_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Returns a session to the pool for later reuse
    pub async fn release_session(&self, config: &SessionConfig, session: Session) {
        let mut pool = self.sessions.lock().await;

        tracing::debug!("Returning session to pool for {}", config.address);
        pool.insert(
            pool_key(config),
            PooledSession {
                session,
                last_used: tokio::time::Instant::now(),
            },
        );
    }

    /// Clean up expired sessions
    pub async fn cleanup(&self) {
        let mut pool = self.sessions.lock().await;
        pool.retain(|key, pooled| {
            let should_keep = pooled.last_used.elapsed() < self.max_idle_time;
            if !should_keep {
                tracing::debug!("Cleaning up expired session: {}", key);
            }
            should_keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults;

    fn config() -> SessionConfig {
        SessionConfig {
            name: "test".to_string(),
            address: "192.168.1.1".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            use_tls: false,
            tls_ca: None,
            recv_timeout_secs: defaults::RECV_TIMEOUT_SECS,
        }
    }

    #[test]
    fn test_session_state_new() {
        let state = SessionState::new();
        assert_eq!(state.consecutive_errors, 0);
        assert!(state.last_error_time.is_none());
        assert!(state.last_success_time.is_none());
    }

    #[test]
    fn test_session_state_record_success() {
        let mut state = SessionState::new();
        state.consecutive_errors = 5;

        state.record_success();

        assert_eq!(state.consecutive_errors, 0);
        assert!(state.last_success_time.is_some());
    }

    #[test]
    fn test_session_state_record_error() {
        let mut state = SessionState::new();

        state.record_error();
        assert_eq!(state.consecutive_errors, 1);
        assert!(state.last_error_time.is_some());

        state.record_error();
        assert_eq!(state.consecutive_errors, 2);
    }

    #[test]
    fn test_session_state_backoff_delay() {
        let mut state = SessionState::new();

        // 0 errors -> 2^0 = 1 second
        assert_eq!(state.backoff_delay(), Duration::from_secs(1));

        // After 1 error -> 2^1 = 2 seconds
        state.record_error();
        assert_eq!(state.backoff_delay(), Duration::from_secs(2));

        // After 2 errors -> 2^2 = 4 seconds
        state.record_error();
        assert_eq!(state.backoff_delay(), Duration::from_secs(4));

        // After 8 errors -> 2^8 = 256 seconds (max power before capping)
        for _ in 0..6 {
            state.record_error();
        }
        assert_eq!(state.consecutive_errors, 8);
        assert_eq!(state.backoff_delay(), Duration::from_secs(256));

        // After 9+ errors -> still 2^8 = 256 due to min(8) in formula
        state.record_error();
        assert_eq!(state.backoff_delay(), Duration::from_secs(256));
    }

    #[test]
    fn test_session_state_should_skip_attempt() {
        let mut state = SessionState::new();

        // Less than 3 errors -> should not skip
        assert!(!state.should_skip_attempt());

        state.record_error();
        assert!(!state.should_skip_attempt());

        state.record_error();
        assert!(!state.should_skip_attempt());

        // 3 errors -> should skip (backoff)
        state.record_error();
        assert!(state.should_skip_attempt());
    }

    #[test]
    fn test_pool_new() {
        let pool = SessionPool::new();
        assert_eq!(pool.max_idle_time, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_pool_starts_empty() {
        let pool = SessionPool::new();
        assert_eq!(pool.idle_count().await, 0);
    }

    #[tokio::test]
    async fn test_record_success() {
        let pool = SessionPool::new();
        pool.record_success(&config()).await;

        let states = pool.session_states.lock().await;
        let key = "192.168.1.1:admin";
        assert!(states.contains_key(key));
        assert_eq!(states[key].consecutive_errors, 0);
    }

    #[tokio::test]
    async fn test_record_error() {
        let pool = SessionPool::new();
        pool.record_error(&config()).await;

        let states = pool.session_states.lock().await;
        let key = "192.168.1.1:admin";
        assert!(states.contains_key(key));
        assert_eq!(states[key].consecutive_errors, 1);
    }

    #[tokio::test]
    async fn test_get_session_state() {
        let pool = SessionPool::new();
        pool.record_error(&config()).await;
        pool.record_error(&config()).await;

        let result = pool.get_session_state(&config()).await;
        assert!(result.is_some());

        let (errors, has_success) = result.unwrap();
        assert_eq!(errors, 2);
        assert!(!has_success);
    }

    #[tokio::test]
    async fn test_backoff_blocks_checkout() {
        let pool = SessionPool::new();
        for _ in 0..3 {
            pool.record_error(&config()).await;
        }

        let err = pool.get_session(&config()).await.unwrap_err();
        assert!(matches!(err, AppError::Session(_)));
    }

    #[tokio::test]
    async fn test_release_and_reuse() {
        let pool = SessionPool::new();
        let session = Session::new(config());
        pool.release_session(&config(), session).await;
        assert_eq!(pool.idle_count().await, 1);

        // checked out session leaves the pool
        let reused = pool.get_session(&config()).await.unwrap();
        assert_eq!(pool.idle_count().await, 0);
        assert!(!reused.is_connected());
    }

    #[tokio::test]
    async fn test_cleanup_empty_pool() {
        let pool = SessionPool::new();
        pool.cleanup().await;
        assert_eq!(pool.idle_count().await, 0);
    }
}
