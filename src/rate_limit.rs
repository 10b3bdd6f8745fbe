//! In-memory rate limiting for generation requests.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<String, VecDeque<Instant>>`,
//! keyed by the caller's client key (authenticated email or `X-Client-Id`).
//! Three limits are enforced:
//! - Per-client: 10 generation requests/min
//! - Global: 20 generation requests/min
//! - Token budget: 50k LLM tokens/client/hour
//!
//! TRADE-OFFS
//! ==========
//! Token budgeting uses reservations so concurrent generations cannot
//! oversubscribe a quota. A [`TokenReservation`] is released when dropped
//! unless it was settled with actual usage, so a failed or cancelled
//! request never keeps budget locked.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::{ConfigError, parse_var};
use crate::error::ErrorCode;

const DEFAULT_PER_CLIENT_LIMIT: usize = 10;
const DEFAULT_PER_CLIENT_WINDOW_SECS: u64 = 60;

const DEFAULT_GLOBAL_LIMIT: usize = 20;
const DEFAULT_GLOBAL_WINDOW_SECS: u64 = 60;

const DEFAULT_TOKEN_BUDGET: u64 = 50_000;
const DEFAULT_TOKEN_WINDOW_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_client_limit: usize,
    pub per_client_window: Duration,
    pub global_limit: usize,
    pub global_window: Duration,
    pub token_budget: u64,
    pub token_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_client_limit: DEFAULT_PER_CLIENT_LIMIT,
            per_client_window: Duration::from_secs(DEFAULT_PER_CLIENT_WINDOW_SECS),
            global_limit: DEFAULT_GLOBAL_LIMIT,
            global_window: Duration::from_secs(DEFAULT_GLOBAL_WINDOW_SECS),
            token_budget: DEFAULT_TOKEN_BUDGET,
            token_window: Duration::from_secs(DEFAULT_TOKEN_WINDOW_SECS),
        }
    }
}

impl RateLimitConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparseable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let per_client_window_secs =
            parse_var(&lookup, "RATE_LIMIT_PER_CLIENT_WINDOW_SECS", DEFAULT_PER_CLIENT_WINDOW_SECS)?;
        let global_window_secs = parse_var(&lookup, "RATE_LIMIT_GLOBAL_WINDOW_SECS", DEFAULT_GLOBAL_WINDOW_SECS)?;
        let token_window_secs = parse_var(&lookup, "RATE_LIMIT_TOKEN_WINDOW_SECS", DEFAULT_TOKEN_WINDOW_SECS)?;

        Ok(Self {
            per_client_limit: parse_var(&lookup, "RATE_LIMIT_PER_CLIENT", DEFAULT_PER_CLIENT_LIMIT)?,
            per_client_window: Duration::from_secs(per_client_window_secs),
            global_limit: parse_var(&lookup, "RATE_LIMIT_GLOBAL", DEFAULT_GLOBAL_LIMIT)?,
            global_window: Duration::from_secs(global_window_secs),
            token_budget: parse_var(&lookup, "RATE_LIMIT_TOKEN_BUDGET", DEFAULT_TOKEN_BUDGET)?,
            token_window: Duration::from_secs(token_window_secs),
        })
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum RateLimitError {
    #[error("per-client rate limit exceeded (max {limit} requests/{window_secs}s)")]
    PerClientExceeded { limit: usize, window_secs: u64 },
    #[error("global rate limit exceeded (max {limit} requests/{window_secs}s)")]
    GlobalExceeded { limit: usize, window_secs: u64 },
    #[error("token budget exceeded (max {budget} tokens/{window_secs}s)")]
    TokenBudgetExceeded { budget: u64, window_secs: u64 },
}

impl ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        "E_RATE_LIMITED"
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
    config: RateLimitConfig,
}

#[derive(Default)]
struct RateLimiterInner {
    /// Per-client request timestamps.
    client_requests: HashMap<String, VecDeque<Instant>>,
    /// Global request timestamps.
    global_requests: VecDeque<Instant>,
    /// Per-client token usage: (timestamp, `token_count`).
    client_tokens: HashMap<String, VecDeque<(Instant, u64)>>,
    /// Per-client in-flight token reservations: (timestamp, reserved tokens).
    client_token_reservations: HashMap<String, VecDeque<(Instant, u64)>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self { inner: Arc::new(Mutex::new(RateLimiterInner::default())), config }
    }

    #[must_use]
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Check both per-client and global rate limits, then record the request.
    ///
    /// # Errors
    ///
    /// Returns the first limit the request would exceed.
    pub fn check_and_record(&self, client_key: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(client_key, Instant::now())
    }

    fn check_and_record_at(&self, client_key: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self.lock();
        let cfg = self.config;

        prune_window(&mut inner.global_requests, now, cfg.global_window);
        if inner.global_requests.len() >= cfg.global_limit {
            return Err(RateLimitError::GlobalExceeded {
                limit: cfg.global_limit,
                window_secs: cfg.global_window.as_secs(),
            });
        }

        let client_deque = inner.client_requests.entry(client_key.to_string()).or_default();
        prune_window(client_deque, now, cfg.per_client_window);
        if client_deque.len() >= cfg.per_client_limit {
            return Err(RateLimitError::PerClientExceeded {
                limit: cfg.per_client_limit,
                window_secs: cfg.per_client_window.as_secs(),
            });
        }

        client_deque.push_back(now);
        inner.global_requests.push_back(now);
        Ok(())
    }

    /// Check if the client's token budget allows another request.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::TokenBudgetExceeded`] when the budget is spent.
    pub fn check_token_budget(&self, client_key: &str) -> Result<(), RateLimitError> {
        self.reserve_token_budget_at(client_key, 0, Instant::now())
    }

    /// Reserve token budget before running a generation.
    ///
    /// The reservation is atomic with the budget check so concurrent requests
    /// see each other's in-flight usage.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::TokenBudgetExceeded`] when the reservation
    /// does not fit in the remaining budget.
    pub fn reserve(&self, client_key: &str, reserved_tokens: u64) -> Result<TokenReservation, RateLimitError> {
        self.reserve_token_budget_at(client_key, reserved_tokens, Instant::now())?;
        Ok(TokenReservation {
            limiter: self.clone(),
            client_key: client_key.to_string(),
            reserved_tokens,
            settled: false,
        })
    }

    fn reserve_token_budget_at(&self, client_key: &str, reserved_tokens: u64, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self.lock();
        let cfg = self.config;
        let exceeded = RateLimitError::TokenBudgetExceeded {
            budget: cfg.token_budget,
            window_secs: cfg.token_window.as_secs(),
        };
        let used_tokens: u64 = {
            let token_deque = inner.client_tokens.entry(client_key.to_string()).or_default();
            prune_token_window(token_deque, now, cfg.token_window);
            token_deque.iter().map(|(_, t)| t).sum()
        };
        let reserved_total: u64 = {
            let reservation_deque = inner.client_token_reservations.entry(client_key.to_string()).or_default();
            prune_token_window(reservation_deque, now, cfg.token_window);
            reservation_deque.iter().map(|(_, t)| t).sum()
        };
        let Some(projected_total) = used_tokens
            .checked_add(reserved_total)
            .and_then(|n| n.checked_add(reserved_tokens))
        else {
            return Err(exceeded);
        };
        let exceeds_budget = if reserved_tokens == 0 {
            projected_total >= cfg.token_budget
        } else {
            projected_total > cfg.token_budget
        };
        if exceeds_budget {
            return Err(exceeded);
        }
        if reserved_tokens > 0 {
            inner
                .client_token_reservations
                .entry(client_key.to_string())
                .or_default()
                .push_back((now, reserved_tokens));
        }
        Ok(())
    }

    /// Record token usage and consume the matching reservation.
    pub fn record_tokens(&self, client_key: &str, tokens: u64, reserved_tokens: u64) {
        self.record_tokens_at(client_key, tokens, reserved_tokens, Instant::now());
    }

    fn record_tokens_at(&self, client_key: &str, tokens: u64, reserved_tokens: u64, now: Instant) {
        let mut inner = self.lock();
        let cfg = self.config;
        {
            let reservation_deque = inner.client_token_reservations.entry(client_key.to_string()).or_default();
            prune_token_window(reservation_deque, now, cfg.token_window);
            consume_reserved_tokens(reservation_deque, reserved_tokens);
        }
        let token_deque = inner.client_tokens.entry(client_key.to_string()).or_default();
        prune_token_window(token_deque, now, cfg.token_window);
        token_deque.push_back((now, tokens));
    }

    /// Release a reservation for a failed or cancelled generation.
    pub fn release_reserved_tokens(&self, client_key: &str, reserved_tokens: u64) {
        let mut inner = self.lock();
        let cfg = self.config;
        let reservation_deque = inner.client_token_reservations.entry(client_key.to_string()).or_default();
        prune_token_window(reservation_deque, Instant::now(), cfg.token_window);
        consume_reserved_tokens(reservation_deque, reserved_tokens);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RateLimiterInner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

// =============================================================================
// RESERVATION GUARD
// =============================================================================

/// Reserved token budget for one generation.
///
/// Call [`TokenReservation::settle`] with actual usage on success. Dropping
/// an unsettled reservation releases it.
pub struct TokenReservation {
    limiter: RateLimiter,
    client_key: String,
    reserved_tokens: u64,
    settled: bool,
}

impl TokenReservation {
    #[must_use]
    pub fn reserved_tokens(&self) -> u64 {
        self.reserved_tokens
    }

    pub fn settle(mut self, tokens_used: u64) {
        self.limiter.record_tokens(&self.client_key, tokens_used, self.reserved_tokens);
        self.settled = true;
    }
}

impl Drop for TokenReservation {
    fn drop(&mut self) {
        if !self.settled {
            self.limiter.release_reserved_tokens(&self.client_key, self.reserved_tokens);
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

fn prune_token_window(deque: &mut VecDeque<(Instant, u64)>, now: Instant, window: Duration) {
    while let Some(&(front, _)) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

fn consume_reserved_tokens(deque: &mut VecDeque<(Instant, u64)>, mut amount: u64) {
    while amount > 0 {
        let Some((_, front_tokens)) = deque.front_mut() else {
            break;
        };
        if *front_tokens <= amount {
            amount -= *front_tokens;
            deque.pop_front();
        } else {
            *front_tokens -= amount;
            break;
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
