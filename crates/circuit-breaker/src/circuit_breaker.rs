// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of PlexActors.
//
// PlexActors is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// PlexActors is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with PlexActors. If not, see <https://www.gnu.org/licenses/>.

//! CircuitBreaker - fault tolerance gate for restart attempts

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation, requests admitted
    Closed,
    /// Tripped, requests rejected until the reset timeout elapses
    Open,
    /// Probing recovery, requests admitted while successes accumulate
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failures within `failure_window` that trip the breaker
    pub trip_threshold: u32,
    /// Window over which failures accumulate; the counter resets once the
    /// interval since the last failure exceeds it
    pub failure_window: Duration,
    /// Time the breaker stays open before probing via half-open
    pub reset_timeout: Duration,
    /// Consecutive successes in half-open required to close
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfig {
            trip_threshold: 5,
            failure_window: Duration::from_secs(60),
            reset_timeout: Duration::from_secs(5),
            success_threshold: 2,
        }
    }
}

impl CircuitBreakerConfig {
    /// A breaker that effectively never trips
    ///
    /// Used by strategies configured without breaker parameters so the
    /// restart path stays uniform.
    pub fn permissive() -> Self {
        CircuitBreakerConfig {
            trip_threshold: 9999,
            failure_window: Duration::from_secs(24 * 60 * 60),
            reset_timeout: Duration::from_millis(1),
            success_threshold: 1,
        }
    }
}

/// Circuit breaker state data
#[derive(Debug)]
struct BreakerState {
    config: CircuitBreakerConfig,
    state: CircuitState,
    failures: u32,
    consecutive_successes: u32,
    last_failure: Option<Instant>,
    last_state_change: Instant,
}

impl BreakerState {
    fn new(config: CircuitBreakerConfig) -> Self {
        BreakerState {
            config,
            state: CircuitState::Closed,
            failures: 0,
            consecutive_successes: 0,
            last_failure: None,
            last_state_change: Instant::now(),
        }
    }

    /// Observe the current state, applying the lazy Open -> HalfOpen
    /// transition once the reset timeout has elapsed.
    fn observe_state(&mut self) -> CircuitState {
        let now = Instant::now();
        if self.state == CircuitState::Open
            && now.duration_since(self.last_state_change) > self.config.reset_timeout
        {
            self.state = CircuitState::HalfOpen;
            self.last_state_change = now;
        }
        self.state
    }

    fn record_failure(&mut self) -> bool {
        let now = Instant::now();

        // Stale failures outside the window no longer count.
        if let Some(last) = self.last_failure {
            if now.duration_since(last) > self.config.failure_window {
                self.failures = 0;
            }
        }

        self.failures += 1;
        self.last_failure = Some(now);
        self.consecutive_successes = 0;

        if self.state == CircuitState::Closed && self.failures >= self.config.trip_threshold {
            self.state = CircuitState::Open;
            self.last_state_change = now;
            return true;
        }

        if self.state == CircuitState::HalfOpen {
            self.state = CircuitState::Open;
            self.last_state_change = now;
        }

        false
    }

    fn record_success(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.consecutive_successes += 1;
            if self.consecutive_successes >= self.config.success_threshold {
                self.reset();
            }
        }
    }

    fn reset(&mut self) {
        self.state = CircuitState::Closed;
        self.failures = 0;
        self.consecutive_successes = 0;
        self.last_state_change = Instant::now();
    }
}

/// Circuit breaker gating restart attempts
///
/// All state transitions are serialized under a single lock. Cloning shares
/// the underlying state.
#[derive(Clone, Debug)]
pub struct CircuitBreaker {
    state: Arc<RwLock<BreakerState>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        CircuitBreaker {
            state: Arc::new(RwLock::new(BreakerState::new(config))),
        }
    }

    /// Check whether an attempt should be admitted
    ///
    /// Returns `true` in `Closed` and `HalfOpen`, `false` in `Open`. Observing
    /// the state applies the lazy Open → HalfOpen transition.
    pub async fn should_allow(&self) -> bool {
        let mut state = self.state.write().await;
        match state.observe_state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        }
    }

    /// Record a failed attempt
    ///
    /// Returns `true` when this failure tripped the breaker from `Closed` to
    /// `Open`.
    pub async fn record_failure(&self) -> bool {
        let mut state = self.state.write().await;
        let tripped = state.record_failure();
        if tripped {
            debug!(failures = state.failures, "circuit breaker tripped open");
        }
        tripped
    }

    /// Record a successful attempt
    ///
    /// Only advances state in `HalfOpen`: after the configured number of
    /// consecutive successes the breaker closes.
    pub async fn record_success(&self) {
        self.state.write().await.record_success();
    }

    /// Force the breaker closed and zero all counters
    pub async fn reset(&self) {
        self.state.write().await.reset();
    }

    /// Current state (applies the lazy Open → HalfOpen transition)
    pub async fn get_state(&self) -> CircuitState {
        self.state.write().await.observe_state()
    }

    /// The breaker's configuration
    pub async fn config(&self) -> CircuitBreakerConfig {
        self.state.read().await.config.clone()
    }
}
