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

//! Restart strategies and backoff calculation

use std::time::Duration;

use plexactors_circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use plexactors_core::ActorId;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::SupervisorError;

/// Which children a supervisor restarts when one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Restart only the failed child
    OneForOne,
    /// Restart the supervisor's full ordered child list
    OneForAll,
    /// Restart the failed child and every child started after it
    RestForOne,
}

/// Delay schedule between repeated restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backoff {
    /// No delay
    None,
    /// `base * attempt`
    Linear,
    /// `base * 2^(attempt - 1)`
    Exponential,
    /// Exponential with uniform noise in `[-jitter * v, +jitter * v]`
    JitteredExponential,
}

/// Tunable strategy parameters beyond kind and restart intensity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Backoff schedule applied once restart intensity is exceeded
    pub backoff: Backoff,
    /// Base delay for the backoff schedule
    pub base_delay: Duration,
    /// Upper bound every computed delay is clamped to
    pub max_delay: Duration,
    /// Relative jitter magnitude, in `[0, 1]`
    pub jitter_factor: f64,
    /// Whether exceeding restart intensity terminates the supervisor
    /// (`true`) or backs off and retries (`false`)
    pub terminate_on_max_restarts: bool,
    /// Breaker parameters; `None` installs a permissive breaker
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            backoff: Backoff::None,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            jitter_factor: 0.2,
            terminate_on_max_restarts: true,
            circuit_breaker: None,
        }
    }
}

impl StrategyConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SupervisorError> {
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(SupervisorError::InvalidStrategy(format!(
                "jitter_factor must be in [0, 1], got {}",
                self.jitter_factor
            )));
        }
        if self.max_delay < self.base_delay {
            return Err(SupervisorError::InvalidStrategy(format!(
                "max_delay {:?} is below base_delay {:?}",
                self.max_delay, self.base_delay
            )));
        }
        Ok(())
    }
}

/// Restart policy a supervisor applies on child failure
///
/// Bundles the strategy kind, the restart-intensity limit (`max_restarts`
/// within `time_window`), the backoff schedule and the circuit breaker that
/// gates restart attempts. Cloning shares the breaker state, so a restarted
/// supervisor keeps its failure history.
#[derive(Clone, Debug)]
pub struct Strategy {
    kind: StrategyKind,
    max_restarts: u32,
    time_window: Duration,
    config: StrategyConfig,
    breaker: CircuitBreaker,
}

impl Strategy {
    /// Create a strategy with default options
    pub fn new(kind: StrategyKind, max_restarts: u32, time_window_seconds: u64) -> Self {
        // Default config always validates.
        Self::with_config(
            kind,
            max_restarts,
            time_window_seconds,
            StrategyConfig::default(),
        )
        .expect("default strategy config is valid")
    }

    /// Create a strategy with explicit options
    pub fn with_config(
        kind: StrategyKind,
        max_restarts: u32,
        time_window_seconds: u64,
        config: StrategyConfig,
    ) -> Result<Self, SupervisorError> {
        config.validate()?;
        let breaker_config = config
            .circuit_breaker
            .clone()
            .unwrap_or_else(CircuitBreakerConfig::permissive);
        Ok(Strategy {
            kind,
            max_restarts,
            time_window: Duration::from_secs(time_window_seconds),
            config,
            breaker: CircuitBreaker::new(breaker_config),
        })
    }

    /// Strategy kind
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Permitted restarts within the time window (0 disables the limit)
    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    /// Sliding window for restart-intensity accounting
    pub fn time_window(&self) -> Duration {
        self.time_window
    }

    /// Whether exhausting restart intensity terminates the supervisor
    pub fn terminate_on_max_restarts(&self) -> bool {
        self.config.terminate_on_max_restarts
    }

    /// The circuit breaker gating restart attempts
    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Compute the restart set for a failure of `child_id`
    ///
    /// Records the failure on the circuit breaker. Returns `[child_id]` for
    /// `OneForOne`; for `OneForAll` and `RestForOne` the set is empty and the
    /// supervisor expands it from its own ordered child table, which the
    /// strategy cannot see.
    pub async fn handle_failure(&self, child_id: &str) -> Vec<ActorId> {
        self.breaker.record_failure().await;

        match self.kind {
            StrategyKind::OneForOne => vec![child_id.to_string()],
            StrategyKind::OneForAll | StrategyKind::RestForOne => Vec::new(),
        }
    }

    /// Compute the delay before restart attempt `attempt` (1-based)
    ///
    /// Attempt 0 and [`Backoff::None`] yield zero. Every result is clamped
    /// to `max_delay`; jittered results are clamped to be non-negative.
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.config.backoff == Backoff::None {
            return Duration::ZERO;
        }

        let base = self.config.base_delay;
        let max = self.config.max_delay;

        let delay = match self.config.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Linear => base.checked_mul(attempt).unwrap_or(max),
            Backoff::Exponential => exponential_delay(base, attempt).unwrap_or(max),
            Backoff::JitteredExponential => {
                let value = exponential_delay(base, attempt)
                    .unwrap_or(max)
                    .min(max)
                    .as_secs_f64();
                let jitter = rand::thread_rng()
                    .gen_range(-self.config.jitter_factor..=self.config.jitter_factor);
                Duration::from_secs_f64((value + value * jitter).max(0.0))
            }
        };

        delay.min(max)
    }
}

fn exponential_delay(base: Duration, attempt: u32) -> Option<Duration> {
    let factor = 1u32.checked_shl(attempt - 1)?;
    base.checked_mul(factor)
}
