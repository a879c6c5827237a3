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

//! # PlexActors Circuit Breaker
//!
//! ## Purpose
//! Gates supervisor restart attempts behind a Closed/Open/HalfOpen state
//! machine, preventing cascading failures: when failures exceed a threshold
//! within a window the breaker opens, restart attempts are rejected fast,
//! and after a reset timeout the breaker probes recovery through the
//! half-open state.
//!
//! ## State machine
//! - Closed → Open: failure count reaches the trip threshold within the
//!   failure window (the counter resets once the window elapses without a
//!   failure)
//! - Open → HalfOpen: lazily, once the reset timeout has passed, observed on
//!   the next state read
//! - HalfOpen → Closed: after the configured number of consecutive successes
//! - HalfOpen → Open: on any single failure

#![warn(missing_docs)]
#![warn(clippy::all)]

mod circuit_breaker;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
