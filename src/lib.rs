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

//! PlexActors: an Erlang/OTP-inspired actor runtime for embedding in a host
//! process
//!
//! Core design:
//! - Isolated actors communicating exclusively by asynchronous message
//!   passing through bounded mailboxes
//! - Hierarchical supervisors restarting failed actors under declared
//!   policies, with restart-intensity limiting, backoff and a circuit
//!   breaker in front of the restart engine
//! - Monitor links notifying peers of termination
//! - Named and typed registries resolving logical names to actors
//! - A generic server pattern with synchronous request/response on top of
//!   the asynchronous mailboxes

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Independent crates - re-export them here
pub use plexactors_actor as actor;
pub use plexactors_circuit_breaker as circuit_breaker;
pub use plexactors_core as core;
pub use plexactors_genserver as genserver;
pub use plexactors_mailbox as mailbox;
pub use plexactors_supervisor as supervision;
pub use plexactors_system as system;
