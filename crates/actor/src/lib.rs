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

//! Core actor implementation for PlexActors
//!
//! This crate provides the foundational actor abstraction including:
//! - Actor lifecycle management (spawn, stop, advisory error recording)
//! - Actor references (`ActorRef`) for non-owning messaging
//! - The monitor registry for termination links

#![warn(missing_docs)]
#![warn(clippy::all)]

// Main actor module
mod r#mod;
pub use r#mod::*;

// Monitor links
pub mod monitor;
pub use monitor::{ActorLookup, MonitorKind, MonitorRegistry};
