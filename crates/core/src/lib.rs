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

//! Core types for PlexActors
//!
//! This crate contains the fundamental types shared between the mailbox,
//! actor, supervisor and system crates to break circular dependencies.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod exit_reason;

pub use exit_reason::ExitReason;

/// Actor ID type (String for simplicity and flexibility)
///
/// An opaque, process-unique identifier assigned at actor creation and
/// immutable for the actor's lifetime. Used as the primary key across the
/// monitor, named and typed registries.
pub type ActorId = String;

/// Boxed future type for async factory and handler functions
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
