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

//! The PlexActors actor system
//!
//! This crate provides the top-level [`ActorSystem`] facade: it owns the
//! root supervisor, the named/typed registries and the monitor registry, and
//! exposes the spawn, lookup, monitor and messaging operations of the
//! runtime. External collaborators (e.g. a cluster transport) plug in
//! through the narrow [`SystemReference`] seam.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod named_registry;
pub use named_registry::NamedRegistry;

mod registry;
pub use registry::TypedRegistry;

mod system;
pub use system::{ActorSystem, SystemError, SystemReference};
