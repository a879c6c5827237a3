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

//! Child specification
//!
//! ## Purpose
//! Defines a child (actor or nested supervisor) managed by a supervisor.
//!
//! ## Erlang/OTP Equivalent
//! Maps to Erlang's child_spec:
//! ```erlang
//! #{id => ChildId,
//!   start => {Module, Function, Args},
//!   restart => permanent | temporary | transient}
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use plexactors_actor::ActorError;
use plexactors_core::ActorId;
use serde::{Deserialize, Serialize};

use crate::Supervised;

/// Factory producing a fresh child on every invocation
///
/// Invoked at `add_child` and again for every restart; the returned child is
/// already running. Maps to Erlang's `start => {Module, Function, Args}`.
pub type ChildFactory =
    Arc<dyn Fn() -> Result<Arc<dyn Supervised>, ActorError> + Send + Sync>;

/// How to handle a child's failures
///
/// ## Erlang Equivalent
/// - `permanent`: always restart
/// - `temporary`: never restart
/// - `transient`: restart only on abnormal exit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartType {
    /// Always restart (default for most actors)
    Permanent,
    /// Never restart (one-shot processes)
    Temporary,
    /// Restart only when the reported reason is an error
    Transient,
}

/// Child specification, immutable after registration
#[derive(Clone)]
pub struct ChildSpec {
    /// Unique identifier for this child within the supervisor
    pub id: ActorId,
    /// Factory creating a fresh, running child
    pub factory: ChildFactory,
    /// Restart policy
    pub restart_type: RestartType,
    /// Free-form arguments recorded with the spec
    pub args: HashMap<String, String>,
}

impl ChildSpec {
    /// Create a spec with the default `Permanent` restart policy
    pub fn new(id: impl Into<ActorId>, factory: ChildFactory) -> Self {
        ChildSpec {
            id: id.into(),
            factory,
            restart_type: RestartType::Permanent,
            args: HashMap::new(),
        }
    }

    /// Set the restart policy
    pub fn with_restart(mut self, restart_type: RestartType) -> Self {
        self.restart_type = restart_type;
        self
    }

    /// Record an argument with the spec
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildSpec")
            .field("id", &self.id)
            .field("restart_type", &self.restart_type)
            .field("args", &self.args)
            .finish()
    }
}
