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

//! Name registry
//!
//! Maintains the bijection between logical names and actors: at most one
//! name per actor, at most one actor per name. Both directions stay inverse
//! functions under arbitrary concurrent register/unregister traffic because
//! every mutation updates the two maps under one write lock.

use std::collections::HashMap;

use plexactors_actor::ActorRef;
use plexactors_core::ActorId;
use tokio::sync::RwLock;

use crate::SystemError;

#[derive(Default)]
struct NamedMaps {
    name_to_ref: HashMap<String, ActorRef>,
    id_to_name: HashMap<ActorId, String>,
}

/// Bijective name ↔ actor registry
pub struct NamedRegistry {
    maps: RwLock<NamedMaps>,
}

impl NamedRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        NamedRegistry {
            maps: RwLock::new(NamedMaps::default()),
        }
    }

    /// Register `actor_ref` under `name`
    ///
    /// Fails when the name is taken or the actor already has a name.
    pub async fn register(&self, name: &str, actor_ref: ActorRef) -> Result<(), SystemError> {
        let mut maps = self.maps.write().await;

        if maps.name_to_ref.contains_key(name) {
            return Err(SystemError::NameAlreadyRegistered(format!(
                "name '{}' is already registered",
                name
            )));
        }
        if let Some(existing) = maps.id_to_name.get(actor_ref.id()) {
            return Err(SystemError::NameAlreadyRegistered(format!(
                "actor is already registered with name '{}'",
                existing
            )));
        }

        maps.id_to_name.insert(actor_ref.id().clone(), name.to_string());
        maps.name_to_ref.insert(name.to_string(), actor_ref);
        Ok(())
    }

    /// Drop the registration for `name`; returns whether it existed
    pub async fn unregister(&self, name: &str) -> bool {
        let mut maps = self.maps.write().await;
        match maps.name_to_ref.remove(name) {
            Some(actor_ref) => {
                maps.id_to_name.remove(actor_ref.id());
                true
            }
            None => false,
        }
    }

    /// Drop whatever name `actor_id` is registered under
    pub async fn unregister_actor(&self, actor_id: &str) -> bool {
        let mut maps = self.maps.write().await;
        match maps.id_to_name.remove(actor_id) {
            Some(name) => {
                maps.name_to_ref.remove(&name);
                true
            }
            None => false,
        }
    }

    /// Resolve a name to its actor
    pub async fn lookup(&self, name: &str) -> Option<ActorRef> {
        self.maps.read().await.name_to_ref.get(name).cloned()
    }

    /// Resolve an actor to its name
    pub async fn lookup_name(&self, actor_id: &str) -> Option<String> {
        self.maps.read().await.id_to_name.get(actor_id).cloned()
    }

    /// True when `name` is registered
    pub async fn is_registered(&self, name: &str) -> bool {
        self.maps.read().await.name_to_ref.contains_key(name)
    }

    /// All registered names
    pub async fn all_names(&self) -> Vec<String> {
        self.maps.read().await.name_to_ref.keys().cloned().collect()
    }

    /// Scan for entries matching a predicate
    pub async fn filter<F>(&self, predicate: F) -> HashMap<String, ActorRef>
    where
        F: Fn(&str, &ActorRef) -> bool,
    {
        self.maps
            .read()
            .await
            .name_to_ref
            .iter()
            .filter(|(name, actor_ref)| predicate(name, actor_ref))
            .map(|(name, actor_ref)| (name.clone(), actor_ref.clone()))
            .collect()
    }
}

impl Default for NamedRegistry {
    fn default() -> Self {
        Self::new()
    }
}
