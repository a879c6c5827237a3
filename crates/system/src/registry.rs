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

//! Typed actor registry
//!
//! Extends plain id → ref resolution with a type tag per actor, zero or more
//! string tags, aliases and creation times, plus broadcast helpers fanning
//! out over all actors of a type or tag.
//!
//! The registry holds weak views: entries can go stale when an actor dies
//! and are tolerated until the owner unregisters them. Broadcasts therefore
//! swallow individual send failures.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use plexactors_actor::ActorRef;
use plexactors_core::ActorId;
use plexactors_mailbox::Message;
use tokio::sync::RwLock;
use tracing::debug;

use crate::SystemError;

#[derive(Default)]
struct TypedMaps {
    actors: HashMap<ActorId, ActorRef>,
    by_type: HashMap<String, Vec<ActorId>>,
    types: HashMap<ActorId, String>,
    aliases: HashMap<String, ActorId>,
    by_tag: HashMap<String, Vec<ActorId>>,
    tags: HashMap<ActorId, Vec<String>>,
    created_at: HashMap<ActorId, DateTime<Utc>>,
}

/// Registry of actors keyed by id, type tag and free-form tags
pub struct TypedRegistry {
    maps: RwLock<TypedMaps>,
}

impl TypedRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        TypedRegistry {
            maps: RwLock::new(TypedMaps::default()),
        }
    }

    /// Register an actor under a type tag, stamping its creation time
    pub async fn register(&self, actor_ref: ActorRef, actor_type: &str) {
        let mut maps = self.maps.write().await;
        let actor_id = actor_ref.id().clone();
        maps.actors.insert(actor_id.clone(), actor_ref);
        maps.by_type
            .entry(actor_type.to_string())
            .or_default()
            .push(actor_id.clone());
        maps.types.insert(actor_id.clone(), actor_type.to_string());
        maps.created_at.insert(actor_id, Utc::now());
    }

    /// Remove an actor and every index entry pointing at it
    pub async fn unregister(&self, actor_id: &str) {
        let mut maps = self.maps.write().await;

        maps.actors.remove(actor_id);

        if let Some(actor_type) = maps.types.remove(actor_id) {
            if let Some(ids) = maps.by_type.get_mut(&actor_type) {
                ids.retain(|id| id != actor_id);
            }
        }

        maps.aliases.retain(|_, id| id != actor_id);

        if let Some(tags) = maps.tags.remove(actor_id) {
            for tag in tags {
                if let Some(ids) = maps.by_tag.get_mut(&tag) {
                    ids.retain(|id| id != actor_id);
                }
            }
        }

        maps.created_at.remove(actor_id);
    }

    /// Resolve an actor by id
    pub async fn get(&self, actor_id: &str) -> Option<ActorRef> {
        self.maps.read().await.actors.get(actor_id).cloned()
    }

    /// Resolve an actor through an alias
    pub async fn get_by_alias(&self, alias: &str) -> Option<ActorRef> {
        let maps = self.maps.read().await;
        let actor_id = maps.aliases.get(alias)?;
        maps.actors.get(actor_id).cloned()
    }

    /// Register an alias for an existing actor; false when the actor is
    /// unknown
    pub async fn register_alias(&self, actor_id: &str, alias: &str) -> bool {
        let mut maps = self.maps.write().await;
        if !maps.actors.contains_key(actor_id) {
            return false;
        }
        maps.aliases.insert(alias.to_string(), actor_id.to_string());
        true
    }

    /// Attach tags to an existing actor; false when the actor is unknown
    pub async fn tag_actor(&self, actor_id: &str, tags: &[&str]) -> bool {
        let mut maps = self.maps.write().await;
        if !maps.actors.contains_key(actor_id) {
            return false;
        }
        for tag in tags {
            maps.by_tag
                .entry((*tag).to_string())
                .or_default()
                .push(actor_id.to_string());
            maps.tags
                .entry(actor_id.to_string())
                .or_default()
                .push((*tag).to_string());
        }
        true
    }

    /// Live references of every actor registered under `actor_type`
    pub async fn actors_by_type(&self, actor_type: &str) -> Vec<ActorRef> {
        let maps = self.maps.read().await;
        maps.by_type
            .get(actor_type)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| maps.actors.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Live references of every actor carrying `tag`
    pub async fn actors_by_tag(&self, tag: &str) -> Vec<ActorRef> {
        let maps = self.maps.read().await;
        maps.by_tag
            .get(tag)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| maps.actors.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Type tag of an actor
    pub async fn actor_type(&self, actor_id: &str) -> Option<String> {
        self.maps.read().await.types.get(actor_id).cloned()
    }

    /// Tags of an actor
    pub async fn actor_tags(&self, actor_id: &str) -> Vec<String> {
        self.maps
            .read()
            .await
            .tags
            .get(actor_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Creation time of an actor
    pub async fn creation_time(&self, actor_id: &str) -> Option<DateTime<Utc>> {
        self.maps.read().await.created_at.get(actor_id).copied()
    }

    /// References of every registered actor
    pub async fn all_actors(&self) -> Vec<ActorRef> {
        self.maps.read().await.actors.values().cloned().collect()
    }

    /// Send one message per actor of `actor_type`, concurrently
    ///
    /// `make_message` is invoked once per target. Individual send failures
    /// are swallowed; the only error is an empty target set.
    pub async fn broadcast_to_type<F>(
        &self,
        actor_type: &str,
        make_message: F,
    ) -> Result<(), SystemError>
    where
        F: Fn() -> Message,
    {
        let targets = self.actors_by_type(actor_type).await;
        if targets.is_empty() {
            return Err(SystemError::NoActorsOfType(actor_type.to_string()));
        }
        Self::fan_out(targets, make_message).await;
        Ok(())
    }

    /// Send one message per actor carrying `tag`, concurrently
    pub async fn broadcast_to_tag<F>(&self, tag: &str, make_message: F) -> Result<(), SystemError>
    where
        F: Fn() -> Message,
    {
        let targets = self.actors_by_tag(tag).await;
        if targets.is_empty() {
            return Err(SystemError::NoActorsWithTag(tag.to_string()));
        }
        Self::fan_out(targets, make_message).await;
        Ok(())
    }

    /// No registry lock is held here; targets were snapshotted first.
    async fn fan_out<F>(targets: Vec<ActorRef>, make_message: F)
    where
        F: Fn() -> Message,
    {
        let sends = targets.iter().map(|target| {
            let message = make_message();
            async move {
                if let Err(err) = target.send(message).await {
                    debug!(target = %target.id(), error = %err, "broadcast send dropped");
                }
            }
        });
        join_all(sends).await;
    }
}

impl Default for TypedRegistry {
    fn default() -> Self {
        Self::new()
    }
}
