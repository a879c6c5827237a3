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

//! Monitor links and termination notification
//!
//! ## Purpose
//! Maintains the directed termination-link graph between actors and fans out
//! [`MonitorNotice`] messages when a monitored actor terminates.
//!
//! ## Guarantees
//! At-most-once notification per link per termination; delivery is
//! best-effort and interleaves freely with other messages to the monitor.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use plexactors_core::{ActorId, ExitReason};
use plexactors_mailbox::{Message, MonitorNotice};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::{ActorError, ActorRef};

/// Kind of monitor link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorKind {
    /// Only the monitor is notified when the monitored actor terminates
    OneWay,
    /// Both actors are notified of each other's termination
    Bidirectional,
}

/// Resolves actor IDs to live references during notification fan-out
///
/// Implemented by the hosting system; the registry only holds weak views and
/// never owns actors.
#[async_trait]
pub trait ActorLookup: Send + Sync {
    /// Look up a live reference for `id`
    async fn get_actor(&self, id: &str) -> Result<ActorRef, ActorError>;
}

#[derive(Default)]
struct MonitorGraph {
    /// monitored actor -> its monitors
    monitors: HashMap<ActorId, HashMap<ActorId, MonitorKind>>,
    /// monitor actor -> the actors it monitors
    monitoring: HashMap<ActorId, HashMap<ActorId, MonitorKind>>,
}

/// Directed and bidirectional termination-link graph
///
/// Invariant: `monitors[target]` and `monitoring[source]` stay mutually
/// consistent, exactly one edge per direction per pair.
pub struct MonitorRegistry {
    graph: RwLock<MonitorGraph>,
}

impl MonitorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        MonitorRegistry {
            graph: RwLock::new(MonitorGraph::default()),
        }
    }

    /// Add a monitor link; idempotent on duplicate adds
    ///
    /// A `Bidirectional` link is stored as two directed edges.
    pub async fn monitor(&self, monitor_id: &str, monitored_id: &str, kind: MonitorKind) {
        let mut graph = self.graph.write().await;
        graph.add_edge(monitor_id, monitored_id, kind);
        if kind == MonitorKind::Bidirectional {
            graph.add_edge(monitored_id, monitor_id, kind);
        }
        trace!(monitor = monitor_id, monitored = monitored_id, ?kind, "monitor link added");
    }

    /// Remove the forward link; for a `Bidirectional` link the reverse edge
    /// is removed too
    pub async fn demonitor(&self, monitor_id: &str, monitored_id: &str) {
        let mut graph = self.graph.write().await;
        let kind = graph.remove_edge(monitor_id, monitored_id);
        if kind == Some(MonitorKind::Bidirectional) {
            graph.remove_edge(monitored_id, monitor_id);
        }
    }

    /// IDs of the actors monitoring `actor_id`
    pub async fn get_monitors(&self, actor_id: &str) -> Vec<ActorId> {
        let graph = self.graph.read().await;
        graph
            .monitors
            .get(actor_id)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// IDs of the actors `actor_id` is monitoring
    pub async fn get_monitored(&self, actor_id: &str) -> Vec<ActorId> {
        let graph = self.graph.read().await;
        graph
            .monitoring
            .get(actor_id)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Fan out a termination notice to every monitor of `actor_id`
    ///
    /// Best-effort: a failed send does not stop the fan-out and is not
    /// surfaced. The snapshot of monitors is taken before any send, so no
    /// registry lock is held while sending.
    pub async fn notify_monitors(&self, actor_id: &str, reason: ExitReason, lookup: &dyn ActorLookup) {
        let monitors = self.get_monitors(actor_id).await;
        if monitors.is_empty() {
            return;
        }

        let timestamp_ns = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        for monitor_id in monitors {
            let notice = MonitorNotice {
                monitored_id: actor_id.to_string(),
                monitor_id: monitor_id.clone(),
                reason: reason.clone(),
                timestamp_ns,
            };
            match lookup.get_actor(&monitor_id).await {
                Ok(actor_ref) => {
                    if let Err(err) = actor_ref.send(Message::monitor(notice)).await {
                        debug!(
                            monitor = %monitor_id,
                            monitored = actor_id,
                            error = %err,
                            "dropping monitor notification"
                        );
                    }
                }
                Err(err) => {
                    debug!(
                        monitor = %monitor_id,
                        monitored = actor_id,
                        error = %err,
                        "monitor not resolvable, dropping notification"
                    );
                }
            }
        }
    }

    /// Remove every edge incident on `actor_id`, in both directions
    ///
    /// Called exactly once at termination.
    pub async fn cleanup_actor(&self, actor_id: &str) {
        let mut graph = self.graph.write().await;

        let monitored: Vec<ActorId> = graph
            .monitoring
            .remove(actor_id)
            .map(|m| m.into_keys().collect())
            .unwrap_or_default();
        for id in monitored {
            if let Some(m) = graph.monitors.get_mut(&id) {
                m.remove(actor_id);
            }
        }

        let monitors: Vec<ActorId> = graph
            .monitors
            .remove(actor_id)
            .map(|m| m.into_keys().collect())
            .unwrap_or_default();
        for id in monitors {
            if let Some(m) = graph.monitoring.get_mut(&id) {
                m.remove(actor_id);
            }
        }
    }

    /// True when the graph has no edges at all
    pub async fn is_empty(&self) -> bool {
        let graph = self.graph.read().await;
        graph.monitors.values().all(|m| m.is_empty())
            && graph.monitoring.values().all(|m| m.is_empty())
    }
}

impl Default for MonitorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorGraph {
    fn add_edge(&mut self, monitor_id: &str, monitored_id: &str, kind: MonitorKind) {
        self.monitors
            .entry(monitored_id.to_string())
            .or_default()
            .insert(monitor_id.to_string(), kind);
        self.monitoring
            .entry(monitor_id.to_string())
            .or_default()
            .insert(monitored_id.to_string(), kind);
    }

    fn remove_edge(&mut self, monitor_id: &str, monitored_id: &str) -> Option<MonitorKind> {
        let kind = self
            .monitors
            .get_mut(monitored_id)
            .and_then(|m| m.remove(monitor_id));
        if let Some(m) = self.monitoring.get_mut(monitor_id) {
            m.remove(monitored_id);
        }
        kind
    }
}
