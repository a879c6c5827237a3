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

//! ActorSystem facade
//!
//! The system is a single long-lived aggregate root composing the root
//! supervisor, the named/typed registries and the monitor registry. It is
//! passed by handle (cloning shares the same system); nothing here is
//! process-global state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use plexactors_actor::{
    Actor, ActorError, ActorLookup, ActorRef, MonitorKind, MonitorRegistry, Receiver,
};
use plexactors_core::{ActorId, ExitReason};
use plexactors_genserver::{GenServer, GenServerError, GenServerOptions};
use plexactors_mailbox::Message;
use plexactors_supervisor::{
    ChildSpec, Strategy, StrategyKind, Supervised, Supervisor, SupervisorError,
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Restart intensity of the root supervisor
const ROOT_MAX_RESTARTS: u32 = 10;
/// Restart window of the root supervisor, in seconds
const ROOT_TIME_WINDOW_SECONDS: u64 = 60;

/// Errors surfaced at the system boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SystemError {
    /// The system has been stopped
    #[error("actor system is stopped")]
    SystemStopped,

    /// The name (or the actor) already has a registration
    #[error("name already registered: {0}")]
    NameAlreadyRegistered(String),

    /// A type broadcast found no targets
    #[error("no actors of type: {0}")]
    NoActorsOfType(String),

    /// A tag broadcast found no targets
    #[error("no actors with tag: {0}")]
    NoActorsWithTag(String),

    /// No actor registered under this id or name
    #[error("actor not found: {0}")]
    ActorNotFound(String),

    /// Underlying actor error
    #[error(transparent)]
    Actor(#[from] ActorError),

    /// Underlying supervisor error
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// Underlying gen-server error
    #[error(transparent)]
    GenServer(#[from] GenServerError),
}

/// Seam through which external collaborators deliver messages into local
/// actors
///
/// A cluster transport (or any other remote ingress) is handed exactly this
/// surface and nothing more.
#[async_trait]
pub trait SystemReference: Send + Sync {
    /// Deliver a message to the actor registered under `actor_id`
    async fn send_message(&self, actor_id: &str, message: Message) -> Result<(), SystemError>;

    /// Deliver a message to the actor registered under the logical `name`
    async fn send_named_message(&self, name: &str, message: Message) -> Result<(), SystemError>;
}

struct SystemInner {
    name: String,
    root: Supervisor,
    /// id -> ref of every spawned actor (weak views; refs may go stale after
    /// a restart and then report stopped on send)
    registry: RwLock<HashMap<ActorId, ActorRef>>,
    /// Gen servers are owned directly by the system, not the root supervisor
    gen_servers: RwLock<HashMap<ActorId, Arc<Actor>>>,
    named: crate::NamedRegistry,
    typed: crate::TypedRegistry,
    monitors: MonitorRegistry,
    running: AtomicBool,
}

/// Top-level actor system
///
/// Cloning yields another handle to the same system.
#[derive(Clone)]
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

impl ActorSystem {
    /// Create a system with a running root supervisor
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let root = Supervisor::new(
            format!("{}/root", name),
            Strategy::new(
                StrategyKind::OneForOne,
                ROOT_MAX_RESTARTS,
                ROOT_TIME_WINDOW_SECONDS,
            ),
        );
        info!(system = %name, "actor system started");
        ActorSystem {
            inner: Arc::new(SystemInner {
                name,
                root,
                registry: RwLock::new(HashMap::new()),
                gen_servers: RwLock::new(HashMap::new()),
                named: crate::NamedRegistry::new(),
                typed: crate::TypedRegistry::new(),
                monitors: MonitorRegistry::new(),
                running: AtomicBool::new(true),
            }),
        }
    }

    /// System name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// True until [`ActorSystem::stop`] has begun
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// The typed registry (types, tags, aliases, creation times)
    pub fn typed_registry(&self) -> &crate::TypedRegistry {
        &self.inner.typed
    }

    /// The root supervisor
    pub fn root_supervisor(&self) -> &Supervisor {
        &self.inner.root
    }

    fn ensure_running(&self) -> Result<(), SystemError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(SystemError::SystemStopped)
        }
    }

    /// Spawn a supervised actor under the root supervisor
    ///
    /// `receiver_factory` produces a fresh [`Receiver`] for the initial
    /// spawn and again on every restart. The child is `Permanent`.
    #[instrument(skip_all, fields(system = %self.inner.name, actor_id = %id))]
    pub async fn spawn_actor<F>(
        &self,
        id: &str,
        receiver_factory: F,
        buffer_size: usize,
    ) -> Result<ActorRef, SystemError>
    where
        F: Fn() -> Box<dyn Receiver> + Send + Sync + 'static,
    {
        self.ensure_running()?;
        let id: ActorId = id.to_string();

        let mut registry = self.inner.registry.write().await;
        if registry.contains_key(&id) {
            return Err(SystemError::Actor(ActorError::InvalidId(id)));
        }

        let actor_id = id.clone();
        let spec = ChildSpec::new(
            id.clone(),
            Arc::new(move || {
                let child: Arc<dyn Supervised> =
                    Actor::spawn(actor_id.clone(), receiver_factory(), buffer_size);
                Ok(child)
            }),
        );

        let actor_ref = self.inner.root.add_child(spec).await?;
        registry.insert(id, actor_ref.clone());
        Ok(actor_ref)
    }

    /// Spawn a supervisor with a default-configured strategy
    pub async fn spawn_supervisor(
        &self,
        id: &str,
        kind: StrategyKind,
        max_restarts: u32,
        time_window_seconds: u64,
    ) -> Result<Supervisor, SystemError> {
        self.spawn_supervisor_with(id, Strategy::new(kind, max_restarts, time_window_seconds))
            .await
    }

    /// Spawn a supervisor with an explicit strategy, supervised by the root
    ///
    /// The returned handle addresses the first instance; a restart by the
    /// root supervisor creates a fresh supervisor from the same strategy.
    #[instrument(skip_all, fields(system = %self.inner.name, supervisor_id = %id))]
    pub async fn spawn_supervisor_with(
        &self,
        id: &str,
        strategy: Strategy,
    ) -> Result<Supervisor, SystemError> {
        self.ensure_running()?;
        let id: ActorId = id.to_string();

        let mut registry = self.inner.registry.write().await;
        if registry.contains_key(&id) {
            return Err(SystemError::Actor(ActorError::InvalidId(id)));
        }

        let supervisor = Supervisor::new(id.clone(), strategy.clone());
        let handle = supervisor.clone();

        let first = std::sync::Mutex::new(Some(supervisor));
        let sup_id = id.clone();
        let spec = ChildSpec::new(
            id.clone(),
            Arc::new(move || {
                if let Some(existing) = first.lock().ok().and_then(|mut slot| slot.take()) {
                    let child: Arc<dyn Supervised> = Arc::new(existing);
                    return Ok(child);
                }
                let child: Arc<dyn Supervised> =
                    Arc::new(Supervisor::new(sup_id.clone(), strategy.clone()));
                Ok(child)
            }),
        );

        let sup_ref = self.inner.root.add_child(spec).await?;
        registry.insert(id, sup_ref);
        Ok(handle)
    }

    /// Spawn a gen server, optionally registering its name atomically with
    /// creation
    ///
    /// `init` runs before any message can be delivered; when name
    /// registration fails the server is stopped and deregistered, so either
    /// both registrations exist or neither does.
    #[instrument(skip_all, fields(system = %self.inner.name, actor_id = %id))]
    pub async fn spawn_gen_server<G: GenServer>(
        &self,
        id: &str,
        args: G::Args,
        options: GenServerOptions,
    ) -> Result<ActorRef, SystemError> {
        self.ensure_running()?;
        let id: ActorId = id.to_string();
        let name = options.name.clone();

        let actor_ref = {
            let mut registry = self.inner.registry.write().await;
            if registry.contains_key(&id) {
                return Err(SystemError::Actor(ActorError::InvalidId(id)));
            }

            let (actor, actor_ref) =
                plexactors_genserver::start::<G>(&id, args, options).await?;
            registry.insert(id.clone(), actor_ref.clone());
            self.inner.gen_servers.write().await.insert(id.clone(), actor);
            actor_ref
        };

        if let Some(name) = name {
            if let Err(err) = self.inner.named.register(&name, actor_ref.clone()).await {
                // Roll back: the server is either fully registered or absent.
                if let Some(actor) = self.inner.gen_servers.write().await.remove(&id) {
                    let _ = actor.stop().await;
                }
                self.inner.registry.write().await.remove(&id);
                return Err(err);
            }
        }

        Ok(actor_ref)
    }

    /// Look up the reference registered under `id`
    pub async fn get_actor(&self, id: &str) -> Result<ActorRef, SystemError> {
        self.ensure_running()?;
        self.inner
            .registry
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SystemError::ActorNotFound(id.to_string()))
    }

    /// Register `actor_ref` under a logical name
    pub async fn register_name(&self, name: &str, actor_ref: ActorRef) -> Result<(), SystemError> {
        self.ensure_running()?;
        self.inner.named.register(name, actor_ref).await
    }

    /// Drop a name registration; returns whether it existed
    pub async fn unregister_name(&self, name: &str) -> bool {
        if !self.is_running() {
            return false;
        }
        self.inner.named.unregister(name).await
    }

    /// Resolve a logical name
    pub async fn where_is(&self, name: &str) -> Option<ActorRef> {
        if !self.is_running() {
            return None;
        }
        self.inner.named.lookup(name).await
    }

    /// Create a monitor link between two registered actors
    pub async fn monitor(
        &self,
        monitor_id: &str,
        monitored_id: &str,
        kind: MonitorKind,
    ) -> Result<(), SystemError> {
        self.ensure_running()?;
        {
            let registry = self.inner.registry.read().await;
            if !registry.contains_key(monitor_id) {
                return Err(SystemError::ActorNotFound(monitor_id.to_string()));
            }
            if !registry.contains_key(monitored_id) {
                return Err(SystemError::ActorNotFound(monitored_id.to_string()));
            }
        }
        self.inner.monitors.monitor(monitor_id, monitored_id, kind).await;
        Ok(())
    }

    /// Remove a monitor link
    pub async fn demonitor(&self, monitor_id: &str, monitored_id: &str) -> Result<(), SystemError> {
        self.ensure_running()?;
        self.inner.monitors.demonitor(monitor_id, monitored_id).await;
        Ok(())
    }

    /// Report an actor failure: notify its monitors, then clean up its
    /// registrations
    ///
    /// Cleanup always runs, even when individual notification sends fail.
    /// Restarting is not implied; that is the owning supervisor's call.
    #[instrument(skip(self, reason), fields(system = %self.inner.name, actor_id = %actor_id))]
    pub async fn notify_failure(
        &self,
        actor_id: &str,
        reason: ExitReason,
    ) -> Result<(), SystemError> {
        self.ensure_running()?;
        self.terminate_cleanup(actor_id, reason).await;
        Ok(())
    }

    /// Stop a spawned actor or gen server and run the termination path
    ///
    /// Monitors observe the stop with a `Normal` reason; name, type and
    /// monitor registrations are pruned.
    #[instrument(skip(self), fields(system = %self.inner.name, actor_id = %actor_id))]
    pub async fn stop_actor(&self, actor_id: &str) -> Result<(), SystemError> {
        self.ensure_running()?;

        let gen_server = self.inner.gen_servers.write().await.remove(actor_id);
        match gen_server {
            Some(actor) => {
                actor.stop().await.map_err(SystemError::Actor)?;
            }
            None => match self.inner.root.remove_child(actor_id).await {
                Ok(()) => {}
                Err(SupervisorError::ChildNotFound(_)) => {
                    return Err(SystemError::ActorNotFound(actor_id.to_string()));
                }
                Err(err) => return Err(err.into()),
            },
        }

        self.inner.registry.write().await.remove(actor_id);
        self.terminate_cleanup(actor_id, ExitReason::Normal).await;
        Ok(())
    }

    /// Deliver `message` to the actor registered under `actor_id`
    pub async fn send_message(&self, actor_id: &str, message: Message) -> Result<(), SystemError> {
        let actor_ref = self.get_actor(actor_id).await?;
        actor_ref.send(message).await.map_err(SystemError::from)
    }

    /// Deliver `message` with an explicit deadline
    pub async fn send_message_timeout(
        &self,
        actor_id: &str,
        message: Message,
        deadline: Option<Duration>,
    ) -> Result<(), SystemError> {
        let actor_ref = self.get_actor(actor_id).await?;
        actor_ref
            .send_timeout(message, deadline)
            .await
            .map_err(SystemError::from)
    }

    /// Deliver `message` to the actor registered under the logical `name`
    pub async fn send_named_message(&self, name: &str, message: Message) -> Result<(), SystemError> {
        self.ensure_running()?;
        let actor_ref = self
            .inner
            .named
            .lookup(name)
            .await
            .ok_or_else(|| SystemError::ActorNotFound(format!("name '{}'", name)))?;
        actor_ref.send(message).await.map_err(SystemError::from)
    }

    /// Register an actor in the typed registry
    pub async fn register_actor_type(&self, actor_ref: ActorRef, actor_type: &str) {
        self.inner.typed.register(actor_ref, actor_type).await;
    }

    /// Attach tags to a registered actor
    pub async fn tag_actor(&self, actor_id: &str, tags: &[&str]) -> bool {
        self.inner.typed.tag_actor(actor_id, tags).await
    }

    /// Broadcast one message per actor of `actor_type`
    pub async fn broadcast_to_type<F>(
        &self,
        actor_type: &str,
        make_message: F,
    ) -> Result<(), SystemError>
    where
        F: Fn() -> Message,
    {
        self.ensure_running()?;
        self.inner.typed.broadcast_to_type(actor_type, make_message).await
    }

    /// Broadcast one message per actor carrying `tag`
    pub async fn broadcast_to_tag<F>(&self, tag: &str, make_message: F) -> Result<(), SystemError>
    where
        F: Fn() -> Message,
    {
        self.ensure_running()?;
        self.inner.typed.broadcast_to_tag(tag, make_message).await
    }

    /// Stop the system: the root supervisor (and with it every supervised
    /// actor), then all gen servers. Idempotent.
    #[instrument(skip(self), fields(system = %self.inner.name))]
    pub async fn stop(&self) -> Result<(), SystemError> {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        info!(system = %self.inner.name, "actor system stopping");

        self.inner.root.stop().await?;

        let gen_servers: Vec<Arc<Actor>> =
            self.inner.gen_servers.write().await.drain().map(|(_, a)| a).collect();
        for actor in gen_servers {
            let _ = actor.stop().await;
        }
        Ok(())
    }

    async fn terminate_cleanup(&self, actor_id: &str, reason: ExitReason) {
        debug!(actor_id, reason = %reason, "running termination path");
        self.inner.monitors.notify_monitors(actor_id, reason, self).await;
        self.inner.named.unregister_actor(actor_id).await;
        self.inner.typed.unregister(actor_id).await;
        self.inner.monitors.cleanup_actor(actor_id).await;
    }
}

#[async_trait]
impl ActorLookup for ActorSystem {
    async fn get_actor(&self, id: &str) -> Result<ActorRef, ActorError> {
        ActorSystem::get_actor(self, id)
            .await
            .map_err(|_| ActorError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl SystemReference for ActorSystem {
    async fn send_message(&self, actor_id: &str, message: Message) -> Result<(), SystemError> {
        ActorSystem::send_message(self, actor_id, message).await
    }

    async fn send_named_message(&self, name: &str, message: Message) -> Result<(), SystemError> {
        ActorSystem::send_named_message(self, name, message).await
    }
}
