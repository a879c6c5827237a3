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

//! Supervision module for fault tolerance
//!
//! Implements Erlang/OTP-inspired supervision trees. A supervisor is itself
//! an actor: child-failure reports are delivered through its own mailbox so
//! the restart transaction is serialized with structural changes and can
//! never interleave with itself.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use indexmap::IndexMap;
use plexactors_actor::{Actor, ActorContext, ActorError, ActorRef, Receiver};
use plexactors_core::{ActorId, ExitReason};
use plexactors_mailbox::{Envelope, Message};
use tokio::sync::{oneshot, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::{ChildSpec, RestartType, Strategy, StrategyKind};

/// Mailbox capacity of a supervisor's own actor
const SUPERVISOR_MAILBOX_CAPACITY: usize = 100;

/// Supervisor errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupervisorError {
    /// Supervisor is not running
    #[error("supervisor is stopped")]
    SupervisorStopped,

    /// Restart intensity exhausted within the time window
    #[error("too many restarts in the time interval")]
    TooManyRestarts,

    /// The circuit breaker is open; no restart was attempted
    #[error("circuit breaker is open")]
    CircuitBreakerOpen,

    /// Strategy parameters are invalid
    #[error("invalid supervision strategy: {0}")]
    InvalidStrategy(String),

    /// Child ID already exists under this supervisor
    #[error("invalid actor ID: {0}")]
    InvalidActorId(String),

    /// No child registered under this ID
    #[error("child not found: {0}")]
    ChildNotFound(String),

    /// The child factory failed
    #[error("child creation failed: {0}")]
    ChildCreationFailed(String),

    /// Underlying actor error
    #[error(transparent)]
    Actor(#[from] ActorError),
}

/// Supervisor lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStatus {
    /// Accepting structural changes and failure reports
    Running,
    /// A restart transaction or backoff delay is in progress
    Restarting,
    /// Shutdown has begun
    Stopping,
    /// Shutdown has completed
    Stopped,
}

/// Unified interface for everything a supervisor can manage
///
/// ## Erlang/OTP Equivalent
/// In Erlang both workers and supervisors expose the same lifecycle
/// functions, which is what lets supervision trees nest. `Actor` implements
/// this trait for workers; [`Supervisor`] implements it for nested
/// supervisors.
#[async_trait]
pub trait Supervised: Send + Sync {
    /// Child identifier
    fn id(&self) -> &ActorId;

    /// Non-owning handle for messaging this child
    fn actor_ref(&self) -> ActorRef;

    /// True while the child has not been stopped
    fn is_running(&self) -> bool;

    /// Stop the child; idempotent
    async fn stop(&self) -> Result<(), ActorError>;
}

#[async_trait]
impl Supervised for Actor {
    fn id(&self) -> &ActorId {
        Actor::id(self)
    }

    fn actor_ref(&self) -> ActorRef {
        Actor::actor_ref(self)
    }

    fn is_running(&self) -> bool {
        Actor::is_running(self)
    }

    async fn stop(&self) -> Result<(), ActorError> {
        Actor::stop(self).await
    }
}

/// Child-failure report, routed through the supervisor's own mailbox
struct ChildFailure {
    child_id: ActorId,
    reason: ExitReason,
    /// Present for caller-visible reports; absent for scheduled retries
    reply_to: Option<oneshot::Sender<Result<(), SupervisorError>>>,
}

struct SupervisorState {
    children: IndexMap<ActorId, Arc<dyn Supervised>>,
    refs: IndexMap<ActorId, ActorRef>,
    specs: IndexMap<ActorId, ChildSpec>,
    /// Completion timestamps of recent restart transactions
    restart_history: Vec<Instant>,
    status: SupervisorStatus,
    last_failure: Option<ExitReason>,
}

impl SupervisorState {
    fn new() -> Self {
        SupervisorState {
            children: IndexMap::new(),
            refs: IndexMap::new(),
            specs: IndexMap::new(),
            restart_history: Vec::new(),
            status: SupervisorStatus::Running,
            last_failure: None,
        }
    }
}

struct SupervisorInner {
    id: ActorId,
    strategy: Strategy,
    state: RwLock<SupervisorState>,
    /// The supervisor's own actor; set once right after spawn
    own: OnceLock<Arc<Actor>>,
}

/// Receive loop of the supervisor's own actor
struct SupervisorReceiver {
    inner: Arc<SupervisorInner>,
}

#[async_trait]
impl Receiver for SupervisorReceiver {
    async fn receive(&mut self, _ctx: &ActorContext, msg: Message) -> Result<(), ActorError> {
        let Envelope::Internal { payload } = msg.envelope else {
            // Monitor notices or stray user messages: nothing to do.
            return Ok(());
        };
        let Ok(failure) = payload.downcast::<ChildFailure>() else {
            return Ok(());
        };
        let ChildFailure {
            child_id,
            reason,
            reply_to,
        } = *failure;

        let result =
            SupervisorInner::handle_child_failure(&self.inner, child_id, reason).await;
        let outcome = result.clone();
        if let Some(tx) = reply_to {
            let _ = tx.send(result);
        }
        outcome.map_err(|e| ActorError::ReceiveFailed(e.to_string()))
    }
}

/// Supervisor for managing actor lifecycle and fault tolerance
///
/// Holds an ordered set of child specs, tracks restart history and executes
/// restart plans computed by its [`Strategy`]. Cloning yields another handle
/// to the same supervisor.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

impl Supervisor {
    /// Create a supervisor and spawn its own actor
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(id: impl Into<ActorId>, strategy: Strategy) -> Self {
        let id = id.into();
        let inner = Arc::new(SupervisorInner {
            id: id.clone(),
            strategy,
            state: RwLock::new(SupervisorState::new()),
            own: OnceLock::new(),
        });

        let receiver = SupervisorReceiver {
            inner: Arc::clone(&inner),
        };
        let actor = Actor::spawn(id, Box::new(receiver), SUPERVISOR_MAILBOX_CAPACITY);
        let _ = inner.own.set(actor);

        Supervisor { inner }
    }

    /// Supervisor ID
    pub fn id(&self) -> &ActorId {
        &self.inner.id
    }

    /// The restart strategy in effect
    pub fn strategy(&self) -> &Strategy {
        &self.inner.strategy
    }

    /// Current lifecycle status
    pub async fn status(&self) -> SupervisorStatus {
        self.inner.state.read().await.status
    }

    /// Reason of the most recently reported child failure
    pub async fn last_failure(&self) -> Option<ExitReason> {
        self.inner.state.read().await.last_failure.clone()
    }

    /// Ordered child IDs (insertion order)
    pub async fn child_order(&self) -> Vec<ActorId> {
        self.inner.state.read().await.children.keys().cloned().collect()
    }

    /// Non-owning handle for the supervisor's own actor
    pub fn actor_ref(&self) -> ActorRef {
        self.inner.own_actor().actor_ref()
    }

    /// Add a child under this supervisor
    ///
    /// Fails with [`SupervisorError::InvalidActorId`] when the ID already
    /// exists and with [`SupervisorError::SupervisorStopped`] unless the
    /// supervisor is running. The child is appended to the child order.
    #[instrument(skip(self, spec), fields(supervisor_id = %self.inner.id, child_id = %spec.id))]
    pub async fn add_child(&self, spec: ChildSpec) -> Result<ActorRef, SupervisorError> {
        let mut state = self.inner.state.write().await;

        if state.status != SupervisorStatus::Running {
            return Err(SupervisorError::SupervisorStopped);
        }
        if state.children.contains_key(&spec.id) {
            return Err(SupervisorError::InvalidActorId(spec.id.clone()));
        }

        let child = (spec.factory)()
            .map_err(|e| SupervisorError::ChildCreationFailed(e.to_string()))?;
        let child_ref = child.actor_ref();

        debug!(
            supervisor_id = %self.inner.id,
            child_id = %spec.id,
            restart_type = ?spec.restart_type,
            "child added"
        );
        metrics::counter!(
            "plexactors_supervisor_child_started_total",
            "supervisor_id" => self.inner.id.clone(),
            "child_id" => spec.id.clone()
        )
        .increment(1);

        state.children.insert(spec.id.clone(), child);
        state.refs.insert(spec.id.clone(), child_ref.clone());
        state.specs.insert(spec.id.clone(), spec);

        Ok(child_ref)
    }

    /// Stop a child and remove it from the supervisor
    #[instrument(skip(self), fields(supervisor_id = %self.inner.id, child_id = %id))]
    pub async fn remove_child(&self, id: &str) -> Result<(), SupervisorError> {
        let mut state = self.inner.state.write().await;

        if state.status != SupervisorStatus::Running {
            return Err(SupervisorError::SupervisorStopped);
        }
        let Some(child) = state.children.get(id).cloned() else {
            return Err(SupervisorError::ChildNotFound(id.to_string()));
        };

        child.stop().await?;

        state.children.shift_remove(id);
        state.refs.shift_remove(id);
        state.specs.shift_remove(id);
        debug!(supervisor_id = %self.inner.id, child_id = %id, "child removed");
        Ok(())
    }

    /// Look up the live reference of a child
    pub async fn get_child(&self, id: &str) -> Result<ActorRef, SupervisorError> {
        let state = self.inner.state.read().await;
        if state.status != SupervisorStatus::Running {
            return Err(SupervisorError::SupervisorStopped);
        }
        state
            .refs
            .get(id)
            .cloned()
            .ok_or_else(|| SupervisorError::ChildNotFound(id.to_string()))
    }

    /// Report a child failure and await the restart outcome
    ///
    /// The report is delivered into the supervisor's own mailbox, so failure
    /// handling is serialized with structural changes; the outcome of the
    /// restart protocol (`TooManyRestarts`, `CircuitBreakerOpen`, success)
    /// travels back over a one-shot channel.
    #[instrument(skip(self, reason), fields(supervisor_id = %self.inner.id, child_id = %child_id))]
    pub async fn notify_child_failure(
        &self,
        child_id: &str,
        reason: ExitReason,
    ) -> Result<(), SupervisorError> {
        let (tx, rx) = oneshot::channel();
        let failure = ChildFailure {
            child_id: child_id.to_string(),
            reason,
            reply_to: Some(tx),
        };
        self.inner
            .own_actor()
            .actor_ref()
            .send(Message::internal(Box::new(failure)))
            .await?;

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(SupervisorError::SupervisorStopped),
        }
    }

    /// Stop the supervisor
    ///
    /// Transitions to `Stopping`, stops every child in child order, then
    /// transitions to `Stopped` and stops the supervisor's own actor.
    /// Idempotent.
    #[instrument(skip(self), fields(supervisor_id = %self.inner.id))]
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        SupervisorInner::shutdown(&self.inner).await
    }
}

#[async_trait]
impl Supervised for Supervisor {
    fn id(&self) -> &ActorId {
        &self.inner.id
    }

    fn actor_ref(&self) -> ActorRef {
        Supervisor::actor_ref(self)
    }

    fn is_running(&self) -> bool {
        self.inner.own_actor().is_running()
    }

    async fn stop(&self) -> Result<(), ActorError> {
        Supervisor::stop(self)
            .await
            .map_err(|e| ActorError::InvalidState(e.to_string()))
    }
}

impl SupervisorInner {
    fn own_actor(&self) -> &Arc<Actor> {
        self.own.get().expect("supervisor actor is set at construction")
    }

    /// The restart protocol, invoked from inside the supervisor's receive
    /// loop. The single state lock is held across the whole transaction.
    async fn handle_child_failure(
        inner: &Arc<SupervisorInner>,
        child_id: ActorId,
        reason: ExitReason,
    ) -> Result<(), SupervisorError> {
        let strategy = &inner.strategy;
        let mut state = inner.state.write().await;

        // A supervisor that is going down ignores late reports.
        if matches!(
            state.status,
            SupervisorStatus::Stopping | SupervisorStatus::Stopped
        ) {
            return Ok(());
        }

        state.last_failure = Some(reason.clone());
        warn!(
            supervisor_id = %inner.id,
            child_id = %child_id,
            reason = %reason,
            "child failure reported"
        );

        // Restart-intensity accounting over completed restarts in the window.
        if strategy.max_restarts() > 0 {
            let now = Instant::now();
            if let Some(cutoff) = now.checked_sub(strategy.time_window()) {
                state.restart_history.retain(|t| *t > cutoff);
            }
            let valid_restarts = state.restart_history.len() as u32;

            if valid_restarts > strategy.max_restarts() {
                if strategy.terminate_on_max_restarts() {
                    state.status = SupervisorStatus::Stopping;
                    drop(state);
                    warn!(
                        supervisor_id = %inner.id,
                        child_id = %child_id,
                        "restart intensity exhausted, supervisor terminating"
                    );
                    metrics::counter!(
                        "plexactors_supervisor_intensity_exhausted_total",
                        "supervisor_id" => inner.id.clone()
                    )
                    .increment(1);
                    let inner = Arc::clone(inner);
                    tokio::spawn(async move {
                        let _ = SupervisorInner::shutdown(&inner).await;
                    });
                    return Err(SupervisorError::TooManyRestarts);
                }

                let delay = strategy.calculate_backoff(valid_restarts);
                if delay > std::time::Duration::ZERO {
                    state.status = SupervisorStatus::Restarting;
                    drop(state);
                    debug!(
                        supervisor_id = %inner.id,
                        child_id = %child_id,
                        delay_ms = delay.as_millis() as u64,
                        "restart intensity exhausted, backing off"
                    );
                    let inner = Arc::clone(inner);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        inner.state.write().await.status = SupervisorStatus::Running;
                        let retry = ChildFailure {
                            child_id,
                            reason,
                            reply_to: None,
                        };
                        let _ = inner
                            .own_actor()
                            .actor_ref()
                            .send(Message::internal(Box::new(retry)))
                            .await;
                    });
                    return Ok(());
                }
            }
        }

        // The breaker gates all restart work.
        if !strategy.circuit_breaker().should_allow().await {
            debug!(
                supervisor_id = %inner.id,
                child_id = %child_id,
                "circuit breaker open, failure swallowed"
            );
            return Err(SupervisorError::CircuitBreakerOpen);
        }

        // Restart policy of the failed child.
        let Some(spec) = state.specs.get(&child_id) else {
            return Ok(());
        };
        let should_restart = match spec.restart_type {
            RestartType::Permanent => true,
            RestartType::Temporary => false,
            RestartType::Transient => reason.is_error(),
        };
        if !should_restart {
            state.children.shift_remove(&child_id);
            state.refs.shift_remove(&child_id);
            state.specs.shift_remove(&child_id);
            debug!(
                supervisor_id = %inner.id,
                child_id = %child_id,
                "child dropped without restart"
            );
            return Ok(());
        }

        state.status = SupervisorStatus::Restarting;

        // Restart set from the strategy; empty means the strategy defers to
        // the supervisor's ordered child table.
        let mut restart_set = strategy.handle_failure(&child_id).await;
        if restart_set.is_empty() {
            restart_set = match strategy.kind() {
                StrategyKind::OneForOne => vec![child_id.clone()],
                StrategyKind::OneForAll => state.children.keys().cloned().collect(),
                StrategyKind::RestForOne => match state.children.get_index_of(&child_id) {
                    Some(pos) => state.children.keys().skip(pos).cloned().collect(),
                    None => Vec::new(),
                },
            };
        }

        for id in &restart_set {
            let Some(spec) = state.specs.get(id).cloned() else {
                continue;
            };
            if let Some(old) = state.children.get(id).cloned() {
                let _ = old.stop().await;
            }
            match (spec.factory)() {
                Ok(fresh) => {
                    let fresh_ref = fresh.actor_ref();
                    state.children.insert(id.clone(), fresh);
                    state.refs.insert(id.clone(), fresh_ref);
                    info!(
                        supervisor_id = %inner.id,
                        child_id = %id,
                        "child restarted"
                    );
                    metrics::counter!(
                        "plexactors_supervisor_child_restarted_total",
                        "supervisor_id" => inner.id.clone(),
                        "child_id" => id.clone()
                    )
                    .increment(1);
                }
                Err(err) => {
                    warn!(
                        supervisor_id = %inner.id,
                        child_id = %id,
                        error = %err,
                        "child factory failed during restart"
                    );
                }
            }
        }

        state.restart_history.push(Instant::now());
        strategy.circuit_breaker().record_success().await;
        state.status = SupervisorStatus::Running;
        Ok(())
    }

    async fn shutdown(inner: &Arc<SupervisorInner>) -> Result<(), SupervisorError> {
        let children: Vec<Arc<dyn Supervised>> = {
            let mut state = inner.state.write().await;
            if state.status == SupervisorStatus::Stopped {
                return Ok(());
            }
            state.status = SupervisorStatus::Stopping;
            state.children.values().cloned().collect()
        };

        info!(supervisor_id = %inner.id, children = children.len(), "supervisor stopping");
        for child in children {
            let _ = child.stop().await;
        }

        inner.state.write().await.status = SupervisorStatus::Stopped;
        inner.own_actor().stop().await?;
        Ok(())
    }
}
