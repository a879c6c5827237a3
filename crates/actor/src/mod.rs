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

//! Actor lifecycle and message processing

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use plexactors_core::ActorId;
use plexactors_mailbox::{Mailbox, MailboxReceiver, Message, SendError};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Actor errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActorError {
    /// The actor has stopped; its mailbox is released
    #[error("actor is stopped")]
    Stopped,

    /// The requested actor does not exist
    #[error("actor not found: {0}")]
    NotFound(String),

    /// Actor ID is invalid or already in use
    #[error("invalid actor ID: {0}")]
    InvalidId(String),

    /// The actor's mailbox stayed full through the send grace period
    #[error("actor mailbox is full")]
    MailboxFull,

    /// A caller-supplied deadline expired
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The receive callback returned an error (or panicked)
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Operation is not valid for the actor's current state
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<SendError> for ActorError {
    fn from(err: SendError) -> Self {
        match err {
            SendError::MailboxFull => ActorError::MailboxFull,
            SendError::ActorStopped => ActorError::Stopped,
            SendError::DeadlineExceeded => ActorError::DeadlineExceeded,
        }
    }
}

/// Context passed to a receiver while handling a message
///
/// Carries the actor's identity and its cancellation signal. A receive
/// callback that performs long waits should watch [`ActorContext::cancelled`]
/// so `stop()` can unwind it.
#[derive(Clone)]
pub struct ActorContext {
    actor_id: ActorId,
    cancel: watch::Receiver<bool>,
}

impl ActorContext {
    /// ID of the actor this context belongs to
    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    /// True once the actor has been asked to stop
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolve when the actor is asked to stop
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Receive side of an actor: what you implement to process messages
///
/// The worker invokes `receive` for every dequeued message, strictly one at
/// a time in dequeue order. A returned error (or a panic, which the worker
/// catches) is recorded as the actor's `last_error`; the worker keeps
/// processing subsequent messages. The runtime never restarts an actor on a
/// receive error by itself; restarting is a supervisor concern driven by
/// explicit failure reports.
#[async_trait]
pub trait Receiver: Send {
    /// Handle one dequeued message
    async fn receive(&mut self, ctx: &ActorContext, msg: Message) -> Result<(), ActorError>;

    /// Called once when the worker exits, before the mailbox is released
    async fn on_stop(&mut self, _ctx: &ActorContext) {}
}

/// An isolated unit of concurrent computation
///
/// Owns a bounded mailbox, a single worker task, opaque key/value state and
/// a user-supplied [`Receiver`]. Shared as `Arc<Actor>`; non-owning handles
/// are minted with [`Actor::actor_ref`].
pub struct Actor {
    id: ActorId,
    mailbox: Mailbox,
    stopped: Arc<AtomicBool>,
    cancel_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    last_error: Arc<RwLock<Option<ActorError>>>,
    state: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Actor {
    /// Create the actor and spawn its worker task
    ///
    /// Allocates a mailbox of `capacity` and immediately starts draining it.
    /// Must be called from within a Tokio runtime.
    pub fn spawn(id: impl Into<ActorId>, receiver: Box<dyn Receiver>, capacity: usize) -> Arc<Self> {
        let id = id.into();
        let (mailbox, receiver_chan) = Mailbox::new(id.clone(), capacity);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let last_error = Arc::new(RwLock::new(None));

        let worker = tokio::spawn(Self::run_worker(
            id.clone(),
            receiver,
            receiver_chan,
            cancel_rx,
            Arc::clone(&last_error),
        ));

        debug!(actor_id = %id, capacity, "actor spawned");

        Arc::new(Actor {
            id,
            mailbox,
            stopped: Arc::new(AtomicBool::new(false)),
            cancel_tx,
            worker: Mutex::new(Some(worker)),
            last_error,
            state: RwLock::new(HashMap::new()),
        })
    }

    async fn run_worker(
        id: ActorId,
        mut receiver: Box<dyn Receiver>,
        mut chan: MailboxReceiver,
        mut cancel_rx: watch::Receiver<bool>,
        last_error: Arc<RwLock<Option<ActorError>>>,
    ) {
        let ctx = ActorContext {
            actor_id: id.clone(),
            cancel: cancel_rx.clone(),
        };

        loop {
            tokio::select! {
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        break;
                    }
                }
                maybe = chan.recv() => {
                    let Some(msg) = maybe else { break };
                    trace!(actor_id = %id, message_id = %msg.id, kind = msg.kind(), "processing message");
                    let outcome = AssertUnwindSafe(receiver.receive(&ctx, msg))
                        .catch_unwind()
                        .await;
                    match outcome {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => {
                            debug!(actor_id = %id, error = %err, "receive callback failed");
                            *last_error.write().await = Some(err);
                        }
                        Err(panic) => {
                            let detail = panic_message(panic);
                            warn!(actor_id = %id, panic = %detail, "receive callback panicked");
                            *last_error.write().await =
                                Some(ActorError::ReceiveFailed(format!("panic: {}", detail)));
                        }
                    }
                }
            }
        }

        chan.close();
        receiver.on_stop(&ctx).await;
        debug!(actor_id = %id, "actor worker exited");
        // Dropping `chan` releases the mailbox; blocked senders wake with
        // ActorStopped.
    }

    /// Actor ID
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// True until `stop()` has begun
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    /// The actor's mailbox (sender half)
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Mint a non-owning handle for sending messages to this actor
    ///
    /// The handle's lifetime is independent of the actor's: it may outlive
    /// the actor, in which case sends fail with [`ActorError::Stopped`].
    pub fn actor_ref(&self) -> ActorRef {
        ActorRef {
            id: self.id.clone(),
            mailbox: self.mailbox.clone(),
            stopped: Arc::clone(&self.stopped),
        }
    }

    /// Enqueue a message into this actor's mailbox
    pub async fn send(&self, message: Message, deadline: Option<Duration>) -> Result<(), ActorError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(ActorError::Stopped);
        }
        self.mailbox.send(message, deadline).await.map_err(ActorError::from)
    }

    /// Stop the actor
    ///
    /// Sets the stopped flag, signals the worker to exit, awaits worker
    /// termination and closes the mailbox so pending senders wake with
    /// [`ActorError::Stopped`]. Idempotent.
    pub async fn stop(&self) -> Result<(), ActorError> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(actor_id = %self.id, "stopping actor");
        let _ = self.cancel_tx.send(true);
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        Ok(())
    }

    /// Last receive-callback error, if any
    ///
    /// Advisory only: the worker keeps running after recording it. Report
    /// the failure to a supervisor explicitly when a restart is wanted.
    pub async fn last_error(&self) -> Option<ActorError> {
        self.last_error.read().await.clone()
    }

    /// Store an opaque state value under `key`
    pub async fn set_state(&self, key: impl Into<String>, value: Arc<dyn Any + Send + Sync>) {
        self.state.write().await.insert(key.into(), value);
    }

    /// Fetch the opaque state value stored under `key`
    pub async fn get_state(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.state.read().await.get(key).cloned()
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Non-owning handle for sending messages to an actor
///
/// Cheap to clone and share. Never exposes the actor's private state.
#[derive(Clone)]
pub struct ActorRef {
    id: ActorId,
    mailbox: Mailbox,
    stopped: Arc<AtomicBool>,
}

impl ActorRef {
    /// ID of the referenced actor
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// True until the referenced actor has begun stopping
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst) && !self.mailbox.is_closed()
    }

    /// Send a message with no caller deadline
    pub async fn send(&self, message: Message) -> Result<(), ActorError> {
        self.send_timeout(message, None).await
    }

    /// Send a message, bounding the wait-for-capacity by `deadline`
    pub async fn send_timeout(
        &self,
        message: Message,
        deadline: Option<Duration>,
    ) -> Result<(), ActorError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(ActorError::Stopped);
        }
        self.mailbox.send(message, deadline).await.map_err(ActorError::from)
    }
}

impl std::fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id)
            .field("running", &self.is_running())
            .finish()
    }
}
