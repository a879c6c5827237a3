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

//! GenServer implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use plexactors_actor::{Actor, ActorContext, ActorError, ActorRef, Receiver};
use plexactors_core::ExitReason;
use plexactors_mailbox::{Envelope, Message, MonitorNotice, Payload};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Default timeout applied when callers pass no explicit call deadline
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// GenServer errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenServerError {
    /// `init` failed; the server was not started
    #[error("failed to initialize gen server: {0}")]
    InitFailed(String),

    /// A handler returned an error
    #[error("handler failed: {0}")]
    HandlerFailed(String),

    /// The server dropped the reply channel without replying
    #[error("no reply from server")]
    NoReply,

    /// The caller's deadline expired before a reply arrived
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Underlying actor error
    #[error(transparent)]
    Actor(#[from] ActorError),
}

/// Out-of-band message dispatched to [`GenServer::handle_info`]
pub enum InfoMessage {
    /// Plain info payload
    User(Payload),
    /// Termination notice for a monitored actor
    Monitor(MonitorNotice),
}

/// The generic server behavior: the implementing struct *is* the state
///
/// ## Erlang Equivalent
/// `gen_server` callbacks: `init/1`, `handle_call/3`, `handle_cast/2`,
/// `handle_info/2`, `terminate/2`. Handlers take `&mut self`, so state
/// transitions are in-place instead of returning a new state value.
///
/// All handlers except [`GenServer::init`] have default implementations, so
/// a server only implements the shapes it speaks.
#[async_trait]
pub trait GenServer: Send + Sized + 'static {
    /// Arguments consumed by `init`
    type Args: Send + 'static;

    /// Build the initial server state
    ///
    /// Runs to completion before any message can be delivered. On error the
    /// server is not started and not registered.
    async fn init(args: Self::Args) -> Result<Self, GenServerError>;

    /// Handle a synchronous call and produce the reply
    async fn handle_call(
        &mut self,
        _ctx: &ActorContext,
        _payload: Payload,
    ) -> Result<Payload, GenServerError> {
        Ok(Box::new(()))
    }

    /// Handle an asynchronous cast
    async fn handle_cast(
        &mut self,
        _ctx: &ActorContext,
        _payload: Payload,
    ) -> Result<(), GenServerError> {
        Ok(())
    }

    /// Handle any other message (info payloads and monitor notices)
    async fn handle_info(
        &mut self,
        _ctx: &ActorContext,
        _msg: InfoMessage,
    ) -> Result<(), GenServerError> {
        Ok(())
    }

    /// Cleanup hook, invoked exactly once when the server stops
    async fn terminate(&mut self, _reason: ExitReason) {}
}

/// Options for starting a gen server
#[derive(Debug, Clone)]
pub struct GenServerOptions {
    /// Register the server under this logical name, atomically with creation
    pub name: Option<String>,
    /// Mailbox capacity
    pub capacity: usize,
}

impl Default for GenServerOptions {
    fn default() -> Self {
        GenServerOptions {
            name: None,
            capacity: 100,
        }
    }
}

impl GenServerOptions {
    /// Set the registered name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the mailbox capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Receiver adapter dispatching envelopes to the server's hooks
struct GenServerReceiver<G: GenServer> {
    server: G,
}

#[async_trait]
impl<G: GenServer> Receiver for GenServerReceiver<G> {
    async fn receive(&mut self, ctx: &ActorContext, msg: Message) -> Result<(), ActorError> {
        match msg.envelope {
            Envelope::Call {
                payload, reply_to, ..
            } => match self.server.handle_call(ctx, payload).await {
                Ok(reply) => {
                    if let Some(tx) = reply_to {
                        // The caller may already have timed out; a dropped
                        // reply is intentional.
                        if tx.send(reply).is_err() {
                            trace!(actor_id = %ctx.actor_id(), "reply dropped, caller gone");
                        }
                    }
                    Ok(())
                }
                Err(err) => Err(ActorError::ReceiveFailed(err.to_string())),
            },
            Envelope::Cast { payload } => self
                .server
                .handle_cast(ctx, payload)
                .await
                .map_err(|e| ActorError::ReceiveFailed(e.to_string())),
            Envelope::Info { payload } => self
                .server
                .handle_info(ctx, InfoMessage::User(payload))
                .await
                .map_err(|e| ActorError::ReceiveFailed(e.to_string())),
            Envelope::Monitor(notice) => self
                .server
                .handle_info(ctx, InfoMessage::Monitor(notice))
                .await
                .map_err(|e| ActorError::ReceiveFailed(e.to_string())),
            Envelope::Internal { .. } => Ok(()),
        }
    }

    async fn on_stop(&mut self, ctx: &ActorContext) {
        debug!(actor_id = %ctx.actor_id(), "gen server terminating");
        self.server.terminate(ExitReason::Normal).await;
    }
}

/// Start a gen server
///
/// Invokes [`GenServer::init`] synchronously before spawning the actor, so
/// no message can be observed by a partially initialized server. Name
/// registration is the hosting system's concern (it is atomic with creation
/// there); `options.name` is carried for it.
pub async fn start<G: GenServer>(
    id: &str,
    args: G::Args,
    options: GenServerOptions,
) -> Result<(Arc<Actor>, ActorRef), GenServerError> {
    let server = G::init(args)
        .await
        .map_err(|e| GenServerError::InitFailed(e.to_string()))?;
    let receiver = GenServerReceiver { server };
    let actor = Actor::spawn(id.to_string(), Box::new(receiver), options.capacity.max(1));
    let actor_ref = actor.actor_ref();
    Ok((actor, actor_ref))
}

/// Synchronous request/response over the asynchronous mailbox
///
/// Creates a one-shot reply channel, enqueues a `Call` envelope and waits
/// for the reply or the deadline, whichever comes first. On timeout the
/// server may still produce a reply later; it is dropped by the closed
/// channel.
pub async fn call(
    to: &ActorRef,
    payload: Payload,
    timeout: Duration,
) -> Result<Payload, GenServerError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    let msg = Message::call(payload, reply_tx, timeout);
    to.send_timeout(msg, Some(timeout)).await?;

    match tokio::time::timeout(timeout, reply_rx).await {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(_)) => Err(GenServerError::NoReply),
        Err(_) => Err(GenServerError::DeadlineExceeded),
    }
}

/// Fire-and-forget request
pub async fn cast(to: &ActorRef, payload: Payload) -> Result<(), GenServerError> {
    to.send(Message::cast(payload)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Counter server: calls add and reply with the new total, casts add
    /// silently, info messages reset.
    struct Counter {
        total: u64,
        terminated: Arc<AtomicBool>,
    }

    struct CounterArgs {
        start: u64,
        terminated: Arc<AtomicBool>,
    }

    #[async_trait]
    impl GenServer for Counter {
        type Args = CounterArgs;

        async fn init(args: Self::Args) -> Result<Self, GenServerError> {
            if args.start > 1000 {
                return Err(GenServerError::InitFailed("start value too large".into()));
            }
            Ok(Counter {
                total: args.start,
                terminated: args.terminated,
            })
        }

        async fn handle_call(
            &mut self,
            _ctx: &ActorContext,
            payload: Payload,
        ) -> Result<Payload, GenServerError> {
            let delta = *payload
                .downcast::<u64>()
                .map_err(|_| GenServerError::HandlerFailed("expected u64".into()))?;
            self.total += delta;
            Ok(Box::new(self.total))
        }

        async fn handle_cast(
            &mut self,
            _ctx: &ActorContext,
            payload: Payload,
        ) -> Result<(), GenServerError> {
            if let Ok(delta) = payload.downcast::<u64>() {
                self.total += *delta;
            }
            Ok(())
        }

        async fn handle_info(
            &mut self,
            _ctx: &ActorContext,
            msg: InfoMessage,
        ) -> Result<(), GenServerError> {
            if let InfoMessage::User(_) = msg {
                self.total = 0;
            }
            Ok(())
        }

        async fn terminate(&mut self, _reason: ExitReason) {
            self.terminated.store(true, Ordering::SeqCst);
        }
    }

    fn counter_args(start: u64) -> (CounterArgs, Arc<AtomicBool>) {
        let terminated = Arc::new(AtomicBool::new(false));
        (
            CounterArgs {
                start,
                terminated: Arc::clone(&terminated),
            },
            terminated,
        )
    }

    #[tokio::test]
    async fn test_call_updates_state_and_replies() {
        let (args, _) = counter_args(10);
        let (actor, actor_ref) = start::<Counter>("counter@test", args, GenServerOptions::default())
            .await
            .unwrap();

        let reply = call(&actor_ref, Box::new(5u64), DEFAULT_CALL_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(*reply.downcast::<u64>().unwrap(), 15);

        let reply = call(&actor_ref, Box::new(1u64), DEFAULT_CALL_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(*reply.downcast::<u64>().unwrap(), 16);

        actor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_cast_is_fire_and_forget() {
        let (args, _) = counter_args(0);
        let (actor, actor_ref) = start::<Counter>("caster@test", args, GenServerOptions::default())
            .await
            .unwrap();

        cast(&actor_ref, Box::new(7u64)).await.unwrap();
        let reply = call(&actor_ref, Box::new(0u64), DEFAULT_CALL_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(*reply.downcast::<u64>().unwrap(), 7);

        actor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_info_routes_to_handle_info() {
        let (args, _) = counter_args(42);
        let (actor, actor_ref) = start::<Counter>("info@test", args, GenServerOptions::default())
            .await
            .unwrap();

        actor_ref.send(Message::info(Box::new(()))).await.unwrap();
        let reply = call(&actor_ref, Box::new(0u64), DEFAULT_CALL_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(*reply.downcast::<u64>().unwrap(), 0);

        actor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_init_failure_prevents_start() {
        let (args, _) = counter_args(5000);
        let result = start::<Counter>("bad@test", args, GenServerOptions::default()).await;
        assert!(matches!(result, Err(GenServerError::InitFailed(_))));
    }

    #[tokio::test]
    async fn test_terminate_called_once_on_stop() {
        let (args, terminated) = counter_args(0);
        let (actor, _ref) = start::<Counter>("term@test", args, GenServerOptions::default())
            .await
            .unwrap();

        actor.stop().await.unwrap();
        assert!(terminated.load(Ordering::SeqCst));

        // Idempotent stop does not re-run terminate (the flag stays set and
        // the worker has already exited).
        actor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_call_to_stopped_server() {
        let (args, _) = counter_args(0);
        let (actor, actor_ref) = start::<Counter>("gone@test", args, GenServerOptions::default())
            .await
            .unwrap();
        actor.stop().await.unwrap();

        let err = call(&actor_ref, Box::new(1u64), DEFAULT_CALL_TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err, GenServerError::Actor(ActorError::Stopped));
    }
}
