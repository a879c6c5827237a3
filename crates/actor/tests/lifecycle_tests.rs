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

//! Actor lifecycle integration tests
//!
//! Covers:
//! - Per-sender FIFO delivery
//! - Advisory error recording (worker survives receive failures and panics)
//! - Blocked senders waking up on stop
//! - Refs outliving their actor

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use plexactors_actor::{Actor, ActorContext, ActorError, Receiver};
use plexactors_mailbox::{Envelope, Message};
use tokio::sync::Mutex;
use tokio::time::sleep;

struct Recording {
    log: Arc<Mutex<Vec<u32>>>,
}

#[async_trait]
impl Receiver for Recording {
    async fn receive(&mut self, _ctx: &ActorContext, msg: Message) -> Result<(), ActorError> {
        if let Envelope::Cast { payload } = msg.envelope {
            if let Ok(n) = payload.downcast::<u32>() {
                self.log.lock().await.push(*n);
            }
        }
        Ok(())
    }
}

/// Fails on every odd payload, panics on 13, succeeds otherwise.
struct Flaky {
    processed: Arc<AtomicUsize>,
}

#[async_trait]
impl Receiver for Flaky {
    async fn receive(&mut self, _ctx: &ActorContext, msg: Message) -> Result<(), ActorError> {
        self.processed.fetch_add(1, Ordering::SeqCst);
        let Envelope::Cast { payload } = msg.envelope else {
            return Ok(());
        };
        let n = *payload.downcast::<u32>().unwrap();
        if n == 13 {
            panic!("unlucky payload");
        }
        if n % 2 == 1 {
            return Err(ActorError::ReceiveFailed(format!("odd payload {}", n)));
        }
        Ok(())
    }
}

struct Slow;

#[async_trait]
impl Receiver for Slow {
    async fn receive(&mut self, ctx: &ActorContext, _msg: Message) -> Result<(), ActorError> {
        tokio::select! {
            _ = sleep(Duration::from_secs(60)) => {}
            _ = ctx.cancelled() => {}
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_single_sender_fifo_preserved() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let actor = Actor::spawn("fifo@node", Box::new(Recording { log: Arc::clone(&log) }), 64);
    let actor_ref = actor.actor_ref();

    for n in 0..32u32 {
        actor_ref.send(Message::cast(Box::new(n))).await.unwrap();
    }
    sleep(Duration::from_millis(100)).await;

    let seen = log.lock().await.clone();
    assert_eq!(seen, (0..32).collect::<Vec<u32>>());
    actor.stop().await.unwrap();
}

#[tokio::test]
async fn test_receive_error_is_advisory() {
    let processed = Arc::new(AtomicUsize::new(0));
    let actor = Actor::spawn(
        "flaky@node",
        Box::new(Flaky { processed: Arc::clone(&processed) }),
        16,
    );
    let actor_ref = actor.actor_ref();

    actor_ref.send(Message::cast(Box::new(1u32))).await.unwrap();
    actor_ref.send(Message::cast(Box::new(2u32))).await.unwrap();
    sleep(Duration::from_millis(50)).await;

    // Both messages processed; the error from the first was recorded only.
    assert_eq!(processed.load(Ordering::SeqCst), 2);
    let last = actor.last_error().await.unwrap();
    assert_eq!(last, ActorError::ReceiveFailed("odd payload 1".to_string()));
    assert!(actor.is_running());

    actor.stop().await.unwrap();
}

#[tokio::test]
async fn test_panic_does_not_kill_worker() {
    let processed = Arc::new(AtomicUsize::new(0));
    let actor = Actor::spawn(
        "panicky@node",
        Box::new(Flaky { processed: Arc::clone(&processed) }),
        16,
    );
    let actor_ref = actor.actor_ref();

    actor_ref.send(Message::cast(Box::new(13u32))).await.unwrap();
    actor_ref.send(Message::cast(Box::new(2u32))).await.unwrap();
    sleep(Duration::from_millis(50)).await;

    assert_eq!(processed.load(Ordering::SeqCst), 2);
    match actor.last_error().await.unwrap() {
        ActorError::ReceiveFailed(msg) => assert!(msg.contains("panic")),
        other => panic!("unexpected last_error: {:?}", other),
    }
    assert!(actor.is_running());

    actor.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_wakes_blocked_sender() {
    // Capacity 1, slow receiver: the second send blocks in the grace wait.
    let actor = Actor::spawn("slow@node", Box::new(Slow), 1);
    let actor_ref = actor.actor_ref();

    actor_ref.send(Message::cast(Box::new(0u32))).await.unwrap();
    actor_ref.send(Message::cast(Box::new(1u32))).await.unwrap();

    let blocked_ref = actor.actor_ref();
    let blocked = tokio::spawn(async move {
        blocked_ref
            .send_timeout(Message::cast(Box::new(2u32)), Some(Duration::from_secs(5)))
            .await
    });

    sleep(Duration::from_millis(20)).await;
    actor.stop().await.unwrap();

    let err = blocked.await.unwrap().unwrap_err();
    assert_eq!(err, ActorError::Stopped);
}

#[tokio::test]
async fn test_ref_outlives_actor() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let actor = Actor::spawn("shortlived@node", Box::new(Recording { log }), 4);
    let actor_ref = actor.actor_ref();

    actor.stop().await.unwrap();
    drop(actor);

    assert!(!actor_ref.is_running());
    let err = actor_ref.send(Message::cast(Box::new(0u32))).await.unwrap_err();
    assert_eq!(err, ActorError::Stopped);
}
