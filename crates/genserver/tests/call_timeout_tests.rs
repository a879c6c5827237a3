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

//! Call-timeout behavior of gen servers
//!
//! A slow handler must not wedge the server: the caller times out with
//! `DeadlineExceeded`, the handler still completes and updates state, the
//! late reply is dropped silently and the server stays usable.

use std::time::Duration;

use async_trait::async_trait;
use plexactors_actor::ActorContext;
use plexactors_genserver::{call, start, GenServer, GenServerError, GenServerOptions};
use plexactors_mailbox::Payload;
use tokio::time::sleep;

/// Sleeps before answering; counts handled calls in state.
struct SlowEcho {
    handled: u64,
    delay: Duration,
}

#[async_trait]
impl GenServer for SlowEcho {
    type Args = Duration;

    async fn init(delay: Self::Args) -> Result<Self, GenServerError> {
        Ok(SlowEcho { handled: 0, delay })
    }

    async fn handle_call(
        &mut self,
        _ctx: &ActorContext,
        payload: Payload,
    ) -> Result<Payload, GenServerError> {
        sleep(self.delay).await;
        self.handled += 1;
        if payload.downcast_ref::<&str>() == Some(&"count") {
            return Ok(Box::new(self.handled));
        }
        Ok(payload)
    }
}

#[tokio::test]
async fn test_slow_call_times_out_but_server_survives() {
    let (actor, actor_ref) = start::<SlowEcho>(
        "slow-echo@test",
        Duration::from_millis(500),
        GenServerOptions::default(),
    )
    .await
    .unwrap();

    // The caller gives up long before the handler finishes.
    let err = call(&actor_ref, Box::new("ping"), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert_eq!(err, GenServerError::DeadlineExceeded);

    // Let the handler complete; its late reply is dropped silently and the
    // state update sticks.
    sleep(Duration::from_millis(600)).await;

    let reply = call(&actor_ref, Box::new("count"), Duration::from_secs(2))
        .await
        .unwrap();
    // First (timed-out) call plus this one.
    assert_eq!(*reply.downcast::<u64>().unwrap(), 2);

    actor.stop().await.unwrap();
}

#[tokio::test]
async fn test_fast_call_within_deadline() {
    let (actor, actor_ref) = start::<SlowEcho>(
        "fast-echo@test",
        Duration::from_millis(10),
        GenServerOptions::default(),
    )
    .await
    .unwrap();

    let reply = call(&actor_ref, Box::new("hello"), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(*reply.downcast::<&str>().unwrap(), "hello");

    actor.stop().await.unwrap();
}

#[tokio::test]
async fn test_queued_calls_are_served_in_order() {
    let (actor, actor_ref) = start::<SlowEcho>(
        "queued-echo@test",
        Duration::from_millis(20),
        GenServerOptions::default(),
    )
    .await
    .unwrap();

    let mut tasks = Vec::new();
    for n in 0..4u32 {
        let r = actor_ref.clone();
        tasks.push(tokio::spawn(async move {
            call(&r, Box::new(n), Duration::from_secs(2)).await
        }));
    }
    for (n, task) in tasks.into_iter().enumerate() {
        let reply = task.await.unwrap().unwrap();
        assert_eq!(*reply.downcast::<u32>().unwrap(), n as u32);
    }

    actor.stop().await.unwrap();
}
