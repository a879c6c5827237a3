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

//! End-to-end supervision scenarios
//!
//! Exercises the composed runtime through the public facade: single-failure
//! recovery, cascading restarts, restart-intensity exhaustion, breaker
//! gating, call timeouts and monitor links on termination.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use plexactors::actor::{ActorContext, ActorError, MonitorKind, Receiver};
use plexactors::circuit_breaker::CircuitBreakerConfig;
use plexactors::core::ExitReason;
use plexactors::genserver::{call, GenServer, GenServerError, GenServerOptions};
use plexactors::mailbox::{Envelope, Message, MonitorNotice, Payload};
use plexactors::supervision::{
    Strategy, StrategyConfig, StrategyKind, SupervisorError, SupervisorStatus,
};
use plexactors::system::ActorSystem;
use tokio::sync::Mutex;
use tokio::time::sleep;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

struct Echo {
    seen: Arc<AtomicUsize>,
}

#[async_trait]
impl Receiver for Echo {
    async fn receive(&mut self, _ctx: &ActorContext, _msg: Message) -> Result<(), ActorError> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// S1: a one-for-one supervisor replaces only the failed child.
#[tokio::test]
async fn s1_one_for_one_recovers_single_failure() {
    init_tracing();
    let system = ActorSystem::new("s1");
    let sup = system
        .spawn_supervisor("s1-sup", StrategyKind::OneForOne, 3, 60)
        .await
        .unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let spec_a = plexactors::supervision::ChildSpec::new("a", {
        let seen = Arc::clone(&seen);
        Arc::new(move || {
            let child: Arc<dyn plexactors::supervision::Supervised> =
                plexactors::actor::Actor::spawn(
                    "a".to_string(),
                    Box::new(Echo {
                        seen: Arc::clone(&seen),
                    }),
                    16,
                );
            Ok(child)
        })
    });
    let spec_b = plexactors::supervision::ChildSpec::new("b", {
        let seen = Arc::clone(&seen);
        Arc::new(move || {
            let child: Arc<dyn plexactors::supervision::Supervised> =
                plexactors::actor::Actor::spawn(
                    "b".to_string(),
                    Box::new(Echo {
                        seen: Arc::clone(&seen),
                    }),
                    16,
                );
            Ok(child)
        })
    });

    let old_a = sup.add_child(spec_a).await.unwrap();
    let old_b = sup.add_child(spec_b).await.unwrap();

    sup.notify_child_failure("a", ExitReason::Error("receive failed".into()))
        .await
        .unwrap();

    // Within well under 100 ms the supervisor exposes a fresh ref for A.
    sleep(Duration::from_millis(50)).await;
    let new_a = sup.get_child("a").await.unwrap();
    assert!(new_a.is_running());
    assert!(!old_a.is_running());

    // B is untouched.
    let b_now = sup.get_child("b").await.unwrap();
    assert!(old_b.is_running());
    assert!(b_now.is_running());

    assert_eq!(
        sup.last_failure().await,
        Some(ExitReason::Error("receive failed".into()))
    );

    system.stop().await.unwrap();
}

/// S2: one-for-all replaces every child on a single failure.
#[tokio::test]
async fn s2_one_for_all_cascades() {
    init_tracing();
    let system = ActorSystem::new("s2");
    let sup = system
        .spawn_supervisor("s2-sup", StrategyKind::OneForAll, 3, 60)
        .await
        .unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    for id in ["a", "b"] {
        let seen = Arc::clone(&seen);
        let actor_id = id.to_string();
        sup.add_child(plexactors::supervision::ChildSpec::new(
            id,
            Arc::new(move || {
                let child: Arc<dyn plexactors::supervision::Supervised> =
                    plexactors::actor::Actor::spawn(
                        actor_id.clone(),
                        Box::new(Echo {
                            seen: Arc::clone(&seen),
                        }),
                        16,
                    );
                Ok(child)
            }),
        ))
        .await
        .unwrap();
    }
    let old_a = sup.get_child("a").await.unwrap();
    let old_b = sup.get_child("b").await.unwrap();

    sup.notify_child_failure("a", ExitReason::Error("boom".into()))
        .await
        .unwrap();

    let new_a = sup.get_child("a").await.unwrap();
    let new_b = sup.get_child("b").await.unwrap();
    assert!(!old_a.is_running());
    assert!(!old_b.is_running());
    assert!(new_a.is_running());
    assert!(new_b.is_running());

    system.stop().await.unwrap();
}

/// S3: restart-intensity exhaustion terminates the supervisor.
#[tokio::test]
async fn s3_restart_intensity_exhaustion() {
    init_tracing();
    let system = ActorSystem::new("s3");
    let sup = system
        .spawn_supervisor("s3-sup", StrategyKind::OneForOne, 2, 10)
        .await
        .unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let seen_for_factory = Arc::clone(&seen);
    sup.add_child(plexactors::supervision::ChildSpec::new(
        "a",
        Arc::new(move || {
            let child: Arc<dyn plexactors::supervision::Supervised> =
                plexactors::actor::Actor::spawn(
                    "a".to_string(),
                    Box::new(Echo {
                        seen: Arc::clone(&seen_for_factory),
                    }),
                    16,
                );
            Ok(child)
        }),
    ))
    .await
    .unwrap();
    let child_ref = sup.get_child("a").await.unwrap();

    // Three reports restart; the fourth exhausts the window.
    for _ in 0..3 {
        sup.notify_child_failure("a", ExitReason::Error("boom".into()))
            .await
            .unwrap();
    }
    let err = sup
        .notify_child_failure("a", ExitReason::Error("boom".into()))
        .await
        .unwrap_err();
    assert_eq!(err, SupervisorError::TooManyRestarts);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(sup.status().await, SupervisorStatus::Stopped);
    assert!(!child_ref.is_running());

    system.stop().await.unwrap();
}

/// S4: the circuit breaker opens after rapid failures and recovers through
/// half-open.
#[tokio::test]
async fn s4_circuit_breaker_opens() {
    init_tracing();
    let system = ActorSystem::new("s4");
    let strategy = Strategy::with_config(
        StrategyKind::OneForOne,
        0,
        60,
        StrategyConfig {
            circuit_breaker: Some(CircuitBreakerConfig {
                trip_threshold: 3,
                failure_window: Duration::from_secs(10),
                reset_timeout: Duration::from_secs(1),
                success_threshold: 1,
            }),
            ..StrategyConfig::default()
        },
    )
    .unwrap();
    let sup = system.spawn_supervisor_with("s4-sup", strategy).await.unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let seen_for_factory = Arc::clone(&seen);
    sup.add_child(plexactors::supervision::ChildSpec::new(
        "a",
        Arc::new(move || {
            let child: Arc<dyn plexactors::supervision::Supervised> =
                plexactors::actor::Actor::spawn(
                    "a".to_string(),
                    Box::new(Echo {
                        seen: Arc::clone(&seen_for_factory),
                    }),
                    16,
                );
            Ok(child)
        }),
    ))
    .await
    .unwrap();

    // Three failures within the window trip the breaker.
    for _ in 0..3 {
        sup.notify_child_failure("a", ExitReason::Error("boom".into()))
            .await
            .unwrap();
    }

    let err = sup
        .notify_child_failure("a", ExitReason::Error("boom".into()))
        .await
        .unwrap_err();
    assert_eq!(err, SupervisorError::CircuitBreakerOpen);

    // After the reset timeout the breaker goes half-open and admits work
    // again; a record_success moves it toward closed.
    sleep(Duration::from_millis(1100)).await;
    assert!(sup.strategy().circuit_breaker().should_allow().await);
    sup.strategy().circuit_breaker().record_success().await;

    sup.notify_child_failure("a", ExitReason::Error("boom".into()))
        .await
        .unwrap();

    system.stop().await.unwrap();
}

/// S5: a slow call handler forces a caller timeout but leaves the server
/// usable.
struct Sleeper {
    calls: u64,
}

#[async_trait]
impl GenServer for Sleeper {
    type Args = ();

    async fn init(_args: ()) -> Result<Self, GenServerError> {
        Ok(Sleeper { calls: 0 })
    }

    async fn handle_call(
        &mut self,
        _ctx: &ActorContext,
        _payload: Payload,
    ) -> Result<Payload, GenServerError> {
        sleep(Duration::from_millis(500)).await;
        self.calls += 1;
        Ok(Box::new(self.calls))
    }
}

#[tokio::test]
async fn s5_gen_server_call_timeout() {
    init_tracing();
    let system = ActorSystem::new("s5");
    let server_ref = system
        .spawn_gen_server::<Sleeper>("sleeper", (), GenServerOptions::default())
        .await
        .unwrap();

    let err = call(&server_ref, Box::new(()), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert_eq!(err, GenServerError::DeadlineExceeded);

    // The handler still ran to completion and the server remains usable.
    sleep(Duration::from_millis(600)).await;
    let reply = call(&server_ref, Box::new(()), Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(*reply.downcast::<u64>().unwrap(), 2);

    system.stop().await.unwrap();
}

/// S6: bidirectional monitors deliver exactly one notice per termination.
struct NoticeCollector {
    notices: Arc<Mutex<Vec<MonitorNotice>>>,
}

#[async_trait]
impl Receiver for NoticeCollector {
    async fn receive(&mut self, _ctx: &ActorContext, msg: Message) -> Result<(), ActorError> {
        if let Envelope::Monitor(notice) = msg.envelope {
            self.notices.lock().await.push(notice);
        }
        Ok(())
    }
}

#[tokio::test]
async fn s6_bidirectional_monitor_on_termination() {
    init_tracing();
    let system = ActorSystem::new("s6");

    let notices_a = Arc::new(Mutex::new(Vec::new()));
    let notices_b = Arc::new(Mutex::new(Vec::new()));
    for (id, notices) in [("a", &notices_a), ("b", &notices_b)] {
        let notices = Arc::clone(notices);
        system
            .spawn_actor(
                id,
                move || {
                    Box::new(NoticeCollector {
                        notices: Arc::clone(&notices),
                    }) as Box<dyn Receiver>
                },
                16,
            )
            .await
            .unwrap();
    }

    system.monitor("a", "b", MonitorKind::Bidirectional).await.unwrap();

    system.stop_actor("a").await.unwrap();
    sleep(Duration::from_millis(100)).await;

    {
        let received = notices_b.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].monitored_id, "a");
        assert_eq!(received[0].reason, ExitReason::Normal);
    }

    // A is gone; B's termination notifies nobody and raises no error.
    system.stop_actor("b").await.unwrap();
    sleep(Duration::from_millis(50)).await;
    assert!(notices_a.lock().await.is_empty());

    system.stop().await.unwrap();
}
