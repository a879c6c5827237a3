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

//! Mailbox implementation and message envelope types

use std::any::Any;
use std::time::Duration;

use plexactors_core::{ActorId, ExitReason};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot;
use tracing::trace;
use ulid::Ulid;

/// Internal grace period a sender waits on a full mailbox before giving up
/// with [`SendError::MailboxFull`].
pub const SEND_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Type-erased user payload carried inside message envelopes.
///
/// The runtime never inspects payloads; receivers downcast at the receive
/// site:
/// ```rust,ignore
/// if let Ok(req) = payload.downcast::<MyRequest>() { ... }
/// ```
pub type Payload = Box<dyn Any + Send>;

/// Errors returned by mailbox send operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// Mailbox has reached capacity and stayed full through the grace period
    #[error("actor mailbox is full")]
    MailboxFull,

    /// The receiving actor has stopped and released its mailbox
    #[error("actor is stopped")]
    ActorStopped,

    /// The caller-supplied deadline expired while waiting for capacity
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Notification emitted to a monitor when a monitored actor terminates
///
/// Emitted exactly once per monitor link at the moment the monitored actor
/// terminates. Delivery is best-effort and may interleave freely with other
/// messages to the monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorNotice {
    /// The actor that terminated
    pub monitored_id: ActorId,
    /// The actor being notified
    pub monitor_id: ActorId,
    /// Why the monitored actor terminated
    pub reason: ExitReason,
    /// Termination timestamp in nanoseconds since the Unix epoch
    pub timestamp_ns: i64,
}

/// System-level message envelope
///
/// Messages are a tagged sum at the runtime level; user payloads are carried
/// as type-erased values. Calls carry their reply channel inside the
/// envelope so replies never need out-of-band correlation state.
pub enum Envelope {
    /// Synchronous request: the handler's reply is pushed through `reply_to`
    Call {
        /// User request payload
        payload: Payload,
        /// One-shot reply channel; dropped replies are lost silently
        reply_to: Option<oneshot::Sender<Payload>>,
        /// Caller timeout, carried for observability
        timeout: Duration,
    },
    /// Fire-and-forget request, no reply
    Cast {
        /// User payload
        payload: Payload,
    },
    /// Out-of-band message (anything that is not a call or cast)
    Info {
        /// User payload
        payload: Payload,
    },
    /// Termination notification from the monitor registry
    Monitor(MonitorNotice),
    /// Runtime-internal message (e.g. a supervisor's child-failure report)
    Internal {
        /// Type-erased internal payload, downcast by the owning component
        payload: Payload,
    },
}

/// Message delivered through an actor mailbox
pub struct Message {
    /// Unique message ID
    pub id: String,
    /// The envelope classifying this message
    pub envelope: Envelope,
    /// Sender actor ID, when known
    pub sender: Option<ActorId>,
}

impl Message {
    fn with_envelope(envelope: Envelope) -> Self {
        Message {
            id: Ulid::new().to_string(),
            envelope,
            sender: None,
        }
    }

    /// Create a synchronous call message carrying its reply channel
    pub fn call(payload: Payload, reply_to: oneshot::Sender<Payload>, timeout: Duration) -> Self {
        Self::with_envelope(Envelope::Call {
            payload,
            reply_to: Some(reply_to),
            timeout,
        })
    }

    /// Create a fire-and-forget cast message
    pub fn cast(payload: Payload) -> Self {
        Self::with_envelope(Envelope::Cast { payload })
    }

    /// Create an info message
    pub fn info(payload: Payload) -> Self {
        Self::with_envelope(Envelope::Info { payload })
    }

    /// Create a monitor-notification message
    pub fn monitor(notice: MonitorNotice) -> Self {
        Self::with_envelope(Envelope::Monitor(notice))
    }

    /// Create a runtime-internal message
    pub fn internal(payload: Payload) -> Self {
        Self::with_envelope(Envelope::Internal { payload })
    }

    /// Set the sender actor ID
    pub fn with_sender(mut self, sender: ActorId) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Short tag naming the envelope variant, for logs
    pub fn kind(&self) -> &'static str {
        match self.envelope {
            Envelope::Call { .. } => "call",
            Envelope::Cast { .. } => "cast",
            Envelope::Info { .. } => "info",
            Envelope::Monitor(_) => "monitor",
            Envelope::Internal { .. } => "internal",
        }
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("sender", &self.sender)
            .finish()
    }
}

/// Sender half of a bounded actor mailbox
///
/// Cloneable; any number of producers may hold it. The consuming half
/// ([`MailboxReceiver`]) is owned by the actor's worker task. Once the worker
/// drops the receiver, every pending and future send fails with
/// [`SendError::ActorStopped`].
#[derive(Clone)]
pub struct Mailbox {
    owner: ActorId,
    tx: mpsc::Sender<Message>,
    capacity: usize,
}

/// Receiver half of a bounded actor mailbox (single consumer)
pub struct MailboxReceiver {
    rx: mpsc::Receiver<Message>,
}

impl Mailbox {
    /// Create a bounded mailbox for `owner` with the given capacity
    ///
    /// Capacity is clamped to at least 1.
    pub fn new(owner: ActorId, capacity: usize) -> (Self, MailboxReceiver) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (
            Mailbox {
                owner,
                tx,
                capacity,
            },
            MailboxReceiver { rx },
        )
    }

    /// ID of the actor owning this mailbox
    pub fn owner(&self) -> &ActorId {
        &self.owner
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once the consuming side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Enqueue without blocking
    pub fn try_send(&self, message: Message) -> Result<(), SendError> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SendError::MailboxFull),
            Err(TrySendError::Closed(_)) => Err(SendError::ActorStopped),
        }
    }

    /// Enqueue with the three-tier send protocol
    ///
    /// 1. Attempt a non-blocking enqueue.
    /// 2. On a full mailbox, wait for capacity up to the internal grace
    ///    period ([`SEND_GRACE_PERIOD`]) while watching the caller-supplied
    ///    deadline.
    /// 3. Return `Ok`, [`SendError::DeadlineExceeded`],
    ///    [`SendError::ActorStopped`], or [`SendError::MailboxFull`] (the
    ///    last only if the grace period elapses with the mailbox still
    ///    full).
    ///
    /// Ordering within a single sender is preserved; across senders it is
    /// the order of successful enqueue.
    pub async fn send(&self, message: Message, deadline: Option<Duration>) -> Result<(), SendError> {
        let message = match self.tx.try_send(message) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => return Err(SendError::ActorStopped),
            Err(TrySendError::Full(message)) => message,
        };

        trace!(owner = %self.owner, "mailbox full, entering grace wait");

        let grace = tokio::time::sleep(SEND_GRACE_PERIOD);
        tokio::pin!(grace);
        let caller_deadline = async {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(caller_deadline);

        tokio::select! {
            sent = self.tx.send(message) => sent.map_err(|_| SendError::ActorStopped),
            _ = &mut caller_deadline => Err(SendError::DeadlineExceeded),
            _ = &mut grace => Err(SendError::MailboxFull),
        }
    }
}

impl MailboxReceiver {
    /// Receive the next message; `None` once all senders are gone
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Close the mailbox, waking pending senders with
    /// [`SendError::ActorStopped`]; already-buffered messages stay
    /// receivable.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
