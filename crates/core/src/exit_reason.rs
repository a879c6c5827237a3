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

//! Exit reason types
//!
//! ## Purpose
//! Defines why an actor terminated, enabling supervision decisions and
//! monitor-notification semantics (Erlang/OTP-style).

use serde::{Deserialize, Serialize};

/// Exit reason for actor termination (Erlang/OTP-style)
///
/// ## Erlang Equivalent
/// Maps to Erlang's exit reasons:
/// - `normal`: Normal termination (not an error)
/// - `shutdown`: Graceful shutdown requested
/// - `{error, Reason}`: Error with message
///
/// ## Usage
/// - Carried inside monitor notifications when a monitored actor terminates
/// - Passed to `GenServer::terminate` on stop
/// - Used by supervisors to decide `Transient` restart policies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Normal termination (not an error)
    Normal,
    /// Shutdown requested (graceful)
    Shutdown,
    /// Error with message
    Error(String),
}

impl ExitReason {
    /// Check if this is a normal exit (not an error)
    pub fn is_normal(&self) -> bool {
        matches!(self, ExitReason::Normal)
    }

    /// Check if this is an error exit
    pub fn is_error(&self) -> bool {
        matches!(self, ExitReason::Error(_))
    }

    /// Get error message if this is an error exit
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ExitReason::Error(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Normal => write!(f, "normal"),
            ExitReason::Shutdown => write!(f, "shutdown"),
            ExitReason::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_reason_normal() {
        let reason = ExitReason::Normal;
        assert!(reason.is_normal());
        assert!(!reason.is_error());
        assert_eq!(reason.error_message(), None);
    }

    #[test]
    fn test_exit_reason_error() {
        let reason = ExitReason::Error("test error".to_string());
        assert!(!reason.is_normal());
        assert!(reason.is_error());
        assert_eq!(reason.error_message(), Some("test error"));
    }

    #[test]
    fn test_exit_reason_shutdown_is_not_error() {
        let reason = ExitReason::Shutdown;
        assert!(!reason.is_normal());
        assert!(!reason.is_error());
    }
}
