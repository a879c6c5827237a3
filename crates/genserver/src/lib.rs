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

//! Generic server behavior for PlexActors
//!
//! Implements the OTP-inspired GenServer pattern as an adapter over an
//! actor: user-supplied `init`/`handle_call`/`handle_cast`/`handle_info`/
//! `terminate` hooks with synchronous request/reply layered on top of the
//! asynchronous mailbox.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod r#mod;
pub use r#mod::*;
