// Copyright PingCAP Inc. 2025.
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; version 2 of the License.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Message types for lock actor communication
//!
//! Every command carries a oneshot channel for its reply, so callers never
//! touch the lock record directly.

use tokio::sync::oneshot;

use crate::actor::LockError;
use crate::lock_info::LockInfo;

/// Commands sent to the LockActor owning one project key
#[derive(Debug)]
pub enum LockCommand {
    /// Acquire the lock if it is free
    Lock {
        candidate: LockInfo,
        reply: oneshot::Sender<Result<bool, LockError>>,
    },

    /// Release the lock if `candidate` carries the held ID
    Unlock {
        candidate: LockInfo,
        reply: oneshot::Sender<Result<bool, LockError>>,
    },

    /// Read the held lock, if any
    Inspect {
        reply: oneshot::Sender<Result<Option<LockInfo>, LockError>>,
    },
}

impl LockCommand {
    /// Operation name used in logs and metrics labels
    pub fn operation(&self) -> &'static str {
        match self {
            LockCommand::Lock { .. } => "lock",
            LockCommand::Unlock { .. } => "unlock",
            LockCommand::Inspect { .. } => "inspect",
        }
    }
}
