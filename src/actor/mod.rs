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

//! Actor-based lock coordination
//!
//! Each project key is owned by exactly one LockActor task. The actor
//! processes its mailbox sequentially, so Lock/Unlock/Inspect for one key
//! are linearized without a mutex around the lock record. Different keys
//! run on independent actors.

pub mod lock_actor;
pub mod messages;
pub mod metrics;
pub mod pool;
pub mod record_store;

use thiserror::Error;

use crate::storage::StorageError;

pub use lock_actor::LockActor;
pub use messages::LockCommand;
pub use metrics::Metrics;
pub use pool::LockActorPool;
pub use record_store::{FileLockStore, InMemoryLockStore, LockRecordStore};

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock request carries no ID")]
    MissingId,
    #[error("lock record storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("lock actor unavailable: {0}")]
    Unavailable(String),
}
