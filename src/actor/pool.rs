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

//! LockActorPool - one LockActor per project key
//!
//! Actors are spawned on first use and kept for the life of the pool. The
//! pool is the only way to reach an actor, so a key can never be served by
//! two actors at once.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::actor::lock_actor::LockActor;
use crate::actor::messages::LockCommand;
use crate::actor::metrics::Metrics;
use crate::actor::record_store::LockRecordStore;
use crate::actor::LockError;
use crate::key::ProjectKey;
use crate::lock_info::LockInfo;
use crate::observability::metrics as prom_metrics;

pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct LockActorPool {
    actors: Arc<Mutex<HashMap<ProjectKey, mpsc::Sender<LockCommand>>>>,
    store: Arc<dyn LockRecordStore>,
    mailbox_capacity: usize,
    metrics: Arc<Metrics>,
}

impl LockActorPool {
    pub fn new(store: Arc<dyn LockRecordStore>) -> Self {
        Self::with_capacity(store, DEFAULT_MAILBOX_CAPACITY)
    }

    pub fn with_capacity(store: Arc<dyn LockRecordStore>, mailbox_capacity: usize) -> Self {
        Self {
            actors: Arc::new(Mutex::new(HashMap::new())),
            store,
            mailbox_capacity: mailbox_capacity.max(1),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn store(&self) -> &Arc<dyn LockRecordStore> {
        &self.store
    }

    /// Number of live actors
    pub async fn active_actors(&self) -> usize {
        self.actors.lock().await.len()
    }

    /// Try to take the lock for `key`. `Ok(false)` means it is already held.
    pub async fn lock(&self, key: &ProjectKey, candidate: LockInfo) -> Result<bool, LockError> {
        self.send_command(key, |reply| LockCommand::Lock { candidate, reply })
            .await
    }

    /// Release the lock for `key`. `Ok(false)` means no lock was held or
    /// the ID did not match.
    pub async fn unlock(&self, key: &ProjectKey, candidate: LockInfo) -> Result<bool, LockError> {
        self.send_command(key, |reply| LockCommand::Unlock { candidate, reply })
            .await
    }

    pub async fn inspect(&self, key: &ProjectKey) -> Result<Option<LockInfo>, LockError> {
        self.send_command(key, |reply| LockCommand::Inspect { reply })
            .await
    }

    /// Get the actor for `key`, spawning it if none is running.
    async fn actor_for_key(&self, key: &ProjectKey) -> mpsc::Sender<LockCommand> {
        let mut actors = self.actors.lock().await;
        if let Some(tx) = actors.get(key) {
            if !tx.is_closed() {
                return tx.clone();
            }
            tracing::warn!(key = %key, "lock actor exited, respawning");
        }

        let (tx, rx) = mpsc::channel(self.mailbox_capacity);
        let actor = LockActor::new(key.as_str(), self.store.clone(), rx, self.metrics.clone());
        tokio::spawn(actor.run());
        actors.insert(key.clone(), tx.clone());

        self.metrics.inc_actor_spawned();
        prom_metrics::set_lock_actors_active(actors.len());
        tracing::debug!(key = %key, actors = actors.len(), "lock actor spawned");
        tx
    }

    /// Send a command to the actor owning `key` and wait for its reply
    async fn send_command<T>(
        &self,
        key: &ProjectKey,
        make_command: impl FnOnce(oneshot::Sender<Result<T, LockError>>) -> LockCommand,
    ) -> Result<T, LockError> {
        let actor_tx = self.actor_for_key(key).await;
        let (reply_tx, reply_rx) = oneshot::channel();
        let cmd = make_command(reply_tx);
        self.metrics.inc_request(cmd.operation());

        actor_tx
            .send(cmd)
            .await
            .map_err(|_| LockError::Unavailable("actor channel closed".to_string()))?;
        self.metrics.inc_message_sent();

        reply_rx
            .await
            .map_err(|_| LockError::Unavailable("actor reply failed".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::record_store::InMemoryLockStore;

    fn key(project: &str) -> ProjectKey {
        ProjectKey::derive("alice", project).unwrap()
    }

    #[tokio::test]
    async fn test_one_actor_per_key() {
        let pool = LockActorPool::new(Arc::new(InMemoryLockStore::new()));

        pool.inspect(&key("a")).await.unwrap();
        pool.inspect(&key("a")).await.unwrap();
        pool.inspect(&key("b")).await.unwrap();

        assert_eq!(pool.active_actors().await, 2);
        assert_eq!(pool.metrics().get_actors_spawned(), 2);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let pool = LockActorPool::new(Arc::new(InMemoryLockStore::new()));

        assert!(pool.lock(&key("a"), LockInfo::new("x", "apply")).await.unwrap());
        assert!(pool.lock(&key("b"), LockInfo::new("y", "apply")).await.unwrap());
        assert_eq!(pool.inspect(&key("a")).await.unwrap().unwrap().id, "x");
        assert_eq!(pool.inspect(&key("b")).await.unwrap().unwrap().id, "y");
    }

    #[tokio::test]
    async fn test_concurrent_lock_has_single_winner() {
        let pool = LockActorPool::new(Arc::new(InMemoryLockStore::new()));
        let k = key("contended");

        let mut handles = Vec::new();
        for i in 0..32 {
            let pool = pool.clone();
            let k = k.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("client-{i}");
                let won = pool.lock(&k, LockInfo::new(id.clone(), "apply")).await.unwrap();
                (id, won)
            }));
        }

        let mut winners = Vec::new();
        for h in handles {
            let (id, won) = h.await.unwrap();
            if won {
                winners.push(id);
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(pool.inspect(&k).await.unwrap().unwrap().id, winners[0]);
        assert_eq!(pool.metrics().get_locks_denied(), 31);
    }

    #[tokio::test]
    async fn test_small_mailbox_still_serves_all_callers() {
        let pool = LockActorPool::with_capacity(Arc::new(InMemoryLockStore::new()), 1);
        let k = key("busy");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let pool = pool.clone();
            let k = k.clone();
            handles.push(tokio::spawn(async move { pool.inspect(&k).await }));
        }
        for h in handles {
            assert!(h.await.unwrap().unwrap().is_none());
        }
    }
}
