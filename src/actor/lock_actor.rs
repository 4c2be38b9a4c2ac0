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

//! Lock actor
//!
//! Owns the lock record of a single project key. Two states: Unlocked (no
//! record held) and Locked. Every transition is written through to the
//! record store before it becomes visible to later commands.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::actor::messages::LockCommand;
use crate::actor::metrics::Metrics;
use crate::actor::record_store::LockRecordStore;
use crate::actor::LockError;
use crate::lock_info::LockInfo;
use crate::observability::metrics as prom_metrics;

pub struct LockActor {
    /// Project key this actor owns
    key: String,

    /// Lock currently held; `None` while unlocked
    held: Option<LockInfo>,

    /// Whether `held` reflects the record store yet
    loaded: bool,

    store: Arc<dyn LockRecordStore>,

    /// Incoming command channel
    rx: mpsc::Receiver<LockCommand>,

    metrics: Arc<Metrics>,
}

impl LockActor {
    pub fn new(
        key: impl Into<String>,
        store: Arc<dyn LockRecordStore>,
        rx: mpsc::Receiver<LockCommand>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            key: key.into(),
            held: None,
            loaded: false,
            store,
            rx,
            metrics,
        }
    }

    /// Main loop: one command at a time until every sender is dropped.
    pub async fn run(mut self) {
        tracing::debug!(key = %self.key, "LockActor started");

        while let Some(cmd) = self.rx.recv().await {
            self.metrics.inc_message_received();
            let operation = cmd.operation();
            let op_start = Instant::now();

            match cmd {
                LockCommand::Lock { candidate, reply } => {
                    let res = self.handle_lock(candidate).await;
                    self.record_outcome(operation, &res);
                    let _ = reply.send(res);
                }

                LockCommand::Unlock { candidate, reply } => {
                    let res = self.handle_unlock(candidate).await;
                    self.record_outcome(operation, &res);
                    let _ = reply.send(res);
                }

                LockCommand::Inspect { reply } => {
                    let res = self.handle_inspect().await;
                    if res.is_err() {
                        self.metrics.inc_error();
                        prom_metrics::record_lock_op(operation, "error");
                    }
                    let _ = reply.send(res);
                }
            }

            prom_metrics::record_actor_op(operation, op_start.elapsed().as_secs_f64());
        }

        tracing::debug!(key = %self.key, "LockActor stopped");
    }

    fn record_outcome(&self, operation: &str, res: &Result<bool, LockError>) {
        let result = match res {
            Ok(true) => "granted",
            Ok(false) => "denied",
            Err(_) => "error",
        };
        match (operation, res) {
            (_, Err(_)) => self.metrics.inc_error(),
            ("lock", Ok(granted)) => self.metrics.record_lock(*granted),
            (_, Ok(granted)) => self.metrics.record_unlock(*granted),
        }
        prom_metrics::record_lock_op(operation, result);
    }

    /// Load the persisted record on first use. A failed load is retried by
    /// the next command.
    async fn ensure_loaded(&mut self) -> Result<(), LockError> {
        if !self.loaded {
            self.held = self.store.load(&self.key).await?;
            self.loaded = true;
            if let Some(held) = &self.held {
                tracing::info!(key = %self.key, lock_id = %held.id, "restored persisted lock");
            }
        }
        Ok(())
    }

    async fn handle_lock(&mut self, candidate: LockInfo) -> Result<bool, LockError> {
        if !candidate.has_id() {
            return Err(LockError::MissingId);
        }
        self.ensure_loaded().await?;

        if let Some(held) = &self.held {
            tracing::warn!(
                key = %self.key,
                lock_id = %candidate.id,
                held_by = %held.id,
                "lock attempt failed: state is already locked"
            );
            return Ok(false);
        }

        self.store.save(&self.key, &candidate).await?;
        tracing::info!(
            key = %self.key,
            lock_id = %candidate.id,
            operation = %candidate.operation,
            who = %candidate.who,
            "state locked"
        );
        self.held = Some(candidate);
        Ok(true)
    }

    async fn handle_unlock(&mut self, candidate: LockInfo) -> Result<bool, LockError> {
        self.ensure_loaded().await?;

        match &self.held {
            Some(held) if held.id == candidate.id => {
                self.store.clear(&self.key).await?;
                tracing::info!(key = %self.key, lock_id = %candidate.id, "state unlocked");
                self.held = None;
                Ok(true)
            }
            Some(held) => {
                tracing::warn!(
                    key = %self.key,
                    lock_id = %candidate.id,
                    held_by = %held.id,
                    "unlock attempt failed: lock ID mismatch"
                );
                Ok(false)
            }
            None => {
                tracing::warn!(key = %self.key, lock_id = %candidate.id, "unlock attempt failed: not locked");
                Ok(false)
            }
        }
    }

    async fn handle_inspect(&mut self) -> Result<Option<LockInfo>, LockError> {
        self.ensure_loaded().await?;
        Ok(self.held.clone())
    }
}
