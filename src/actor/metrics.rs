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

//! Lock-free counters for the lock actors
//!
//! Shared by every actor in a pool and updated with relaxed atomics.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    // Requests
    pub lock_requests: AtomicU64,
    pub unlock_requests: AtomicU64,
    pub inspect_requests: AtomicU64,

    // Outcomes
    pub locks_granted: AtomicU64,
    pub locks_denied: AtomicU64,
    pub unlocks_granted: AtomicU64,
    pub unlocks_denied: AtomicU64,

    // Errors
    pub errors_total: AtomicU64,

    // Actor health
    pub actors_spawned: AtomicU64,
    pub messages_sent: AtomicU64,
    pub messages_received: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_request(&self, operation: &str) {
        let counter = match operation {
            "lock" => &self.lock_requests,
            "unlock" => &self.unlock_requests,
            _ => &self.inspect_requests,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lock(&self, granted: bool) {
        if granted {
            self.locks_granted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.locks_denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_unlock(&self, granted: bool) {
        if granted {
            self.unlocks_granted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.unlocks_denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_actor_spawned(&self) {
        self.actors_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    // Readers
    pub fn get_locks_granted(&self) -> u64 {
        self.locks_granted.load(Ordering::Relaxed)
    }

    pub fn get_locks_denied(&self) -> u64 {
        self.locks_denied.load(Ordering::Relaxed)
    }

    pub fn get_actors_spawned(&self) -> u64 {
        self.actors_spawned.load(Ordering::Relaxed)
    }

    pub fn get_errors_total(&self) -> u64 {
        self.errors_total.load(Ordering::Relaxed)
    }

    pub fn get_message_queue_depth(&self) -> i64 {
        let sent = self.messages_sent.load(Ordering::Relaxed) as i64;
        let received = self.messages_received.load(Ordering::Relaxed) as i64;
        sent - received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_counters() {
        let m = Metrics::new();
        m.record_lock(true);
        m.record_lock(false);
        m.record_lock(false);
        assert_eq!(m.get_locks_granted(), 1);
        assert_eq!(m.get_locks_denied(), 2);
    }

    #[test]
    fn test_queue_depth() {
        let m = Metrics::new();
        m.inc_message_sent();
        m.inc_message_sent();
        m.inc_message_received();
        assert_eq!(m.get_message_queue_depth(), 1);
    }

    #[test]
    fn test_request_routing() {
        let m = Metrics::new();
        m.inc_request("lock");
        m.inc_request("unlock");
        m.inc_request("inspect");
        assert_eq!(m.lock_requests.load(Ordering::Relaxed), 1);
        assert_eq!(m.unlock_requests.load(Ordering::Relaxed), 1);
        assert_eq!(m.inspect_requests.load(Ordering::Relaxed), 1);
    }
}
