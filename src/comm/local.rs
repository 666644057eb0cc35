// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-process communicator backend
//!
//! Gives N ranks within a single process a shared, tag-addressed mailbox
//! fabric. All ranks are node-local, so the node communicator is the
//! communicator itself and the global-to-node rank mapping is the identity.
//! Used by the integration tests and as the loopback backend.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::comm::communicator::{Communicator, PatternKind};
use crate::error::{AcclError, AcclResult};
use crate::topo::TopologyFacts;

/// Mailbox fabric shared by every rank of a group.
/// Messages are keyed by (source rank, destination rank, tag).
#[derive(Default)]
struct Mailbox {
    slots: Mutex<HashMap<(i32, i32, u64), VecDeque<Vec<u8>>>>,
    cond: Condvar,
}

/// One rank's endpoint of an in-process communicator group
pub struct LocalCommunicator {
    rank: i32,
    size: i32,
    comm_id: u16,
    topo: TopologyFacts,
    mailbox: Arc<Mailbox>,
    patterns: Mutex<HashMap<(PatternKind, i32), u32>>,
    self_ref: Weak<LocalCommunicator>,
}

impl LocalCommunicator {
    /// Create the communicators of a `size`-rank group sharing one mailbox
    /// fabric, indexed by rank.
    pub fn create_group(
        size: i32,
        comm_id: u16,
        topo: TopologyFacts,
    ) -> Vec<Arc<LocalCommunicator>> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| {
                let mailbox = mailbox.clone();
                Arc::new_cyclic(|me| LocalCommunicator {
                    rank,
                    size,
                    comm_id,
                    topo,
                    mailbox,
                    patterns: Mutex::new(HashMap::new()),
                    self_ref: me.clone(),
                })
            })
            .collect()
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> i32 {
        self.rank
    }

    fn size(&self) -> i32 {
        self.size
    }

    fn comm_id(&self) -> u16 {
        self.comm_id
    }

    fn node_comm(&self) -> Arc<dyn Communicator> {
        // All ranks of a local group live on one node.
        self.self_ref
            .upgrade()
            .expect("communicator outlives its node_comm call")
    }

    fn rank_from_global(&self, global_rank: i32) -> i32 {
        global_rank
    }

    fn topology(&self) -> TopologyFacts {
        self.topo
    }

    fn post_send(&self, peer: i32, tag: u64, payload: &[u8]) -> AcclResult<()> {
        if peer < 0 || peer >= self.size {
            return Err(AcclError::Invalid(format!(
                "peer rank {} out of range for group of {}",
                peer, self.size
            )));
        }
        let mut slots = self.mailbox.slots.lock();
        slots
            .entry((self.rank, peer, tag))
            .or_default()
            .push_back(payload.to_vec());
        self.mailbox.cond.notify_all();
        Ok(())
    }

    fn try_recv(&self, peer: i32, tag: u64) -> AcclResult<Option<Vec<u8>>> {
        let mut slots = self.mailbox.slots.lock();
        Ok(slots
            .get_mut(&(peer, self.rank, tag))
            .and_then(|q| q.pop_front()))
    }

    fn recv_blocking(
        &self,
        peer: i32,
        tag: u64,
        deadline: Option<Instant>,
    ) -> AcclResult<Vec<u8>> {
        let key = (peer, self.rank, tag);
        let mut slots = self.mailbox.slots.lock();
        loop {
            if let Some(msg) = slots.get_mut(&key).and_then(|q| q.pop_front()) {
                return Ok(msg);
            }
            match deadline {
                Some(d) => {
                    if self.mailbox.cond.wait_until(&mut slots, d).timed_out() {
                        return Err(AcclError::Timeout(format!(
                            "no message from peer {} with tag {:#x}",
                            peer, tag
                        )));
                    }
                }
                None => self.mailbox.cond.wait(&mut slots),
            }
        }
    }

    fn rt_pattern(&self, kind: PatternKind, peer: i32) -> u32 {
        *self.patterns.lock().get(&(kind, peer)).unwrap_or(&0)
    }

    fn update_rt_pattern(&self, kind: PatternKind, peer: i32, pattern: u32) {
        self.patterns.lock().insert((kind, peer), pattern);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_post_and_try_recv() {
        let group = LocalCommunicator::create_group(2, 1, TopologyFacts::single_node());
        group[0].post_send(1, 0x10, b"ready").unwrap();

        assert_eq!(group[1].try_recv(0, 0x10).unwrap().unwrap(), b"ready");
        assert!(group[1].try_recv(0, 0x10).unwrap().is_none());
    }

    #[test]
    fn test_tags_do_not_cross_talk() {
        let group = LocalCommunicator::create_group(2, 1, TopologyFacts::single_node());
        group[0].post_send(1, 0x10, b"a").unwrap();

        assert!(group[1].try_recv(0, 0x11).unwrap().is_none());
        assert!(group[1].try_recv(0, 0x10).unwrap().is_some());
    }

    #[test]
    fn test_recv_blocking_deadline() {
        let group = LocalCommunicator::create_group(2, 1, TopologyFacts::single_node());
        let deadline = Some(Instant::now() + Duration::from_millis(20));
        let err = group[0].recv_blocking(1, 0x99, deadline).unwrap_err();
        assert_eq!(err.code(), crate::error::Code::Timeout);
    }

    #[test]
    fn test_pattern_state_per_peer() {
        let group = LocalCommunicator::create_group(3, 1, TopologyFacts::single_node());
        assert_eq!(group[0].rt_pattern(PatternKind::Send, 1), 0);
        group[0].update_rt_pattern(PatternKind::Send, 1, 5);
        assert_eq!(group[0].rt_pattern(PatternKind::Send, 1), 5);
        assert_eq!(group[0].rt_pattern(PatternKind::Send, 2), 0);
        assert_eq!(group[0].rt_pattern(PatternKind::Recv, 1), 0);
    }
}
