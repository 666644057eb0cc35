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

//! Communicator trait
//!
//! A communicator identifies a set of ranks sharing a transport. The
//! transfer engine only ever messages peers through the node-scoped
//! sub-communicator, addressed by node-local rank. Topology facts and the
//! tag namespace are read-only for the lifetime of a transfer; the per-peer
//! ring pattern state is internally synchronized.

use std::sync::Arc;
use std::time::Instant;

use crate::error::AcclResult;
use crate::topo::TopologyFacts;

/// Per-peer adaptive ring pattern key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Send,
    Recv,
}

/// Set of ranks sharing a transport
pub trait Communicator: Send + Sync {
    /// This process's rank within the communicator
    fn rank(&self) -> i32;

    /// Number of ranks in the communicator
    fn size(&self) -> i32;

    /// Stable numeric id, part of every tag allocated under this communicator
    fn comm_id(&self) -> u16;

    /// Sub-communicator of the ranks colocated on this machine
    fn node_comm(&self) -> Arc<dyn Communicator>;

    /// Map a global rank to its node-local rank
    fn rank_from_global(&self, global_rank: i32) -> i32;

    /// Topology facts computed at communicator construction
    fn topology(&self) -> TopologyFacts;

    /// Enqueue a tagged message to `peer` without blocking
    fn post_send(&self, peer: i32, tag: u64, payload: &[u8]) -> AcclResult<()>;

    /// Poll for a tagged message from `peer`; never blocks
    fn try_recv(&self, peer: i32, tag: u64) -> AcclResult<Option<Vec<u8>>>;

    /// Block until a tagged message from `peer` arrives, or `deadline`
    /// passes. Only called from queue host tasks, never from the
    /// transfer-issuing thread.
    fn recv_blocking(&self, peer: i32, tag: u64, deadline: Option<Instant>)
        -> AcclResult<Vec<u8>>;

    /// Current adaptive ring pattern for (kind, peer)
    fn rt_pattern(&self, kind: PatternKind, peer: i32) -> u32;

    /// Store the advanced ring pattern for (kind, peer)
    fn update_rt_pattern(&self, kind: PatternKind, peer: i32, pattern: u32);
}
