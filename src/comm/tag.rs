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

//! Synchronization tag allocation
//!
//! Tags keep the handshake messages of concurrently outstanding transfers
//! apart. The allocator is a pure function over (node-local rank,
//! communicator id, kind): two transfers between different rank pairs, or
//! under different communicators, can never produce the same tag, and the
//! ready/done tags of one pair never collide with each other.
//!
//! Layout of the 64-bit tag:
//!
//! ```text
//! | comm_id (16) | node-local rank (32) | kind (16) |
//! ```

/// Kind of synchronization message a tag identifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    /// Peer's buffer is populated and may be read/written
    Ready = 1,
    /// Transfer finished from the copying side's perspective
    Done = 2,
    /// Handle-exchange payload message
    Exchange = 3,
}

/// Pure tag allocator over the communicator's tag namespace
pub struct TagAllocator;

impl TagAllocator {
    const COMM_ID_SHIFT: u32 = 48;
    const RANK_SHIFT: u32 = 16;

    /// Derive a collision-free tag for (rank, communicator, kind).
    ///
    /// `node_local_rank` must be non-negative; validating the rank is the
    /// caller's responsibility.
    pub fn create(node_local_rank: i32, comm_id: u16, kind: SyncKind) -> u64 {
        ((comm_id as u64) << Self::COMM_ID_SHIFT)
            | (((node_local_rank as u32) as u64) << Self::RANK_SHIFT)
            | kind as u64
    }

    /// The (ready, done) kind pair used by the pt2pt handshake
    pub fn pt2pt_sync_tags() -> (SyncKind, SyncKind) {
        (SyncKind::Ready, SyncKind::Done)
    }
}
