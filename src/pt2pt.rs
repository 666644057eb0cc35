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

//! Pairwise transfer executor
//!
//! `send` and `recv` sequence pre-sync, handle exchange, the device copy
//! and post-sync for one direction of a pairwise transfer. Every per-call
//! knob lives in [`Pt2ptAttr`]; there is no process-wide mutable state, so
//! concurrent transfers from different threads are independent.

use std::time::Duration;

pub mod recv;
pub mod ring;
pub mod selector;
pub mod send;
pub mod sync;

pub use recv::recv;
pub use selector::{select_mode, TransferMode};
pub use send::send;
pub use sync::{post_ack, pre_sync};

/// Default message size up to which the small-message ring variant is used
pub const DEFAULT_RING_THRESHOLD: usize = 16 * 1024;

/// Per-call transfer attributes
///
/// Owned by the issuing call stack and dropped when the call returns.
#[derive(Debug, Clone)]
pub struct Pt2ptAttr {
    /// Prefer read mode (receiver copies from the sender's exposed buffer)
    /// over write mode. Overridden by topology and device-family facts in
    /// the selector.
    pub prefer_read: bool,
    /// Byte size at or below which the ring path uses its small variant
    pub ring_threshold: usize,
    /// Bound on the handle-exchange drive loop. `None` keeps the historical
    /// unbounded busy wait.
    pub exchange_deadline: Option<Duration>,
    /// An overlapping group context is active on this thread
    pub group_active: bool,
}

impl Default for Pt2ptAttr {
    fn default() -> Self {
        Self {
            prefer_read: true,
            ring_threshold: DEFAULT_RING_THRESHOLD,
            exchange_deadline: None,
            group_active: false,
        }
    }
}

impl Pt2ptAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefer_read(mut self, prefer_read: bool) -> Self {
        self.prefer_read = prefer_read;
        self
    }

    pub fn with_ring_threshold(mut self, threshold: usize) -> Self {
        self.ring_threshold = threshold;
        self
    }

    pub fn with_exchange_deadline(mut self, deadline: Duration) -> Self {
        self.exchange_deadline = Some(deadline);
        self
    }

    pub fn with_group_active(mut self, group_active: bool) -> Self {
        self.group_active = group_active;
        self
    }
}
