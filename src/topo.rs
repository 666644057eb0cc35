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

//! Topology facts consumed by the transfer mode selector
//!
//! These booleans are computed once per communicator by topology discovery
//! (an external collaborator) and are read-only for the lifetime of any
//! transfer issued under that communicator.

/// Device family classification reported by the device queue.
///
/// The Arc family has platform-specific IPC limitations: handle-exchange
/// transfers fall back to write mode, and outside an active group context
/// the low-latency ring path is used instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    Arc,
    Xe,
    Unknown,
}

impl DeviceFamily {
    pub fn is_arc(&self) -> bool {
        matches!(self, DeviceFamily::Arc)
    }
}

/// Per-communicator topology facts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyFacts {
    /// All ranks of the communicator are colocated on one machine
    pub is_single_node: bool,
    /// All ranks live on tiles of the same physical card
    pub is_single_card: bool,
    /// Peer-to-peer access is available between the node's devices
    pub has_p2p_access: bool,
}

impl TopologyFacts {
    /// Facts for ranks spread across tiles of one card
    pub fn single_card() -> Self {
        Self {
            is_single_node: true,
            is_single_card: true,
            has_p2p_access: true,
        }
    }

    /// Facts for ranks colocated on one machine, across cards
    pub fn single_node() -> Self {
        Self {
            is_single_node: true,
            is_single_card: false,
            has_p2p_access: true,
        }
    }

    /// Facts for ranks spanning more than one machine
    pub fn multi_node() -> Self {
        Self {
            is_single_node: false,
            is_single_card: false,
            has_p2p_access: false,
        }
    }
}
