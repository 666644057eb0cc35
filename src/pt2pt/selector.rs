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

//! Transfer mode selection
//!
//! One pure decision function, evaluated once per call and threaded down to
//! the executor. Order matters: the degenerate cases win first, then the
//! multi-node rejection, then the Arc-family ring fallback, and only then
//! the read/write sub-choice of the handle-exchange path.

use crate::pt2pt::Pt2ptAttr;
use crate::topo::{DeviceFamily, TopologyFacts};

/// Strategy chosen for one transfer call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// No payload movement, only a completion handshake
    AckOnly,
    /// Handle exchange; the receiver copies from the sender's exposed buffer
    Read,
    /// Handle exchange; the sender copies into the receiver's exposed buffer
    Write,
    /// Low-latency ring path, bypassing handle exchange
    Ring,
    /// Cross-node transfer, rejected before any protocol step
    Unsupported,
}

/// Resolve the transfer mode for one call
pub fn select_mode(
    topo: &TopologyFacts,
    family: DeviceFamily,
    comm_size: i32,
    count: usize,
    attr: &Pt2ptAttr,
) -> TransferMode {
    if comm_size == 1 || count == 0 {
        return TransferMode::AckOnly;
    }
    if !topo.is_single_node {
        return TransferMode::Unsupported;
    }
    if family.is_arc() && !attr.group_active {
        return TransferMode::Ring;
    }
    // Tiles on one card always read; Arc IPC limitations force write.
    let read = if topo.is_single_card {
        true
    } else if family.is_arc() {
        false
    } else {
        attr.prefer_read
    };
    if read {
        TransferMode::Read
    } else {
        TransferMode::Write
    }
}
