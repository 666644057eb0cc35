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

//! accl: point-to-point accelerator memory transfer engine
//!
//! Moves buffers directly between accelerator memories across process
//! boundaries on a single compute node. The engine exchanges IPC memory
//! handles between node-local peers, picks a transfer strategy from runtime
//! topology, and synchronizes the transfer with tagged one-byte
//! acknowledgments, blocking the issuing thread only for the bounded
//! handle-exchange step.

pub mod comm;
pub mod datatype;
pub mod device;
pub mod error;
pub mod pt2pt;
pub mod sched;
pub mod topo;
pub mod util;

// Re-export commonly used types
pub use crate::comm::{Communicator, LocalCommunicator, SyncKind, TagAllocator};
pub use crate::datatype::Datatype;
pub use crate::device::{DevicePtr, Event, HostQueue};
pub use crate::error::{AcclError, AcclResult, Code};
pub use crate::pt2pt::{recv, select_mode, send, Pt2ptAttr, TransferMode};
pub use crate::topo::{DeviceFamily, TopologyFacts};

/// The main entry point and version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
