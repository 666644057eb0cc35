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

//! Device command-queue abstraction and completion events
//!
//! The transfer engine never talks to an accelerator runtime directly; it
//! enqueues work (waits, copies, host tasks, ring launches) onto a
//! [`DeviceQueue`] and orders it with explicit dependency [`Event`] lists.
//! The `host` backend runs that contract over plain host memory and is used
//! by the integration tests.

pub mod event;
pub mod host;
pub mod memory;
pub mod queue;

pub use event::{Event, NativeEvent};
pub use host::{HostQueue, QueueStats};
pub use memory::{DevicePtr, ExchangedHandle, IpcHandle, IpcMemKind, MemDesc};
pub use queue::{DeviceQueue, RingDirection, RingLaunch, RingProto};
