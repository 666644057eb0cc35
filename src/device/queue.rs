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

//! Device command-queue trait
//!
//! Enqueue calls return immediately with an [`Event`]; ordering between
//! operations comes solely from the dependency lists passed to each call.
//! The queue does not provide global ordering across unrelated transfers.

use crate::datatype::Datatype;
use crate::device::event::Event;
use crate::device::memory::{DevicePtr, IpcHandle, MemDesc};
use crate::error::AcclResult;
use crate::topo::DeviceFamily;

/// Host-side work executed by the queue once its dependencies are met
pub type HostTask = Box<dyn FnOnce() -> AcclResult<()> + Send>;

/// Ring protocol width variant, chosen by message size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingProto {
    /// Small-message low-latency ring
    Ll64,
    /// Wide ring for larger payloads
    Ll256,
}

/// Direction of a ring transfer step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingDirection {
    Send,
    Recv,
}

/// Fully resolved description of one ring transfer launch
#[derive(Debug, Clone)]
pub struct RingLaunch {
    pub direction: RingDirection,
    pub proto: RingProto,
    pub buf: DevicePtr,
    pub count: usize,
    pub dtype: Datatype,
    /// Node-local peer rank
    pub peer: i32,
    /// Adaptive scheduling pattern carried per (direction, peer)
    pub pattern: u32,
    /// Peer-to-peer access is available between the devices involved
    pub p2p: bool,
}

/// Accelerator command queue consumed by the transfer engine
///
/// Backends also implement the IPC handle export/open pair, since handle
/// exchange needs the device runtime that owns the buffer.
pub trait DeviceQueue: Send + Sync {
    /// Family of the device this queue targets
    fn device_family(&self) -> DeviceFamily;

    /// Enqueue a barrier over the given dependency events
    fn enqueue_wait(&self, deps: &[Event]) -> AcclResult<Event>;

    /// Enqueue a device-to-device copy of `bytes` bytes ordered after `deps`
    fn enqueue_memcpy(
        &self,
        dst: DevicePtr,
        src: DevicePtr,
        bytes: usize,
        deps: &[Event],
    ) -> AcclResult<Event>;

    /// Enqueue host-side work ordered after `deps`
    fn enqueue_host_task(&self, deps: &[Event], task: HostTask) -> AcclResult<Event>;

    /// Enqueue one ring transfer step ordered after `deps`
    fn enqueue_ring(&self, launch: &RingLaunch, deps: &[Event]) -> AcclResult<Event>;

    /// Export a locally owned buffer as an opaque IPC handle
    fn export_handle(&self, desc: &MemDesc) -> AcclResult<IpcHandle>;

    /// Open a peer's IPC handle, mapping its buffer into this address space
    fn open_handle(&self, handle: &IpcHandle) -> AcclResult<DevicePtr>;
}
