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

//! Accelerator memory descriptors and IPC handles
//!
//! A [`MemDesc`] names a locally owned device buffer that may be exposed to
//! a peer process. Exporting it yields an opaque [`IpcHandle`]; the peer
//! opens the handle and obtains an [`ExchangedHandle`], a pointer it can use
//! to address this process's buffer directly.

/// Raw device address, transportable across threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevicePtr(pub u64);

impl DevicePtr {
    pub const NULL: DevicePtr = DevicePtr(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Kind of memory behind a descriptor eligible for cross-process exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcMemKind {
    /// A plain device allocation
    Memory,
    /// A pooled allocation managed by an external allocator
    Pool,
}

/// Locally owned device buffer eligible for handle exchange
#[derive(Debug, Clone, Copy)]
pub struct MemDesc {
    pub ptr: DevicePtr,
    pub kind: IpcMemKind,
}

impl MemDesc {
    pub fn new(ptr: DevicePtr, kind: IpcMemKind) -> Self {
        Self { ptr, kind }
    }
}

/// Size of an exported IPC handle in bytes
pub const IPC_HANDLE_SIZE: usize = 64;

/// Opaque exported memory descriptor, safe to ship between processes
#[derive(Clone, Copy)]
pub struct IpcHandle {
    bytes: [u8; IPC_HANDLE_SIZE],
}

impl IpcHandle {
    pub fn new(bytes: [u8; IPC_HANDLE_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; IPC_HANDLE_SIZE] {
        &self.bytes
    }
}

impl Default for IpcHandle {
    fn default() -> Self {
        Self {
            bytes: [0u8; IPC_HANDLE_SIZE],
        }
    }
}

/// Peer buffer mapped into the local address space after handle exchange
#[derive(Debug, Clone, Copy)]
pub struct ExchangedHandle {
    pub ptr: DevicePtr,
}
