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

//! One-shot transfer schedule and its exchanged-handle registry
//!
//! A [`Schedule`] lives for exactly one transfer call. Its registry receives
//! the peer handles produced by a handle-exchange entry and hands them to
//! the copy step, keyed by (slot index, node-local peer rank). Asking for a
//! slot that was never exchanged is a fatal precondition: proceeding would
//! dereference an invalid pointer.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::memory::ExchangedHandle;
use crate::error::{AcclError, AcclResult};

/// Shared registry of exchanged handles, cloneable into entries
#[derive(Clone, Default)]
pub struct HandleRegistry {
    inner: Arc<Mutex<HashMap<(usize, i32), ExchangedHandle>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the handle exchanged for `slot` with `peer`
    pub fn put(&self, slot: usize, peer: i32, handle: ExchangedHandle) {
        self.inner.lock().insert((slot, peer), handle);
    }

    /// Retrieve the handle exchanged for `slot` with `peer`
    pub fn get(&self, slot: usize, peer: i32) -> AcclResult<ExchangedHandle> {
        self.inner.lock().get(&(slot, peer)).copied().ok_or_else(|| {
            AcclError::Precondition(format!(
                "no handle was exchanged for slot {} of peer {}",
                slot, peer
            ))
        })
    }

    /// Number of handles currently registered
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Transfer-scoped schedule owning the handle registry
pub struct Schedule {
    registry: HandleRegistry,
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            registry: HandleRegistry::new(),
        }
    }

    /// Clone of the registry, handed to entries that fill it
    pub fn registry(&self) -> HandleRegistry {
        self.registry.clone()
    }

    /// Look up an exchanged handle by slot and node-local peer rank
    pub fn get_handle(&self, slot: usize, peer: i32) -> AcclResult<ExchangedHandle> {
        self.registry.get(slot, peer)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::memory::DevicePtr;

    #[test]
    fn test_missing_slot_is_fatal() {
        let sched = Schedule::new();
        let err = sched.get_handle(0, 0).unwrap_err();
        assert_eq!(err.code(), crate::error::Code::Precondition);
    }

    #[test]
    fn test_put_get() {
        let sched = Schedule::new();
        sched.registry().put(
            0,
            1,
            ExchangedHandle {
                ptr: DevicePtr(0x40),
            },
        );
        assert_eq!(sched.get_handle(0, 1).unwrap().ptr, DevicePtr(0x40));
    }
}
