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

//! Completion events wrapping native asynchronous tokens
//!
//! An [`Event`] is the only value a transfer returns to its caller. It is
//! signaled once the associated device work finishes and can be passed as a
//! dependency to later enqueue calls. Waiting on an event never blocks the
//! enqueueing path of the engine itself; only callers and queue workers wait.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Native asynchronous completion token supplied by a queue backend
pub trait NativeEvent: Send + Sync {
    /// True once the associated work has finished
    fn is_complete(&self) -> bool;

    /// Block the calling thread until the work has finished
    fn wait(&self);
}

/// Opaque completion handle returned by enqueue operations
#[derive(Clone)]
pub struct Event {
    inner: Arc<dyn NativeEvent>,
}

impl core::fmt::Debug for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Event")
            .field("is_complete", &self.inner.is_complete())
            .finish()
    }
}

impl Event {
    /// Wrap a native completion token
    pub fn from_native(inner: Arc<dyn NativeEvent>) -> Self {
        Self { inner }
    }

    /// An event that is already signaled
    pub fn completed() -> Self {
        Self {
            inner: Arc::new(CompletedEvent),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    pub fn wait(&self) {
        self.inner.wait()
    }
}

struct CompletedEvent;

impl NativeEvent for CompletedEvent {
    fn is_complete(&self) -> bool {
        true
    }

    fn wait(&self) {}
}

/// Manually signaled event used by host-side queue backends
pub struct ManualEvent {
    state: Mutex<bool>,
    cond: Condvar,
}

impl ManualEvent {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(false),
            cond: Condvar::new(),
        })
    }

    /// Mark the event complete and wake all waiters
    pub fn signal(&self) {
        let mut done = self.state.lock();
        *done = true;
        self.cond.notify_all();
    }
}

impl NativeEvent for ManualEvent {
    fn is_complete(&self) -> bool {
        *self.state.lock()
    }

    fn wait(&self) {
        let mut done = self.state.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }
}
