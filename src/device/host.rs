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

//! Host-memory queue backend
//!
//! Implements the [`DeviceQueue`] contract over plain host memory: enqueued
//! work runs in order on a dedicated worker thread after its dependency
//! events are signaled, so enqueue calls never block the issuing thread.
//! "Device" pointers are host addresses, and IPC handles carry the raw
//! address, which stays valid because all ranks share one process. Ring
//! launches are recorded and completed without moving data; the ring kernels
//! belong to a real accelerator backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::error;
use parking_lot::Mutex;

use crate::device::event::{Event, ManualEvent};
use crate::device::memory::{DevicePtr, IpcHandle, MemDesc, IPC_HANDLE_SIZE};
use crate::device::queue::{DeviceQueue, HostTask, RingLaunch};
use crate::error::{AcclError, AcclResult};
use crate::topo::DeviceFamily;

enum Task {
    Wait,
    Memcpy {
        dst: DevicePtr,
        src: DevicePtr,
        bytes: usize,
    },
    Host(HostTask),
    Ring(RingLaunch),
}

struct Op {
    deps: Vec<Event>,
    task: Task,
    done: Arc<ManualEvent>,
}

/// Counts of operations the queue has executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub waits: u64,
    pub memcpys: u64,
    pub host_tasks: u64,
    /// Host tasks that returned an error; included in `host_tasks`
    pub failed_host_tasks: u64,
    pub rings: u64,
}

#[derive(Default)]
struct Inner {
    waits: AtomicU64,
    memcpys: AtomicU64,
    host_tasks: AtomicU64,
    failed_host_tasks: AtomicU64,
    rings: AtomicU64,
    last_ring: Mutex<Option<RingLaunch>>,
}

/// In-process queue backend over host memory
pub struct HostQueue {
    family: DeviceFamily,
    inner: Arc<Inner>,
    tx: Mutex<Option<mpsc::Sender<Op>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HostQueue {
    pub fn new(family: DeviceFamily) -> Self {
        let (tx, rx) = mpsc::channel::<Op>();
        let inner = Arc::new(Inner::default());
        let worker_inner = inner.clone();

        let worker = std::thread::spawn(move || {
            while let Ok(op) = rx.recv() {
                for dep in &op.deps {
                    dep.wait();
                }
                match op.task {
                    Task::Wait => {
                        worker_inner.waits.fetch_add(1, Ordering::Relaxed);
                    }
                    Task::Memcpy { dst, src, bytes } => {
                        // Overlap is possible when both ranks alias the same
                        // buffer, so a memmove-style copy is required.
                        unsafe {
                            std::ptr::copy(src.0 as *const u8, dst.0 as *mut u8, bytes);
                        }
                        worker_inner.memcpys.fetch_add(1, Ordering::Relaxed);
                    }
                    Task::Host(task) => {
                        if let Err(e) = task() {
                            error!("host task failed: {}", e);
                            worker_inner.failed_host_tasks.fetch_add(1, Ordering::Relaxed);
                        }
                        worker_inner.host_tasks.fetch_add(1, Ordering::Relaxed);
                    }
                    Task::Ring(launch) => {
                        *worker_inner.last_ring.lock() = Some(launch);
                        worker_inner.rings.fetch_add(1, Ordering::Relaxed);
                    }
                }
                op.done.signal();
            }
        });

        Self {
            family,
            inner,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    fn submit(&self, deps: &[Event], task: Task) -> AcclResult<Event> {
        let done = ManualEvent::new();
        let op = Op {
            deps: deps.to_vec(),
            task,
            done: done.clone(),
        };
        let tx = self.tx.lock();
        match tx.as_ref() {
            Some(tx) => tx
                .send(op)
                .map_err(|_| AcclError::Communication("queue worker has shut down".to_string()))?,
            None => {
                return Err(AcclError::Communication(
                    "queue worker has shut down".to_string(),
                ))
            }
        }
        Ok(Event::from_native(done))
    }

    /// Snapshot of executed-operation counters
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            waits: self.inner.waits.load(Ordering::Relaxed),
            memcpys: self.inner.memcpys.load(Ordering::Relaxed),
            host_tasks: self.inner.host_tasks.load(Ordering::Relaxed),
            failed_host_tasks: self.inner.failed_host_tasks.load(Ordering::Relaxed),
            rings: self.inner.rings.load(Ordering::Relaxed),
        }
    }

    /// The most recently executed ring launch, if any
    pub fn last_ring(&self) -> Option<RingLaunch> {
        self.inner.last_ring.lock().clone()
    }
}

impl DeviceQueue for HostQueue {
    fn device_family(&self) -> DeviceFamily {
        self.family
    }

    fn enqueue_wait(&self, deps: &[Event]) -> AcclResult<Event> {
        self.submit(deps, Task::Wait)
    }

    fn enqueue_memcpy(
        &self,
        dst: DevicePtr,
        src: DevicePtr,
        bytes: usize,
        deps: &[Event],
    ) -> AcclResult<Event> {
        self.submit(deps, Task::Memcpy { dst, src, bytes })
    }

    fn enqueue_host_task(&self, deps: &[Event], task: HostTask) -> AcclResult<Event> {
        self.submit(deps, Task::Host(task))
    }

    fn enqueue_ring(&self, launch: &RingLaunch, deps: &[Event]) -> AcclResult<Event> {
        self.submit(deps, Task::Ring(launch.clone()))
    }

    fn export_handle(&self, desc: &MemDesc) -> AcclResult<IpcHandle> {
        let mut bytes = [0u8; IPC_HANDLE_SIZE];
        bytes[..8].copy_from_slice(&desc.ptr.as_u64().to_le_bytes());
        Ok(IpcHandle::new(bytes))
    }

    fn open_handle(&self, handle: &IpcHandle) -> AcclResult<DevicePtr> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&handle.as_bytes()[..8]);
        Ok(DevicePtr(u64::from_le_bytes(raw)))
    }
}

impl Drop for HostQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit.
        self.tx.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memcpy_orders_after_deps() {
        let q = HostQueue::new(DeviceFamily::Xe);
        let src = vec![7u8; 16];
        let mut dst = vec![0u8; 16];

        let barrier = q.enqueue_wait(&[]).unwrap();
        let copy = q
            .enqueue_memcpy(
                DevicePtr(dst.as_mut_ptr() as u64),
                DevicePtr(src.as_ptr() as u64),
                16,
                &[barrier],
            )
            .unwrap();
        copy.wait();

        assert_eq!(dst, vec![7u8; 16]);
        assert_eq!(q.stats().memcpys, 1);
    }

    #[test]
    fn test_failed_host_task_is_counted() {
        let q = HostQueue::new(DeviceFamily::Xe);
        let ok = q.enqueue_host_task(&[], Box::new(|| Ok(()))).unwrap();
        let failed = q
            .enqueue_host_task(
                &[],
                Box::new(|| Err(AcclError::Communication("peer gone".to_string()))),
            )
            .unwrap();
        ok.wait();
        // The event still signals; the failure shows up in the stats.
        failed.wait();

        let stats = q.stats();
        assert_eq!(stats.host_tasks, 2);
        assert_eq!(stats.failed_host_tasks, 1);
    }

    #[test]
    fn test_handle_roundtrip() {
        let q = HostQueue::new(DeviceFamily::Xe);
        let desc = MemDesc::new(DevicePtr(0xdead_beef), crate::device::memory::IpcMemKind::Memory);
        let handle = q.export_handle(&desc).unwrap();
        assert_eq!(q.open_handle(&handle).unwrap(), DevicePtr(0xdead_beef));
    }
}
