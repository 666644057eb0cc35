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

//! Acknowledgment primitives
//!
//! Both handshakes of the protocol are the same one-byte tagged message,
//! enqueued as a host task ordered after the given dependencies: `pre_sync`
//! carries the "buffer populated" readiness signal, `post_ack` the
//! completion signal. When `do_send` is false the host task blocks the
//! queue worker (never the issuing thread) until the peer's message
//! arrives; a stalled peer is a documented limitation, not an error here.

use std::sync::Arc;

use crate::comm::communicator::Communicator;
use crate::device::event::Event;
use crate::device::queue::{DeviceQueue, HostTask};
use crate::error::AcclResult;

const ACK_PAYLOAD: [u8; 1] = [1];

fn ack(
    queue: &Arc<dyn DeviceQueue>,
    deps: &[Event],
    comm: &Arc<dyn Communicator>,
    do_send: bool,
    peer: i32,
    tag: u64,
) -> AcclResult<Event> {
    let comm = comm.clone();
    let task: HostTask = if do_send {
        Box::new(move || comm.post_send(peer, tag, &ACK_PAYLOAD))
    } else {
        Box::new(move || comm.recv_blocking(peer, tag, None).map(|_| ()))
    };
    queue.enqueue_host_task(deps, task)
}

/// Readiness handshake ordered before the device copy
pub fn pre_sync(
    queue: &Arc<dyn DeviceQueue>,
    deps: &[Event],
    comm: &Arc<dyn Communicator>,
    do_send: bool,
    peer: i32,
    tag: u64,
) -> AcclResult<Event> {
    ack(queue, deps, comm, do_send, peer, tag)
}

/// Completion handshake ordered after the device copy
pub fn post_ack(
    queue: &Arc<dyn DeviceQueue>,
    deps: &[Event],
    comm: &Arc<dyn Communicator>,
    do_send: bool,
    peer: i32,
    tag: u64,
) -> AcclResult<Event> {
    ack(queue, deps, comm, do_send, peer, tag)
}
