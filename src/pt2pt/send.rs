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

//! Pairwise send
//!
//! In read mode the sender only handshakes: it signals readiness once its
//! dependencies are met and waits for the peer's completion ack; the
//! receiver performs the copy. In write mode the roles flip: the sender
//! waits for the receiver's readiness, copies into the receiver's exposed
//! buffer and reports completion.

use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::comm::communicator::Communicator;
use crate::comm::tag::TagAllocator;
use crate::datatype::Datatype;
use crate::device::event::Event;
use crate::device::memory::{DevicePtr, IpcMemKind, MemDesc};
use crate::device::queue::DeviceQueue;
use crate::error::{AcclError, AcclResult};
use crate::pt2pt::ring;
use crate::pt2pt::selector::{select_mode, TransferMode};
use crate::pt2pt::sync::{post_ack, pre_sync};
use crate::pt2pt::Pt2ptAttr;
use crate::sched::entry::drive;
use crate::sched::handle_exchange::{ExchangeRole, HandleExchangeEntry};
use crate::sched::schedule::Schedule;

/// Send `count` elements of `send_buf` to `peer_rank`.
///
/// Returns the completion event, valid once all work is enqueued, and a
/// flag that is true once the final enqueue step succeeded.
pub fn send(
    queue: &Arc<dyn DeviceQueue>,
    send_buf: DevicePtr,
    count: usize,
    dtype: Datatype,
    peer_rank: i32,
    comm: &Arc<dyn Communicator>,
    attr: &Pt2ptAttr,
    deps: &[Event],
) -> AcclResult<(Event, bool)> {
    let topo = comm.topology();
    let family = queue.device_family();
    let mode = select_mode(&topo, family, comm.size(), count, attr);

    debug!(
        "send: buf={:#x}, count={}, peer_rank={}, mode={:?}",
        send_buf.as_u64(),
        count,
        peer_rank,
        mode
    );

    match mode {
        TransferMode::Unsupported => Err(AcclError::Unsupported(
            "multi-node point-to-point send is not supported".to_string(),
        )),
        TransferMode::Ring => {
            ring::send_ll(queue, send_buf, count, dtype, peer_rank, comm, attr, deps)
        }
        TransferMode::AckOnly => {
            debug!("send: count is 0 or comm size is 1, skipping payload");
            let node_comm = comm.node_comm();
            let node_peer = node_comm.rank_from_global(peer_rank);
            let (_, done_kind) = TagAllocator::pt2pt_sync_tags();
            let tag_done = TagAllocator::create(node_peer, comm.comm_id(), done_kind);

            let barrier = queue.enqueue_wait(deps)?;
            // The receiving side reports completion; the sender accepts it.
            let ack = post_ack(queue, &[barrier], &node_comm, false, node_peer, tag_done)?;
            Ok((ack, true))
        }
        TransferMode::Read | TransferMode::Write => {
            send_handle_exchange(mode, queue, send_buf, count, dtype, peer_rank, comm, attr, deps)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn send_handle_exchange(
    mode: TransferMode,
    queue: &Arc<dyn DeviceQueue>,
    send_buf: DevicePtr,
    count: usize,
    dtype: Datatype,
    peer_rank: i32,
    comm: &Arc<dyn Communicator>,
    attr: &Pt2ptAttr,
    deps: &[Event],
) -> AcclResult<(Event, bool)> {
    let node_comm = comm.node_comm();
    let node_peer = node_comm.rank_from_global(peer_rank);
    let comm_id = comm.comm_id();
    let (ready_kind, done_kind) = TagAllocator::pt2pt_sync_tags();
    // Sync tags derive from the receiver-side node rank, so both ends
    // compute the same values.
    let tag_ready = TagAllocator::create(node_peer, comm_id, ready_kind);
    let tag_done = TagAllocator::create(node_peer, comm_id, done_kind);

    let role = if mode == TransferMode::Read {
        ExchangeRole::Sender
    } else {
        ExchangeRole::Receiver
    };

    let sched = Schedule::new();
    let mut entry = HandleExchangeEntry::new(
        sched.registry(),
        node_comm.clone(),
        queue.clone(),
        vec![MemDesc::new(send_buf, IpcMemKind::Memory)],
        node_peer,
        role,
    );
    let deadline = attr.exchange_deadline.map(|d| Instant::now() + d);
    drive(&mut entry, deadline)?;

    if mode == TransferMode::Write {
        debug!("send: write mode enabled");

        // Wait for the receiver's readiness before touching its buffer.
        let sync_event = pre_sync(queue, deps, &node_comm, false, node_peer, tag_ready)?;

        let out_buf = sched.get_handle(0, node_peer)?;
        if out_buf.ptr.is_null() {
            return Err(AcclError::Precondition(
                "no pointer from peer in write mode".to_string(),
            ));
        }

        let bytes = dtype.size() * count;
        let copy_event = queue.enqueue_memcpy(out_buf.ptr, send_buf, bytes, &[sync_event])?;

        let ack_event = post_ack(queue, &[copy_event], &node_comm, true, node_peer, tag_done)?;
        debug!("send: ack_report done, ack_tag={:#x}", tag_done);
        Ok((ack_event, true))
    } else {
        debug!("send: read mode enabled");

        // Signal readiness so the receiver never reads before the data is
        // in place, then accept its completion report.
        let sync_event = pre_sync(queue, deps, &node_comm, true, node_peer, tag_ready)?;
        let ack_event = post_ack(queue, &[sync_event], &node_comm, false, node_peer, tag_done)?;
        debug!("send: ack_accept done, ack_tag={:#x}", tag_done);
        Ok((ack_event, true))
    }
}
