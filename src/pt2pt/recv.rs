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

//! Pairwise receive
//!
//! Mirror image of [`crate::pt2pt::send`]: in read mode the receiver waits
//! for the sender's readiness, copies from the sender's exposed buffer into
//! the local one and reports completion; in write mode it only signals
//! readiness and accepts the sender's completion report.

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

/// Receive `count` elements from `peer_rank` into `recv_buf`.
///
/// Returns the completion event, valid once all work is enqueued, and a
/// flag that is true once the final enqueue step succeeded.
pub fn recv(
    queue: &Arc<dyn DeviceQueue>,
    recv_buf: DevicePtr,
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
        "recv: buf={:#x}, count={}, peer_rank={}, mode={:?}",
        recv_buf.as_u64(),
        count,
        peer_rank,
        mode
    );

    match mode {
        TransferMode::Unsupported => Err(AcclError::Unsupported(
            "multi-node point-to-point recv is not supported".to_string(),
        )),
        TransferMode::Ring => {
            ring::recv_ll(queue, recv_buf, count, dtype, peer_rank, comm, attr, deps)
        }
        TransferMode::AckOnly => {
            debug!("recv: count is 0 or comm size is 1, skipping payload");
            let node_comm = comm.node_comm();
            let node_peer = node_comm.rank_from_global(peer_rank);
            let (_, done_kind) = TagAllocator::pt2pt_sync_tags();
            let tag_done = TagAllocator::create(node_comm.rank(), comm.comm_id(), done_kind);

            let barrier = queue.enqueue_wait(deps)?;
            // The receiving side reports completion.
            let ack = post_ack(queue, &[barrier], &node_comm, true, node_peer, tag_done)?;
            Ok((ack, true))
        }
        TransferMode::Read | TransferMode::Write => {
            recv_handle_exchange(mode, queue, recv_buf, count, dtype, peer_rank, comm, attr, deps)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn recv_handle_exchange(
    mode: TransferMode,
    queue: &Arc<dyn DeviceQueue>,
    recv_buf: DevicePtr,
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
    // The receiver derives sync tags from its own node rank; the sender
    // derives them from its peer's, so both ends agree.
    let tag_ready = TagAllocator::create(node_comm.rank(), comm_id, ready_kind);
    let tag_done = TagAllocator::create(node_comm.rank(), comm_id, done_kind);

    let role = if mode == TransferMode::Read {
        ExchangeRole::Receiver
    } else {
        ExchangeRole::Sender
    };

    let sched = Schedule::new();
    let mut entry = HandleExchangeEntry::new(
        sched.registry(),
        node_comm.clone(),
        queue.clone(),
        vec![MemDesc::new(recv_buf, IpcMemKind::Memory)],
        node_peer,
        role,
    );
    let deadline = attr.exchange_deadline.map(|d| Instant::now() + d);
    drive(&mut entry, deadline)?;

    if mode == TransferMode::Read {
        debug!("recv: read mode enabled");

        // Wait for the sender's readiness so we never read before the data
        // is in place.
        let sync_event = pre_sync(queue, deps, &node_comm, false, node_peer, tag_ready)?;

        let out_buf = sched.get_handle(0, node_peer)?;
        if out_buf.ptr.is_null() {
            return Err(AcclError::Precondition(
                "no pointer from peer in read mode".to_string(),
            ));
        }

        let bytes = dtype.size() * count;
        let copy_event = queue.enqueue_memcpy(recv_buf, out_buf.ptr, bytes, &[sync_event])?;

        let ack_event = post_ack(queue, &[copy_event], &node_comm, true, node_peer, tag_done)?;
        debug!("recv: ack_report done, ack_tag={:#x}", tag_done);
        Ok((ack_event, true))
    } else {
        debug!("recv: write mode enabled");

        // Signal readiness to the sender, then accept its completion report.
        let sync_event = pre_sync(queue, deps, &node_comm, true, node_peer, tag_ready)?;
        let ack_event = post_ack(queue, &[sync_event], &node_comm, false, node_peer, tag_done)?;
        debug!("recv: ack_accept done, ack_tag={:#x}", tag_done);
        Ok((ack_event, true))
    }
}
