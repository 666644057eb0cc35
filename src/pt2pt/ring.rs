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

//! Low-latency ring transfer path
//!
//! Alternative strategy for Arc-family devices, bypassing handle exchange.
//! This module owns the strategy decisions: the protocol width is chosen by
//! message size against the configured threshold, and a per-peer adaptive
//! pattern value is read from the communicator, passed into the launch to
//! bias ring-step scheduling, and stored back advanced so subsequent
//! transfers to the same peer rotate through the ring differently. The ring
//! kernels themselves belong to the queue backend.

use std::sync::Arc;

use log::debug;

use crate::comm::communicator::{Communicator, PatternKind};
use crate::datatype::Datatype;
use crate::device::event::Event;
use crate::device::memory::DevicePtr;
use crate::device::queue::{DeviceQueue, RingDirection, RingLaunch, RingProto};
use crate::error::AcclResult;
use crate::pt2pt::Pt2ptAttr;

fn launch(
    direction: RingDirection,
    queue: &Arc<dyn DeviceQueue>,
    buf: DevicePtr,
    count: usize,
    dtype: Datatype,
    peer_rank: i32,
    comm: &Arc<dyn Communicator>,
    attr: &Pt2ptAttr,
    deps: &[Event],
) -> AcclResult<(Event, bool)> {
    let node_comm = comm.node_comm();
    let bytes = count * dtype.size();

    let proto = if bytes <= attr.ring_threshold {
        RingProto::Ll64
    } else {
        RingProto::Ll256
    };

    let kind = match direction {
        RingDirection::Send => PatternKind::Send,
        RingDirection::Recv => PatternKind::Recv,
    };
    let pattern = comm.rt_pattern(kind, peer_rank);

    debug!(
        "ring {:?}: bytes={}, proto={:?}, peer_rank={}, pattern={}",
        direction, bytes, proto, peer_rank, pattern
    );

    let ring = RingLaunch {
        direction,
        proto,
        buf,
        count,
        dtype,
        peer: node_comm.rank_from_global(peer_rank),
        pattern,
        p2p: node_comm.topology().has_p2p_access,
    };
    let event = queue.enqueue_ring(&ring, deps)?;

    comm.update_rt_pattern(kind, peer_rank, pattern.wrapping_add(1));
    Ok((event, true))
}

/// Ring send step; returns once the launch is enqueued
pub(crate) fn send_ll(
    queue: &Arc<dyn DeviceQueue>,
    send_buf: DevicePtr,
    count: usize,
    dtype: Datatype,
    peer_rank: i32,
    comm: &Arc<dyn Communicator>,
    attr: &Pt2ptAttr,
    deps: &[Event],
) -> AcclResult<(Event, bool)> {
    launch(
        RingDirection::Send,
        queue,
        send_buf,
        count,
        dtype,
        peer_rank,
        comm,
        attr,
        deps,
    )
}

/// Ring receive step; returns once the launch is enqueued
pub(crate) fn recv_ll(
    queue: &Arc<dyn DeviceQueue>,
    recv_buf: DevicePtr,
    count: usize,
    dtype: Datatype,
    peer_rank: i32,
    comm: &Arc<dyn Communicator>,
    attr: &Pt2ptAttr,
    deps: &[Event],
) -> AcclResult<(Event, bool)> {
    launch(
        RingDirection::Recv,
        queue,
        recv_buf,
        count,
        dtype,
        peer_rank,
        comm,
        attr,
        deps,
    )
}
