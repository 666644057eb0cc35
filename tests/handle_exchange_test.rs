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

//! Handle-exchange entry tests over the in-process backend

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use accl::comm::LocalCommunicator;
use accl::Communicator;
use accl::device::{DevicePtr, DeviceQueue, HostQueue, IpcMemKind, MemDesc};
use accl::error::Code;
use accl::sched::{drive, ExchangeRole, HandleExchangeEntry, Schedule, ScheduleEntry};
use accl::topo::{DeviceFamily, TopologyFacts};

#[test]
fn test_two_rank_exchange_maps_peer_buffers() {
    let group = LocalCommunicator::create_group(2, 1, TopologyFacts::single_node());

    let buf0 = vec![0u8; 64];
    let buf1 = vec![1u8; 64];
    let ptrs = [buf0.as_ptr() as u64, buf1.as_ptr() as u64];

    let mut workers = Vec::new();
    for rank in 0..2usize {
        let comm = group[rank].clone();
        let local = ptrs[rank];
        let remote = ptrs[1 - rank];
        workers.push(thread::spawn(move || {
            let queue: Arc<dyn DeviceQueue> = Arc::new(HostQueue::new(DeviceFamily::Xe));
            let peer = (1 - rank) as i32;
            let role = if rank == 0 {
                ExchangeRole::Sender
            } else {
                ExchangeRole::Receiver
            };

            let sched = Schedule::new();
            let mut entry = HandleExchangeEntry::new(
                sched.registry(),
                comm.node_comm(),
                queue,
                vec![MemDesc::new(DevicePtr(local), IpcMemKind::Memory)],
                peer,
                role,
            );
            drive(&mut entry, None).unwrap();

            let handle = sched.get_handle(0, peer).unwrap();
            assert_eq!(handle.ptr, DevicePtr(remote));
        }));
    }

    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn test_empty_descriptor_list_completes_immediately() {
    let group = LocalCommunicator::create_group(2, 1, TopologyFacts::single_node());
    let queue: Arc<dyn DeviceQueue> = Arc::new(HostQueue::new(DeviceFamily::Xe));

    let sched = Schedule::new();
    let mut entry = HandleExchangeEntry::new(
        sched.registry(),
        group[0].node_comm(),
        queue,
        Vec::new(),
        1,
        ExchangeRole::Sender,
    );

    // Zero slots expected; the drive must finish without peer cooperation,
    // well inside the deadline.
    let deadline = Some(Instant::now() + Duration::from_millis(100));
    drive(&mut entry, deadline).unwrap();
    assert!(entry.is_completed());

    // Nothing was exchanged and nothing was sent to the peer.
    let err = sched.get_handle(0, 1).unwrap_err();
    assert_eq!(err.code(), Code::Precondition);
}

#[test]
fn test_exchange_deadline_without_peer() {
    let group = LocalCommunicator::create_group(2, 1, TopologyFacts::single_node());
    let queue: Arc<dyn DeviceQueue> = Arc::new(HostQueue::new(DeviceFamily::Xe));

    let buf = vec![0u8; 16];
    let sched = Schedule::new();
    let mut entry = HandleExchangeEntry::new(
        sched.registry(),
        group[0].node_comm(),
        queue,
        vec![MemDesc::new(DevicePtr(buf.as_ptr() as u64), IpcMemKind::Memory)],
        1,
        ExchangeRole::Sender,
    );

    // Rank 1 never participates.
    let deadline = Some(Instant::now() + Duration::from_millis(50));
    let err = drive(&mut entry, deadline).unwrap_err();
    assert_eq!(err.code(), Code::Timeout);

    // Nothing was exchanged, so the registry lookup is a fatal precondition.
    let err = sched.get_handle(0, 1).unwrap_err();
    assert_eq!(err.code(), Code::Precondition);
}
