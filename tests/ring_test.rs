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

//! Ring-path tests on Arc-family queues

use std::sync::Arc;

use accl::comm::{Communicator, LocalCommunicator, PatternKind};
use accl::datatype::Datatype;
use accl::device::{DevicePtr, DeviceQueue, HostQueue, RingDirection, RingProto};
use accl::pt2pt::{recv, send, Pt2ptAttr};
use accl::topo::{DeviceFamily, TopologyFacts};

#[test]
fn test_arc_send_takes_ring_path() {
    let group = LocalCommunicator::create_group(2, 1, TopologyFacts::single_node());
    let comm: Arc<dyn Communicator> = group[0].clone();

    let hq = Arc::new(HostQueue::new(DeviceFamily::Arc));
    let queue: Arc<dyn DeviceQueue> = hq.clone();
    let buf = vec![0u8; 4096];

    let (event, done) = send(
        &queue,
        DevicePtr(buf.as_ptr() as u64),
        1024,
        Datatype::Float32,
        1,
        &comm,
        &Pt2ptAttr::default(),
        &[],
    )
    .unwrap();
    assert!(done);
    event.wait();

    // One ring launch, no handle exchange and no copy.
    let stats = hq.stats();
    assert_eq!(stats.rings, 1);
    assert_eq!(stats.memcpys, 0);
    assert_eq!(stats.host_tasks, 0);

    let launch = hq.last_ring().unwrap();
    assert_eq!(launch.direction, RingDirection::Send);
    assert_eq!(launch.proto, RingProto::Ll64);
    assert_eq!(launch.peer, 1);
    assert_eq!(launch.count, 1024);
    assert!(launch.p2p);
}

#[test]
fn test_ring_recv_direction_and_proto_by_size() {
    let group = LocalCommunicator::create_group(2, 2, TopologyFacts::single_node());
    let comm: Arc<dyn Communicator> = group[1].clone();

    let hq = Arc::new(HostQueue::new(DeviceFamily::Arc));
    let queue: Arc<dyn DeviceQueue> = hq.clone();

    // 8192 float32 elements = 32 KiB, above the default threshold.
    let mut buf = vec![0u8; 32768];
    let (event, done) = recv(
        &queue,
        DevicePtr(buf.as_mut_ptr() as u64),
        8192,
        Datatype::Float32,
        0,
        &comm,
        &Pt2ptAttr::default(),
        &[],
    )
    .unwrap();
    assert!(done);
    event.wait();

    let launch = hq.last_ring().unwrap();
    assert_eq!(launch.direction, RingDirection::Recv);
    assert_eq!(launch.proto, RingProto::Ll256);
    assert_eq!(launch.peer, 0);
}

#[test]
fn test_ring_threshold_is_inclusive_and_tunable() {
    let group = LocalCommunicator::create_group(2, 3, TopologyFacts::single_node());
    let comm: Arc<dyn Communicator> = group[0].clone();

    let hq = Arc::new(HostQueue::new(DeviceFamily::Arc));
    let queue: Arc<dyn DeviceQueue> = hq.clone();
    let buf = vec![0u8; 4096];

    // Exactly at the threshold stays on the 64-byte protocol.
    let attr = Pt2ptAttr::default().with_ring_threshold(4096);
    let (event, _) = send(
        &queue,
        DevicePtr(buf.as_ptr() as u64),
        1024,
        Datatype::Float32,
        1,
        &comm,
        &attr,
        &[],
    )
    .unwrap();
    event.wait();
    assert_eq!(hq.last_ring().unwrap().proto, RingProto::Ll64);

    // One byte over flips to the 256-byte protocol.
    let attr = Pt2ptAttr::default().with_ring_threshold(4095);
    let (event, _) = send(
        &queue,
        DevicePtr(buf.as_ptr() as u64),
        1024,
        Datatype::Float32,
        1,
        &comm,
        &attr,
        &[],
    )
    .unwrap();
    event.wait();
    assert_eq!(hq.last_ring().unwrap().proto, RingProto::Ll256);
}

#[test]
fn test_ring_pattern_advances_per_peer_and_direction() {
    let group = LocalCommunicator::create_group(3, 4, TopologyFacts::single_node());
    let comm: Arc<dyn Communicator> = group[0].clone();

    let hq = Arc::new(HostQueue::new(DeviceFamily::Arc));
    let queue: Arc<dyn DeviceQueue> = hq.clone();
    let buf = vec![0u8; 256];
    let attr = Pt2ptAttr::default();

    for expected in 0..3u32 {
        let (event, _) = send(
            &queue,
            DevicePtr(buf.as_ptr() as u64),
            64,
            Datatype::Float32,
            1,
            &comm,
            &attr,
            &[],
        )
        .unwrap();
        event.wait();
        assert_eq!(hq.last_ring().unwrap().pattern, expected);
    }

    // A different peer and the receive direction each track their own slot.
    assert_eq!(comm.rt_pattern(PatternKind::Send, 1), 3);
    assert_eq!(comm.rt_pattern(PatternKind::Send, 2), 0);
    assert_eq!(comm.rt_pattern(PatternKind::Recv, 1), 0);
}

#[test]
fn test_arc_group_call_avoids_ring() {
    let group = LocalCommunicator::create_group(2, 5, TopologyFacts::single_node());

    // Inside a group call the ring kernels are off the table even on Arc;
    // the transfer falls back to the handle-exchange write path. The peer
    // has to run the matching side for the handshake to complete.
    let payload: Vec<u8> = (0..1024).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let sender = {
        let comm: Arc<dyn Communicator> = group[0].clone();
        std::thread::spawn(move || {
            let hq = Arc::new(HostQueue::new(DeviceFamily::Arc));
            let queue: Arc<dyn DeviceQueue> = hq.clone();
            let attr = Pt2ptAttr::default().with_group_active(true);
            let (event, done) = send(
                &queue,
                DevicePtr(payload.as_ptr() as u64),
                256,
                Datatype::Float32,
                1,
                &comm,
                &attr,
                &[],
            )
            .unwrap();
            assert!(done);
            event.wait();
            hq.stats()
        })
    };

    let receiver = {
        let comm: Arc<dyn Communicator> = group[1].clone();
        std::thread::spawn(move || {
            let hq = Arc::new(HostQueue::new(DeviceFamily::Arc));
            let queue: Arc<dyn DeviceQueue> = hq.clone();
            let attr = Pt2ptAttr::default().with_group_active(true);
            let mut buf = vec![0u8; 1024];
            let (event, done) = recv(
                &queue,
                DevicePtr(buf.as_mut_ptr() as u64),
                256,
                Datatype::Float32,
                0,
                &comm,
                &attr,
                &[],
            )
            .unwrap();
            assert!(done);
            event.wait();
            (hq.stats(), buf)
        })
    };

    let sender_stats = sender.join().unwrap();
    let (receiver_stats, received) = receiver.join().unwrap();

    assert_eq!(received, expected);
    assert_eq!(sender_stats.rings, 0);
    assert_eq!(receiver_stats.rings, 0);
    // Arc prefers the write path: the sender does the copy.
    assert_eq!(sender_stats.memcpys, 1);
    assert_eq!(receiver_stats.memcpys, 0);
}
