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

//! Handle-exchange schedule entry
//!
//! Exchanges accelerator-memory descriptors between two node-local peers:
//! `start` exports every local descriptor and posts it to the peer under an
//! exchange tag; `update` polls for the peer's descriptors, opens each one
//! through the device's IPC path and records the resulting pointer in the
//! owning schedule's handle registry. Exchange uses node-local addressing
//! only; cross-node peers are rejected by the mode selector before an entry
//! is ever built.
//!
//! Wire format of one exchange message: 4-byte little-endian slot index
//! followed by the opaque handle bytes.

use std::sync::Arc;

use log::{debug, trace};

use crate::comm::communicator::Communicator;
use crate::comm::tag::{SyncKind, TagAllocator};
use crate::device::memory::{ExchangedHandle, IpcHandle, MemDesc, IPC_HANDLE_SIZE};
use crate::device::queue::DeviceQueue;
use crate::error::{AcclError, AcclResult};
use crate::sched::entry::{EntryState, ScheduleEntry};
use crate::sched::schedule::HandleRegistry;

/// Which side of the transfer this entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeRole {
    Sender,
    Receiver,
}

/// Schedule entry exchanging memory descriptors with a single peer
pub struct HandleExchangeEntry {
    state: EntryState,
    registry: HandleRegistry,
    node_comm: Arc<dyn Communicator>,
    queue: Arc<dyn DeviceQueue>,
    descriptors: Vec<MemDesc>,
    /// Node-local peer rank
    peer: i32,
    role: ExchangeRole,
    comm_id: u16,
    received: usize,
}

impl HandleExchangeEntry {
    pub fn new(
        registry: HandleRegistry,
        node_comm: Arc<dyn Communicator>,
        queue: Arc<dyn DeviceQueue>,
        descriptors: Vec<MemDesc>,
        peer: i32,
        role: ExchangeRole,
    ) -> Self {
        let comm_id = node_comm.comm_id();
        Self {
            state: EntryState::NotStarted,
            registry,
            node_comm,
            queue,
            descriptors,
            peer,
            role,
            comm_id,
            received: 0,
        }
    }

    /// Tag of messages flowing towards `dest_rank`
    fn exchange_tag(&self, dest_rank: i32) -> u64 {
        TagAllocator::create(dest_rank, self.comm_id, SyncKind::Exchange)
    }

    fn encode(slot: usize, handle: &IpcHandle) -> Vec<u8> {
        let mut payload = Vec::with_capacity(4 + IPC_HANDLE_SIZE);
        payload.extend_from_slice(&(slot as u32).to_le_bytes());
        payload.extend_from_slice(handle.as_bytes());
        payload
    }

    fn decode(payload: &[u8]) -> AcclResult<(usize, IpcHandle)> {
        if payload.len() != 4 + IPC_HANDLE_SIZE {
            return Err(AcclError::Communication(format!(
                "malformed exchange message of {} bytes",
                payload.len()
            )));
        }
        let mut slot_raw = [0u8; 4];
        slot_raw.copy_from_slice(&payload[..4]);
        let mut handle_raw = [0u8; IPC_HANDLE_SIZE];
        handle_raw.copy_from_slice(&payload[4..]);
        Ok((u32::from_le_bytes(slot_raw) as usize, IpcHandle::new(handle_raw)))
    }
}

impl ScheduleEntry for HandleExchangeEntry {
    fn start(&mut self) -> AcclResult<()> {
        debug!(
            "handle exchange start: peer={}, role={:?}, descriptors={}",
            self.peer,
            self.role,
            self.descriptors.len()
        );
        // An empty descriptor list exposes nothing and expects nothing
        // back, so the entry is complete before any message moves.
        if self.descriptors.is_empty() {
            self.state = EntryState::Completed;
            return Ok(());
        }
        let tag_out = self.exchange_tag(self.peer);
        for (slot, desc) in self.descriptors.iter().enumerate() {
            let handle = self.queue.export_handle(desc)?;
            self.node_comm
                .post_send(self.peer, tag_out, &Self::encode(slot, &handle))?;
        }
        self.state = EntryState::Active;
        Ok(())
    }

    fn update(&mut self) -> AcclResult<()> {
        if self.state != EntryState::Active {
            return Ok(());
        }
        let tag_in = self.exchange_tag(self.node_comm.rank());
        if let Some(payload) = self.node_comm.try_recv(self.peer, tag_in)? {
            let (slot, handle) = Self::decode(&payload)?;
            let ptr = self.queue.open_handle(&handle)?;
            trace!(
                "handle exchange: got slot {} of peer {} -> {:#x}",
                slot,
                self.peer,
                ptr.as_u64()
            );
            self.registry.put(slot, self.peer, ExchangedHandle { ptr });
            self.received += 1;
            if self.received == self.descriptors.len() {
                self.state = EntryState::Completed;
                debug!("handle exchange completed: peer={}", self.peer);
            }
        }
        Ok(())
    }

    fn is_completed(&self) -> bool {
        self.state == EntryState::Completed
    }

    fn name(&self) -> &'static str {
        "handle_exchange"
    }
}
