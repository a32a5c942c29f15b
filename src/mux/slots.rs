use crate::mux::types::SlotId;
use crate::socks::Destination;
use std::net::SocketAddr;
use tokio::task::{AbortHandle, Id};

#[derive(Debug)]
pub enum Slot {
    Empty,
    /// Local client accepted, SOCKS handshake or channel open in progress.
    AwaitingHandshake { peer: SocketAddr, task: AbortHandle },
    Forwarding {
        peer: SocketAddr,
        destination: Destination,
        task: AbortHandle,
    },
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    fn task(&self) -> Option<&AbortHandle> {
        match self {
            Slot::Empty => None,
            Slot::AwaitingHandshake { task, .. } | Slot::Forwarding { task, .. } => Some(task),
        }
    }
}

/// Fixed capacity table of local connections. A slot is reused only after
/// it went back to [`Slot::Empty`].
#[derive(Debug)]
pub struct SlotTable {
    slots: Vec<Slot>,
    occupied: usize,
}

impl SlotTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::Empty).collect(),
            occupied: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn is_full(&self) -> bool {
        self.occupied == self.slots.len()
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(id)
    }

    /// Lowest empty slot, if any.
    pub fn free_slot(&self) -> Option<SlotId> {
        self.slots.iter().position(Slot::is_empty)
    }

    /// Puts a freshly accepted connection into an empty slot.
    pub fn occupy(&mut self, id: SlotId, peer: SocketAddr, task: AbortHandle) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) if slot.is_empty() => {
                *slot = Slot::AwaitingHandshake { peer, task };
                self.occupied += 1;
                true
            }
            _ => false,
        }
    }

    /// Moves a slot to [`Slot::Forwarding`] if it is still held by `task`.
    pub fn mark_forwarding(&mut self, id: SlotId, task_id: Id, destination: Destination) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        match std::mem::replace(slot, Slot::Empty) {
            Slot::AwaitingHandshake { peer, task } if task.id() == task_id => {
                *slot = Slot::Forwarding {
                    peer,
                    destination,
                    task,
                };
                true
            }
            other => {
                *slot = other;
                false
            }
        }
    }

    /// Empties a slot, returning what it held.
    pub fn release(&mut self, id: SlotId) -> Option<Slot> {
        let slot = self.slots.get_mut(id)?;
        if slot.is_empty() {
            return None;
        }
        self.occupied -= 1;
        Some(std::mem::replace(slot, Slot::Empty))
    }

    /// Empties every slot whose task is no longer running.
    pub fn sweep_finished(&mut self) -> usize {
        let finished: Vec<SlotId> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.task().is_some_and(AbortHandle::is_finished))
            .map(|(id, _)| id)
            .collect();
        for id in &finished {
            self.release(*id);
        }
        finished.len()
    }

    /// Aborts every task and empties the table.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(task) = slot.task() {
                task.abort();
            }
            *slot = Slot::Empty;
        }
        self.occupied = 0;
    }
}
