//! An arena-backed FIFO queue of pending waiters
//!
//! The semaphore needs a queue that supports O(1) append at the tail,
//! O(1) pop from the head, and O(1) removal from anywhere for
//! cancellation. Instead of an intrusive linked list of raw pointers,
//! waiters live in an arena of slots linked by index, and callers hold
//! generation-tagged keys. A key whose slot has been vacated and reused
//! no longer matches the stored generation, so a cancellation racing the
//! release that already took the same waiter degrades to a detectable
//! no-op rather than touching a stranger's slot.

use alloc::vec::Vec;

/// A handle to an entry in a [`WaiterQueue`].
///
/// Keys are stable for the lifetime of the entry and invalid afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WaiterKey {
    index: usize,
    generation: u64,
}

struct Slot<T> {
    generation: u64,
    state: SlotState<T>,
}

enum SlotState<T> {
    Vacant,
    Occupied {
        value: T,
        prev: Option<usize>,
        next: Option<usize>,
    },
}

/// FIFO queue with keyed O(1) removal from any position.
pub(crate) struct WaiterQueue<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> WaiterQueue<T> {
    pub(crate) fn new() -> WaiterQueue<T> {
        WaiterQueue {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `value` at the tail and returns its key.
    pub(crate) fn push_back(&mut self, value: T) -> WaiterKey {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].state = SlotState::Occupied {
                    value,
                    prev: self.tail,
                    next: None,
                };
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    state: SlotState::Occupied {
                        value,
                        prev: self.tail,
                        next: None,
                    },
                });
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.set_next(tail, Some(index)),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;

        WaiterKey {
            index,
            generation: self.slots[index].generation,
        }
    }

    /// Removes and returns the head entry, if any.
    pub(crate) fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        Some(self.vacate(head))
    }

    /// Removes the entry identified by `key`.
    ///
    /// Returns `None` if the entry has already left the queue, which
    /// makes stale keys (a cancellation that lost its race against a
    /// release) harmless.
    pub(crate) fn remove(&mut self, key: WaiterKey) -> Option<T> {
        let slot = self.slots.get(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        match slot.state {
            SlotState::Vacant => None,
            SlotState::Occupied { .. } => Some(self.vacate(key.index)),
        }
    }

    /// Returns whether `key` still identifies a queued entry.
    pub(crate) fn contains(&self, key: WaiterKey) -> bool {
        match self.slots.get(key.index) {
            Some(slot) => {
                slot.generation == key.generation
                    && matches!(slot.state, SlotState::Occupied { .. })
            }
            None => false,
        }
    }

    /// Unlinks `index` from the chain and releases its slot.
    fn vacate(&mut self, index: usize) -> T {
        let slot = &mut self.slots[index];
        slot.generation += 1;
        let (value, prev, next) =
            match core::mem::replace(&mut slot.state, SlotState::Vacant) {
                SlotState::Occupied { value, prev, next } => (value, prev, next),
                SlotState::Vacant => unreachable!("vacate of an empty slot"),
            };

        match prev {
            Some(prev) => self.set_next(prev, next),
            None => self.head = next,
        }
        match next {
            Some(next) => self.set_prev(next, prev),
            None => self.tail = prev,
        }

        self.free.push(index);
        self.len -= 1;
        value
    }

    fn set_next(&mut self, index: usize, link: Option<usize>) {
        match &mut self.slots[index].state {
            SlotState::Occupied { next, .. } => *next = link,
            SlotState::Vacant => unreachable!("link through an empty slot"),
        }
    }

    fn set_prev(&mut self, index: usize, link: Option<usize>) {
        match &mut self.slots[index].state {
            SlotState::Occupied { prev, .. } => *prev = link,
            SlotState::Vacant => unreachable!("link through an empty slot"),
        }
    }
}
