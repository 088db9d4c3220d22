// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-entry FIFO buffer of arrived, unconsumed messages.
//!
//! Messages live in a slot arena; `order` holds the live slots in arrival
//! order so "any"-matching always sees the earliest unconsumed message
//! first. Slot generations make stale [`MessageHandle`]s detectable after
//! a slot is recycled.

use crate::ident::{CorrelationTag, EntryId, MessageHandle};

#[derive(Debug)]
struct Stored<M> {
    tag: CorrelationTag,
    payload: M,
}

#[derive(Debug)]
struct Slot<M> {
    generation: u64,
    message: Option<Stored<M>>,
}

/// FIFO buffer of unconsumed messages for a single entry point.
#[derive(Debug)]
pub(crate) struct MessageBuffer<M> {
    entry: EntryId,
    slots: Vec<Slot<M>>,
    free: Vec<usize>,
    /// Live slots in arrival order.
    order: Vec<usize>,
}

impl<M> MessageBuffer<M> {
    pub(crate) fn new(entry: EntryId) -> Self {
        Self {
            entry,
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Appends a message at the tail of the arrival order.
    pub(crate) fn push(&mut self, tag: CorrelationTag, payload: M) -> MessageHandle {
        let stored = Stored { tag, payload };
        let slot = if let Some(slot) = self.free.pop() {
            self.slots[slot].message = Some(stored);
            slot
        } else {
            self.slots.push(Slot {
                generation: 0,
                message: Some(stored),
            });
            self.slots.len() - 1
        };
        self.order.push(slot);
        MessageHandle {
            entry: self.entry,
            slot,
            generation: self.slots[slot].generation,
        }
    }

    /// Earliest unconsumed message carrying exactly `tag`, if any.
    pub(crate) fn find(&self, tag: CorrelationTag) -> Option<MessageHandle> {
        self.order.iter().find_map(|&slot| {
            let s = &self.slots[slot];
            let stored = s.message.as_ref()?;
            (stored.tag == tag).then_some(MessageHandle {
                entry: self.entry,
                slot,
                generation: s.generation,
            })
        })
    }

    /// Earliest unconsumed message regardless of tag, if any.
    pub(crate) fn front(&self) -> Option<MessageHandle> {
        self.order.first().map(|&slot| MessageHandle {
            entry: self.entry,
            slot,
            generation: self.slots[slot].generation,
        })
    }

    /// Borrow the payload behind a live handle; `None` when stale.
    pub(crate) fn payload(&self, handle: MessageHandle) -> Option<&M> {
        let slot = self.slots.get(handle.slot)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.message.as_ref().map(|s| &s.payload)
    }

    /// Removes the identified message, returning its payload.
    ///
    /// `None` when the handle is stale (already consumed, or the slot was
    /// recycled since) — the caller maps this to an error.
    pub(crate) fn remove(&mut self, handle: MessageHandle) -> Option<M> {
        let slot = self.slots.get_mut(handle.slot)?;
        if slot.generation != handle.generation {
            return None;
        }
        let stored = slot.message.take()?;
        slot.generation += 1;
        self.order.retain(|&s| s != handle.slot);
        self.free.push(handle.slot);
        Some(stored.payload)
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
