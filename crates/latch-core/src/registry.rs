// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-when registry of currently-waiting continuations.
//!
//! Triggers for the same [`WhenId`] are independent and queued FIFO: two
//! registrations of the same when (repeated coordination-block entries)
//! coexist and resolve in registration order. Removal is idempotent via
//! slot generations.

use crate::ident::{TriggerHandle, WhenId};
use crate::trigger::Trigger;

#[derive(Debug)]
struct Slot {
    generation: u64,
    trigger: Option<Trigger>,
}

#[derive(Debug, Default)]
struct WhenQueue {
    slots: Vec<Slot>,
    free: Vec<usize>,
    /// Live slots in registration order.
    order: Vec<usize>,
}

/// Registry of pending triggers, keyed by when-identifier.
#[derive(Debug)]
pub(crate) struct ContinuationRegistry {
    queues: Vec<WhenQueue>,
}

impl ContinuationRegistry {
    pub(crate) fn new(num_whens: usize) -> Self {
        Self {
            queues: (0..num_whens).map(|_| WhenQueue::default()).collect(),
        }
    }

    pub(crate) fn num_whens(&self) -> usize {
        self.queues.len()
    }

    /// Appends `trigger` at the tail of its when's registration order.
    pub(crate) fn insert(&mut self, trigger: Trigger) -> TriggerHandle {
        let when = trigger.when;
        let q = &mut self.queues[when.index()];
        let slot = if let Some(slot) = q.free.pop() {
            q.slots[slot].trigger = Some(trigger);
            slot
        } else {
            q.slots.push(Slot {
                generation: 0,
                trigger: Some(trigger),
            });
            q.slots.len() - 1
        };
        q.order.push(slot);
        TriggerHandle {
            when,
            slot,
            generation: q.slots[slot].generation,
        }
    }

    /// Removes the identified trigger; `None` when the handle is stale
    /// (already resolved or deregistered), leaving state unchanged.
    pub(crate) fn remove(&mut self, handle: TriggerHandle) -> Option<Trigger> {
        let q = self.queues.get_mut(handle.when.index())?;
        let slot = q.slots.get_mut(handle.slot)?;
        if slot.generation != handle.generation {
            return None;
        }
        let trigger = slot.trigger.take()?;
        slot.generation += 1;
        q.order.retain(|&s| s != handle.slot);
        q.free.push(handle.slot);
        Some(trigger)
    }

    pub(crate) fn get(&self, handle: TriggerHandle) -> Option<&Trigger> {
        let slot = self.queues.get(handle.when.index())?.slots.get(handle.slot)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.trigger.as_ref()
    }

    /// Handles of `when`'s pending triggers, in registration order.
    pub(crate) fn handles(&self, when: WhenId) -> impl Iterator<Item = TriggerHandle> + '_ {
        let q = &self.queues[when.index()];
        q.order.iter().map(move |&slot| TriggerHandle {
            when,
            slot,
            generation: q.slots[slot].generation,
        })
    }

    pub(crate) fn len(&self, when: WhenId) -> usize {
        self.queues[when.index()].order.len()
    }
}
