// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Time-ordered delivery queue: a binary min-heap over stable tickets.
//!
//! Elements are opaque to the queue beyond the [`TimeKeyed`] comparison
//! capability. The backing array reorders on every mutation, so positions
//! are never exposed; instead every element gets a [`DeliveryTicket`]
//! whose internal position mapping is maintained across swaps and growth.
//! Equal keys order by insertion sequence, so drain order is fully
//! deterministic and replayable.

use std::cmp::Ordering;

use thiserror::Error;

/// Comparison capability the queue requires of its elements.
///
/// Typically compares a logical timestamp. The queue never inspects
/// element internals beyond this.
pub trait TimeKeyed {
    /// Three-way comparison of this element's key against `other`'s.
    fn compare_key(&self, other: &Self) -> Ordering;
}

/// Errors emitted by the delivery queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The ticket's element was already extracted from the queue.
    #[error("stale delivery ticket: element already extracted")]
    StaleTicket,
}

/// Stable logical identifier for a queued element.
///
/// Stays valid across storage growth and heap reordering; invalidated
/// when the element is extracted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DeliveryTicket {
    slot: usize,
    generation: u64,
}

#[derive(Debug)]
struct ItemSlot<T> {
    generation: u64,
    item: Option<T>,
    /// Current position in `heap`; only meaningful while `item` is `Some`.
    pos: usize,
    /// Insertion sequence, the deterministic equal-key tie-break.
    seq: u64,
}

/// Binary min-heap over [`TimeKeyed`] elements keyed by logical timestamp.
///
/// `insert`/`extract_min` are O(log n), `peek_min` O(1). A key mutated in
/// place (via [`Self::get_mut`]) is repaired with [`Self::fix`], which
/// unifies increase-key and decrease-key into one operation.
#[derive(Debug)]
pub struct TimeOrderedDeliveryQueue<T> {
    /// Position → slot.
    heap: Vec<usize>,
    slots: Vec<ItemSlot<T>>,
    free: Vec<usize>,
    next_seq: u64,
}

impl<T: TimeKeyed> Default for TimeOrderedDeliveryQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeKeyed> TimeOrderedDeliveryQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            slots: Vec::new(),
            free: Vec::new(),
            next_seq: 0,
        }
    }

    /// Builds a queue from `items` with bottom-up heapify, O(n).
    ///
    /// Tickets are returned in the order the items were supplied.
    #[must_use]
    pub fn from_items(items: Vec<T>) -> (Self, Vec<DeliveryTicket>) {
        let len = items.len();
        let mut queue = Self {
            heap: (0..len).collect(),
            slots: items
                .into_iter()
                .enumerate()
                .map(|(i, item)| ItemSlot {
                    generation: 0,
                    item: Some(item),
                    pos: i,
                    seq: i as u64,
                })
                .collect(),
            free: Vec::new(),
            next_seq: len as u64,
        };
        let tickets = (0..len)
            .map(|slot| DeliveryTicket { slot, generation: 0 })
            .collect();
        for pos in (0..len / 2).rev() {
            queue.sift_down(pos);
        }
        (queue, tickets)
    }

    /// Number of queued elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when no elements are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Inserts an element, returning its ticket; O(log n).
    pub fn insert(&mut self, item: T) -> DeliveryTicket {
        let seq = self.next_seq;
        self.next_seq += 1;
        let pos = self.heap.len();
        let slot = if let Some(slot) = self.free.pop() {
            let s = &mut self.slots[slot];
            s.item = Some(item);
            s.pos = pos;
            s.seq = seq;
            slot
        } else {
            self.slots.push(ItemSlot {
                generation: 0,
                item: Some(item),
                pos,
                seq,
            });
            self.slots.len() - 1
        };
        self.heap.push(slot);
        self.sift_up(pos);
        DeliveryTicket {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    /// Borrows the minimum-key element without removing it; O(1).
    #[must_use]
    pub fn peek_min(&self) -> Option<&T> {
        let &slot = self.heap.first()?;
        self.slots[slot].item.as_ref()
    }

    /// Removes and returns the minimum-key element; O(log n).
    ///
    /// The extracted element's ticket becomes stale.
    pub fn extract_min(&mut self) -> Option<T> {
        let &root = self.heap.first()?;
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        self.heap.pop();
        if let Some(&moved) = self.heap.first() {
            self.slots[moved].pos = 0;
            self.sift_down(0);
        }
        let slot = &mut self.slots[root];
        slot.generation += 1;
        let item = slot.item.take();
        self.free.push(root);
        item
    }

    /// Borrows the element behind a live ticket; `None` when stale.
    #[must_use]
    pub fn get(&self, ticket: DeliveryTicket) -> Option<&T> {
        let slot = self.slots.get(ticket.slot)?;
        if slot.generation != ticket.generation {
            return None;
        }
        slot.item.as_ref()
    }

    /// Mutably borrows the element behind a live ticket.
    ///
    /// If the mutation changes the element's key, call [`Self::fix`] with
    /// the same ticket before the next queue operation; until then heap
    /// order is suspended for that element.
    pub fn get_mut(&mut self, ticket: DeliveryTicket) -> Option<&mut T> {
        let slot = self.slots.get_mut(ticket.slot)?;
        if slot.generation != ticket.generation {
            return None;
        }
        slot.item.as_mut()
    }

    /// Repairs heap order after the element's key changed in place.
    ///
    /// Sifts toward the root while smaller than its parent, otherwise
    /// sifts down toward the lesser child — one operation covers both
    /// increased and decreased keys.
    ///
    /// # Errors
    /// Returns [`QueueError::StaleTicket`] if the element was already
    /// extracted.
    pub fn fix(&mut self, ticket: DeliveryTicket) -> Result<(), QueueError> {
        let slot = self.slots.get(ticket.slot).ok_or(QueueError::StaleTicket)?;
        if slot.generation != ticket.generation || slot.item.is_none() {
            return Err(QueueError::StaleTicket);
        }
        let pos = slot.pos;
        self.sift_up(pos);
        let pos = self.slots[ticket.slot].pos;
        self.sift_down(pos);
        Ok(())
    }

    /// Verifies heap order over the whole structure.
    ///
    /// Test/debug aid; never needed on a production path.
    #[must_use]
    pub fn integrity_check(&self) -> bool {
        (0..self.heap.len()).all(|pos| {
            let c1 = 2 * pos + 1;
            let c2 = 2 * pos + 2;
            (c1 >= self.heap.len() || !self.less(c1, pos))
                && (c2 >= self.heap.len() || !self.less(c2, pos))
        })
    }

    /// True if the element at heap position `a` orders strictly before the
    /// one at `b` — by key, then by insertion sequence.
    fn less(&self, a: usize, b: usize) -> bool {
        let sa = &self.slots[self.heap[a]];
        let sb = &self.slots[self.heap[b]];
        let (Some(x), Some(y)) = (sa.item.as_ref(), sb.item.as_ref()) else {
            return false;
        };
        match x.compare_key(y) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => sa.seq < sb.seq,
        }
    }

    fn swap_positions(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.slots[self.heap[a]].pos = a;
        self.slots[self.heap[b]].pos = b;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.less(pos, parent) {
                self.swap_positions(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        loop {
            let c1 = 2 * pos + 1;
            if c1 >= self.heap.len() {
                break;
            }
            let c2 = c1 + 1;
            let best = if c2 < self.heap.len() && self.less(c2, c1) {
                c2
            } else {
                c1
            };
            if self.less(best, pos) {
                self.swap_positions(best, pos);
                pos = best;
            } else {
                break;
            }
        }
    }
}
