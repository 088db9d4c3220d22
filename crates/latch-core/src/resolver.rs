// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Join resolution engine.
//!
//! Orchestrates the per-entry message buffers, the per-when trigger
//! registry, and the static dependency index: messages are buffered
//! non-destructively, satisfaction is checked both on arrival and on
//! registration, and the caller commits by consuming matched messages
//! explicitly. See [`DependencyResolver`] for the full protocol.

use thiserror::Error;
use tracing::{debug, trace};

use crate::buffer::MessageBuffer;
use crate::ident::{CorrelationTag, EntryId, MessageHandle, TriggerHandle, WhenId};
use crate::index::DependencyIndex;
use crate::registry::ContinuationRegistry;
use crate::trigger::Trigger;

/// Errors emitted by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolverError {
    /// Construction parameters were unusable.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the parameters.
        reason: &'static str,
    },
    /// An entry id outside `[0, num_entries)` was supplied.
    #[error("entry id out of range: {0:?}")]
    InvalidEntry(EntryId),
    /// A when id outside `[0, num_whens)` was supplied.
    #[error("when id out of range: {0:?}")]
    InvalidWhen(WhenId),
    /// `declare_dependency` was called after runtime traffic began.
    #[error("dependency index is sealed once traffic has begun")]
    IndexSealed,
    /// A message handle no longer refers to a buffered message.
    #[error("stale message handle: message already consumed")]
    StaleHandle,
}

/// Outcome of [`DependencyResolver::register`].
#[derive(Debug)]
pub enum RegisterOutcome {
    /// The trigger is waiting; cancel it later with the handle if needed.
    Pending(TriggerHandle),
    /// Every requirement was already buffered: the trigger is handed back
    /// for immediate execution and was never left waiting.
    Satisfied(Trigger),
}

/// Dependency/join resolution engine for one locally executing entity.
///
/// The resolver suspends continuations ([`Trigger`]s) until a matching set
/// of tagged messages has been buffered, then resolves exactly the right
/// trigger exactly once. The protocol is two-phase:
///
/// 1. **Check** — [`Self::on_message_arrived`] and [`Self::register`] test
///    satisfaction non-destructively and yield at most one resolved
///    trigger per call.
/// 2. **Commit** — the caller locates the matched messages
///    ([`Self::find_message`] / [`Self::first_message`]) and removes them
///    with [`Self::consume_message`] once the continuation body has used
///    them.
///
/// Keeping the check non-destructive means a failed continuation body
/// never half-consumes its inputs, at the cost of a documented race: two
/// pending triggers can both *see* the same unconsumed message as
/// satisfying their "any" requirements; the earliest-registered trigger
/// found by the arrival scan actually claims it (first satisfied wins).
///
/// Single-threaded by design: every operation runs synchronously to
/// completion with no locking and no blocking. A trigger whose
/// dependencies never arrive waits forever; flow control is the caller's
/// concern.
#[derive(Debug)]
pub struct DependencyResolver<M> {
    index: DependencyIndex,
    buffers: Vec<MessageBuffer<M>>,
    registry: ContinuationRegistry,
}

impl<M> DependencyResolver<M> {
    /// Constructs a resolver for fixed entry and when counts.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidConfig`] if either count is zero.
    pub fn new(num_entries: usize, num_whens: usize) -> Result<Self, ResolverError> {
        if num_entries == 0 {
            return Err(ResolverError::InvalidConfig {
                reason: "num_entries must be positive",
            });
        }
        if num_whens == 0 {
            return Err(ResolverError::InvalidConfig {
                reason: "num_whens must be positive",
            });
        }
        Ok(Self {
            index: DependencyIndex::new(num_entries, num_whens),
            buffers: (0..num_entries).map(|e| MessageBuffer::new(EntryId(e))).collect(),
            registry: ContinuationRegistry::new(num_whens),
        })
    }

    /// Number of entry points fixed at construction.
    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.buffers.len()
    }

    /// Number of when-identifiers fixed at construction.
    #[must_use]
    pub fn num_whens(&self) -> usize {
        self.registry.num_whens()
    }

    /// Declares that triggers of `when` may depend on messages at `entry`.
    ///
    /// Setup-only: all edges must be declared before the first
    /// [`Self::buffer_message`] or [`Self::register`] call. Duplicate
    /// edges are ignored; the first occurrence fixes the position in the
    /// arrival scan order.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidWhen`] / [`ResolverError::InvalidEntry`]
    /// for out-of-range ids, and [`ResolverError::IndexSealed`] once
    /// runtime traffic has begun.
    pub fn declare_dependency(&mut self, when: WhenId, entry: EntryId) -> Result<(), ResolverError> {
        self.check_when(when)?;
        self.check_entry(entry)?;
        if self.index.is_sealed() {
            return Err(ResolverError::IndexSealed);
        }
        self.index.declare(when, entry);
        Ok(())
    }

    /// Entries `when` was declared to depend on, in declaration order.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidWhen`] for an out-of-range id.
    pub fn dependencies_of(&self, when: WhenId) -> Result<&[EntryId], ResolverError> {
        self.check_when(when)?;
        Ok(self.index.entries_for(when))
    }

    /// Buffers an arrived message at the tail of `entry`'s FIFO, taking
    /// ownership of `payload`.
    ///
    /// The returned handle stays valid until the message is consumed.
    /// Buffering does not resolve anything by itself; call
    /// [`Self::on_message_arrived`] afterwards to discover a newly
    /// satisfied trigger.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidEntry`] for an out-of-range id.
    pub fn buffer_message(
        &mut self,
        entry: EntryId,
        tag: CorrelationTag,
        payload: M,
    ) -> Result<MessageHandle, ResolverError> {
        self.check_entry(entry)?;
        self.index.seal();
        let handle = self.buffers[entry.index()].push(tag, payload);
        trace!(entry = entry.index(), tag = tag.0, "message buffered");
        Ok(handle)
    }

    /// Registers a trigger, immediately re-running the same satisfaction
    /// test used on message arrival.
    ///
    /// If the trigger's full requirement set is already buffered it is
    /// handed straight back as [`RegisterOutcome::Satisfied`] — without
    /// this symmetry a trigger registered after its messages arrived would
    /// stall forever waiting for an arrival that never comes.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidWhen`] / [`ResolverError::InvalidEntry`]
    /// if the trigger references an out-of-range id.
    pub fn register(&mut self, trigger: Trigger) -> Result<RegisterOutcome, ResolverError> {
        self.check_trigger(&trigger)?;
        self.index.seal();
        if self.satisfied(&trigger) {
            debug!(when = trigger.when.index(), "trigger satisfied at registration");
            return Ok(RegisterOutcome::Satisfied(trigger));
        }
        let when = trigger.when;
        let handle = self.registry.insert(trigger);
        trace!(when = when.index(), "trigger pending");
        Ok(RegisterOutcome::Pending(handle))
    }

    /// Cancels a pending trigger; idempotent.
    ///
    /// Returns the trigger if it was still registered, `None` if the
    /// handle is stale (already resolved or deregistered) — in that case
    /// state is left unchanged. Any claim the trigger would have had on
    /// buffered messages lapses with it; the messages stay buffered for
    /// other triggers.
    pub fn deregister(&mut self, handle: TriggerHandle) -> Option<Trigger> {
        let removed = self.registry.remove(handle);
        if removed.is_some() {
            trace!(when = handle.when.index(), "trigger deregistered");
        }
        removed
    }

    /// The core arrival event: scans the whens depending on `entry` (in
    /// declaration order) and their pending triggers (in registration
    /// order), deregistering and returning the first fully satisfied one.
    ///
    /// At most one trigger resolves per call. The engine performs no
    /// cascading resolution: if consuming the winner's messages could
    /// unblock another trigger, re-invoke this per freed message.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidEntry`] for an out-of-range id.
    pub fn on_message_arrived(
        &mut self,
        entry: EntryId,
        tag: CorrelationTag,
    ) -> Result<Option<Trigger>, ResolverError> {
        self.check_entry(entry)?;
        let Some(hit) = self.find_satisfied(entry) else {
            return Ok(None);
        };
        let trigger = self.registry.remove(hit);
        if trigger.is_some() {
            debug!(entry = entry.index(), tag = tag.0, "trigger resolved");
        }
        Ok(trigger)
    }

    /// Non-destructively tests whether every requirement of `trigger` has
    /// a buffered, unconsumed message.
    ///
    /// Because nothing is consumed here, two distinct pending triggers can
    /// both observe the same message as satisfying their respective "any"
    /// requirements; only the first one resolved actually claims it.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidWhen`] / [`ResolverError::InvalidEntry`]
    /// if the trigger references an out-of-range id.
    pub fn is_satisfied(&self, trigger: &Trigger) -> Result<bool, ResolverError> {
        self.check_trigger(trigger)?;
        Ok(self.satisfied(trigger))
    }

    /// Earliest unconsumed message at `entry` carrying exactly `tag`
    /// (or any tag, when `tag` is the wildcard). Non-destructive.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidEntry`] for an out-of-range id.
    pub fn find_message(
        &self,
        entry: EntryId,
        tag: CorrelationTag,
    ) -> Result<Option<MessageHandle>, ResolverError> {
        self.check_entry(entry)?;
        let buf = &self.buffers[entry.index()];
        Ok(if tag.is_wildcard() {
            buf.front()
        } else {
            buf.find(tag)
        })
    }

    /// Earliest unconsumed message at `entry` regardless of tag (the
    /// "any"-match lookup). Non-destructive.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidEntry`] for an out-of-range id.
    pub fn first_message(&self, entry: EntryId) -> Result<Option<MessageHandle>, ResolverError> {
        self.check_entry(entry)?;
        Ok(self.buffers[entry.index()].front())
    }

    /// Borrows the payload behind a live handle; `None` when stale.
    #[must_use]
    pub fn payload(&self, handle: MessageHandle) -> Option<&M> {
        self.buffers.get(handle.entry.index())?.payload(handle)
    }

    /// Permanently removes a buffered message, returning its payload.
    ///
    /// The only destructive message operation, called by the caller after
    /// a resolved trigger's body has finished with the message.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidEntry`] if the handle's entry is out
    /// of range and [`ResolverError::StaleHandle`] if the message was
    /// already consumed (double consumption is detected, never silent).
    pub fn consume_message(&mut self, handle: MessageHandle) -> Result<M, ResolverError> {
        let buf = self
            .buffers
            .get_mut(handle.entry.index())
            .ok_or(ResolverError::InvalidEntry(handle.entry))?;
        let payload = buf.remove(handle).ok_or(ResolverError::StaleHandle)?;
        trace!(entry = handle.entry.index(), "message consumed");
        Ok(payload)
    }

    /// Number of buffered, unconsumed messages at `entry`.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidEntry`] for an out-of-range id.
    pub fn buffered_len(&self, entry: EntryId) -> Result<usize, ResolverError> {
        self.check_entry(entry)?;
        Ok(self.buffers[entry.index()].len())
    }

    /// Number of pending triggers registered under `when`.
    ///
    /// # Errors
    /// Returns [`ResolverError::InvalidWhen`] for an out-of-range id.
    pub fn pending_len(&self, when: WhenId) -> Result<usize, ResolverError> {
        self.check_when(when)?;
        Ok(self.registry.len(when))
    }

    fn find_satisfied(&self, entry: EntryId) -> Option<TriggerHandle> {
        for &when in self.index.whens_for(entry) {
            for handle in self.registry.handles(when) {
                if self.registry.get(handle).is_some_and(|t| self.satisfied(t)) {
                    return Some(handle);
                }
            }
        }
        None
    }

    /// Requires every id in the trigger to be validated beforehand.
    fn satisfied(&self, trigger: &Trigger) -> bool {
        let specific_ok = trigger.specific.iter().all(|dep| {
            let buf = &self.buffers[dep.entry.index()];
            if dep.tag.is_wildcard() {
                buf.front().is_some()
            } else {
                buf.find(dep.tag).is_some()
            }
        });
        specific_ok
            && trigger
                .any
                .iter()
                .all(|entry| self.buffers[entry.index()].front().is_some())
    }

    fn check_trigger(&self, trigger: &Trigger) -> Result<(), ResolverError> {
        self.check_when(trigger.when)?;
        for dep in &trigger.specific {
            self.check_entry(dep.entry)?;
        }
        for &entry in &trigger.any {
            self.check_entry(entry)?;
        }
        Ok(())
    }

    fn check_entry(&self, entry: EntryId) -> Result<(), ResolverError> {
        if entry.index() < self.buffers.len() {
            Ok(())
        } else {
            Err(ResolverError::InvalidEntry(entry))
        }
    }

    fn check_when(&self, when: WhenId) -> Result<(), ResolverError> {
        if when.index() < self.registry.num_whens() {
            Ok(())
        } else {
            Err(ResolverError::InvalidWhen(when))
        }
    }
}
