// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Continuation descriptors.

use crate::ident::{CorrelationTag, EntryId, WhenId};

/// A single specific message requirement: one message at `entry` bearing
/// exactly `tag` (or any tag, when `tag` is the wildcard).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SpecificDep {
    /// Entry point the message must arrive at.
    pub entry: EntryId,
    /// Correlation tag the message must carry.
    pub tag: CorrelationTag,
}

/// A suspended unit of work awaiting one or more buffered messages.
///
/// A trigger is satisfied when every [`SpecificDep`] has a buffered message
/// at its `(entry, tag)` and every entry in `any` has at least one buffered
/// message regardless of tag. Requirements are checked non-destructively;
/// the caller consumes matched messages explicitly after resolution.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Trigger {
    /// Continuation class this trigger belongs to.
    pub when: WhenId,
    /// Requirements matched by exact `(entry, tag)`.
    pub specific: Vec<SpecificDep>,
    /// Requirements matched by entry alone, tag ignored.
    pub any: Vec<EntryId>,
}

impl Trigger {
    /// Creates an empty trigger for `when` with no requirements yet.
    ///
    /// An empty requirement set is trivially satisfied, so registering it
    /// returns the trigger immediately.
    #[must_use]
    pub fn new(when: WhenId) -> Self {
        Self {
            when,
            specific: Vec::new(),
            any: Vec::new(),
        }
    }

    /// Adds a specific `(entry, tag)` requirement.
    #[must_use]
    pub fn expecting(mut self, entry: EntryId, tag: CorrelationTag) -> Self {
        self.specific.push(SpecificDep { entry, tag });
        self
    }

    /// Adds an "any"-match requirement: at least one message at `entry`.
    #[must_use]
    pub fn expecting_any(mut self, entry: EntryId) -> Self {
        self.any.push(entry);
        self
    }
}
