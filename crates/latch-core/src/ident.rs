// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and handle types.
//!
//! Entry and when identifiers are dense indices fixed at engine
//! construction. Handles are generation-checked logical identifiers:
//! internal storage may recycle slots freely, and a handle whose
//! generation no longer matches is detected as stale rather than
//! resolving to whatever now occupies the slot.

/// Strongly typed identifier for a receive entry point on the local entity.
///
/// Valid values lie in `[0, num_entries)` for the resolver the id is used
/// with. Out-of-range ids are rejected eagerly with
/// [`crate::ResolverError::InvalidEntry`].
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EntryId(pub usize);

impl EntryId {
    /// Returns the dense index backing this id.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Strongly typed identifier for a coordination continuation class.
///
/// Valid values lie in `[0, num_whens)`; a dedicated wrapper prevents
/// accidental mixing with [`EntryId`].
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct WhenId(pub usize);

impl WhenId {
    /// Returns the dense index backing this id.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Application-chosen correlation value matching continuations to messages.
///
/// The reserved [`CorrelationTag::WILDCARD`] value requests tag-agnostic
/// matching: a requirement carrying it is satisfied by the earliest
/// unconsumed message at its entry regardless of that message's tag.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CorrelationTag(pub i64);

impl CorrelationTag {
    /// Reserved tag value meaning "ignore the tag when matching".
    pub const WILDCARD: Self = Self(i64::MIN);

    /// True if this is the reserved wildcard value.
    #[must_use]
    pub fn is_wildcard(self) -> bool {
        self == Self::WILDCARD
    }
}

/// Stable logical identifier for a buffered, unconsumed message.
///
/// Returned by `buffer_message` and accepted by `payload` /
/// `consume_message`. Remains valid until the message is consumed;
/// afterwards every use is detected as stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MessageHandle {
    pub(crate) entry: EntryId,
    pub(crate) slot: usize,
    pub(crate) generation: u64,
}

impl MessageHandle {
    /// Entry point the message was buffered at.
    #[must_use]
    pub fn entry(self) -> EntryId {
        self.entry
    }
}

/// Stable logical identifier for a registered, still-pending continuation.
///
/// Returned by `register` when the trigger is left pending; used for
/// cancellation via `deregister`. Invalidated once the trigger is resolved
/// or deregistered, after which `deregister` is a no-op.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TriggerHandle {
    pub(crate) when: WhenId,
    pub(crate) slot: usize,
    pub(crate) generation: u64,
}

impl TriggerHandle {
    /// When-identifier the trigger was registered under.
    #[must_use]
    pub fn when(self) -> WhenId {
        self.when
    }
}
