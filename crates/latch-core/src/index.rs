// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Static adjacency between when-identifiers and entry points.
//!
//! Built once via repeated `declare` calls before any runtime traffic,
//! then sealed. Iteration order is declaration order — the tie-break the
//! resolver relies on when several whens depend on the same entry.

use crate::ident::{EntryId, WhenId};

/// Dual adjacency: entry → dependent whens, when → depended-on entries.
#[derive(Debug)]
pub(crate) struct DependencyIndex {
    entry_to_whens: Vec<Vec<WhenId>>,
    when_to_entries: Vec<Vec<EntryId>>,
    sealed: bool,
}

impl DependencyIndex {
    pub(crate) fn new(num_entries: usize, num_whens: usize) -> Self {
        Self {
            entry_to_whens: vec![Vec::new(); num_entries],
            when_to_entries: vec![Vec::new(); num_whens],
            sealed: false,
        }
    }

    /// Records both directions of the edge. Duplicate edges are ignored;
    /// the first occurrence fixes the iteration position.
    pub(crate) fn declare(&mut self, when: WhenId, entry: EntryId) {
        let whens = &mut self.entry_to_whens[entry.index()];
        if !whens.contains(&when) {
            whens.push(when);
        }
        let entries = &mut self.when_to_entries[when.index()];
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    /// Marks the start of runtime traffic; later declares are rejected.
    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    pub(crate) fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Whens that might depend on `entry`, in declaration order.
    pub(crate) fn whens_for(&self, entry: EntryId) -> &[WhenId] {
        &self.entry_to_whens[entry.index()]
    }

    /// Entries `when` depends on, in declaration order.
    pub(crate) fn entries_for(&self, when: WhenId) -> &[EntryId] {
        &self.when_to_entries[when.index()]
    }
}
