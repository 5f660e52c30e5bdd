// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::heap::Handle;
use crate::types::TypeId;

use std::collections::{BTreeMap, BTreeSet};

/// A source cell as seen through a particular type, copied into a pointer to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AliasKey {
    pub source: Handle,
    pub ty: TypeId,
    pub target: TypeId,
}

/// Destination cell already produced for a source cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    pub destination: Handle,
}

/// Source-to-destination cell map for one top-level copy.
///
/// Entries are recorded before the engine descends into a cell, so a cycle that leads back to
/// the cell finds the destination under construction. When hierarchy preservation is off the
/// engine releases each entry once the cell's subtree is done: only cycles through ancestors
/// alias, and sub-structures shared by siblings are copied once per path.
///
/// Cells copied by value (a pointer source into a non-pointer slot) have no destination cell to
/// alias. They are tracked as ancestors instead; entering one that is already entered is a cycle.
#[derive(Debug, Default)]
pub struct AliasTracker {
    preserve: bool,
    entries: BTreeMap<AliasKey, Alias>,
    ancestors: BTreeSet<Handle>,
}

impl AliasTracker {
    pub fn new(preserve: bool) -> Self {
        Self {
            preserve,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn lookup(&self, key: &AliasKey) -> Option<Alias> {
        self.entries.get(key).copied()
    }

    /// Returns the previous entry for `key`, if any.
    pub fn record(&mut self, key: AliasKey, alias: Alias) -> Option<Alias> {
        self.entries.insert(key, alias)
    }

    /// Forgets `key` unless every shared cell is being mirrored.
    pub fn release(&mut self, key: &AliasKey) {
        if !self.preserve {
            self.entries.remove(key);
        }
    }

    /// Marks `source` as being copied by value. False if it already is.
    #[must_use]
    pub fn enter(&mut self, source: Handle) -> bool {
        self.ancestors.insert(source)
    }

    pub fn leave(&mut self, source: Handle) {
        self.ancestors.remove(&source);
    }
}
