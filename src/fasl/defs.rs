// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{resource_error, ErrorLocation, Result};

/// Per-stream table of defined values, addressed by index rather than by
/// pointer so that a value can be "published" into the table before it is
/// fully built (see [`crate::values::ValueFactory`]).
///
/// Indices are not required to be contiguous or densely packed; an index
/// past the current length simply grows the table. This mirrors the
/// original decoder's lazily-resized array, but replaces its resize hazard
/// (reallocation invalidating a pointer held across the recursive decode of
/// a child) by having callers always re-look-up through the table rather
/// than retain a reference.
pub struct DefinitionTable<V> {
    slots: Vec<Option<V>>,
    growth_unit: usize,
}

impl<V: Clone> DefinitionTable<V> {
    pub fn new(growth_unit: usize) -> Self {
        DefinitionTable { slots: Vec::new(), growth_unit: growth_unit.max(1) }
    }

    fn ensure_capacity(&mut self, index: usize) {
        if index < self.slots.len() {
            return;
        }
        let needed = index + 1;
        let new_len = (2 * self.slots.len()).max(needed + self.growth_unit);
        self.slots.resize(new_len, None);
    }

    /// Defines `index` to `value`, growing the table if necessary.
    pub fn define(&mut self, index: usize, value: V) {
        self.ensure_capacity(index);
        self.slots[index] = Some(value);
    }

    /// Looks up `index`. An index that was never defined, or that was
    /// dropped by [`Self::reset`], yields `None` rather than an error —
    /// callers resolve that to nil (spec-documented behavior, matching the
    /// original reader's `fasl_ensure_valid_table_index`).
    pub fn get(&self, index: usize) -> Option<&V> {
        self.slots.get(index).and_then(|slot| slot.as_ref())
    }

    /// Clears every definition without shrinking the backing storage.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Bounds an index against a hard ceiling, independent of the table's own
/// lazy growth, so a corrupt stream cannot force an unbounded allocation
/// (spec §7, "Resource" error kind).
pub fn check_index_bound(index: usize, max_index: usize, at: ErrorLocation) -> Result<()> {
    if index > max_index {
        return resource_error("fasl table index exceeds configured bound", at);
    }
    Ok(())
}
