// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change masks: the explicit set of fields a modify should apply.

use bimsync_geometry::MemoSlot;
use std::collections::BTreeSet;
use std::fmt;

/// Name of one host element field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub &'static str);

impl FieldId {
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Fields and memo slots supplied by a descriptor.
///
/// On create the mask is informational: the host starts from type
/// defaults and the builder overwrites what it was given. On modify only
/// the masked fields and slots are written; everything else on the
/// existing element is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeMask {
    fields: BTreeSet<FieldId>,
    memo: BTreeSet<MemoSlot>,
}

impl ChangeMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: FieldId) {
        self.fields.insert(field);
    }

    pub fn set_memo(&mut self, slot: MemoSlot) {
        self.memo.insert(slot);
    }

    pub fn contains(&self, field: FieldId) -> bool {
        self.fields.contains(&field)
    }

    pub fn contains_memo(&self, slot: MemoSlot) -> bool {
        self.memo.contains(&slot)
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.fields.iter().copied()
    }

    pub fn memo_slots(&self) -> impl Iterator<Item = MemoSlot> + '_ {
        self.memo.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.memo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len() + self.memo.len()
    }
}
