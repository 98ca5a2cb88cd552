// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-definition discovery keyed by element configuration.
//!
//! Which definitions apply to an element depends on its type and on the
//! classification items assigned to it, so elements sharing both share a
//! definition list. Discovery is the expensive host call; it runs once per
//! distinct configuration.

use crate::error::HostResult;
use crate::host::{ClassificationAssignment, HostModel, PropertyDefinition, PropertyFilter, PropertyKind};
use bimsync_core::{ElementType, InternalId};
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use uuid::{uuid, Uuid};

/// Built-in (listing) definitions worth exporting.
pub const BUILT_IN_EXPORTS: &[Uuid] = &[
    uuid!("C4B62357-1289-4D43-A3F6-AB02B192864C"), // Height
    uuid!("A7B55E43-7C56-4C9E-836D-7A56F1D9D760"), // Thickness
    uuid!("3799B10A-61C5-4566-BF9C-EAA9CE49196E"), // Width
    uuid!("DB3A47B7-9723-47EB-B8BF-224761379150"), // Gross volume
    uuid!("FC8B1598-3E3B-4A4F-BBCE-277F83BC8598"), // Net volume
    uuid!("AC5CCA52-F79B-4850-92A9-BED7CB7C3847"), // Area
    uuid!("7E221F33-829B-4FBC-A670-E74DABCE6289"), // Element ID
    uuid!("9C609FB7-E28E-4475-8ADC-E878E78A3858"), // Unique ID
    uuid!("6AA4A58A-D32F-4AAB-BD84-E881F55D4122"), // Surface area
    uuid!("59D1CBE9-6C29-4B97-BA57-7EC9011B8D67"), // Slant angle
];

/// Cache key over `(type, filter, sorted classification pairs)`.
pub fn configuration_fingerprint(
    element_type: ElementType,
    filter: PropertyFilter,
    assignments: &[ClassificationAssignment],
) -> u64 {
    let mut pairs: Vec<_> = assignments.iter().map(|a| (a.system, a.item)).collect();
    pairs.sort_unstable();

    let mut hasher = FxHasher::default();
    element_type.as_str().hash(&mut hasher);
    filter.user_defined.hash(&mut hasher);
    filter.built_in.hash(&mut hasher);
    pairs.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Default)]
pub struct PropertyCache {
    by_configuration: FxHashMap<u64, Vec<PropertyDefinition>>,
}

impl PropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Definitions to export for `guid`.
    ///
    /// Built-in definitions outside [`BUILT_IN_EXPORTS`] are dropped.
    pub fn definitions(
        &mut self,
        host: &dyn HostModel,
        guid: InternalId,
        element_type: ElementType,
        filter: PropertyFilter,
        assignments: &[ClassificationAssignment],
    ) -> HostResult<Vec<PropertyDefinition>> {
        if !filter.user_defined && !filter.built_in {
            return Ok(Vec::new());
        }
        let key = configuration_fingerprint(element_type, filter, assignments);
        if let Some(cached) = self.by_configuration.get(&key) {
            return Ok(cached.clone());
        }

        let definitions: Vec<_> = host
            .property_definitions(guid, filter)?
            .into_iter()
            .filter(|d| match d.kind {
                PropertyKind::UserDefined => true,
                PropertyKind::BuiltIn => BUILT_IN_EXPORTS.contains(&d.guid),
            })
            .collect();
        tracing::debug!(
            element_type = %element_type,
            count = definitions.len(),
            "Property definitions discovered"
        );
        self.by_configuration.insert(key, definitions.clone());
        Ok(definitions)
    }

    pub fn len(&self) -> usize {
        self.by_configuration.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_configuration.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_configuration.clear();
    }
}
