// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute resolution keyed by (type, name).

use crate::error::HostResult;
use crate::host::{AttributeIndex, AttributeSpec, AttributeType, HostModel};
use rustc_hash::FxHashMap;

/// Caches attribute lookups and surface-material creation.
///
/// Misses are cached too: a name the host does not know stays unknown for
/// the rest of the batch.
#[derive(Debug, Default)]
pub struct MaterialCache {
    by_name: FxHashMap<(AttributeType, String), Option<AttributeIndex>>,
    names: FxHashMap<(AttributeType, AttributeIndex), String>,
}

impl MaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `spec`, creating the attribute if its type allows it.
    pub fn resolve(
        &mut self,
        host: &mut dyn HostModel,
        spec: &AttributeSpec,
    ) -> HostResult<Option<AttributeIndex>> {
        let key = (spec.kind, spec.name.clone());
        if let Some(cached) = self.by_name.get(&key) {
            return Ok(*cached);
        }
        let resolved = if spec.kind.is_creatable() {
            Some(host.get_or_create_attribute(spec)?)
        } else {
            host.find_attribute(spec.kind, &spec.name)?
        };
        tracing::debug!(kind = %spec.kind, name = %spec.name, found = resolved.is_some(), "Attribute resolved");
        if let Some(index) = resolved {
            self.names.insert((spec.kind, index), spec.name.clone());
        }
        self.by_name.insert(key, resolved);
        Ok(resolved)
    }

    /// Lookup without creation, for layers, composites, profiles and the like.
    pub fn lookup(
        &mut self,
        host: &dyn HostModel,
        kind: AttributeType,
        name: &str,
    ) -> HostResult<Option<AttributeIndex>> {
        let key = (kind, name.to_string());
        if let Some(cached) = self.by_name.get(&key) {
            return Ok(*cached);
        }
        let resolved = host.find_attribute(kind, name)?;
        if let Some(index) = resolved {
            self.names.insert((kind, index), name.to_string());
        }
        self.by_name.insert(key, resolved);
        Ok(resolved)
    }

    /// Attribute name for extraction.
    pub fn name_of(
        &mut self,
        host: &dyn HostModel,
        kind: AttributeType,
        index: AttributeIndex,
    ) -> HostResult<String> {
        if let Some(name) = self.names.get(&(kind, index)) {
            return Ok(name.clone());
        }
        let name = host.attribute_name(kind, index)?;
        self.names.insert((kind, index), name.clone());
        Ok(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
        self.names.clear();
    }
}
