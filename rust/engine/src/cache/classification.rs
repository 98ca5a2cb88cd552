// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Classification lookup.
//!
//! The first reference to a system fetches its whole item tree and
//! flattens it into `code -> item`. Every later lookup in that system is a
//! hash probe. An inverse `item -> (system, code, name)` map serves
//! extraction.

use crate::error::HostResult;
use crate::host::{ClassificationItem, HostModel};
use rustc_hash::FxHashMap;
use uuid::Uuid;

/// Human-readable description of an assigned item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRef {
    pub system: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Default)]
struct SystemEntry {
    codes: FxHashMap<String, Uuid>,
}

#[derive(Debug, Default)]
pub struct ClassificationCache {
    /// `None` marks a system name the host does not have.
    systems: FxHashMap<String, Option<SystemEntry>>,
    items: FxHashMap<Uuid, ClassificationRef>,
    all_loaded: bool,
}

fn flatten(
    system: &str,
    items: &[ClassificationItem],
    codes: &mut FxHashMap<String, Uuid>,
    inverse: &mut FxHashMap<Uuid, ClassificationRef>,
) {
    for item in items {
        codes.entry(item.code.clone()).or_insert(item.guid);
        inverse.insert(
            item.guid,
            ClassificationRef {
                system: system.to_string(),
                code: item.code.clone(),
                name: item.name.clone(),
            },
        );
        flatten(system, &item.children, codes, inverse);
    }
}

impl ClassificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn load_system(&mut self, host: &dyn HostModel, name: &str) -> HostResult<()> {
        if self.systems.contains_key(name) {
            return Ok(());
        }
        let system = host
            .classification_systems()?
            .into_iter()
            .find(|s| s.name == name);
        let entry = match system {
            Some(system) => {
                let roots = host.classification_items(system.guid)?;
                let mut entry = SystemEntry::default();
                flatten(name, &roots, &mut entry.codes, &mut self.items);
                tracing::debug!(system = %name, items = entry.codes.len(), "Classification system loaded");
                Some(entry)
            }
            None => None,
        };
        self.systems.insert(name.to_string(), entry);
        Ok(())
    }

    /// Item with `code` in `system`, if both exist.
    pub fn resolve(&mut self, host: &dyn HostModel, system: &str, code: &str) -> HostResult<Option<Uuid>> {
        self.load_system(host, system)?;
        Ok(self
            .systems
            .get(system)
            .and_then(|entry| entry.as_ref())
            .and_then(|entry| entry.codes.get(code).copied()))
    }

    /// Describe an assigned item, loading every system on first use.
    pub fn describe(&mut self, host: &dyn HostModel, item: Uuid) -> HostResult<Option<ClassificationRef>> {
        if !self.items.contains_key(&item) && !self.all_loaded {
            for system in host.classification_systems()? {
                self.load_system(host, &system.name)?;
            }
            self.all_loaded = true;
        }
        Ok(self.items.get(&item).cloned())
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn clear(&mut self) {
        self.systems.clear();
        self.items.clear();
        self.all_loaded = false;
    }
}
