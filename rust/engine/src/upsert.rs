// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Upsert pipeline: descriptors in, one result per descriptor out.
//!
//! The whole batch runs inside a single host transaction. Items are
//! processed best-effort: any validation, build or host error downgrades
//! that item to `Failed` and the loop moves on. Failing to open the
//! transaction is the only way the batch aborts.

use crate::builder::{BuildContext, BuilderRegistry, BuiltElement, ElementBuilder};
use crate::cache::ResourceCaches;
use crate::error::{BuildError, BuildResult, HostResult, SyncError};
use crate::host::HostModel;
use crate::identity::IdentityMap;
use crate::story::StoryTable;
use bimsync_core::{keys, Descriptor, ElementType, ExternalId, InternalId, SynchronizationResult};
use serde::Deserialize;
use std::time::Instant;
use uuid::Uuid;

/// Classification reference as supplied in a descriptor.
#[derive(Debug, Deserialize)]
struct ClassificationEntry {
    system: String,
    code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassificationChange {
    Add(Uuid),
    Remove(Uuid),
}

impl ClassificationChange {
    fn item(&self) -> Uuid {
        match self {
            ClassificationChange::Add(item) | ClassificationChange::Remove(item) => *item,
        }
    }

    fn inverse(&self) -> Self {
        match *self {
            ClassificationChange::Add(item) => ClassificationChange::Remove(item),
            ClassificationChange::Remove(item) => ClassificationChange::Add(item),
        }
    }

    fn apply(&self, host: &mut dyn HostModel, guid: InternalId) -> HostResult<()> {
        match *self {
            ClassificationChange::Add(item) => host.add_classification(guid, item),
            ClassificationChange::Remove(item) => host.remove_classification(guid, item),
        }
    }
}

pub struct UpsertPipeline<'a> {
    pub host: &'a mut dyn HostModel,
    pub identity: &'a mut IdentityMap,
    pub caches: &'a mut ResourceCaches,
    pub registry: &'a BuilderRegistry,
}

impl UpsertPipeline<'_> {
    /// Synchronize `items` of one element type inside transaction `transaction`.
    pub fn synchronize(
        &mut self,
        element_type: ElementType,
        items: &[Descriptor],
        transaction: &str,
    ) -> Result<Vec<SynchronizationResult>, SyncError> {
        self.host
            .begin_transaction(transaction)
            .map_err(|source| SyncError::Transaction {
                name: transaction.to_string(),
                source,
            })?;

        let start = Instant::now();
        let stories = match self.host.stories() {
            Ok(stories) => StoryTable::new(stories),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stories, placing elements on floor 0");
                StoryTable::default()
            }
        };

        let builder = self.registry.get(element_type).copied();
        let mut results = Vec::with_capacity(items.len());
        for desc in items {
            let result = match &builder {
                Some(builder) => self.process(builder, &stories, desc),
                None => SynchronizationResult::failed(
                    desc.external_id(),
                    Vec::new(),
                    BuildError::NoBuilder(element_type).to_string(),
                ),
            };
            results.push(result);
        }

        if let Err(e) = self.host.commit_transaction() {
            tracing::warn!(transaction = %transaction, error = %e, "Commit failed");
        }

        let failed = results.iter().filter(|r| !r.status.is_success()).count();
        tracing::info!(
            element_type = %element_type,
            items = items.len(),
            failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch synchronized"
        );
        Ok(results)
    }

    fn process(&mut self, builder: &ElementBuilder, stories: &StoryTable, desc: &Descriptor) -> SynchronizationResult {
        let original_id = desc.external_id();
        let mut log = Vec::new();
        match self.upsert(builder, stories, desc, &original_id, &mut log) {
            Ok((guid, true)) => {
                tracing::debug!(id = %original_id, guid = %guid, "Created");
                SynchronizationResult::created(original_id, guid, log)
            }
            Ok((guid, false)) => {
                tracing::debug!(id = %original_id, guid = %guid, "Updated");
                SynchronizationResult::updated(original_id, guid, log)
            }
            Err(e) => {
                tracing::warn!(id = %original_id, error = %e, "Item failed");
                SynchronizationResult::failed(original_id, log, e.to_string())
            }
        }
    }

    /// Returns the element guid and whether it was created.
    fn upsert(
        &mut self,
        builder: &ElementBuilder,
        stories: &StoryTable,
        desc: &Descriptor,
        original_id: &ExternalId,
        log: &mut Vec<String>,
    ) -> BuildResult<(InternalId, bool)> {
        let element_type = builder.element_type();
        if original_id.is_empty() {
            return Err(BuildError::InvalidValue {
                key: keys::ID,
                reason: "external id is empty".into(),
            });
        }

        let parent = self.resolve_parent(element_type, desc, log)?;

        // Only a converted id whose element still exists is modified. A
        // caller-suggested guid is never used to find an element.
        let existing = self
            .identity
            .get_state(original_id)
            .internal_id
            .filter(|guid| self.host.element_exists(*guid));

        let (mut target, is_create) = match existing {
            Some(guid) => {
                let current = self.host.element_type(guid)?;
                if current != element_type {
                    return Err(BuildError::TypeChanged {
                        existing: current,
                        requested: element_type,
                    });
                }
                (BuiltElement::new(self.host.get_element(guid)?), false)
            }
            None => {
                let mut defaults = self.host.get_defaults(element_type)?;
                defaults.element_type = element_type;
                defaults.guid = match desc.application_id() {
                    Some(requested) if self.host.element_exists(requested) => {
                        log.push(format!("{} {} is already in use, a new guid is assigned", keys::APPLICATION_ID, requested));
                        InternalId::from_uuid(Uuid::nil())
                    }
                    Some(requested) => requested,
                    None => InternalId::from_uuid(Uuid::nil()),
                };
                (BuiltElement::new(defaults), true)
            }
        };

        let mut ctx = BuildContext {
            host: &mut *self.host,
            caches: &mut *self.caches,
            stories,
            parent,
            is_create,
            log: Vec::new(),
        };
        let built = builder.build(desc, &mut ctx, &mut target);
        log.append(&mut ctx.log);
        built?;

        let guid = if is_create {
            self.host.create_element(&target.element, &target.memo)?
        } else {
            self.host.modify_element(&target.element, &target.mask, &target.memo)?;
            target.element.guid
        };
        self.identity.update_state(original_id.clone(), guid);

        if desc.contains(keys::CLASSIFICATIONS) {
            if let Err(e) = self.import_classifications(guid, desc, log) {
                log.push(format!("classifications not imported: {}", e));
            }
        }

        Ok((guid, is_create))
    }

    fn resolve_parent(
        &self,
        element_type: ElementType,
        desc: &Descriptor,
        log: &mut Vec<String>,
    ) -> BuildResult<Option<InternalId>> {
        match desc.parent_id() {
            Some(parent_id) if element_type.accepts_parent() => self
                .identity
                .get_state(&parent_id)
                .internal_id
                .filter(|guid| self.host.element_exists(*guid))
                .map(Some)
                .ok_or_else(|| BuildError::UnresolvedParent(parent_id.to_string())),
            Some(parent_id) => {
                log.push(format!("{} '{}' ignored: {} elements are not hosted", keys::PARENT_ID, parent_id, element_type));
                Ok(None)
            }
            None if element_type.requires_parent() => Err(BuildError::ParentRequired { element_type }),
            None => Ok(None),
        }
    }

    /// Make the host assignments match the descriptor's classification list.
    fn import_classifications(
        &mut self,
        guid: InternalId,
        desc: &Descriptor,
        log: &mut Vec<String>,
    ) -> BuildResult<()> {
        let entries: Vec<ClassificationEntry> = desc.get_as(keys::CLASSIFICATIONS)?.unwrap_or_default();

        let mut wanted = Vec::with_capacity(entries.len());
        for entry in &entries {
            match self.caches.classifications.resolve(&*self.host, &entry.system, &entry.code)? {
                Some(item) if !wanted.contains(&item) => wanted.push(item),
                Some(_) => {}
                None => log.push(format!("classification '{}' not found in '{}'", entry.code, entry.system)),
            }
        }

        let current = self.host.element_classifications(guid)?;
        let mut changes: Vec<ClassificationChange> = current
            .iter()
            .filter(|a| !wanted.contains(&a.item))
            .map(|a| ClassificationChange::Remove(a.item))
            .collect();
        changes.extend(
            wanted
                .into_iter()
                .filter(|item| !current.iter().any(|a| a.item == *item))
                .map(ClassificationChange::Add),
        );

        for (done, change) in changes.iter().enumerate() {
            if let Err(e) = change.apply(&mut *self.host, guid) {
                // Undo in reverse so the element keeps its previous assignments.
                for applied in changes[..done].iter().rev() {
                    if let Err(undo) = applied.inverse().apply(&mut *self.host, guid) {
                        tracing::warn!(guid = %guid, error = %undo, "Classification rollback failed");
                        log.push(format!("classification {} could not be rolled back", applied.item()));
                    }
                }
                return Err(e.into());
            }
        }
        Ok(())
    }
}
