// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synchronization session: owns the host, the identity map and the caches.

use crate::builder::BuilderRegistry;
use crate::cache::ResourceCaches;
use crate::error::SyncError;
use crate::extract::{ExportOptions, ExtractionPipeline};
use crate::host::HostModel;
use crate::identity::IdentityMap;
use crate::upsert::UpsertPipeline;
use bimsync_core::{Descriptor, ElementType, InternalId, SyncStatus, SynchronizationResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionOptions {
    /// Prefix of the undoable command opened for each batch.
    pub undo_name_prefix: String,
    /// Export defaults for extraction requests that do not say.
    pub send_properties: bool,
    pub send_listing_parameters: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            undo_name_prefix: "Synchronize".to_string(),
            send_properties: false,
            send_listing_parameters: false,
        }
    }
}

impl SessionOptions {
    pub fn export(&self) -> ExportOptions {
        ExportOptions {
            send_properties: self.send_properties,
            send_listing_parameters: self.send_listing_parameters,
        }
    }
}

/// Results of one upsert batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncBatch {
    /// Name of the host transaction the batch ran in.
    pub transaction: String,
    pub results: Vec<SynchronizationResult>,
}

impl SyncBatch {
    pub fn count(&self, status: SyncStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn statuses(&self) -> Vec<SyncStatus> {
        self.results.iter().map(|r| r.status).collect()
    }
}

/// Long-lived synchronization state for one host model.
///
/// The identity map lives as long as the session. Resource caches are
/// emptied by [`SyncSession::finish_transaction`].
pub struct SyncSession<H: HostModel> {
    host: H,
    identity: IdentityMap,
    caches: ResourceCaches,
    registry: BuilderRegistry,
    options: SessionOptions,
}

impl<H: HostModel> SyncSession<H> {
    pub fn new(host: H) -> Self {
        Self::with_options(host, SessionOptions::default())
    }

    pub fn with_options(host: H, options: SessionOptions) -> Self {
        Self {
            host,
            identity: IdentityMap::new(),
            caches: ResourceCaches::new(),
            registry: BuilderRegistry::with_defaults(),
            options,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    pub fn caches(&self) -> &ResourceCaches {
        &self.caches
    }

    pub fn registry_mut(&mut self) -> &mut BuilderRegistry {
        &mut self.registry
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Upsert `items` as elements of `element_type`.
    pub fn synchronize(
        &mut self,
        element_type: ElementType,
        items: &[Descriptor],
    ) -> Result<SyncBatch, SyncError> {
        let transaction = format!("{} {}", self.options.undo_name_prefix, element_type.collection_field());
        let mut pipeline = UpsertPipeline {
            host: &mut self.host,
            identity: &mut self.identity,
            caches: &mut self.caches,
            registry: &self.registry,
        };
        let results = pipeline.synchronize(element_type, items, &transaction)?;
        Ok(SyncBatch { transaction, results })
    }

    /// Serialize the given elements; unknown ids and ids of other types are skipped.
    pub fn extract(
        &mut self,
        element_type: ElementType,
        ids: &[InternalId],
        options: ExportOptions,
    ) -> Vec<Descriptor> {
        let mut pipeline = ExtractionPipeline {
            host: &self.host,
            caches: &mut self.caches,
            registry: &self.registry,
        };
        pipeline.extract(element_type, ids, options)
    }

    /// End of a receive transaction: drop every cached host handle.
    pub fn finish_transaction(&mut self) {
        self.caches.finish();
        tracing::info!(identities = self.identity.len(), "Receive transaction finished");
    }

    /// Forget every external id correlation.
    pub fn reset_identity(&mut self) {
        self.identity.clear();
    }

    /// Guids of all elements of the given types, in type order.
    pub fn element_ids(&self, types: &[ElementType]) -> Vec<InternalId> {
        types
            .iter()
            .flat_map(|t| self.host.elements_of_type(*t))
            .collect()
    }

    /// Type of each guid; unknown guids are left out.
    pub fn element_types(&self, ids: &[InternalId]) -> Vec<(InternalId, ElementType)> {
        ids.iter()
            .filter_map(|guid| self.host.element_type(*guid).ok().map(|t| (*guid, t)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: SessionOptions = serde_json::from_str(r#"{ "sendProperties": true }"#).unwrap();
        assert!(options.send_properties);
        assert!(!options.send_listing_parameters);
        assert_eq!(options.undo_name_prefix, "Synchronize");
    }

    #[test]
    fn test_transaction_named_after_collection() {
        let mut session = SyncSession::new(MemoryHost::new());
        let batch = session.synchronize(ElementType::Slab, &[]).unwrap();
        assert_eq!(batch.transaction, "Synchronize slabs");
        assert!(batch.results.is_empty());
        assert_eq!(session.host().committed_transactions(), &["Synchronize slabs".to_string()]);
    }
}
