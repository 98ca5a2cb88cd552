// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extraction pipeline: host elements back into descriptors.
//!
//! Unlike the upsert pipeline, extraction reports nothing for ids it
//! cannot serve. An id whose element is missing, of another type, or
//! fails to serialize is left out of the output and logged at debug
//! level.

use crate::builder::{BuilderRegistry, ElementBuilder, ExtractContext};
use crate::cache::ResourceCaches;
use crate::error::{BuildResult, HostResult};
use crate::host::{ClassificationAssignment, HostModel, PropertyFilter};
use crate::story::StoryTable;
use bimsync_core::{keys, Descriptor, ElementType, InternalId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Which property families to export alongside each element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// User-defined properties.
    pub send_properties: bool,
    /// Built-in listing parameters.
    pub send_listing_parameters: bool,
}

impl ExportOptions {
    pub fn filter(&self) -> PropertyFilter {
        PropertyFilter {
            user_defined: self.send_properties,
            built_in: self.send_listing_parameters,
        }
    }
}

pub struct ExtractionPipeline<'a> {
    pub host: &'a dyn HostModel,
    pub caches: &'a mut ResourceCaches,
    pub registry: &'a BuilderRegistry,
}

impl ExtractionPipeline<'_> {
    /// Serialize every id in `ids` that is an element of `element_type`.
    pub fn extract(
        &mut self,
        element_type: ElementType,
        ids: &[InternalId],
        options: ExportOptions,
    ) -> Vec<Descriptor> {
        let Some(builder) = self.registry.get(element_type).copied() else {
            tracing::warn!(element_type = %element_type, "No builder registered");
            return Vec::new();
        };
        let stories = match self.host.stories() {
            Ok(stories) => StoryTable::new(stories),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stories");
                StoryTable::default()
            }
        };

        let mut records = Vec::with_capacity(ids.len());
        for &guid in ids {
            match self.extract_one(&builder, &stories, guid, options) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::debug!(guid = %guid, error = %e, "Skipping element"),
            }
        }
        tracing::info!(
            element_type = %element_type,
            requested = ids.len(),
            returned = records.len(),
            "Elements extracted"
        );
        records
    }

    fn extract_one(
        &mut self,
        builder: &ElementBuilder,
        stories: &StoryTable,
        guid: InternalId,
        options: ExportOptions,
    ) -> BuildResult<Option<Descriptor>> {
        let element = self.host.get_element(guid)?;
        if element.element_type != builder.element_type() {
            tracing::debug!(
                guid = %guid,
                expected = %builder.element_type(),
                actual = %element.element_type,
                "Skipping element of another type"
            );
            return Ok(None);
        }
        let memo = self.host.get_memo(guid)?;

        let mut ctx = ExtractContext {
            host: self.host,
            caches: &mut *self.caches,
            stories,
        };
        let mut record = builder.serialize(&element, &memo, &mut ctx)?;

        let assignments = match self.host.element_classifications(guid) {
            Ok(assignments) => assignments,
            Err(e) => {
                tracing::debug!(guid = %guid, error = %e, "Classifications unavailable");
                Vec::new()
            }
        };
        match self.classifications(&assignments) {
            Ok(list) => record.insert(keys::CLASSIFICATIONS, list),
            Err(e) => tracing::debug!(guid = %guid, error = %e, "Classifications not exported"),
        }

        let filter = options.filter();
        if filter.user_defined || filter.built_in {
            match self.properties(guid, element.element_type, filter, &assignments) {
                Ok(list) => record.insert(keys::ELEMENT_PROPERTIES, list),
                Err(e) => tracing::debug!(guid = %guid, error = %e, "Properties not exported"),
            }
        }

        Ok(Some(record))
    }

    fn classifications(&mut self, assignments: &[ClassificationAssignment]) -> HostResult<Vec<Value>> {
        let mut list = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            if let Some(item) = self.caches.classifications.describe(self.host, assignment.item)? {
                list.push(json!({
                    "system": item.system,
                    "code": item.code,
                    "name": item.name,
                }));
            }
        }
        Ok(list)
    }

    fn properties(
        &mut self,
        guid: InternalId,
        element_type: ElementType,
        filter: PropertyFilter,
        assignments: &[ClassificationAssignment],
    ) -> HostResult<Vec<Value>> {
        let definitions = self
            .caches
            .properties
            .definitions(self.host, guid, element_type, filter, assignments)?;
        let values = self.host.property_values(guid, &definitions)?;
        Ok(definitions
            .iter()
            .filter_map(|d| {
                values.iter().find(|v| v.definition == d.guid).map(|v| {
                    json!({
                        "name": d.name,
                        "group": d.group,
                        "value": v.value,
                    })
                })
            })
            .collect())
    }
}
