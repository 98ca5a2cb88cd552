// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-run resource caches.
//!
//! All four caches are filled lazily during a run and dropped together by
//! [`ResourceCaches::finish`]. Host handles may go stale once the host's
//! transaction ends, so nothing here survives that point.

pub mod classification;
pub mod library_part;
pub mod material;
pub mod property;

pub use classification::{ClassificationCache, ClassificationRef};
pub use library_part::{model_fingerprint, LibraryPartCache};
pub use material::MaterialCache;
pub use property::{configuration_fingerprint, PropertyCache, BUILT_IN_EXPORTS};

#[derive(Debug, Default)]
pub struct ResourceCaches {
    pub materials: MaterialCache,
    pub library_parts: LibraryPartCache,
    pub classifications: ClassificationCache,
    pub properties: PropertyCache,
}

impl ResourceCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard every cached handle.
    pub fn finish(&mut self) {
        tracing::debug!(
            materials = self.materials.len(),
            library_parts = self.library_parts.len(),
            classification_systems = self.classifications.len(),
            property_sets = self.properties.len(),
            "Discarding resource caches"
        );
        self.materials.clear();
        self.library_parts.clear();
        self.classifications.clear();
        self.properties.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
            && self.library_parts.is_empty()
            && self.classifications.is_empty()
            && self.properties.is_empty()
    }
}
