// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Library-part resolution: by name, or by content fingerprint for
//! synthesized custom objects.

use crate::error::HostResult;
use crate::host::{HostModel, LibraryPartIndex, LibraryPartSpec};
use bimsync_geometry::ModelGeometry;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};

/// SHA-256 over vertices, face point ids and material names.
pub fn model_fingerprint(model: &ModelGeometry) -> String {
    let mut hasher = Sha256::new();
    hasher.update((model.vertices.len() as u64).to_le_bytes());
    for v in &model.vertices {
        hasher.update(v.x.to_bits().to_le_bytes());
        hasher.update(v.y.to_bits().to_le_bytes());
        hasher.update(v.z.to_bits().to_le_bytes());
    }
    hasher.update((model.polygons.len() as u64).to_le_bytes());
    for polygon in &model.polygons {
        hasher.update((polygon.point_ids.len() as u64).to_le_bytes());
        for id in &polygon.point_ids {
            hasher.update(id.to_le_bytes());
        }
        hasher.update(polygon.material.as_deref().unwrap_or("").as_bytes());
        hasher.update([0u8]);
    }
    for material in &model.materials {
        hasher.update(material.name.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Default)]
pub struct LibraryPartCache {
    by_fingerprint: FxHashMap<String, LibraryPartIndex>,
    by_name: FxHashMap<String, Option<LibraryPartIndex>>,
    names: FxHashMap<LibraryPartIndex, String>,
}

impl LibraryPartCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `model` as a custom library part, once per fingerprint.
    pub fn resolve_model(
        &mut self,
        host: &mut dyn HostModel,
        base_name: &str,
        model: &ModelGeometry,
    ) -> HostResult<LibraryPartIndex> {
        let fingerprint = model_fingerprint(model);
        if let Some(index) = self.by_fingerprint.get(&fingerprint) {
            return Ok(*index);
        }
        let spec = LibraryPartSpec {
            name: format!("{} {}", base_name, &fingerprint[..12]),
            fingerprint: fingerprint.clone(),
            model: model.clone(),
        };
        let index = host.create_library_part(&spec)?;
        tracing::debug!(name = %spec.name, polygons = model.polygons.len(), "Registered custom library part");
        self.names.insert(index, spec.name);
        self.by_fingerprint.insert(fingerprint, index);
        Ok(index)
    }

    /// Find an existing library part by name.
    pub fn lookup(&mut self, host: &dyn HostModel, name: &str) -> HostResult<Option<LibraryPartIndex>> {
        if let Some(cached) = self.by_name.get(name) {
            return Ok(*cached);
        }
        let found = host.find_library_part(name)?;
        if let Some(index) = found {
            self.names.insert(index, name.to_string());
        }
        self.by_name.insert(name.to_string(), found);
        Ok(found)
    }

    pub fn name_of(&mut self, host: &dyn HostModel, index: LibraryPartIndex) -> HostResult<String> {
        if let Some(name) = self.names.get(&index) {
            return Ok(name.clone());
        }
        let name = host.library_part_name(index)?;
        self.names.insert(index, name.clone());
        Ok(name)
    }

    pub fn len(&self) -> usize {
        self.by_fingerprint.len() + self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.by_fingerprint.clear();
        self.by_name.clear();
        self.names.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use bimsync_geometry::{ModelPolygon, Point3D};

    fn cube_face(offset: f64) -> ModelGeometry {
        ModelGeometry {
            vertices: vec![
                Point3D::new(offset, 0.0, 0.0),
                Point3D::new(offset + 1.0, 0.0, 0.0),
                Point3D::new(offset + 1.0, 1.0, 0.0),
            ],
            polygons: vec![ModelPolygon {
                point_ids: vec![0, 1, 2],
                material: None,
            }],
            materials: vec![],
        }
    }

    #[test]
    fn test_fingerprint_is_content_based() {
        assert_eq!(model_fingerprint(&cube_face(0.0)), model_fingerprint(&cube_face(0.0)));
        assert_ne!(model_fingerprint(&cube_face(0.0)), model_fingerprint(&cube_face(1.0)));
        assert_eq!(model_fingerprint(&cube_face(0.0)).len(), 64);
    }

    #[test]
    fn test_identical_models_register_once() {
        let mut host = MemoryHost::new();
        host.begin_transaction("t").unwrap();
        let mut cache = LibraryPartCache::new();
        let a = cache.resolve_model(&mut host, "Object", &cube_face(0.0)).unwrap();
        let b = cache.resolve_model(&mut host, "Object", &cube_face(0.0)).unwrap();
        let c = cache.resolve_model(&mut host, "Object", &cube_face(2.0)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(host.calls().create_library_part, 2);
    }

    #[test]
    fn test_lookup_by_name() {
        let mut host = MemoryHost::new();
        let idx = host.add_library_part("Door 18");
        let mut cache = LibraryPartCache::new();
        assert_eq!(cache.lookup(&host, "Door 18").unwrap(), Some(idx));
        assert_eq!(cache.lookup(&host, "Door 18").unwrap(), Some(idx));
        assert_eq!(cache.lookup(&host, "Missing").unwrap(), None);
        assert_eq!(host.calls().find_library_part, 2);
        assert_eq!(cache.name_of(&host, idx).unwrap(), "Door 18");
    }
}
