// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygonal model geometry for custom 3D objects.

use crate::error::{Error, Result};
use crate::point::Point3D;
use serde::{Deserialize, Serialize};

/// RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

/// Surface material referenced by model polygons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMaterial {
    pub name: String,
    #[serde(default)]
    pub ambient_color: Color,
    #[serde(default)]
    pub emission_color: Color,
    /// 0 = opaque, 1 = fully transparent.
    #[serde(default)]
    pub transparency: f64,
}

/// Planar face given by indices into the model's vertex list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPolygon {
    pub point_ids: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}

/// Vertices, faces and materials of a custom object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelGeometry {
    #[serde(default)]
    pub vertices: Vec<Point3D>,
    #[serde(default)]
    pub polygons: Vec<ModelPolygon>,
    #[serde(default)]
    pub materials: Vec<ModelMaterial>,
}

impl ModelGeometry {
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn material(&self, name: &str) -> Option<&ModelMaterial> {
        self.materials.iter().find(|m| m.name == name)
    }

    /// Faces must reference existing vertices and declared materials.
    pub fn validate(&self) -> Result<()> {
        for (i, polygon) in self.polygons.iter().enumerate() {
            if polygon.point_ids.len() < 3 {
                return Err(Error::InvalidModel(format!(
                    "polygon {} has {} points",
                    i,
                    polygon.point_ids.len()
                )));
            }
            if let Some(bad) = polygon
                .point_ids
                .iter()
                .find(|&&id| id as usize >= self.vertices.len())
            {
                return Err(Error::InvalidModel(format!(
                    "polygon {} references vertex {} of {}",
                    i,
                    bad,
                    self.vertices.len()
                )));
            }
            if let Some(name) = &polygon.material {
                if self.material(name).is_none() {
                    return Err(Error::InvalidModel(format!(
                        "polygon {} uses undeclared material '{}'",
                        i, name
                    )));
                }
            }
        }
        Ok(())
    }
}
