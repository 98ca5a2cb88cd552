// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element shapes: a contour polyline with optional hole polylines.

use crate::codec::{self, MemoSlot, PolygonMemo};
use crate::error::{Error, Result};
use crate::polyline::Polyline;
use serde::{Deserialize, Serialize};

/// Contour and holes, as exchanged with the external document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementShape {
    pub contour_polyline: Polyline,
    #[serde(default)]
    pub hole_polylines: Vec<Polyline>,
}

impl ElementShape {
    pub fn new(contour_polyline: Polyline) -> Self {
        Self {
            contour_polyline,
            hole_polylines: Vec::new(),
        }
    }

    pub fn with_holes(mut self, holes: impl IntoIterator<Item = Polyline>) -> Self {
        self.hole_polylines.extend(holes);
        self
    }

    /// Contour first, then holes in order.
    pub fn polylines(&self) -> impl Iterator<Item = &Polyline> {
        std::iter::once(&self.contour_polyline).chain(self.hole_polylines.iter())
    }

    pub fn subpoly_count(&self) -> usize {
        self.hole_polylines.len() + 1
    }

    /// Sum of the distinct-vertex counts of all polylines.
    pub fn vertex_count(&self) -> usize {
        self.polylines().map(Polyline::vertex_count).sum()
    }

    pub fn arc_count(&self) -> usize {
        self.polylines().map(Polyline::arc_count).sum()
    }

    /// Elevation of the contour's first point.
    pub fn level(&self) -> f64 {
        self.contour_polyline.level().unwrap_or(0.0)
    }

    /// Encode into `slot` of `memo`, replacing whatever was there.
    pub fn set_to_memo(&self, memo: &mut PolygonMemo, slot: MemoSlot) -> Result<()> {
        let polygon = codec::encode(self, slot)?;
        memo.insert(slot, polygon);
        Ok(())
    }

    /// Decode the polygon stored in `slot` at elevation `level`.
    pub fn from_memo(memo: &PolygonMemo, slot: MemoSlot, level: f64) -> Result<Self> {
        let polygon = memo
            .get(slot)
            .ok_or_else(|| Error::MissingSlot(slot.to_string()))?;
        codec::decode(polygon, slot, level)
    }
}
