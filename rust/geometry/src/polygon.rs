// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flat polygon encoding
//!
//! The host stores a polygon with holes as parallel arrays: vertex
//! coordinates, per-vertex topological ids, cumulative sub-polygon ends
//! (`pends`), sparse arcs and optional body flags. Vertex positions are
//! 1-based, as in the host; [`VertexId`] makes that explicit and checks it.

use crate::error::{Error, Result};
use nalgebra::Point2;
use std::num::NonZeroU32;
use std::ops::RangeInclusive;

/// 1-based position in a [`FlatPolygon`]'s vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(NonZeroU32);

impl VertexId {
    /// `None` for position 0, which the host never uses.
    pub fn new(position: u32) -> Option<Self> {
        NonZeroU32::new(position).map(Self)
    }

    /// From a 0-based array index.
    pub fn from_index(index: usize) -> Result<Self> {
        u32::try_from(index + 1)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| Error::InvalidEncoding(format!("vertex index {} overflows", index)))
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// 0-based array index.
    #[inline]
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Arc on the edge between two vertex positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolyArc {
    pub begin: VertexId,
    pub end: VertexId,
    pub angle: f64,
}

/// Host-side polygon-with-holes.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatPolygon {
    pub vertices: Vec<Point2<f64>>,
    /// Topological id per vertex; equal coordinates share an id.
    pub vertex_ids: Vec<u32>,
    /// `pends[0] = 0`, `pends[i]` = last position of sub-polygon `i`.
    pub pends: Vec<u32>,
    pub arcs: Vec<PolyArc>,
    /// Parallel to `vertices` when present.
    pub body_flags: Option<Vec<bool>>,
}

impl Default for FlatPolygon {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            vertex_ids: Vec::new(),
            pends: vec![0],
            arcs: Vec::new(),
            body_flags: None,
        }
    }
}

impl FlatPolygon {
    /// Number of sub-polygons (contour plus holes).
    pub fn subpoly_count(&self) -> usize {
        self.pends.len().saturating_sub(1)
    }

    /// Length of all runs together, `pends[last]`. A closed run counts its
    /// repeated first vertex, so this is not the distinct-vertex count.
    pub fn run_len(&self) -> usize {
        self.pends.last().copied().unwrap_or(0) as usize
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// Highest topological id in use.
    pub fn max_vertex_id(&self) -> u32 {
        self.vertex_ids.iter().copied().max().unwrap_or(0)
    }

    pub fn vertex(&self, id: VertexId) -> Result<&Point2<f64>> {
        self.vertices
            .get(id.index())
            .ok_or(Error::VertexOutOfRange {
                index: id.get(),
                count: self.vertices.len(),
            })
    }

    pub fn vertex_id_at(&self, id: VertexId) -> Result<u32> {
        self.vertex_ids
            .get(id.index())
            .copied()
            .ok_or(Error::VertexOutOfRange {
                index: id.get(),
                count: self.vertex_ids.len(),
            })
    }

    /// 1-based position range of sub-polygon `subpoly` (1-based).
    pub fn subpoly_range(&self, subpoly: usize) -> Option<RangeInclusive<u32>> {
        if subpoly == 0 || subpoly >= self.pends.len() {
            return None;
        }
        Some(self.pends[subpoly - 1] + 1..=self.pends[subpoly])
    }

    /// The arc whose begin position is `begin`.
    pub fn arc_starting_at(&self, begin: VertexId) -> Option<&PolyArc> {
        self.arcs.iter().find(|a| a.begin == begin)
    }

    pub fn body_flag(&self, id: VertexId) -> Option<bool> {
        self.body_flags
            .as_ref()
            .and_then(|flags| flags.get(id.index()).copied())
    }

    /// Check the structural invariants of the encoding.
    pub fn validate(&self) -> Result<()> {
        if self.pends.first() != Some(&0) {
            return Err(Error::InvalidEncoding("pends must start with 0".into()));
        }
        if self.pends.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::InvalidEncoding("pends must be non-decreasing".into()));
        }
        if self.run_len() != self.vertices.len() {
            return Err(Error::InvalidEncoding(format!(
                "pends end at {} but {} vertices are stored",
                self.run_len(),
                self.vertices.len()
            )));
        }
        if self.vertex_ids.len() != self.vertices.len() {
            return Err(Error::InvalidEncoding(format!(
                "{} vertex ids for {} vertices",
                self.vertex_ids.len(),
                self.vertices.len()
            )));
        }
        if let Some(flags) = &self.body_flags {
            if flags.len() != self.vertices.len() {
                return Err(Error::InvalidEncoding(format!(
                    "{} body flags for {} vertices",
                    flags.len(),
                    self.vertices.len()
                )));
            }
        }
        for arc in &self.arcs {
            let inside_one = (1..=self.subpoly_count())
                .filter_map(|i| self.subpoly_range(i))
                .any(|r| r.contains(&arc.begin.get()) && r.contains(&arc.end.get()));
            if !inside_one {
                return Err(Error::InvalidEncoding(format!(
                    "arc {}..{} crosses a sub-polygon boundary",
                    arc.begin.get(),
                    arc.end.get()
                )));
            }
        }
        Ok(())
    }
}
