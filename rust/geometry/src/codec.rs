// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shape codec
//!
//! Converts between [`ElementShape`] (contour and holes made of segments)
//! and [`FlatPolygon`]. Every memo slot uses the same algorithm; the slot
//! only decides whether body flags are carried.
//!
//! Each sub-polygon is written as its vertex run: the first segment's start
//! followed by every segment's end. A closed polyline therefore ends on a
//! repeat of its first vertex, and segment `k` of a sub-polygon always maps
//! to the run positions `(k, k + 1)` (plus the sub-polygon offset).

use crate::error::{Error, Result};
use crate::point::{coords_equal, Point3D};
use crate::polygon::{FlatPolygon, PolyArc, VertexId};
use crate::polyline::{Polyline, PolylineSegment};
use crate::shape::ElementShape;
use std::collections::BTreeMap;
use std::fmt;

/// Polygon slots of an element's attached memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoSlot {
    /// Main outline (slabs, roofs, zones, openings).
    Main,
    /// Secondary polygon, e.g. a roof's pivot polygon.
    Additional,
    /// First profile of a ruled shell.
    ShellPolygon1,
    /// Second profile of a ruled shell.
    ShellPolygon2,
    /// Per-contour polygon of a shell with contour and holes.
    ShellContour(u32),
}

impl MemoSlot {
    /// Shell geometry carries per-edge body flags; plan polygons do not.
    pub fn supports_body_flags(&self) -> bool {
        matches!(
            self,
            MemoSlot::ShellPolygon1 | MemoSlot::ShellPolygon2 | MemoSlot::ShellContour(_)
        )
    }
}

impl fmt::Display for MemoSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoSlot::Main => write!(f, "main"),
            MemoSlot::Additional => write!(f, "additional"),
            MemoSlot::ShellPolygon1 => write!(f, "shellPolygon1"),
            MemoSlot::ShellPolygon2 => write!(f, "shellPolygon2"),
            MemoSlot::ShellContour(i) => write!(f, "shellContour{}", i),
        }
    }
}

/// Polygons attached to one element, keyed by slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonMemo {
    polygons: BTreeMap<MemoSlot, FlatPolygon>,
}

impl PolygonMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: MemoSlot) -> Option<&FlatPolygon> {
        self.polygons.get(&slot)
    }

    pub fn insert(&mut self, slot: MemoSlot, polygon: FlatPolygon) -> Option<FlatPolygon> {
        self.polygons.insert(slot, polygon)
    }

    pub fn remove(&mut self, slot: MemoSlot) -> Option<FlatPolygon> {
        self.polygons.remove(&slot)
    }

    pub fn contains(&self, slot: MemoSlot) -> bool {
        self.polygons.contains_key(&slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = MemoSlot> + '_ {
        self.polygons.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Overlay `other` on top of this memo, slot by slot.
    pub fn merge(&mut self, other: PolygonMemo) {
        self.polygons.extend(other.polygons);
    }
}

/// Encode a shape for the given slot.
pub fn encode(shape: &ElementShape, slot: MemoSlot) -> Result<FlatPolygon> {
    let with_flags = slot.supports_body_flags();
    let mut polygon = FlatPolygon {
        vertices: Vec::with_capacity(shape.vertex_count() + shape.subpoly_count()),
        vertex_ids: Vec::new(),
        pends: Vec::with_capacity(shape.subpoly_count() + 1),
        arcs: Vec::with_capacity(shape.arc_count()),
        body_flags: if with_flags { Some(Vec::new()) } else { None },
    };
    polygon.pends.push(0);
    let mut next_id: u32 = 1;

    for (index, polyline) in shape.polylines().enumerate() {
        if polyline.is_empty() {
            return Err(Error::EmptyPolyline { index });
        }
        let offset = polygon.vertices.len();
        let (run, starts) = polyline.vertex_run();

        for point in &run {
            let coord = point.to_coord();
            // Weld against everything written so far, across sub-polygons.
            let id = match polygon
                .vertices
                .iter()
                .position(|existing| coords_equal(existing, &coord))
            {
                Some(k) => polygon.vertex_ids[k],
                None => {
                    let id = next_id;
                    next_id += 1;
                    id
                }
            };
            polygon.vertices.push(coord);
            polygon.vertex_ids.push(id);
        }

        let mut flags = vec![false; run.len()];
        for (segment, start) in polyline.segments().iter().zip(&starts) {
            if segment.is_arc() {
                polygon.arcs.push(PolyArc {
                    begin: VertexId::from_index(offset + start)?,
                    end: VertexId::from_index(offset + start + 1)?,
                    angle: segment.arc_angle,
                });
            }
            if segment.body_flag == Some(true) {
                flags[*start] = true;
            }
        }
        if let Some(all) = polygon.body_flags.as_mut() {
            all.extend(flags);
        }

        let end = u32::try_from(polygon.vertices.len())
            .map_err(|_| Error::InvalidEncoding("too many vertices".into()))?;
        polygon.pends.push(end);
    }

    Ok(polygon)
}

/// Decode a polygon back into a shape at elevation `level`.
pub fn decode(polygon: &FlatPolygon, slot: MemoSlot, level: f64) -> Result<ElementShape> {
    polygon.validate()?;
    if polygon.subpoly_count() == 0 {
        return Err(Error::InvalidEncoding("polygon has no sub-polygons".into()));
    }
    let with_flags = slot.supports_body_flags() && polygon.body_flags.is_some();

    let mut polylines = Vec::with_capacity(polygon.subpoly_count());
    for i in 1..=polygon.subpoly_count() {
        let Some(range) = polygon.subpoly_range(i) else {
            continue;
        };
        let (first, last) = (*range.start(), *range.end());
        let mut segments = Vec::new();
        for j in first..last {
            let begin = VertexId::new(j).ok_or(Error::VertexOutOfRange {
                index: j,
                count: polygon.vertices.len(),
            })?;
            let end = VertexId::new(j + 1).ok_or(Error::VertexOutOfRange {
                index: j + 1,
                count: polygon.vertices.len(),
            })?;
            let start_point = Point3D::from_coord(polygon.vertex(begin)?, level);
            let end_point = Point3D::from_coord(polygon.vertex(end)?, level);
            let arc_angle = polygon.arc_starting_at(begin).map_or(0.0, |a| a.angle);
            let mut segment = PolylineSegment::arc(start_point, end_point, arc_angle);
            if with_flags {
                segment.body_flag = polygon.body_flag(begin);
            }
            segments.push(segment);
        }
        polylines.push(Polyline::new(segments));
    }

    let mut polylines = polylines.into_iter();
    let contour = polylines.next().unwrap_or_default();
    Ok(ElementShape::new(contour).with_holes(polylines))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polyline {
        Polyline::closed_from_points(&[
            Point3D::new(x0, y0, 0.0),
            Point3D::new(x1, y0, 0.0),
            Point3D::new(x1, y1, 0.0),
            Point3D::new(x0, y1, 0.0),
        ])
    }

    #[test]
    fn test_encode_single_contour() {
        let shape = ElementShape::new(rect(0.0, 0.0, 2.0, 1.0));
        let poly = encode(&shape, MemoSlot::Main).unwrap();
        assert_eq!(poly.pends, vec![0, 5]);
        assert_eq!(poly.vertex_ids, vec![1, 2, 3, 4, 1]);
        assert!(poly.arcs.is_empty());
        assert!(poly.body_flags.is_none());
        assert!(poly.validate().is_ok());
    }

    #[test]
    fn test_encode_arc_positions_are_global() {
        let mut hole = rect(0.5, 0.25, 1.0, 0.75);
        hole.polyline_segments[1].arc_angle = 1.2;
        let shape = ElementShape::new(rect(0.0, 0.0, 2.0, 1.0)).with_holes([hole]);
        let poly = encode(&shape, MemoSlot::Main).unwrap();
        assert_eq!(poly.arcs.len(), 1);
        assert_eq!(poly.arcs[0].begin.get(), 7);
        assert_eq!(poly.arcs[0].end.get(), 8);
        assert_eq!(poly.arcs[0].angle, 1.2);
    }

    #[test]
    fn test_body_flags_only_on_capable_slots() {
        let mut contour = rect(0.0, 0.0, 1.0, 1.0);
        contour.polyline_segments[2] = contour.polyline_segments[2].with_body_flag(true);
        let shape = ElementShape::new(contour);

        let plain = encode(&shape, MemoSlot::Main).unwrap();
        assert!(plain.body_flags.is_none());

        let shell = encode(&shape, MemoSlot::ShellContour(0)).unwrap();
        let flags = shell.body_flags.as_ref().unwrap();
        assert_eq!(flags, &vec![false, false, true, false, false]);

        let back = decode(&shell, MemoSlot::ShellContour(0), 0.0).unwrap();
        assert_eq!(back.contour_polyline.segments()[2].body_flag, Some(true));
        assert_eq!(back.contour_polyline.segments()[0].body_flag, Some(false));
    }

    #[test]
    fn test_empty_contour_rejected() {
        let shape = ElementShape::new(Polyline::default());
        assert!(matches!(
            encode(&shape, MemoSlot::Main),
            Err(Error::EmptyPolyline { index: 0 })
        ));
    }

    #[test]
    fn test_decode_uses_level() {
        let shape = ElementShape::new(rect(0.0, 0.0, 1.0, 1.0));
        let poly = encode(&shape, MemoSlot::Main).unwrap();
        let back = decode(&poly, MemoSlot::Main, 3.5).unwrap();
        assert!(back
            .contour_polyline
            .segments()
            .iter()
            .all(|s| s.start_point.z == 3.5 && s.end_point.z == 3.5));
    }

    #[test]
    fn test_memo_slots() {
        let mut memo = PolygonMemo::new();
        assert!(memo.is_empty());
        memo.insert(MemoSlot::ShellContour(1), FlatPolygon::default());
        memo.insert(MemoSlot::Main, FlatPolygon::default());
        let slots: Vec<_> = memo.slots().collect();
        assert_eq!(slots, vec![MemoSlot::Main, MemoSlot::ShellContour(1)]);
        assert_eq!(MemoSlot::ShellContour(1).to_string(), "shellContour1");
    }
}
