// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Segment polylines
//!
//! A polyline is stored only as its segments. The distinct-vertex list and
//! the encoded vertex run are both derived from them on demand, so they can
//! never drift out of sync.

use crate::point::Point3D;
use serde::{Deserialize, Serialize};

/// One straight or circular segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolylineSegment {
    pub start_point: Point3D,
    pub end_point: Point3D,
    /// Signed sweep angle in radians; 0 for a straight segment.
    #[serde(default)]
    pub arc_angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_flag: Option<bool>,
}

impl PolylineSegment {
    pub fn line(start_point: Point3D, end_point: Point3D) -> Self {
        Self {
            start_point,
            end_point,
            arc_angle: 0.0,
            body_flag: None,
        }
    }

    pub fn arc(start_point: Point3D, end_point: Point3D, arc_angle: f64) -> Self {
        Self {
            start_point,
            end_point,
            arc_angle,
            body_flag: None,
        }
    }

    pub fn with_body_flag(mut self, flag: bool) -> Self {
        self.body_flag = Some(flag);
        self
    }

    #[inline]
    pub fn is_arc(&self) -> bool {
        self.arc_angle != 0.0
    }
}

/// Ordered sequence of segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polyline {
    #[serde(default)]
    pub polyline_segments: Vec<PolylineSegment>,
}

impl Polyline {
    pub fn new(polyline_segments: Vec<PolylineSegment>) -> Self {
        Self { polyline_segments }
    }

    /// Closed straight polyline through `points`, returning to the first one.
    pub fn closed_from_points(points: &[Point3D]) -> Self {
        let segments = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| PolylineSegment::line(*a, *b))
            .collect();
        Self::new(segments)
    }

    pub fn segments(&self) -> &[PolylineSegment] {
        &self.polyline_segments
    }

    pub fn is_empty(&self) -> bool {
        self.polyline_segments.is_empty()
    }

    /// Distinct vertices in first-seen order.
    ///
    /// Every candidate is compared against all vertices collected so far,
    /// starting with the first one, so the closing point of a closed
    /// polyline is never counted twice.
    pub fn vertices(&self) -> Vec<Point3D> {
        let mut vertices: Vec<Point3D> = Vec::with_capacity(self.polyline_segments.len() + 1);
        for segment in &self.polyline_segments {
            for p in [segment.start_point, segment.end_point] {
                if !vertices.iter().any(|v| v.approx_eq(&p)) {
                    vertices.push(p);
                }
            }
        }
        vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().len()
    }

    pub fn arc_count(&self) -> usize {
        self.polyline_segments.iter().filter(|s| s.is_arc()).count()
    }

    /// First segment's start equals last segment's end.
    pub fn is_closed(&self) -> bool {
        match (self.polyline_segments.first(), self.polyline_segments.last()) {
            (Some(first), Some(last)) => first.start_point.approx_eq(&last.end_point),
            _ => false,
        }
    }

    /// Vertex run as written to the host: the first start point followed by
    /// every segment end. Returns the run and, per segment, the run position
    /// of its start point.
    pub(crate) fn vertex_run(&self) -> (Vec<Point3D>, Vec<usize>) {
        let mut run: Vec<Point3D> = Vec::with_capacity(self.polyline_segments.len() + 1);
        let mut starts = Vec::with_capacity(self.polyline_segments.len());
        for segment in &self.polyline_segments {
            let continues = run
                .last()
                .map_or(false, |last| last.approx_eq(&segment.start_point));
            if !continues {
                run.push(segment.start_point);
            }
            starts.push(run.len() - 1);
            run.push(segment.end_point);
        }
        (run, starts)
    }

    /// Elevation of the first point, if any.
    pub fn level(&self) -> Option<f64> {
        self.polyline_segments.first().map(|s| s.start_point.z)
    }
}
