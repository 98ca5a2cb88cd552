// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BIMSync Geometry
//!
//! Polyline shapes with holes and arcs, and their lossless conversion to the
//! host's flat polygon encoding, using nalgebra for plan coordinates.

pub mod codec;
pub mod error;
pub mod model;
pub mod point;
pub mod polygon;
pub mod polyline;
pub mod shape;

// Re-export nalgebra types for convenience
pub use nalgebra::Point2;

pub use codec::{decode, encode, MemoSlot, PolygonMemo};
pub use error::{Error, Result};
pub use model::{Color, ModelGeometry, ModelMaterial, ModelPolygon};
pub use point::{Point3D, EPS};
pub use polygon::{FlatPolygon, PolyArc, VertexId};
pub use polyline::{Polyline, PolylineSegment};
pub use shape::ElementShape;
