// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 3D points with tolerant equality

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Coordinate tolerance used for every geometric equality test.
pub const EPS: f64 = 1e-5;

#[inline]
pub(crate) fn is_near(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

/// Plan coordinates compare equal within [`EPS`] on both axes.
#[inline]
pub fn coords_equal(a: &Point2<f64>, b: &Point2<f64>) -> bool {
    is_near(a.x, b.x) && is_near(a.y, b.y)
}

/// Point as exchanged with the external document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point3D {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Equality within [`EPS`] on all three axes.
    #[inline]
    pub fn approx_eq(&self, other: &Point3D) -> bool {
        is_near(self.x, other.x) && is_near(self.y, other.y) && is_near(self.z, other.z)
    }

    /// Projection onto the plan.
    #[inline]
    pub fn to_coord(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn from_coord(coord: &Point2<f64>, z: f64) -> Self {
        Self::new(coord.x, coord.y, z)
    }
}
