// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element type tags.
//!
//! Fast type dispatch using an enum instead of string comparison.

use crate::error::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Kinds of building elements that can be synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    // Structural elements
    Wall,
    Slab,
    Beam,
    Column,
    Roof,
    Shell,

    // Hosted elements
    Door,
    Window,
    Opening,

    // Spaces and annotation
    Zone,
    GridElement,

    // Generic objects
    Object,
}

impl ElementType {
    /// Every supported type, in command-table order.
    pub const ALL: [ElementType; 12] = [
        Self::Wall,
        Self::Slab,
        Self::Beam,
        Self::Column,
        Self::Roof,
        Self::Shell,
        Self::Door,
        Self::Window,
        Self::Opening,
        Self::Zone,
        Self::GridElement,
        Self::Object,
    ];

    /// Canonical type name as used in descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wall => "Wall",
            Self::Slab => "Slab",
            Self::Beam => "Beam",
            Self::Column => "Column",
            Self::Roof => "Roof",
            Self::Shell => "Shell",
            Self::Door => "Door",
            Self::Window => "Window",
            Self::Opening => "Opening",
            Self::Zone => "Zone",
            Self::GridElement => "GridElement",
            Self::Object => "Object",
        }
    }

    /// Key of the element list in command parameters and responses.
    pub fn collection_field(&self) -> &'static str {
        match self {
            Self::Wall => "walls",
            Self::Slab => "slabs",
            Self::Beam => "beams",
            Self::Column => "columns",
            Self::Roof => "roofs",
            Self::Shell => "shells",
            Self::Door => "doors",
            Self::Window => "windows",
            Self::Opening => "openings",
            Self::Zone => "zones",
            Self::GridElement => "gridElements",
            Self::Object => "objects",
        }
    }

    /// Name of the upsert command for this type, e.g. `CreateWall`.
    pub fn create_command(&self) -> String {
        format!("Create{}", self.as_str())
    }

    /// Name of the extraction command for this type, e.g. `GetWallData`.
    pub fn data_command(&self) -> String {
        format!("Get{}Data", self.as_str())
    }

    /// Types that live inside a parent element and need `parentApplicationId`.
    pub fn requires_parent(&self) -> bool {
        matches!(self, Self::Door | Self::Window)
    }

    /// Types that may optionally be placed in a parent element.
    pub fn accepts_parent(&self) -> bool {
        matches!(self, Self::Door | Self::Window | Self::Opening)
    }

    /// Types whose host record is a library-part placement.
    pub fn is_library_part_placement(&self) -> bool {
        matches!(self, Self::Door | Self::Window | Self::Object)
    }
}

impl FromStr for ElementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownElementType(s.to_string()))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ElementType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
