// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host model boundary.
//!
//! The engine never talks to a CAD product directly. Everything it needs
//! from the host (element CRUD, attribute tables, library parts,
//! classification trees, property definitions, stories) goes through the
//! object-safe [`HostModel`] trait. [`MemoryHost`] is the in-process
//! implementation used by the server and the test suite.

pub mod memory;

use crate::error::HostResult;
use crate::mask::{ChangeMask, FieldId};
use bimsync_core::{ElementType, InternalId};
use bimsync_geometry::{Color, ModelGeometry, Point3D, PolygonMemo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub use memory::{CallCounts, MemoryHost};

/// Header fields every element carries.
pub mod header {
    use crate::mask::FieldId;

    pub const FLOOR_INDEX: FieldId = FieldId("floorIndex");
    pub const LAYER: FieldId = FieldId("layer");
    pub const OWNER: FieldId = FieldId("owner");
    pub const LIBRARY_PART: FieldId = FieldId("libraryPart");
}

/// Attribute tables of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeType {
    Layer,
    BuildingMaterial,
    Composite,
    Profile,
    /// Surface material; the only kind the engine may create.
    Surface,
    LineType,
    Fill,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Layer => "layer",
            AttributeType::BuildingMaterial => "building material",
            AttributeType::Composite => "composite",
            AttributeType::Profile => "profile",
            AttributeType::Surface => "surface",
            AttributeType::LineType => "line type",
            AttributeType::Fill => "fill",
        }
    }

    pub fn is_creatable(&self) -> bool {
        matches!(self, AttributeType::Surface)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index into one attribute table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeIndex(pub u32);

/// Request for a (possibly new) attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub kind: AttributeType,
    pub name: String,
    pub color: Option<Color>,
    pub transparency: Option<f64>,
    pub shading: Option<f64>,
}

impl AttributeSpec {
    pub fn named(kind: AttributeType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            color: None,
            transparency: None,
            shading: None,
        }
    }
}

/// Index of a loaded library part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryPartIndex(pub u32);

/// A custom 3D library part to register.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryPartSpec {
    pub name: String,
    pub fingerprint: String,
    pub model: ModelGeometry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationSystem {
    pub guid: Uuid,
    pub name: String,
}

/// Node of a classification tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationItem {
    pub guid: Uuid,
    pub code: String,
    pub name: String,
    pub children: Vec<ClassificationItem>,
}

impl ClassificationItem {
    pub fn leaf(code: &str, name: &str) -> Self {
        Self {
            guid: Uuid::new_v4(),
            code: code.to_string(),
            name: name.to_string(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ClassificationItem>) -> Self {
        self.children = children;
        self
    }
}

/// Item assigned to an element within one system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassificationAssignment {
    pub system: Uuid,
    pub item: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    UserDefined,
    BuiltIn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub guid: Uuid,
    pub name: String,
    pub group: String,
    pub kind: PropertyKind,
}

/// Which definition families a property query should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropertyFilter {
    pub user_defined: bool,
    pub built_in: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub definition: Uuid,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub index: i64,
    pub name: String,
    /// Absolute elevation of the story's floor.
    pub level: f64,
}

/// Typed value of one element field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Point(Point3D),
    Attribute(AttributeType, AttributeIndex),
    LibraryPart(LibraryPartIndex),
    Element(InternalId),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Full value of a host element.
#[derive(Debug, Clone, PartialEq)]
pub struct HostElement {
    /// Nil until the host assigns or accepts a guid.
    pub guid: InternalId,
    pub element_type: ElementType,
    pub fields: BTreeMap<FieldId, FieldValue>,
}

impl HostElement {
    pub fn new(element_type: ElementType) -> Self {
        Self {
            guid: InternalId::from_uuid(Uuid::nil()),
            element_type,
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: FieldId) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn set(&mut self, field: FieldId, value: FieldValue) {
        self.fields.insert(field, value);
    }

    pub fn remove(&mut self, field: FieldId) -> Option<FieldValue> {
        self.fields.remove(&field)
    }

    pub fn floor_index(&self) -> i64 {
        self.get(header::FLOOR_INDEX)
            .and_then(FieldValue::as_i64)
            .unwrap_or(0)
    }

    pub fn owner(&self) -> Option<InternalId> {
        match self.get(header::OWNER) {
            Some(FieldValue::Element(guid)) => Some(*guid),
            _ => None,
        }
    }
}

/// Synchronous CRUD and introspection API of the CAD host.
pub trait HostModel {
    // Transactions

    /// Enter the editing context and open an undoable command.
    fn begin_transaction(&mut self, name: &str) -> HostResult<()>;
    fn commit_transaction(&mut self) -> HostResult<()>;

    // Elements

    fn element_type(&self, guid: InternalId) -> HostResult<ElementType>;

    fn element_exists(&self, guid: InternalId) -> bool {
        self.element_type(guid).is_ok()
    }

    fn get_element(&self, guid: InternalId) -> HostResult<HostElement>;
    fn get_memo(&self, guid: InternalId) -> HostResult<PolygonMemo>;
    fn get_defaults(&self, element_type: ElementType) -> HostResult<HostElement>;

    /// Create an element. A non-nil `element.guid` is honored when free.
    fn create_element(&mut self, element: &HostElement, memo: &PolygonMemo) -> HostResult<InternalId>;

    /// Write the masked fields and memo slots of `element`.
    fn modify_element(
        &mut self,
        element: &HostElement,
        mask: &ChangeMask,
        memo: &PolygonMemo,
    ) -> HostResult<()>;

    fn elements_of_type(&self, element_type: ElementType) -> Vec<InternalId>;

    /// Elements placed in `owner` (doors and windows in walls, openings in roofs).
    fn hosted_elements(&self, owner: InternalId) -> HostResult<Vec<InternalId>>;

    // Attributes

    fn find_attribute(&self, kind: AttributeType, name: &str) -> HostResult<Option<AttributeIndex>>;
    fn get_or_create_attribute(&mut self, spec: &AttributeSpec) -> HostResult<AttributeIndex>;
    fn attribute_name(&self, kind: AttributeType, index: AttributeIndex) -> HostResult<String>;

    // Library parts

    fn find_library_part(&self, name: &str) -> HostResult<Option<LibraryPartIndex>>;
    fn create_library_part(&mut self, spec: &LibraryPartSpec) -> HostResult<LibraryPartIndex>;
    fn library_part_name(&self, index: LibraryPartIndex) -> HostResult<String>;

    // Classification

    fn classification_systems(&self) -> HostResult<Vec<ClassificationSystem>>;
    /// Root items of a system, children nested.
    fn classification_items(&self, system: Uuid) -> HostResult<Vec<ClassificationItem>>;
    fn element_classifications(&self, guid: InternalId) -> HostResult<Vec<ClassificationAssignment>>;
    fn add_classification(&mut self, guid: InternalId, item: Uuid) -> HostResult<()>;
    fn remove_classification(&mut self, guid: InternalId, item: Uuid) -> HostResult<()>;

    // Properties

    fn property_definitions(
        &self,
        guid: InternalId,
        filter: PropertyFilter,
    ) -> HostResult<Vec<PropertyDefinition>>;
    fn property_values(
        &self,
        guid: InternalId,
        definitions: &[PropertyDefinition],
    ) -> HostResult<Vec<PropertyValue>>;

    // Stories

    fn stories(&self) -> HostResult<Vec<Story>>;
}
