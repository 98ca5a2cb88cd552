// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Declarative field tables and the generic descriptor <-> element mapping.
//!
//! Each element type declares which descriptor keys map onto which host
//! fields, which keys name attributes, and which keys carry shapes. The
//! generic [`apply`] and [`serialize`] cover everything a table can
//! express; per-type hooks in [`super::elements`] handle the rest.

use super::{BuildContext, BuiltElement, ExtractContext};
use crate::error::{BuildError, BuildResult};
use crate::host::{header, AttributeSpec, AttributeType, FieldValue, HostElement};
use crate::mask::FieldId;
use bimsync_core::{keys, Descriptor, ElementType};
use bimsync_geometry::{decode, encode, Color, ElementShape, MemoSlot, Point3D, PolygonMemo};
use serde::Deserialize;
use serde_json::{json, Value};

/// Descriptor key naming a library part.
pub const LIBRARY_PART_KEY: &str = "libraryPart";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Text,
    Point,
}

/// Scalar or point field copied verbatim.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub field: FieldId,
    pub kind: FieldKind,
}

/// Field holding a reference into an attribute table, given by name.
#[derive(Debug, Clone, Copy)]
pub struct AttributeFieldSpec {
    pub key: &'static str,
    pub field: FieldId,
    pub kind: AttributeType,
}

/// Shape stored in a memo slot.
#[derive(Debug, Clone, Copy)]
pub struct ShapeSpec {
    pub key: &'static str,
    pub slot: MemoSlot,
}

#[derive(Debug)]
pub struct ElementSchema {
    pub element_type: ElementType,
    pub fields: &'static [FieldSpec],
    pub attributes: &'static [AttributeFieldSpec],
    pub shapes: &'static [ShapeSpec],
    /// Keys that must be present when creating.
    pub required: &'static [&'static str],
    /// Field receiving the offset from the element's story.
    pub level_field: Option<FieldId>,
}

impl ElementSchema {
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }
}

pub const fn field(key: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        key,
        field: FieldId(key),
        kind,
    }
}

pub const fn attribute(key: &'static str, kind: AttributeType) -> AttributeFieldSpec {
    AttributeFieldSpec {
        key,
        field: FieldId(key),
        kind,
    }
}

pub const fn shape(key: &'static str, slot: MemoSlot) -> ShapeSpec {
    ShapeSpec { key, slot }
}

/// Attribute given either by name or, for surfaces, with its appearance.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AttributeRef {
    Name(String),
    Described {
        name: String,
        #[serde(default)]
        color: Option<Color>,
        #[serde(default)]
        transparency: Option<f64>,
    },
}

impl AttributeRef {
    fn into_spec(self, kind: AttributeType) -> AttributeSpec {
        match self {
            AttributeRef::Name(name) => AttributeSpec::named(kind, name),
            AttributeRef::Described {
                name,
                color,
                transparency,
            } => AttributeSpec {
                kind,
                name,
                color,
                transparency,
                shading: None,
            },
        }
    }
}

enum LevelRef {
    Elevation(f64),
    Floor(i64),
}

fn read_field(desc: &Descriptor, spec: &FieldSpec) -> BuildResult<Option<FieldValue>> {
    let value = match spec.kind {
        FieldKind::Bool => desc.get_bool(spec.key)?.map(FieldValue::Bool),
        FieldKind::Int => desc.get_i64(spec.key)?.map(FieldValue::Int),
        FieldKind::Float => desc.get_f64(spec.key)?.map(FieldValue::Float),
        FieldKind::Text => desc.get_str(spec.key)?.map(|s| FieldValue::Text(s.to_string())),
        FieldKind::Point => desc.get_as::<Point3D>(spec.key)?.map(FieldValue::Point),
    };
    Ok(value)
}

fn field_json(value: &FieldValue) -> Option<Value> {
    match value {
        FieldValue::Bool(v) => Some(json!(v)),
        FieldValue::Int(v) => Some(json!(v)),
        FieldValue::Float(v) => Some(json!(v)),
        FieldValue::Text(v) => Some(json!(v)),
        FieldValue::Point(p) => serde_json::to_value(p).ok(),
        _ => None,
    }
}

fn read_level(desc: &Descriptor) -> BuildResult<Option<LevelRef>> {
    match desc.get(keys::LEVEL) {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64().map(LevelRef::Elevation)),
        Some(Value::Object(_)) => {
            let level = desc.get_object(keys::LEVEL)?.unwrap_or_default();
            if let Some(z) = level.get_f64("elevation")? {
                Ok(Some(LevelRef::Elevation(z)))
            } else {
                Ok(level.get_i64("index")?.map(LevelRef::Floor))
            }
        }
        Some(other) => Err(bimsync_core::Error::field(
            keys::LEVEL,
            format!("expected number or object, got {}", other),
        )
        .into()),
    }
}

/// Apply the descriptor's table-driven fields onto `target`.
///
/// Only keys present in the descriptor are written and masked. On create,
/// every key in `schema.required` must be present.
pub fn apply(
    schema: &ElementSchema,
    desc: &Descriptor,
    ctx: &mut BuildContext<'_>,
    target: &mut BuiltElement,
) -> BuildResult<()> {
    if ctx.is_create {
        if let Some(missing) = schema.required.iter().copied().find(|key| !desc.contains(key)) {
            return Err(BuildError::MissingField(missing));
        }
    }

    apply_header(schema, desc, ctx, target)?;

    // Shapes first: their elevation is the fallback story reference.
    let mut fallback_elevation = None;
    for spec in schema.shapes {
        let Some(shape) = desc.get_as::<ElementShape>(spec.key)? else {
            continue;
        };
        fallback_elevation.get_or_insert(shape.level());
        target.memo.insert(spec.slot, encode(&shape, spec.slot)?);
        target.mask.set_memo(spec.slot);
    }

    let mut values = Vec::with_capacity(schema.fields.len());
    for spec in schema.fields {
        if let Some(value) = read_field(desc, spec)? {
            if let FieldValue::Point(p) = &value {
                fallback_elevation.get_or_insert(p.z);
            }
            values.push((spec.field, value));
        }
    }

    // Story placement goes before plain fields so an explicit offset wins.
    if ctx.parent.is_none() {
        apply_level(schema, desc, ctx, target, fallback_elevation)?;
    }
    for (field, value) in values {
        target.element.set(field, value);
        target.mask.set(field);
    }

    for spec in schema.attributes {
        let Some(reference) = desc.get_as::<AttributeRef>(spec.key)? else {
            continue;
        };
        let request = reference.into_spec(spec.kind);
        let resolved = if spec.kind.is_creatable() {
            ctx.caches.materials.resolve(&mut *ctx.host, &request)?
        } else {
            ctx.caches.materials.lookup(&*ctx.host, spec.kind, &request.name)?
        };
        match resolved {
            Some(index) => {
                target.element.set(spec.field, FieldValue::Attribute(spec.kind, index));
                target.mask.set(spec.field);
            }
            None => ctx.log.push(format!("{} '{}' not found, '{}' left unchanged", spec.kind, request.name, spec.key)),
        }
    }

    Ok(())
}

fn apply_header(
    schema: &ElementSchema,
    desc: &Descriptor,
    ctx: &mut BuildContext<'_>,
    target: &mut BuiltElement,
) -> BuildResult<()> {
    if let Some(parent) = ctx.parent {
        // Hosted elements live on their owner's story.
        let owner = ctx.host.get_element(parent)?;
        target.element.set(header::OWNER, FieldValue::Element(parent));
        target.element.set(header::FLOOR_INDEX, FieldValue::Int(owner.floor_index()));
        target.mask.set(header::OWNER);
        target.mask.set(header::FLOOR_INDEX);
    }

    if let Some(layer) = desc.get_str(keys::LAYER)? {
        match ctx.caches.materials.lookup(&*ctx.host, AttributeType::Layer, layer)? {
            Some(index) => {
                target.element.set(header::LAYER, FieldValue::Attribute(AttributeType::Layer, index));
                target.mask.set(header::LAYER);
            }
            None => ctx.log.push(format!("layer '{}' not found", layer)),
        }
    }

    if schema.element_type.is_library_part_placement() {
        if let Some(name) = desc.get_str(LIBRARY_PART_KEY)? {
            match ctx.caches.library_parts.lookup(&*ctx.host, name)? {
                Some(index) => {
                    target.element.set(header::LIBRARY_PART, FieldValue::LibraryPart(index));
                    target.mask.set(header::LIBRARY_PART);
                }
                None => ctx.log.push(format!("library part '{}' not found", name)),
            }
        }
    }

    Ok(())
}

fn apply_level(
    schema: &ElementSchema,
    desc: &Descriptor,
    ctx: &mut BuildContext<'_>,
    target: &mut BuiltElement,
    fallback_elevation: Option<f64>,
) -> BuildResult<()> {
    let reference = read_level(desc)?.or(fallback_elevation.map(LevelRef::Elevation));
    match reference {
        Some(LevelRef::Elevation(z)) => {
            let (floor, offset) = ctx.stories.floor_for_elevation(z);
            target.element.set(header::FLOOR_INDEX, FieldValue::Int(floor));
            target.mask.set(header::FLOOR_INDEX);
            if let Some(field) = schema.level_field {
                target.element.set(field, FieldValue::Float(offset));
                target.mask.set(field);
            }
        }
        Some(LevelRef::Floor(floor)) => {
            if ctx.stories.get(floor).is_none() && !ctx.stories.is_empty() {
                ctx.log.push(format!("story {} not found", floor));
            }
            target.element.set(header::FLOOR_INDEX, FieldValue::Int(floor));
            target.mask.set(header::FLOOR_INDEX);
        }
        None => {}
    }
    Ok(())
}

/// Absolute elevation of the element's reference plane.
pub fn element_elevation(schema: &ElementSchema, element: &HostElement, ctx: &ExtractContext<'_>) -> f64 {
    let offset = schema
        .level_field
        .and_then(|f| element.get(f))
        .and_then(FieldValue::as_f64)
        .unwrap_or(0.0);
    ctx.stories.level_of(element.floor_index()) + offset
}

/// Write the table-driven part of `element` into `out`.
pub fn serialize(
    schema: &ElementSchema,
    element: &HostElement,
    memo: &PolygonMemo,
    ctx: &mut ExtractContext<'_>,
    out: &mut Descriptor,
) -> BuildResult<()> {
    out.insert(keys::APPLICATION_ID, element.guid.to_string());
    out.insert(keys::ELEMENT_TYPE, element.element_type.as_str());

    let floor = element.floor_index();
    let story = ctx.stories.get(floor);
    out.insert(
        keys::LEVEL,
        json!({
            "index": floor,
            "name": story.map_or("", |s| s.name.as_str()),
            "elevation": story.map_or(0.0, |s| s.level),
        }),
    );

    if let Some(FieldValue::Attribute(kind, index)) = element.get(header::LAYER) {
        if let Ok(name) = ctx.caches.materials.name_of(ctx.host, *kind, *index) {
            out.insert(keys::LAYER, name);
        }
    }
    if let Some(owner) = element.owner() {
        out.insert(keys::PARENT_ID, owner.to_string());
    }
    if let Some(FieldValue::LibraryPart(index)) = element.get(header::LIBRARY_PART) {
        if let Ok(name) = ctx.caches.library_parts.name_of(ctx.host, *index) {
            out.insert(LIBRARY_PART_KEY, name);
        }
    }

    for spec in schema.fields {
        if let Some(value) = element.get(spec.field).and_then(field_json) {
            out.insert(spec.key, value);
        }
    }

    for spec in schema.attributes {
        if let Some(FieldValue::Attribute(kind, index)) = element.get(spec.field) {
            match ctx.caches.materials.name_of(ctx.host, *kind, *index) {
                Ok(name) => out.insert(spec.key, name),
                Err(e) => tracing::debug!(key = spec.key, error = %e, "Attribute name unavailable"),
            }
        }
    }

    let elevation = element_elevation(schema, element, ctx);
    for spec in schema.shapes {
        if let Some(polygon) = memo.get(spec.slot) {
            let shape = decode(polygon, spec.slot, elevation)?;
            out.insert(spec.key, serde_json::to_value(&shape).map_err(bimsync_core::Error::from)?);
        }
    }

    Ok(())
}
