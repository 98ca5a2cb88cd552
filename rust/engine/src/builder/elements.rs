// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Field tables and hooks for every supported element type.

use super::schema::{self, attribute, field, shape, ElementSchema, FieldKind::*};
use super::{BuildContext, BuiltElement, ElementBuilder, ExtractContext};
use crate::error::{BuildError, BuildResult};
use crate::host::{header, AttributeSpec, AttributeType::*, FieldValue, HostElement};
use crate::mask::FieldId;
use bimsync_core::{keys, Descriptor, ElementType};
use bimsync_geometry::{decode, encode, ElementShape, MemoSlot, ModelGeometry, PolygonMemo};

pub const SHELL_CONTOURS: &str = "shellContours";
pub const SHELL_CONTOUR_POLY: &str = "shellContourPoly";
pub const MODEL: &str = "model";

const OFFSET: FieldId = FieldId("offset");

pub static WALL: ElementSchema = ElementSchema {
    element_type: ElementType::Wall,
    fields: &[
        field("startPoint", Point),
        field("endPoint", Point),
        field("arcAngle", Float),
        field("thickness", Float),
        field("height", Float),
        field("baseOffset", Float),
        field("topOffset", Float),
        field("flipped", Bool),
        field("structure", Text),
        field("referenceLineLocation", Text),
    ],
    attributes: &[
        attribute("buildingMaterialName", BuildingMaterial),
        attribute("compositeName", Composite),
        attribute("profileName", Profile),
        attribute("refMat", Surface),
        attribute("oppMat", Surface),
        attribute("sidMat", Surface),
    ],
    shapes: &[],
    required: &["startPoint", "endPoint"],
    level_field: Some(FieldId("baseOffset")),
};

pub static SLAB: ElementSchema = ElementSchema {
    element_type: ElementType::Slab,
    fields: &[
        field("thickness", Float),
        field("offset", Float),
        field("structure", Text),
        field("referencePlaneLocation", Text),
        field("edgeAngleType", Text),
        field("edgeAngle", Float),
    ],
    attributes: &[
        attribute("buildingMaterialName", BuildingMaterial),
        attribute("compositeName", Composite),
        attribute("topMat", Surface),
        attribute("sideMat", Surface),
        attribute("botMat", Surface),
    ],
    shapes: &[shape(keys::SHAPE, MemoSlot::Main)],
    required: &[keys::SHAPE],
    level_field: Some(OFFSET),
};

pub static BEAM: ElementSchema = ElementSchema {
    element_type: ElementType::Beam,
    fields: &[
        field("begC", Point),
        field("endC", Point),
        field("offset", Float),
        field("isSlanted", Bool),
        field("slantAngle", Float),
        field("curveAngle", Float),
        field("height", Float),
        field("width", Float),
    ],
    attributes: &[attribute("buildingMaterialName", BuildingMaterial)],
    shapes: &[],
    required: &["begC", "endC"],
    level_field: Some(OFFSET),
};

pub static COLUMN: ElementSchema = ElementSchema {
    element_type: ElementType::Column,
    fields: &[
        field("origoPos", Point),
        field("height", Float),
        field("bottomOffset", Float),
        field("topOffset", Float),
        field("angle", Float),
    ],
    attributes: &[attribute("buildingMaterialName", BuildingMaterial)],
    shapes: &[],
    required: &["origoPos"],
    level_field: Some(FieldId("bottomOffset")),
};

pub static ROOF: ElementSchema = ElementSchema {
    element_type: ElementType::Roof,
    fields: &[
        field("roofClassName", Text),
        field("planeRoofAngle", Float),
        field("thickness", Float),
        field("offset", Float),
        field("begC", Point),
        field("endC", Point),
    ],
    attributes: &[
        attribute("buildingMaterialName", BuildingMaterial),
        attribute("compositeName", Composite),
    ],
    shapes: &[
        shape(keys::SHAPE, MemoSlot::Main),
        shape("pivotPolygon", MemoSlot::Additional),
    ],
    required: &[keys::SHAPE],
    level_field: Some(OFFSET),
};

pub static SHELL: ElementSchema = ElementSchema {
    element_type: ElementType::Shell,
    fields: &[
        field("shellClassName", Text),
        field("thickness", Float),
        field("offset", Float),
    ],
    attributes: &[
        attribute("buildingMaterialName", BuildingMaterial),
        attribute("compositeName", Composite),
    ],
    shapes: &[
        shape("shape1", MemoSlot::ShellPolygon1),
        shape("shape2", MemoSlot::ShellPolygon2),
    ],
    required: &[],
    level_field: Some(OFFSET),
};

const OPENING_FIELDS: &[schema::FieldSpec] = &[
    field("width", Float),
    field("height", Float),
    field("objLoc", Float),
    field("lower", Float),
    field("flipped", Bool),
];

pub static DOOR: ElementSchema = ElementSchema {
    element_type: ElementType::Door,
    fields: OPENING_FIELDS,
    attributes: &[attribute("buildingMaterial", BuildingMaterial)],
    shapes: &[],
    required: &[],
    level_field: None,
};

pub static WINDOW: ElementSchema = ElementSchema {
    element_type: ElementType::Window,
    fields: OPENING_FIELDS,
    attributes: &[attribute("buildingMaterial", BuildingMaterial)],
    shapes: &[],
    required: &[],
    level_field: None,
};

pub static OPENING: ElementSchema = ElementSchema {
    element_type: ElementType::Opening,
    fields: &[
        field("width", Float),
        field("height", Float),
        field("depth", Float),
        field("offset", Float),
    ],
    attributes: &[],
    shapes: &[shape(keys::SHAPE, MemoSlot::Main)],
    required: &[],
    level_field: Some(OFFSET),
};

pub static ZONE: ElementSchema = ElementSchema {
    element_type: ElementType::Zone,
    fields: &[
        field("name", Text),
        field("number", Text),
        field("height", Float),
        field("offset", Float),
        field("basePoint", Point),
    ],
    attributes: &[],
    shapes: &[shape(keys::SHAPE, MemoSlot::Main)],
    required: &[keys::SHAPE],
    level_field: Some(OFFSET),
};

pub static GRID_ELEMENT: ElementSchema = ElementSchema {
    element_type: ElementType::GridElement,
    fields: &[
        field("begin", Point),
        field("end", Point),
        field("angle", Float),
        field("markerText", Text),
        field("isArc", Bool),
        field("arcAngle", Float),
    ],
    attributes: &[],
    shapes: &[],
    required: &["begin", "end"],
    level_field: None,
};

pub static OBJECT: ElementSchema = ElementSchema {
    element_type: ElementType::Object,
    fields: &[field("pos", Point), field("angle", Float)],
    attributes: &[],
    shapes: &[],
    required: &["pos"],
    level_field: None,
};

/// One builder per supported type.
pub fn default_builders() -> [ElementBuilder; 12] {
    [
        ElementBuilder::new(&WALL)
            .with_build(build_wall)
            .with_serialize(list_wall_openings),
        ElementBuilder::new(&SLAB),
        ElementBuilder::new(&BEAM),
        ElementBuilder::new(&COLUMN),
        ElementBuilder::new(&ROOF)
            .with_build(build_roof)
            .with_serialize(list_openings),
        ElementBuilder::new(&SHELL)
            .with_build(build_shell)
            .with_serialize(serialize_shell),
        ElementBuilder::new(&DOOR).with_build(check_owner),
        ElementBuilder::new(&WINDOW).with_build(check_owner),
        ElementBuilder::new(&OPENING).with_build(check_owner),
        ElementBuilder::new(&ZONE),
        ElementBuilder::new(&GRID_ELEMENT),
        ElementBuilder::new(&OBJECT).with_build(build_object),
    ]
}

fn point_of(element: &HostElement, key: &'static str) -> Option<bimsync_geometry::Point3D> {
    match element.get(FieldId(key)) {
        Some(FieldValue::Point(p)) => Some(*p),
        _ => None,
    }
}

fn build_wall(_desc: &Descriptor, _ctx: &mut BuildContext<'_>, target: &mut BuiltElement) -> BuildResult<()> {
    if let (Some(start), Some(end)) = (point_of(&target.element, "startPoint"), point_of(&target.element, "endPoint")) {
        if bimsync_geometry::point::coords_equal(&start.to_coord(), &end.to_coord()) {
            return Err(BuildError::InvalidValue {
                key: "endPoint",
                reason: "wall has zero length".into(),
            });
        }
    }
    if let Some(FieldValue::Text(structure)) = target.element.get(FieldId("structure")) {
        if !matches!(structure.as_str(), "Basic" | "Composite" | "Profile") {
            return Err(BuildError::InvalidValue {
                key: "structure",
                reason: format!("unknown wall structure '{}'", structure),
            });
        }
    }
    Ok(())
}

fn build_roof(desc: &Descriptor, ctx: &mut BuildContext<'_>, _target: &mut BuiltElement) -> BuildResult<()> {
    if ctx.is_create && desc.get_str("roofClassName")? == Some("PolyRoof") && !desc.contains("pivotPolygon") {
        return Err(BuildError::MissingField("pivotPolygon"));
    }
    Ok(())
}

fn build_shell(desc: &Descriptor, ctx: &mut BuildContext<'_>, target: &mut BuiltElement) -> BuildResult<()> {
    if ctx.is_create && desc.get_str("shellClassName")? == Some("RuledShell") {
        if let Some(missing) = ["shape1", "shape2"].into_iter().find(|key| !desc.contains(key)) {
            return Err(BuildError::MissingField(missing));
        }
    }

    let Some(contours) = desc.get_array(SHELL_CONTOURS)? else {
        return Ok(());
    };
    for (i, entry) in contours.iter().enumerate() {
        let entry = Descriptor::from_value(entry.clone())?;
        let shape = entry
            .get_as::<ElementShape>(SHELL_CONTOUR_POLY)?
            .ok_or_else(|| BuildError::InvalidValue {
                key: SHELL_CONTOURS,
                reason: format!("entry {} has no {}", i, SHELL_CONTOUR_POLY),
            })?;
        let slot = MemoSlot::ShellContour(i as u32);
        target.memo.insert(slot, encode(&shape, slot)?);
        target.mask.set_memo(slot);
    }

    // Contours beyond the new list are dropped from the existing element.
    if !ctx.is_create {
        let existing = ctx.host.get_memo(target.element.guid)?;
        for slot in existing.slots() {
            if let MemoSlot::ShellContour(i) = slot {
                if i as usize >= contours.len() {
                    target.mask.set_memo(slot);
                }
            }
        }
    }
    Ok(())
}

fn serialize_shell(
    element: &HostElement,
    memo: &PolygonMemo,
    ctx: &mut ExtractContext<'_>,
    out: &mut Descriptor,
) -> BuildResult<()> {
    let elevation = schema::element_elevation(&SHELL, element, ctx);
    let mut contours = Vec::new();
    for slot in memo.slots() {
        if let (MemoSlot::ShellContour(_), Some(polygon)) = (slot, memo.get(slot)) {
            let shape = decode(polygon, slot, elevation)?;
            let shape = serde_json::to_value(&shape).map_err(bimsync_core::Error::from)?;
            contours.push(Descriptor::new().with(SHELL_CONTOUR_POLY, shape).into_value());
        }
    }
    if !contours.is_empty() {
        out.insert(SHELL_CONTOURS, contours);
    }
    list_openings(element, memo, ctx, out)
}

fn list_hosted(
    element: &HostElement,
    ctx: &ExtractContext<'_>,
    out: &mut Descriptor,
    types: &[ElementType],
) -> BuildResult<()> {
    let hosted: Vec<String> = ctx
        .host
        .hosted_elements(element.guid)?
        .into_iter()
        .filter(|guid| ctx.host.element_type(*guid).map_or(false, |t| types.contains(&t)))
        .map(|guid| guid.to_string())
        .collect();
    out.insert(keys::SUB_ELEMENTS, hosted);
    Ok(())
}

fn list_wall_openings(
    element: &HostElement,
    _memo: &PolygonMemo,
    ctx: &mut ExtractContext<'_>,
    out: &mut Descriptor,
) -> BuildResult<()> {
    list_hosted(element, ctx, out, &[ElementType::Door, ElementType::Window])
}

fn list_openings(
    element: &HostElement,
    _memo: &PolygonMemo,
    ctx: &mut ExtractContext<'_>,
    out: &mut Descriptor,
) -> BuildResult<()> {
    list_hosted(element, ctx, out, &[ElementType::Opening])
}

/// Hosted elements only go into owners that can carry them.
fn check_owner(_desc: &Descriptor, ctx: &mut BuildContext<'_>, target: &mut BuiltElement) -> BuildResult<()> {
    let Some(parent) = ctx.parent else {
        return Ok(());
    };
    let owner_type = ctx.host.element_type(parent)?;
    let element_type = target.element.element_type;
    let allowed: &[ElementType] = match element_type {
        ElementType::Door | ElementType::Window => &[ElementType::Wall],
        _ => &[ElementType::Wall, ElementType::Slab, ElementType::Roof, ElementType::Shell],
    };
    if !allowed.contains(&owner_type) {
        return Err(BuildError::InvalidValue {
            key: keys::PARENT_ID,
            reason: format!("a {} cannot host a {}", owner_type, element_type),
        });
    }
    Ok(())
}

/// Custom objects: register the supplied model as a library part.
fn build_object(desc: &Descriptor, ctx: &mut BuildContext<'_>, target: &mut BuiltElement) -> BuildResult<()> {
    let Some(model) = desc.get_as::<ModelGeometry>(MODEL)? else {
        return Ok(());
    };
    if model.is_empty() {
        return Err(BuildError::InvalidValue {
            key: MODEL,
            reason: "model has no polygons".into(),
        });
    }
    model.validate()?;

    for material in &model.materials {
        let spec = AttributeSpec {
            color: Some(material.ambient_color),
            transparency: Some(material.transparency),
            ..AttributeSpec::named(Surface, material.name.clone())
        };
        if ctx.caches.materials.resolve(&mut *ctx.host, &spec)?.is_none() {
            ctx.log.push(format!("surface '{}' could not be created", material.name));
        }
    }

    let base_name = desc.get_str("name")?.unwrap_or("Object");
    let index = ctx.caches.library_parts.resolve_model(&mut *ctx.host, base_name, &model)?;
    target.element.set(header::LIBRARY_PART, FieldValue::LibraryPart(index));
    target.mask.set(header::LIBRARY_PART);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResourceCaches;
    use crate::host::{HostModel, MemoryHost};
    use crate::story::StoryTable;
    use serde_json::json;

    fn build(
        builder: &ElementBuilder,
        host: &mut MemoryHost,
        caches: &mut ResourceCaches,
        desc: Descriptor,
    ) -> BuildResult<BuiltElement> {
        let stories = StoryTable::new(host.stories().unwrap());
        let mut target = BuiltElement::new(host.get_defaults(builder.element_type()).unwrap());
        let mut ctx = BuildContext {
            host,
            caches,
            stories: &stories,
            parent: None,
            is_create: true,
            log: Vec::new(),
        };
        builder.build(&desc, &mut ctx, &mut target)?;
        Ok(target)
    }

    fn square(z: f64) -> serde_json::Value {
        json!({
            "contourPolyline": { "polylineSegments": [
                { "startPoint": { "x": 0.0, "y": 0.0, "z": z }, "endPoint": { "x": 4.0, "y": 0.0, "z": z } },
                { "startPoint": { "x": 4.0, "y": 0.0, "z": z }, "endPoint": { "x": 4.0, "y": 4.0, "z": z } },
                { "startPoint": { "x": 4.0, "y": 4.0, "z": z }, "endPoint": { "x": 0.0, "y": 0.0, "z": z } }
            ]}
        })
    }

    #[test]
    fn test_wall_fields_and_story_offset() {
        let mut host = MemoryHost::new();
        host.add_story(0, "Ground", 0.0);
        host.add_story(1, "First", 3.0);
        let mut caches = ResourceCaches::new();
        let desc = Descriptor::new()
            .with("startPoint", json!({ "x": 0.0, "y": 0.0, "z": 3.5 }))
            .with("endPoint", json!({ "x": 5.0, "y": 0.0, "z": 3.5 }))
            .with("height", 2.7)
            .with("structure", "Basic");
        let built = build(&default_builders()[0], &mut host, &mut caches, desc).unwrap();

        assert_eq!(built.element.floor_index(), 1);
        let offset = built.element.get(FieldId("baseOffset")).and_then(FieldValue::as_f64).unwrap();
        approx::assert_relative_eq!(offset, 0.5);
        assert!(built.mask.contains(FieldId("height")));
        assert!(!built.mask.contains(FieldId("thickness")));
    }

    #[test]
    fn test_wall_requires_endpoints_on_create() {
        let mut host = MemoryHost::new();
        let mut caches = ResourceCaches::new();
        let desc = Descriptor::new().with("startPoint", json!({ "x": 0.0, "y": 0.0 }));
        let err = build(&default_builders()[0], &mut host, &mut caches, desc).unwrap_err();
        assert!(matches!(err, BuildError::MissingField("endPoint")));
    }

    #[test]
    fn test_zero_length_wall_rejected() {
        let mut host = MemoryHost::new();
        let mut caches = ResourceCaches::new();
        let desc = Descriptor::new()
            .with("startPoint", json!({ "x": 1.0, "y": 1.0 }))
            .with("endPoint", json!({ "x": 1.0, "y": 1.0 }));
        let err = build(&default_builders()[0], &mut host, &mut caches, desc).unwrap_err();
        assert!(matches!(err, BuildError::InvalidValue { key: "endPoint", .. }));
    }

    #[test]
    fn test_slab_shape_goes_to_main_slot() {
        let mut host = MemoryHost::new();
        let mut caches = ResourceCaches::new();
        let desc = Descriptor::new().with(keys::SHAPE, square(0.0)).with("thickness", 0.25);
        let built = build(&default_builders()[1], &mut host, &mut caches, desc).unwrap();
        assert!(built.mask.contains_memo(MemoSlot::Main));
        assert_eq!(built.memo.get(MemoSlot::Main).unwrap().subpoly_count(), 1);
    }

    #[test]
    fn test_missing_attribute_is_logged_not_failed() {
        let mut host = MemoryHost::new();
        let mut caches = ResourceCaches::new();
        let stories = StoryTable::default();
        let desc = Descriptor::new()
            .with(keys::SHAPE, square(0.0))
            .with("buildingMaterialName", "Unobtainium")
            .with("topMat", json!({ "name": "Oak", "color": { "red": 0.6, "green": 0.4, "blue": 0.2 } }));
        let builder = default_builders()[1];
        let mut target = BuiltElement::new(HostElement::new(ElementType::Slab));
        let mut ctx = BuildContext {
            host: &mut host,
            caches: &mut caches,
            stories: &stories,
            parent: None,
            is_create: true,
            log: Vec::new(),
        };
        builder.build(&desc, &mut ctx, &mut target).unwrap();
        assert_eq!(ctx.log.len(), 1);
        assert!(ctx.log[0].contains("Unobtainium"));
        assert!(target.mask.contains(FieldId("topMat")));
        assert!(!target.mask.contains(FieldId("buildingMaterialName")));
    }

    #[test]
    fn test_shell_contours_fill_numbered_slots() {
        let mut host = MemoryHost::new();
        let mut caches = ResourceCaches::new();
        let desc = Descriptor::new().with(
            SHELL_CONTOURS,
            json!([{ "shellContourPoly": square(0.0) }, { "shellContourPoly": square(0.0) }]),
        );
        let built = build(&default_builders()[5], &mut host, &mut caches, desc).unwrap();
        assert!(built.memo.contains(MemoSlot::ShellContour(0)));
        assert!(built.memo.contains(MemoSlot::ShellContour(1)));
        assert!(built.memo.get(MemoSlot::ShellContour(1)).unwrap().body_flags.is_some());
    }

    #[test]
    fn test_object_model_registers_library_part_once() {
        let mut host = MemoryHost::new();
        host.begin_transaction("t").unwrap();
        let mut caches = ResourceCaches::new();
        let model = json!({
            "vertices": [{ "x": 0.0, "y": 0.0, "z": 0.0 }, { "x": 1.0, "y": 0.0, "z": 0.0 }, { "x": 0.0, "y": 1.0, "z": 0.0 }],
            "polygons": [{ "pointIds": [0, 1, 2], "material": "Steel" }],
            "materials": [{ "name": "Steel", "transparency": 0.0 }]
        });
        let desc = Descriptor::new()
            .with("pos", json!({ "x": 0.0, "y": 0.0 }))
            .with(MODEL, model);
        let builder = default_builders()[11];
        let a = build(&builder, &mut host, &mut caches, desc.clone()).unwrap();
        let b = build(&builder, &mut host, &mut caches, desc).unwrap();
        assert_eq!(a.element.get(header::LIBRARY_PART), b.element.get(header::LIBRARY_PART));
        assert_eq!(host.calls().create_library_part, 1);
        assert_eq!(host.calls().get_or_create_attribute, 1);
    }
}
