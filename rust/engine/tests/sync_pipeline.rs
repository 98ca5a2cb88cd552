// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests of the upsert and extraction pipelines against the
//! in-memory host.

use approx::assert_relative_eq;
use bimsync_core::{Descriptor, ElementType, InternalId, SyncStatus};
use bimsync_engine::host::{ClassificationItem, FieldValue, PropertyKind};
use bimsync_engine::{ExportOptions, FieldId, HostModel, MemoryHost, SyncError, SyncSession};
use bimsync_geometry::{ElementShape, MemoSlot};
use serde_json::{json, Value};
use std::collections::BTreeSet;

fn desc(value: Value) -> Descriptor {
    Descriptor::from_value(value).unwrap()
}

fn wall(id: &str, x: f64) -> Descriptor {
    desc(json!({
        "id": id,
        "startPoint": { "x": x, "y": 0.0 },
        "endPoint": { "x": x + 5.0, "y": 0.0 },
        "height": 3.0,
        "thickness": 0.3,
    }))
}

fn square(x0: f64, y0: f64, size: f64, z: f64) -> Value {
    let p = |x: f64, y: f64| json!({ "x": x, "y": y, "z": z });
    json!({ "polylineSegments": [
        { "startPoint": p(x0, y0), "endPoint": p(x0 + size, y0) },
        { "startPoint": p(x0 + size, y0), "endPoint": p(x0 + size, y0 + size), "arcAngle": 0.5 },
        { "startPoint": p(x0 + size, y0 + size), "endPoint": p(x0, y0 + size) },
        { "startPoint": p(x0, y0 + size), "endPoint": p(x0, y0) }
    ]})
}

fn slab(id: &str, z: f64) -> Descriptor {
    desc(json!({
        "id": id,
        "thickness": 0.25,
        "shape": {
            "contourPolyline": square(0.0, 0.0, 10.0, z),
            "holePolylines": [square(2.0, 2.0, 1.0, z)],
        },
    }))
}

fn ids(results: &[bimsync_core::SynchronizationResult]) -> BTreeSet<InternalId> {
    results.iter().filter_map(|r| r.application_id).collect()
}

#[test]
fn test_second_run_updates_instead_of_duplicating() {
    let mut session = SyncSession::new(MemoryHost::new());
    let batch = vec![wall("w1", 0.0), wall("w2", 10.0)];

    let first = session.synchronize(ElementType::Wall, &batch).unwrap();
    assert_eq!(first.statuses(), vec![SyncStatus::Created, SyncStatus::Created]);

    let second = session.synchronize(ElementType::Wall, &batch).unwrap();
    assert_eq!(second.statuses(), vec![SyncStatus::Updated, SyncStatus::Updated]);
    assert_eq!(ids(&first.results), ids(&second.results));
    assert_eq!(session.host().element_count(), 2);
}

#[test]
fn test_partial_failure_keeps_going() {
    let mut session = SyncSession::new(MemoryHost::new());
    let batch = vec![wall("a", 0.0), wall("", 5.0), wall("c", 10.0)];

    let result = session.synchronize(ElementType::Wall, &batch).unwrap();
    assert_eq!(result.results.len(), 3);
    assert_eq!(
        result.statuses(),
        vec![SyncStatus::Created, SyncStatus::Failed, SyncStatus::Created]
    );
    assert!(!result.results[1].log.is_empty());
    assert!(result.results[1].application_id.is_none());
    assert_eq!(session.host().element_count(), 2);
}

#[test]
fn test_known_then_new_wall() {
    let mut session = SyncSession::new(MemoryHost::new());
    session.synchronize(ElementType::Wall, &[wall("known", 0.0)]).unwrap();

    let batch = session
        .synchronize(ElementType::Wall, &[wall("known", 0.0), wall("fresh", 8.0)])
        .unwrap();
    assert_eq!(batch.statuses(), vec![SyncStatus::Updated, SyncStatus::Created]);
    assert_eq!(batch.results[0].original_id.as_str(), "known");
    assert_eq!(batch.results[1].original_id.as_str(), "fresh");
}

#[test]
fn test_modify_leaves_unsupplied_fields() {
    let mut session = SyncSession::new(MemoryHost::new());
    let created = session.synchronize(ElementType::Wall, &[wall("w", 0.0)]).unwrap();
    let guid = created.results[0].application_id.unwrap();

    let change = desc(json!({ "id": "w", "height": 4.5 }));
    let updated = session.synchronize(ElementType::Wall, &[change]).unwrap();
    assert_eq!(updated.statuses(), vec![SyncStatus::Updated]);

    let stored = session.host().get_element(guid).unwrap();
    assert_eq!(stored.get(FieldId("height")), Some(&FieldValue::Float(4.5)));
    assert_eq!(stored.get(FieldId("thickness")), Some(&FieldValue::Float(0.3)));
}

#[test]
fn test_application_id_is_reused_on_create() {
    let mut session = SyncSession::new(MemoryHost::new());
    let wanted = "0D1C2B3A-4F5E-4D6C-8B7A-9F8E7D6C5B4A";
    let mut item = wall("w", 0.0);
    item.insert("applicationId", wanted);

    let batch = session.synchronize(ElementType::Wall, &[item]).unwrap();
    assert_eq!(batch.results[0].application_id, Some(wanted.parse().unwrap()));
}

#[test]
fn test_unconverted_id_with_taken_application_id_creates() {
    let mut session = SyncSession::new(MemoryHost::new());
    let first = session.synchronize(ElementType::Wall, &[wall("a", 0.0)]).unwrap();
    let taken = first.results[0].application_id.unwrap();

    let mut item = wall("b", 10.0);
    item.insert("applicationId", taken.to_string());
    let second = session.synchronize(ElementType::Wall, &[item]).unwrap();

    assert_eq!(second.statuses(), vec![SyncStatus::Created]);
    let created = second.results[0].application_id.unwrap();
    assert_ne!(created, taken);
    assert!(second.results[0].log.iter().any(|l| l.contains("already in use")));
    assert_eq!(session.host().elements_of_type(ElementType::Wall).len(), 2);

    let a = session.identity().get_state(&"a".into()).internal_id;
    let b = session.identity().get_state(&"b".into()).internal_id;
    assert_eq!(a, Some(taken));
    assert_eq!(b, Some(created));

    // "a" is still a wall starting at the origin.
    let stored = session.host().get_element(taken).unwrap();
    assert_eq!(
        stored.get(FieldId("startPoint")),
        Some(&FieldValue::Point(bimsync_geometry::Point3D::new(0.0, 0.0, 0.0)))
    );
}

#[test]
fn test_unconverted_id_with_taken_application_id_of_other_type_creates() {
    let mut session = SyncSession::new(MemoryHost::new());
    let slabs = session.synchronize(ElementType::Slab, &[slab("s", 0.0)]).unwrap();
    let slab_guid = slabs.results[0].application_id.unwrap();

    let mut item = wall("w", 0.0);
    item.insert("applicationId", slab_guid.to_string());
    let walls = session.synchronize(ElementType::Wall, &[item]).unwrap();

    assert_eq!(walls.statuses(), vec![SyncStatus::Created]);
    assert_eq!(session.host().element_type(slab_guid).unwrap(), ElementType::Slab);
}

#[test]
fn test_converted_id_keeps_mapped_guid_over_application_id() {
    let mut session = SyncSession::new(MemoryHost::new());
    let batch = session
        .synchronize(ElementType::Wall, &[wall("a", 0.0), wall("b", 10.0)])
        .unwrap();
    let a_guid = batch.results[0].application_id.unwrap();
    let b_guid = batch.results[1].application_id.unwrap();

    let mut pointing_at_b = wall("a", 0.0);
    pointing_at_b.insert("applicationId", b_guid.to_string());
    pointing_at_b.insert("height", 6.0);
    let mut pointing_at_nothing = wall("b", 10.0);
    pointing_at_nothing.insert("applicationId", InternalId::new_v4().to_string());

    let second = session
        .synchronize(ElementType::Wall, &[pointing_at_b, pointing_at_nothing])
        .unwrap();
    assert_eq!(second.statuses(), vec![SyncStatus::Updated, SyncStatus::Updated]);
    assert_eq!(second.results[0].application_id, Some(a_guid));
    assert_eq!(second.results[1].application_id, Some(b_guid));
    assert_eq!(session.host().elements_of_type(ElementType::Wall).len(), 2);

    let a = session.host().get_element(a_guid).unwrap();
    let b = session.host().get_element(b_guid).unwrap();
    assert_eq!(a.get(FieldId("height")), Some(&FieldValue::Float(6.0)));
    assert_eq!(b.get(FieldId("height")), Some(&FieldValue::Float(3.0)));
}

#[test]
fn test_surface_material_resolved_once_per_batch() {
    let mut session = SyncSession::new(MemoryHost::new());
    let batch: Vec<_> = (0..3)
        .map(|i| {
            let mut s = slab(&format!("s{}", i), 0.0);
            s.insert("topMat", json!({ "name": "Oak", "color": { "red": 0.5, "green": 0.3, "blue": 0.1 } }));
            s
        })
        .collect();

    let result = session.synchronize(ElementType::Slab, &batch).unwrap();
    assert_eq!(result.count(SyncStatus::Created), 3);
    assert_eq!(session.host().calls().get_or_create_attribute, 1);
}

#[test]
fn test_refused_context_aborts_before_any_item() {
    let mut host = MemoryHost::new();
    host.refuse_context(true);
    let mut session = SyncSession::new(host);

    let err = session
        .synchronize(ElementType::Wall, &[wall("w1", 0.0)])
        .unwrap_err();
    assert!(matches!(err, SyncError::Transaction { .. }));
    assert_eq!(session.host().element_count(), 0);
    assert_eq!(session.host().calls().create_element, 0);
    assert!(session.identity().is_empty());
}

#[test]
fn test_host_rejection_fails_only_that_item() {
    let mut host = MemoryHost::new();
    host.reject_writes_for(ElementType::Wall);
    let mut session = SyncSession::new(host);

    let batch = session
        .synchronize(ElementType::Wall, &[wall("w1", 0.0), wall("w2", 6.0)])
        .unwrap();
    assert_eq!(batch.count(SyncStatus::Failed), 2);
    assert!(batch.results[0].log.iter().any(|l| l.contains("rejected")));
    // The transaction still commits for undo purposes.
    assert_eq!(session.host().committed_transactions().len(), 1);
}

#[test]
fn test_type_change_fails_item() {
    let mut session = SyncSession::new(MemoryHost::new());
    session.synchronize(ElementType::Wall, &[wall("x", 0.0)]).unwrap();

    let batch = session.synchronize(ElementType::Slab, &[slab("x", 0.0)]).unwrap();
    assert_eq!(batch.statuses(), vec![SyncStatus::Failed]);
    assert!(batch.results[0].log.last().unwrap().contains("Wall"));
}

#[test]
fn test_hosted_elements_need_a_converted_parent() {
    let mut host = MemoryHost::new();
    host.add_library_part("Door 18");
    let mut session = SyncSession::new(host);
    let walls = session.synchronize(ElementType::Wall, &[wall("w", 0.0)]).unwrap();
    let wall_guid = walls.results[0].application_id.unwrap();
    session.synchronize(ElementType::Slab, &[slab("s", 0.0)]).unwrap();

    let doors = vec![
        desc(json!({ "id": "d1", "width": 0.9 })),
        desc(json!({ "id": "d2", "parentApplicationId": "nowhere" })),
        desc(json!({ "id": "d3", "parentApplicationId": "w", "libraryPart": "Door 18", "objLoc": 1.5 })),
        desc(json!({ "id": "d4", "parentApplicationId": "s" })),
    ];
    let batch = session.synchronize(ElementType::Door, &doors).unwrap();
    assert_eq!(
        batch.statuses(),
        vec![SyncStatus::Failed, SyncStatus::Failed, SyncStatus::Created, SyncStatus::Failed]
    );

    let door = session
        .host()
        .get_element(batch.results[2].application_id.unwrap())
        .unwrap();
    assert_eq!(door.owner(), Some(wall_guid));

    // Openings may stand alone.
    let opening = desc(json!({ "id": "o1", "shape": { "contourPolyline": square(0.0, 0.0, 1.0, 0.0) } }));
    let batch = session.synchronize(ElementType::Opening, &[opening]).unwrap();
    assert_eq!(batch.statuses(), vec![SyncStatus::Created]);
}

#[test]
fn test_missing_layer_is_logged_but_item_succeeds() {
    let mut session = SyncSession::new(MemoryHost::new());
    let mut item = wall("w", 0.0);
    item.insert("layer", "Structural - Bearing");

    let batch = session.synchronize(ElementType::Wall, &[item]).unwrap();
    assert_eq!(batch.statuses(), vec![SyncStatus::Created]);
    assert!(batch.results[0].log.iter().any(|l| l.contains("Structural - Bearing")));
}

#[test]
fn test_classifications_follow_the_descriptor() {
    let mut host = MemoryHost::new();
    let a = ClassificationItem::leaf("Ss_20", "Structural systems");
    let b = ClassificationItem::leaf("Ss_25", "Wall systems");
    let (a_id, b_id) = (a.guid, b.guid);
    host.add_classification_system("Uniclass", vec![a, b]);
    let mut session = SyncSession::new(host);

    let mut item = wall("w", 0.0);
    item.insert("classifications", json!([{ "system": "Uniclass", "code": "Ss_20" }]));
    let batch = session.synchronize(ElementType::Wall, &[item]).unwrap();
    let guid = batch.results[0].application_id.unwrap();
    let assigned: Vec<_> = session
        .host()
        .element_classifications(guid)
        .unwrap()
        .iter()
        .map(|c| c.item)
        .collect();
    assert_eq!(assigned, vec![a_id]);

    let mut item = wall("w", 0.0);
    item.insert(
        "classifications",
        json!([{ "system": "Uniclass", "code": "Ss_25" }, { "system": "Uniclass", "code": "Zz_99" }]),
    );
    let batch = session.synchronize(ElementType::Wall, &[item]).unwrap();
    assert_eq!(batch.statuses(), vec![SyncStatus::Updated]);
    assert!(batch.results[0].log.iter().any(|l| l.contains("Zz_99")));
    let assigned: Vec<_> = session
        .host()
        .element_classifications(guid)
        .unwrap()
        .iter()
        .map(|c| c.item)
        .collect();
    assert_eq!(assigned, vec![b_id]);
    assert_eq!(session.host().calls().classification_items, 1);
}

#[test]
fn test_failed_classification_import_restores_previous_assignments() {
    let mut host = MemoryHost::new();
    let structural = ClassificationItem::leaf("Ss_20", "Structural systems");
    let external = ClassificationItem::leaf("EF_25", "Walls");
    let locked = ClassificationItem::leaf("X1", "Locked");
    let (structural_id, locked_id) = (structural.guid, locked.guid);
    host.add_classification_system("Uniclass", vec![structural]);
    host.add_classification_system("OmniClass", vec![external]);
    host.add_classification_system("Custom", vec![locked]);
    let mut session = SyncSession::new(host);

    let mut item = wall("w", 0.0);
    item.insert("classifications", json!([{ "system": "Uniclass", "code": "Ss_20" }]));
    let batch = session.synchronize(ElementType::Wall, &[item]).unwrap();
    let guid = batch.results[0].application_id.unwrap();

    session.host_mut().reject_classification(locked_id);
    let mut item = wall("w", 0.0);
    item.insert(
        "classifications",
        json!([{ "system": "OmniClass", "code": "EF_25" }, { "system": "Custom", "code": "X1" }]),
    );
    let batch = session.synchronize(ElementType::Wall, &[item]).unwrap();

    // The element itself is still updated.
    assert_eq!(batch.statuses(), vec![SyncStatus::Updated]);
    assert!(batch.results[0]
        .log
        .iter()
        .any(|l| l.starts_with("classifications not imported")));
    let assigned: Vec<_> = session
        .host()
        .element_classifications(guid)
        .unwrap()
        .iter()
        .map(|c| c.item)
        .collect();
    assert_eq!(assigned, vec![structural_id]);
}

#[test]
fn test_extraction_silently_skips_unresolvable_ids() {
    let mut session = SyncSession::new(MemoryHost::new());
    let walls = session.synchronize(ElementType::Wall, &[wall("w", 0.0)]).unwrap();
    let slabs = session.synchronize(ElementType::Slab, &[slab("s", 0.0)]).unwrap();

    let ids = vec![
        walls.results[0].application_id.unwrap(),
        slabs.results[0].application_id.unwrap(),
        InternalId::new_v4(),
    ];
    let records = session.extract(ElementType::Wall, &ids, ExportOptions::default());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get_str("elementType").unwrap(), Some("Wall"));
    assert_eq!(records[0].get_f64("height").unwrap(), Some(3.0));
}

#[test]
fn test_extracted_shape_matches_synchronized_shape() {
    let mut host = MemoryHost::new();
    host.add_story(0, "Ground", 0.0);
    host.add_story(1, "First", 3.0);
    let mut session = SyncSession::new(host);

    let source = slab("s", 3.2);
    let batch = session.synchronize(ElementType::Slab, &[source.clone()]).unwrap();
    let guid = batch.results[0].application_id.unwrap();
    assert_eq!(session.host().get_element(guid).unwrap().floor_index(), 1);
    assert!(session.host().get_memo(guid).unwrap().contains(MemoSlot::Main));

    let records = session.extract(ElementType::Slab, &[guid], ExportOptions::default());
    let original: ElementShape = source.get_as("shape").unwrap().unwrap();
    let extracted: ElementShape = records[0].get_as("shape").unwrap().unwrap();

    assert_eq!(extracted.hole_polylines.len(), 1);
    for (a, b) in original.polylines().zip(extracted.polylines()) {
        assert_eq!(a.segments().len(), b.segments().len());
        for (sa, sb) in a.segments().iter().zip(b.segments()) {
            assert!(sa.start_point.approx_eq(&sb.start_point));
            assert!(sa.end_point.approx_eq(&sb.end_point));
            assert_relative_eq!(sa.arc_angle, sb.arc_angle);
        }
    }
    assert_eq!(records[0].get("level").unwrap()["name"], json!("First"));
}

#[test]
fn test_extraction_exports_properties_and_hosted_elements() {
    let mut host = MemoryHost::new();
    let fire = host.add_property_definition("Fire rating", "Pset_WallCommon", PropertyKind::UserDefined);
    let mut session = SyncSession::new(host);
    let walls = session.synchronize(ElementType::Wall, &[wall("w", 0.0)]).unwrap();
    let wall_guid = walls.results[0].application_id.unwrap();
    let doors = session
        .synchronize(
            ElementType::Door,
            &[desc(json!({ "id": "d", "parentApplicationId": "w" }))],
        )
        .unwrap();
    let door_guid = doors.results[0].application_id.unwrap();
    session.host_mut().set_property_value(wall_guid, fire, json!("EI60"));

    let options = ExportOptions {
        send_properties: true,
        send_listing_parameters: false,
    };
    let records = session.extract(ElementType::Wall, &[wall_guid], options);
    let record = &records[0];
    assert_eq!(
        record.get("elementProperties").unwrap(),
        &json!([{ "name": "Fire rating", "group": "Pset_WallCommon", "value": "EI60" }])
    );
    assert_eq!(record.get("elements").unwrap(), &json!([door_guid.to_string()]));

    let door = &session.extract(ElementType::Door, &[door_guid], ExportOptions::default())[0];
    assert_eq!(door.get_str("parentApplicationId").unwrap(), Some(wall_guid.to_string().as_str()));
}

#[test]
fn test_finish_transaction_keeps_identity() {
    let mut session = SyncSession::new(MemoryHost::new());
    let mut item = slab("s", 0.0);
    item.insert("topMat", "Concrete - Rough");
    session.synchronize(ElementType::Slab, &[item.clone()]).unwrap();
    assert!(!session.caches().is_empty());

    session.finish_transaction();
    assert!(session.caches().is_empty());
    assert_eq!(session.identity().len(), 1);

    let again = session.synchronize(ElementType::Slab, &[item]).unwrap();
    assert_eq!(again.statuses(), vec![SyncStatus::Updated]);
    // Cache was emptied, so the material is resolved against the host again.
    assert_eq!(session.host().calls().get_or_create_attribute, 2);

    session.reset_identity();
    assert!(session.identity().is_empty());
}
