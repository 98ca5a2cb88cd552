// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory host model.

use super::{
    header, AttributeIndex, AttributeSpec, AttributeType, ClassificationAssignment,
    ClassificationItem, ClassificationSystem, FieldValue, HostElement, HostModel, LibraryPartIndex,
    LibraryPartSpec, PropertyDefinition, PropertyFilter, PropertyKind, PropertyValue, Story,
};
use crate::error::{HostError, HostResult};
use crate::mask::ChangeMask;
use bimsync_core::{ElementType, InternalId};
use bimsync_geometry::PolygonMemo;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::Cell;
use uuid::Uuid;

/// Number of calls made to the primitives the caches guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get_or_create_attribute: usize,
    pub find_attribute: usize,
    pub find_library_part: usize,
    pub create_library_part: usize,
    pub classification_items: usize,
    pub property_definitions: usize,
    pub create_element: usize,
    pub modify_element: usize,
}

#[derive(Default)]
struct Counters {
    get_or_create_attribute: Cell<usize>,
    find_attribute: Cell<usize>,
    find_library_part: Cell<usize>,
    create_library_part: Cell<usize>,
    classification_items: Cell<usize>,
    property_definitions: Cell<usize>,
    create_element: Cell<usize>,
    modify_element: Cell<usize>,
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

struct StoredElement {
    element: HostElement,
    memo: PolygonMemo,
}

struct StoredAttribute {
    spec: AttributeSpec,
}

/// Host model kept entirely in memory.
#[derive(Default)]
pub struct MemoryHost {
    elements: FxHashMap<InternalId, StoredElement>,
    order: Vec<InternalId>,
    defaults: FxHashMap<ElementType, HostElement>,
    attributes: FxHashMap<AttributeType, Vec<StoredAttribute>>,
    library_parts: Vec<LibraryPartSpec>,
    systems: Vec<(ClassificationSystem, Vec<ClassificationItem>)>,
    assignments: FxHashMap<InternalId, Vec<ClassificationAssignment>>,
    property_definitions: Vec<PropertyDefinition>,
    property_values: FxHashMap<(InternalId, Uuid), serde_json::Value>,
    stories: Vec<Story>,
    open_transaction: Option<String>,
    committed: Vec<String>,
    refuse_context: bool,
    rejected_types: FxHashSet<ElementType>,
    rejected_items: FxHashSet<Uuid>,
    counters: Counters,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the primitive call counters.
    pub fn calls(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            get_or_create_attribute: c.get_or_create_attribute.get(),
            find_attribute: c.find_attribute.get(),
            find_library_part: c.find_library_part.get(),
            create_library_part: c.create_library_part.get(),
            classification_items: c.classification_items.get(),
            property_definitions: c.property_definitions.get(),
            create_element: c.create_element.get(),
            modify_element: c.modify_element.get(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Names of committed transactions, oldest first.
    pub fn committed_transactions(&self) -> &[String] {
        &self.committed
    }

    pub fn set_defaults(&mut self, defaults: HostElement) {
        self.defaults.insert(defaults.element_type, defaults);
    }

    pub fn add_story(&mut self, index: i64, name: &str, level: f64) {
        self.stories.push(Story {
            index,
            name: name.to_string(),
            level,
        });
        self.stories.sort_by(|a, b| a.level.total_cmp(&b.level));
    }

    pub fn add_attribute(&mut self, kind: AttributeType, name: &str) -> AttributeIndex {
        let table = self.attributes.entry(kind).or_default();
        table.push(StoredAttribute {
            spec: AttributeSpec::named(kind, name),
        });
        AttributeIndex(table.len() as u32)
    }

    pub fn attribute_spec(&self, kind: AttributeType, index: AttributeIndex) -> Option<&AttributeSpec> {
        self.attributes
            .get(&kind)
            .and_then(|t| t.get((index.0 as usize).checked_sub(1)?))
            .map(|a| &a.spec)
    }

    pub fn library_part_count(&self) -> usize {
        self.library_parts.len()
    }

    /// Register a library part that ships with the host.
    pub fn add_library_part(&mut self, name: &str) -> LibraryPartIndex {
        self.library_parts.push(LibraryPartSpec {
            name: name.to_string(),
            fingerprint: String::new(),
            model: Default::default(),
        });
        LibraryPartIndex(self.library_parts.len() as u32)
    }

    pub fn add_classification_system(&mut self, name: &str, items: Vec<ClassificationItem>) -> Uuid {
        let guid = Uuid::new_v4();
        self.systems.push((
            ClassificationSystem {
                guid,
                name: name.to_string(),
            },
            items,
        ));
        guid
    }

    pub fn add_property_definition(&mut self, name: &str, group: &str, kind: PropertyKind) -> Uuid {
        self.add_property_definition_with_guid(Uuid::new_v4(), name, group, kind)
    }

    pub fn add_property_definition_with_guid(
        &mut self,
        guid: Uuid,
        name: &str,
        group: &str,
        kind: PropertyKind,
    ) -> Uuid {
        self.property_definitions.push(PropertyDefinition {
            guid,
            name: name.to_string(),
            group: group.to_string(),
            kind,
        });
        guid
    }

    pub fn set_property_value(&mut self, guid: InternalId, definition: Uuid, value: serde_json::Value) {
        self.property_values.insert((guid, definition), value);
    }

    /// Make the next `begin_transaction` fail as if the editing context
    /// could not be entered.
    pub fn refuse_context(&mut self, refuse: bool) {
        self.refuse_context = refuse;
    }

    /// Reject create and modify calls for one element type.
    pub fn reject_writes_for(&mut self, element_type: ElementType) {
        self.rejected_types.insert(element_type);
    }

    /// Reject assigning one classification item to any element.
    pub fn reject_classification(&mut self, item: Uuid) {
        self.rejected_items.insert(item);
    }

    /// Insert an element directly, bypassing transactions.
    pub fn insert_element(&mut self, mut element: HostElement, memo: PolygonMemo) -> InternalId {
        if element.guid.is_nil() {
            element.guid = InternalId::new_v4();
        }
        let guid = element.guid;
        if self.elements.insert(guid, StoredElement { element, memo }).is_none() {
            self.order.push(guid);
        }
        guid
    }

    pub fn remove_element(&mut self, guid: InternalId) -> bool {
        self.order.retain(|g| *g != guid);
        self.assignments.remove(&guid);
        self.elements.remove(&guid).is_some()
    }

    fn stored(&self, guid: InternalId) -> HostResult<&StoredElement> {
        self.elements.get(&guid).ok_or(HostError::ElementNotFound(guid))
    }

    fn check_writable(&self, element_type: ElementType) -> HostResult<()> {
        if self.open_transaction.is_none() {
            return Err(HostError::NoTransaction);
        }
        if self.rejected_types.contains(&element_type) {
            return Err(HostError::Rejected(format!("{} is locked", element_type)));
        }
        Ok(())
    }

    fn find_item(&self, item: Uuid) -> Option<Uuid> {
        fn contains(items: &[ClassificationItem], item: Uuid) -> bool {
            items
                .iter()
                .any(|i| i.guid == item || contains(&i.children, item))
        }
        self.systems
            .iter()
            .find(|(_, items)| contains(items, item))
            .map(|(system, _)| system.guid)
    }
}

impl HostModel for MemoryHost {
    fn begin_transaction(&mut self, name: &str) -> HostResult<()> {
        if self.refuse_context {
            return Err(HostError::Context("floor plan is not available".into()));
        }
        if let Some(open) = &self.open_transaction {
            return Err(HostError::Rejected(format!("transaction '{}' already open", open)));
        }
        self.open_transaction = Some(name.to_string());
        Ok(())
    }

    fn commit_transaction(&mut self) -> HostResult<()> {
        let name = self.open_transaction.take().ok_or(HostError::NoTransaction)?;
        self.committed.push(name);
        Ok(())
    }

    fn element_type(&self, guid: InternalId) -> HostResult<ElementType> {
        self.stored(guid).map(|s| s.element.element_type)
    }

    fn get_element(&self, guid: InternalId) -> HostResult<HostElement> {
        self.stored(guid).map(|s| s.element.clone())
    }

    fn get_memo(&self, guid: InternalId) -> HostResult<PolygonMemo> {
        self.stored(guid).map(|s| s.memo.clone())
    }

    fn get_defaults(&self, element_type: ElementType) -> HostResult<HostElement> {
        Ok(self.defaults.get(&element_type).cloned().unwrap_or_else(|| {
            let mut element = HostElement::new(element_type);
            element.set(header::FLOOR_INDEX, FieldValue::Int(0));
            element
        }))
    }

    fn create_element(&mut self, element: &HostElement, memo: &PolygonMemo) -> HostResult<InternalId> {
        bump(&self.counters.create_element);
        self.check_writable(element.element_type)?;
        let mut element = element.clone();
        if element.guid.is_nil() || self.elements.contains_key(&element.guid) {
            element.guid = InternalId::new_v4();
        }
        Ok(self.insert_element(element, memo.clone()))
    }

    fn modify_element(
        &mut self,
        element: &HostElement,
        mask: &ChangeMask,
        memo: &PolygonMemo,
    ) -> HostResult<()> {
        bump(&self.counters.modify_element);
        self.check_writable(element.element_type)?;
        let stored = self
            .elements
            .get_mut(&element.guid)
            .ok_or(HostError::ElementNotFound(element.guid))?;
        if stored.element.element_type != element.element_type {
            return Err(HostError::TypeMismatch {
                guid: element.guid,
                expected: stored.element.element_type,
                actual: element.element_type,
            });
        }
        for field in mask.fields() {
            match element.get(field) {
                Some(value) => stored.element.set(field, value.clone()),
                None => {
                    stored.element.remove(field);
                }
            }
        }
        for slot in mask.memo_slots() {
            match memo.get(slot) {
                Some(polygon) => {
                    stored.memo.insert(slot, polygon.clone());
                }
                None => {
                    stored.memo.remove(slot);
                }
            }
        }
        Ok(())
    }

    fn elements_of_type(&self, element_type: ElementType) -> Vec<InternalId> {
        self.order
            .iter()
            .filter(|g| {
                self.elements
                    .get(g)
                    .map_or(false, |s| s.element.element_type == element_type)
            })
            .copied()
            .collect()
    }

    fn hosted_elements(&self, owner: InternalId) -> HostResult<Vec<InternalId>> {
        self.stored(owner)?;
        Ok(self
            .order
            .iter()
            .filter(|g| {
                self.elements
                    .get(g)
                    .map_or(false, |s| s.element.owner() == Some(owner))
            })
            .copied()
            .collect())
    }

    fn find_attribute(&self, kind: AttributeType, name: &str) -> HostResult<Option<AttributeIndex>> {
        bump(&self.counters.find_attribute);
        Ok(self.attributes.get(&kind).and_then(|table| {
            table
                .iter()
                .position(|a| a.spec.name == name)
                .map(|i| AttributeIndex(i as u32 + 1))
        }))
    }

    fn get_or_create_attribute(&mut self, spec: &AttributeSpec) -> HostResult<AttributeIndex> {
        bump(&self.counters.get_or_create_attribute);
        let table = self.attributes.entry(spec.kind).or_default();
        if let Some(i) = table.iter().position(|a| a.spec.name == spec.name) {
            return Ok(AttributeIndex(i as u32 + 1));
        }
        if !spec.kind.is_creatable() {
            return Err(HostError::ResourceNotFound {
                kind: spec.kind.as_str(),
                name: spec.name.clone(),
            });
        }
        table.push(StoredAttribute { spec: spec.clone() });
        Ok(AttributeIndex(table.len() as u32))
    }

    fn attribute_name(&self, kind: AttributeType, index: AttributeIndex) -> HostResult<String> {
        self.attribute_spec(kind, index)
            .map(|s| s.name.clone())
            .ok_or_else(|| HostError::ResourceNotFound {
                kind: kind.as_str(),
                name: format!("#{}", index.0),
            })
    }

    fn find_library_part(&self, name: &str) -> HostResult<Option<LibraryPartIndex>> {
        bump(&self.counters.find_library_part);
        Ok(self
            .library_parts
            .iter()
            .position(|p| p.name == name)
            .map(|i| LibraryPartIndex(i as u32 + 1)))
    }

    fn create_library_part(&mut self, spec: &LibraryPartSpec) -> HostResult<LibraryPartIndex> {
        bump(&self.counters.create_library_part);
        if self.open_transaction.is_none() {
            return Err(HostError::NoTransaction);
        }
        self.library_parts.push(spec.clone());
        Ok(LibraryPartIndex(self.library_parts.len() as u32))
    }

    fn library_part_name(&self, index: LibraryPartIndex) -> HostResult<String> {
        (index.0 as usize)
            .checked_sub(1)
            .and_then(|i| self.library_parts.get(i))
            .map(|p| p.name.clone())
            .ok_or_else(|| HostError::ResourceNotFound {
                kind: "library part",
                name: format!("#{}", index.0),
            })
    }

    fn classification_systems(&self) -> HostResult<Vec<ClassificationSystem>> {
        Ok(self.systems.iter().map(|(s, _)| s.clone()).collect())
    }

    fn classification_items(&self, system: Uuid) -> HostResult<Vec<ClassificationItem>> {
        bump(&self.counters.classification_items);
        self.systems
            .iter()
            .find(|(s, _)| s.guid == system)
            .map(|(_, items)| items.clone())
            .ok_or_else(|| HostError::ResourceNotFound {
                kind: "classification system",
                name: system.to_string(),
            })
    }

    fn element_classifications(&self, guid: InternalId) -> HostResult<Vec<ClassificationAssignment>> {
        self.stored(guid)?;
        Ok(self.assignments.get(&guid).cloned().unwrap_or_default())
    }

    fn add_classification(&mut self, guid: InternalId, item: Uuid) -> HostResult<()> {
        self.stored(guid)?;
        let system = self.find_item(item).ok_or_else(|| HostError::ResourceNotFound {
            kind: "classification item",
            name: item.to_string(),
        })?;
        if self.rejected_items.contains(&item) {
            return Err(HostError::Rejected(format!("classification item {} is locked", item)));
        }
        let assigned = self.assignments.entry(guid).or_default();
        // One item per system.
        assigned.retain(|a| a.system != system);
        assigned.push(ClassificationAssignment { system, item });
        Ok(())
    }

    fn remove_classification(&mut self, guid: InternalId, item: Uuid) -> HostResult<()> {
        self.stored(guid)?;
        if let Some(assigned) = self.assignments.get_mut(&guid) {
            assigned.retain(|a| a.item != item);
        }
        Ok(())
    }

    fn property_definitions(
        &self,
        guid: InternalId,
        filter: PropertyFilter,
    ) -> HostResult<Vec<PropertyDefinition>> {
        bump(&self.counters.property_definitions);
        self.stored(guid)?;
        Ok(self
            .property_definitions
            .iter()
            .filter(|d| match d.kind {
                PropertyKind::UserDefined => filter.user_defined,
                PropertyKind::BuiltIn => filter.built_in,
            })
            .cloned()
            .collect())
    }

    fn property_values(
        &self,
        guid: InternalId,
        definitions: &[PropertyDefinition],
    ) -> HostResult<Vec<PropertyValue>> {
        self.stored(guid)?;
        Ok(definitions
            .iter()
            .filter_map(|d| {
                self.property_values
                    .get(&(guid, d.guid))
                    .map(|value| PropertyValue {
                        definition: d.guid,
                        value: value.clone(),
                    })
            })
            .collect())
    }

    fn stories(&self) -> HostResult<Vec<Story>> {
        Ok(self.stories.clone())
    }
}
