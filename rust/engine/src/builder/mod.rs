// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-type element builders.
//!
//! A builder is a field table ([`ElementSchema`]) plus optional hooks for
//! whatever the table cannot express. Builders are looked up by element
//! type in a [`BuilderRegistry`].

pub mod elements;
pub mod schema;

pub use schema::{AttributeFieldSpec, ElementSchema, FieldKind, FieldSpec, ShapeSpec};

use crate::cache::ResourceCaches;
use crate::error::BuildResult;
use crate::host::{HostElement, HostModel};
use crate::mask::ChangeMask;
use crate::story::StoryTable;
use bimsync_core::{Descriptor, ElementType, InternalId};
use bimsync_geometry::PolygonMemo;
use rustc_hash::FxHashMap;

/// Everything a builder may touch while building one element.
pub struct BuildContext<'a> {
    pub host: &'a mut dyn HostModel,
    pub caches: &'a mut ResourceCaches,
    pub stories: &'a StoryTable,
    /// Resolved owner element, for hosted types.
    pub parent: Option<InternalId>,
    pub is_create: bool,
    /// Non-fatal notes, returned in the item's result.
    pub log: Vec<String>,
}

/// Read-only counterpart of [`BuildContext`] for extraction.
pub struct ExtractContext<'a> {
    pub host: &'a dyn HostModel,
    pub caches: &'a mut ResourceCaches,
    pub stories: &'a StoryTable,
}

/// Element value under construction, with what was actually supplied.
#[derive(Debug, Clone)]
pub struct BuiltElement {
    pub element: HostElement,
    pub mask: ChangeMask,
    pub memo: PolygonMemo,
}

impl BuiltElement {
    /// Start from `element`, usually host defaults or the existing value.
    pub fn new(element: HostElement) -> Self {
        Self {
            element,
            mask: ChangeMask::new(),
            memo: PolygonMemo::new(),
        }
    }
}

pub type BuildHook = fn(&Descriptor, &mut BuildContext<'_>, &mut BuiltElement) -> BuildResult<()>;

pub type SerializeHook = fn(
    &HostElement,
    &PolygonMemo,
    &mut ExtractContext<'_>,
    &mut Descriptor,
) -> BuildResult<()>;

#[derive(Clone, Copy)]
pub struct ElementBuilder {
    pub schema: &'static ElementSchema,
    pub build: Option<BuildHook>,
    pub serialize: Option<SerializeHook>,
}

impl std::fmt::Debug for ElementBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementBuilder")
            .field("element_type", &self.schema.element_type)
            .field("build", &self.build.is_some())
            .field("serialize", &self.serialize.is_some())
            .finish()
    }
}

impl ElementBuilder {
    pub const fn new(schema: &'static ElementSchema) -> Self {
        Self {
            schema,
            build: None,
            serialize: None,
        }
    }

    pub const fn with_build(mut self, hook: BuildHook) -> Self {
        self.build = Some(hook);
        self
    }

    pub const fn with_serialize(mut self, hook: SerializeHook) -> Self {
        self.serialize = Some(hook);
        self
    }

    pub fn element_type(&self) -> ElementType {
        self.schema.element_type
    }

    /// Fill `target` from `desc`: the field table first, then the hook.
    pub fn build(
        &self,
        desc: &Descriptor,
        ctx: &mut BuildContext<'_>,
        target: &mut BuiltElement,
    ) -> BuildResult<()> {
        schema::apply(self.schema, desc, ctx, target)?;
        if let Some(hook) = self.build {
            hook(desc, ctx, target)?;
        }
        Ok(())
    }

    pub fn serialize(
        &self,
        element: &HostElement,
        memo: &PolygonMemo,
        ctx: &mut ExtractContext<'_>,
    ) -> BuildResult<Descriptor> {
        let mut out = Descriptor::new();
        schema::serialize(self.schema, element, memo, ctx, &mut out)?;
        if let Some(hook) = self.serialize {
            hook(element, memo, ctx, &mut out)?;
        }
        Ok(out)
    }
}

/// Element type -> builder.
#[derive(Debug, Default)]
pub struct BuilderRegistry {
    builders: FxHashMap<ElementType, ElementBuilder>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a builder for every supported type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for builder in elements::default_builders() {
            registry.register(builder);
        }
        registry
    }

    /// Add or replace the builder for its element type.
    pub fn register(&mut self, builder: ElementBuilder) -> Option<ElementBuilder> {
        self.builders.insert(builder.element_type(), builder)
    }

    pub fn get(&self, element_type: ElementType) -> Option<&ElementBuilder> {
        self.builders.get(&element_type)
    }

    pub fn contains(&self, element_type: ElementType) -> bool {
        self.builders.contains_key(&element_type)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}
