// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! External element descriptors.
//!
//! A descriptor is a self-describing key/value tree produced by the external
//! document. The engine only ever reads it; typed accessors return `None`
//! for absent or `null` keys and an [`Error::FieldType`] when the key is
//! present with the wrong shape.

use crate::error::{Error, Result};
use crate::ids::{ExternalId, InternalId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known descriptor keys shared by every element type.
pub mod keys {
    pub const ID: &str = "id";
    pub const APPLICATION_ID: &str = "applicationId";
    pub const PARENT_ID: &str = "parentApplicationId";
    pub const ELEMENT_TYPE: &str = "elementType";
    pub const LEVEL: &str = "level";
    pub const LAYER: &str = "layer";
    pub const SHAPE: &str = "shape";
    pub const CLASSIFICATIONS: &str = "classifications";
    pub const ELEMENT_PROPERTIES: &str = "elementProperties";
    pub const SUB_ELEMENTS: &str = "elements";
}

/// One element as supplied by the external document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(Map<String, Value>);

impl Descriptor {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(Error::NotAnObject),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Builder-style insert, mostly useful for tests and serializers.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Present and not `null`.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// The external id. Missing and blank ids are both reported as empty.
    pub fn external_id(&self) -> ExternalId {
        self.get(keys::ID)
            .and_then(Value::as_str)
            .map(ExternalId::new)
            .unwrap_or_else(|| ExternalId::new(""))
    }

    pub fn parent_id(&self) -> Option<ExternalId> {
        self.get(keys::PARENT_ID)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(ExternalId::new)
    }

    /// Caller-suggested internal id. Unparseable ids are treated as absent.
    pub fn application_id(&self) -> Option<InternalId> {
        self.get(keys::APPLICATION_ID)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(Error::field(key, format!("expected string, got {}", other))),
        }
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| Error::field(key, format!("expected number, got {}", v))),
        }
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| Error::field(key, format!("expected integer, got {}", v))),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| Error::field(key, format!("expected bool, got {}", v))),
        }
    }

    /// Nested descriptor, e.g. a sub-element or a classification record.
    pub fn get_object(&self, key: &str) -> Result<Option<Descriptor>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(Descriptor(map.clone()))),
            Some(other) => Err(Error::field(key, format!("expected object, got {}", other))),
        }
    }

    pub fn get_array(&self, key: &str) -> Result<Option<&Vec<Value>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(Error::field(key, format!("expected array, got {}", other))),
        }
    }

    /// Deserialize a field into a typed value.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => serde_json::from_value(v.clone())
                .map(Some)
                .map_err(|e| Error::field(key, e.to_string())),
        }
    }
}

impl From<Map<String, Value>> for Descriptor {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
