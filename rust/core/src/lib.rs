// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIMSync Core
//!
//! Shared vocabulary for synchronizing building elements between an external
//! document and a CAD host model.
//!
//! ## Overview
//!
//! - **Identifiers**: [`ExternalId`] for document-side ids, [`InternalId`] for
//!   host guids
//! - **Element types**: [`ElementType`] tags with their command and
//!   collection names
//! - **Descriptors**: [`Descriptor`], the read-only key/value tree describing
//!   one element
//! - **Results**: [`SynchronizationResult`] records reported per input item
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bimsync_core::{Descriptor, ElementType};
//! use serde_json::json;
//!
//! let wall = Descriptor::from_value(json!({ "id": "w1", "height": 3.0 }))?;
//! assert_eq!(wall.external_id().as_str(), "w1");
//! assert_eq!(ElementType::Wall.create_command(), "CreateWall");
//! ```

pub mod descriptor;
pub mod element_type;
pub mod error;
pub mod ids;
pub mod result;

pub use descriptor::{keys, Descriptor};
pub use element_type::ElementType;
pub use error::{Error, Result};
pub use ids::{ExternalId, InternalId};
pub use result::{SyncStatus, SynchronizationResult};
