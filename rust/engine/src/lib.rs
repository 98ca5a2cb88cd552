// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIMSync Engine
//!
//! Synchronizes externally described building elements into a CAD host
//! model and extracts them back.
//!
//! ## Overview
//!
//! - **Identity map**: external id to host guid, so a repeated run updates
//!   instead of duplicating
//! - **Upsert pipeline**: best-effort batch create/modify with one result
//!   per item
//! - **Extraction pipeline**: host elements back to descriptors
//! - **Resource caches**: materials, library parts, classification items and
//!   property definitions, resolved once per run
//! - **Host boundary**: the [`HostModel`] trait and the in-memory
//!   [`MemoryHost`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bimsync_core::{Descriptor, ElementType};
//! use bimsync_engine::{MemoryHost, SyncSession};
//! use serde_json::json;
//!
//! let mut session = SyncSession::new(MemoryHost::new());
//! let wall = Descriptor::from_value(json!({
//!     "id": "w1",
//!     "startPoint": { "x": 0.0, "y": 0.0 },
//!     "endPoint": { "x": 5.0, "y": 0.0 },
//! }))?;
//! let batch = session.synchronize(ElementType::Wall, &[wall])?;
//! session.finish_transaction();
//! ```

pub mod builder;
pub mod cache;
pub mod command;
pub mod error;
pub mod extract;
pub mod host;
pub mod identity;
pub mod mask;
pub mod session;
pub mod story;
pub mod upsert;

pub use builder::{BuilderRegistry, ElementBuilder, ElementSchema};
pub use cache::ResourceCaches;
pub use command::{execute, Command, CommandRequest};
pub use error::{BuildError, CommandError, HostError, HostResult, SyncError};
pub use extract::{ExportOptions, ExtractionPipeline};
pub use host::{HostElement, HostModel, MemoryHost};
pub use identity::{ConversionState, IdentityMap};
pub use mask::{ChangeMask, FieldId};
pub use session::{SessionOptions, SyncBatch, SyncSession};
pub use story::StoryTable;
pub use upsert::UpsertPipeline;
