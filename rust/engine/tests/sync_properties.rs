// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for batch synchronization.

use bimsync_core::{Descriptor, ElementType, InternalId, SyncStatus};
use bimsync_engine::{HostModel, MemoryHost, SyncSession};
use proptest::prelude::*;
use serde_json::json;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone)]
struct WallItem {
    /// `None` stands for an empty external id.
    id: Option<u8>,
    x: f64,
    length: f64,
    height: f64,
}

impl WallItem {
    fn external_id(&self) -> String {
        self.id.map(|n| format!("w{}", n)).unwrap_or_default()
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor::from_value(json!({
            "id": self.external_id(),
            "startPoint": { "x": self.x, "y": 0.0 },
            "endPoint": { "x": self.x + self.length, "y": 0.0 },
            "height": self.height,
        }))
        .unwrap()
    }
}

// =============================================================================
// STRATEGIES
// =============================================================================

fn wall_strategy() -> impl Strategy<Value = WallItem> {
    (
        prop_oneof![1 => Just(None), 6 => (0u8..8).prop_map(Some)],
        -50.0f64..50.0,
        0.5f64..20.0,
        2.0f64..6.0,
    )
        .prop_map(|(id, x, length, height)| WallItem { id, x, length, height })
}

fn batch_strategy() -> impl Strategy<Value = Vec<WallItem>> {
    prop::collection::vec(wall_strategy(), 0..12)
}

fn descriptors(items: &[WallItem]) -> Vec<Descriptor> {
    items.iter().map(WallItem::descriptor).collect()
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    /// Running a batch twice updates every item that succeeded and creates nothing new.
    #[test]
    fn second_run_updates_without_duplicating(items in batch_strategy()) {
        let mut session = SyncSession::new(MemoryHost::new());
        let batch = descriptors(&items);

        let first = session.synchronize(ElementType::Wall, &batch).unwrap();
        let walls_after_first = session.host().elements_of_type(ElementType::Wall).len();
        let second = session.synchronize(ElementType::Wall, &batch).unwrap();

        prop_assert_eq!(first.results.len(), items.len());
        prop_assert_eq!(second.results.len(), items.len());
        for ((a, b), item) in first.results.iter().zip(&second.results).zip(&items) {
            if a.status.is_success() {
                prop_assert_eq!(b.status, SyncStatus::Updated);
                prop_assert_eq!(a.application_id, b.application_id);
            } else {
                prop_assert!(item.id.is_none());
                prop_assert_eq!(b.status, SyncStatus::Failed);
                prop_assert!(!b.log.is_empty());
            }
        }

        let first_ids: BTreeSet<InternalId> = first.results.iter().filter_map(|r| r.application_id).collect();
        let second_ids: BTreeSet<InternalId> = second.results.iter().filter_map(|r| r.application_id).collect();
        prop_assert_eq!(&first_ids, &second_ids);
        prop_assert_eq!(session.host().elements_of_type(ElementType::Wall).len(), walls_after_first);

        let distinct: HashSet<u8> = items.iter().filter_map(|i| i.id).collect();
        prop_assert_eq!(walls_after_first, distinct.len());
    }

    /// Each result is Updated exactly when its id was converted before it, and
    /// results come back in input order.
    #[test]
    fn status_follows_identity_map(earlier in batch_strategy(), later in batch_strategy()) {
        let mut session = SyncSession::new(MemoryHost::new());
        session.synchronize(ElementType::Wall, &descriptors(&earlier)).unwrap();
        let mut converted: HashSet<u8> = earlier.iter().filter_map(|i| i.id).collect();

        let batch = session.synchronize(ElementType::Wall, &descriptors(&later)).unwrap();
        prop_assert_eq!(batch.results.len(), later.len());
        for (result, item) in batch.results.iter().zip(&later) {
            let external_id = item.external_id();
            prop_assert_eq!(result.original_id.as_str(), external_id.as_str());
            let expected = match item.id {
                None => SyncStatus::Failed,
                Some(n) if converted.contains(&n) => SyncStatus::Updated,
                Some(n) => {
                    converted.insert(n);
                    SyncStatus::Created
                }
            };
            prop_assert_eq!(result.status, expected);
        }
    }
}
