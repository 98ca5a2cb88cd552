// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Story lookup for absolute elevations.

use crate::host::Story;
use bimsync_geometry::EPS;

/// Host stories sorted by level.
#[derive(Debug, Clone, Default)]
pub struct StoryTable {
    stories: Vec<Story>,
}

impl StoryTable {
    pub fn new(mut stories: Vec<Story>) -> Self {
        stories.sort_by(|a, b| a.level.total_cmp(&b.level));
        Self { stories }
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn get(&self, index: i64) -> Option<&Story> {
        self.stories.iter().find(|s| s.index == index)
    }

    /// Absolute floor level of story `index`; 0 when unknown.
    pub fn level_of(&self, index: i64) -> f64 {
        self.get(index).map_or(0.0, |s| s.level)
    }

    /// Split an absolute elevation into (floor index, offset from that floor).
    ///
    /// Picks the highest story at or below `z`. Elevations under the lowest
    /// story belong to it with a negative offset.
    pub fn floor_for_elevation(&self, z: f64) -> (i64, f64) {
        let story = self
            .stories
            .iter()
            .rev()
            .find(|s| s.level <= z + EPS)
            .or_else(|| self.stories.first());
        match story {
            Some(s) => (s.index, z - s.level),
            None => (0, z),
        }
    }
}
