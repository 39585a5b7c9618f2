//! Identity-bearing sub-ranges of a profile.
//!
//! A segment is the half-open range `[start, end)` over a circular profile
//! of known total length. Its UUID survives boundary moves, merges, splits
//! and re-interpolation, so population edits can be replayed onto nuclei
//! whose profiles have different native lengths.

use crate::error::ProfileError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The smallest number of indices a segment can contain. Raising this makes
/// segment detection more robust at the cost of resolution.
pub const MIN_SEGMENT_SIZE: usize = 10;

/// Map an index on a profile of `old_length` to the equivalent index on a
/// profile of `new_length`, preserving the fractional position around the
/// ring. Rounds to nearest; this is the single rounding rule used for every
/// cross-length translation in the crate.
pub fn proportional_index(old_length: usize, old_index: usize, new_length: usize) -> usize {
    debug_assert!(old_length > 0 && new_length > 0);
    let fraction = old_index as f64 / old_length as f64;
    ((fraction * new_length as f64).round() as usize) % new_length
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileSegment {
    id: Uuid,
    start_index: usize,
    end_index: usize,
    total_length: usize,
    /// The two segments combined to form this one, if it was merged.
    /// Kept as merge-time snapshots; boundaries are recomputed
    /// proportionally on unmerge.
    merge_sources: Option<Box<(ProfileSegment, ProfileSegment)>>,
    /// Start-index lock used during interactive boundary drags.
    locked: bool,
}

impl ProfileSegment {
    pub fn new(
        start_index: usize,
        end_index: usize,
        total_length: usize,
        id: Uuid,
    ) -> Result<Self, ProfileError> {
        if start_index >= total_length || end_index >= total_length {
            return Err(ProfileError::SegmentUpdate(format!(
                "segment bounds {start_index}-{end_index} exceed profile length {total_length}"
            )));
        }
        let seg = ProfileSegment {
            id,
            start_index,
            end_index,
            total_length,
            merge_sources: None,
            locked: false,
        };
        if seg.length() < MIN_SEGMENT_SIZE {
            return Err(ProfileError::SegmentUpdate(format!(
                "segment {start_index}-{end_index} of {total_length} is shorter than the minimum ({MIN_SEGMENT_SIZE})"
            )));
        }
        Ok(seg)
    }

    pub fn with_random_id(
        start_index: usize,
        end_index: usize,
        total_length: usize,
    ) -> Result<Self, ProfileError> {
        Self::new(start_index, end_index, total_length, Uuid::new_v4())
    }

    /// A single segment spanning the entire profile.
    pub fn spanning(total_length: usize, id: Uuid) -> Result<Self, ProfileError> {
        Self::new(0, 0, total_length, id)
    }

    #[inline(always)]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline(always)]
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    #[inline(always)]
    pub fn end_index(&self) -> usize {
        self.end_index
    }

    #[inline(always)]
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Number of indices covered. A segment whose start equals its end
    /// spans the whole profile.
    pub fn length(&self) -> usize {
        if self.start_index == self.end_index {
            self.total_length
        } else {
            (self.end_index as isize - self.start_index as isize)
                .rem_euclid(self.total_length as isize) as usize
        }
    }

    /// True if the segment crosses the profile end back to index 0.
    pub fn wraps(&self) -> bool {
        self.end_index <= self.start_index
    }

    pub fn contains(&self, index: usize) -> bool {
        if index >= self.total_length {
            return false;
        }
        self.internal_distance(index) < self.length()
    }

    /// Distance from the segment start to the given index, walking forward
    /// around the ring.
    fn internal_distance(&self, index: usize) -> usize {
        (index as isize - self.start_index as isize).rem_euclid(self.total_length as isize) as usize
    }

    pub fn midpoint_index(&self) -> usize {
        (self.start_index + self.length() / 2) % self.total_length
    }

    /// The absolute index at fractional position `p` within the segment
    /// (0 at the start, 1 at the end).
    pub fn proportional_index(&self, p: f64) -> usize {
        debug_assert!((0.0..=1.0).contains(&p));
        let steps = (self.length() as f64 * p).round() as usize;
        (self.start_index + steps) % self.total_length
    }

    /// The fractional position of an absolute index within the segment.
    pub fn index_proportion(&self, index: usize) -> Result<f64, ProfileError> {
        if !self.contains(index) {
            return Err(ProfileError::SegmentUpdate(format!(
                "segment {self} does not contain index {index}"
            )));
        }
        Ok(self.internal_distance(index) as f64 / self.length() as f64)
    }

    /// A copy shifted by `offset` around the ring, id preserved. Merge
    /// sources shift with it.
    pub fn offset(&self, offset: isize) -> ProfileSegment {
        let total = self.total_length as isize;
        let mut seg = self.clone();
        seg.start_index = (self.start_index as isize + offset).rem_euclid(total) as usize;
        seg.end_index = (self.end_index as isize + offset).rem_euclid(total) as usize;
        if let Some(sources) = &self.merge_sources {
            seg.merge_sources = Some(Box::new((sources.0.offset(offset), sources.1.offset(offset))));
        }
        seg
    }

    pub fn has_merge_sources(&self) -> bool {
        self.merge_sources.is_some()
    }

    pub fn merge_sources(&self) -> Option<(&ProfileSegment, &ProfileSegment)> {
        self.merge_sources.as_ref().map(|b| (&b.0, &b.1))
    }

    /// Ids of the two source segments, if any. The persisted form of
    /// merge provenance.
    pub fn merge_source_ids(&self) -> Vec<Uuid> {
        match &self.merge_sources {
            Some(b) => vec![b.0.id, b.1.id],
            None => Vec::new(),
        }
    }

    /// True if this segment is, or was merged from, the given id.
    pub fn has_merge_source(&self, id: Uuid) -> bool {
        if self.id == id {
            return true;
        }
        match &self.merge_sources {
            Some(b) => b.0.has_merge_source(id) || b.1.has_merge_source(id),
            None => false,
        }
    }

    pub fn set_merge_sources(&mut self, first: ProfileSegment, second: ProfileSegment) {
        self.merge_sources = Some(Box::new((first, second)));
    }

    pub fn clear_merge_sources(&mut self) {
        self.merge_sources = None;
    }

    pub(crate) fn set_bounds(&mut self, start_index: usize, end_index: usize) {
        self.start_index = start_index;
        self.end_index = end_index;
    }

    pub(crate) fn set_total_length(&mut self, total_length: usize) {
        self.total_length = total_length;
    }
}

impl fmt::Display for ProfileSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} - {} of {}: {}",
            self.start_index, self.end_index, self.total_length, self.id
        )
    }
}
