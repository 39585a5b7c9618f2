//! A profile paired with a segment ring that tiles it exactly once.
//!
//! The ring invariant: segments sorted by start index cover
//! `[0, total_length)` with no gaps and no overlaps. Every mutating
//! operation either preserves the invariant or leaves the profile unchanged
//! and reports why. Segment neighbours are resolved by position in the
//! sorted ring rather than stored links, and are recomputed after every
//! structural change.

use crate::error::ProfileError;
use crate::profile::Profile;
use crate::segment::{proportional_index, ProfileSegment, MIN_SEGMENT_SIZE};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id of the placeholder segment spanning a profile that has not yet been
/// segmented.
pub const DEFAULT_SEGMENT_ID: Uuid = Uuid::nil();

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentedProfile {
    profile: Profile,
    /// Ring order: ascending start index.
    segments: Vec<ProfileSegment>,
}

impl SegmentedProfile {
    /// Wrap a plain profile in a single spanning segment.
    pub fn new(profile: Profile) -> Result<Self, ProfileError> {
        let span = ProfileSegment::spanning(profile.size(), DEFAULT_SEGMENT_ID)?;
        Ok(SegmentedProfile {
            profile,
            segments: vec![span],
        })
    }

    pub fn with_segments(
        profile: Profile,
        segments: Vec<ProfileSegment>,
    ) -> Result<Self, ProfileError> {
        let segments = validate_ring(segments, profile.size())?;
        Ok(SegmentedProfile { profile, segments })
    }

    #[inline(always)]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.profile.size()
    }

    /// Segments in ring order (ascending start index).
    #[inline(always)]
    pub fn segments(&self) -> &[ProfileSegment] {
        &self.segments
    }

    #[inline(always)]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment_ids(&self) -> Vec<Uuid> {
        self.segments.iter().map(|s| s.id()).collect()
    }

    pub fn has_segment(&self, id: Uuid) -> bool {
        self.segments.iter().any(|s| s.id() == id)
    }

    pub fn segment(&self, id: Uuid) -> Result<&ProfileSegment, ProfileError> {
        self.segments
            .iter()
            .find(|s| s.id() == id)
            .ok_or(ProfileError::MissingSegment(id))
    }

    fn segment_position(&self, id: Uuid) -> Result<usize, ProfileError> {
        self.segments
            .iter()
            .position(|s| s.id() == id)
            .ok_or(ProfileError::MissingSegment(id))
    }

    pub fn segment_containing(&self, index: usize) -> Result<&ProfileSegment, ProfileError> {
        self.segments
            .iter()
            .find(|s| s.contains(index))
            .ok_or_else(|| {
                ProfileError::SegmentUpdate(format!("index {index} is not in any segment"))
            })
    }

    /// |value(start) − value(end)| for the given segment.
    pub fn displacement(&self, id: Uuid) -> Result<f64, ProfileError> {
        let seg = self.segment(id)?;
        let start = self.profile.get(seg.start_index() as isize);
        let end = self.profile.get(seg.end_index() as isize);
        Ok((start - end).abs())
    }

    pub fn set_segment_locked(&mut self, id: Uuid, locked: bool) -> Result<(), ProfileError> {
        let pos = self.segment_position(id)?;
        self.segments[pos].set_locked(locked);
        Ok(())
    }

    /// Replace the whole ring. The incoming segments must come from a
    /// profile of the same length.
    pub fn set_segments(&mut self, segments: Vec<ProfileSegment>) -> Result<(), ProfileError> {
        self.segments = validate_ring(segments, self.profile.size())?;
        Ok(())
    }

    /// Move the boundaries of one segment. The previous segment absorbs a
    /// start move and the next segment absorbs an end move. Rejected when a
    /// resulting segment would drop below [`MIN_SEGMENT_SIZE`], when a
    /// locked segment's start would move, or when a boundary would jump
    /// into a non-adjacent segment.
    pub fn update(
        &mut self,
        id: Uuid,
        new_start: usize,
        new_end: usize,
    ) -> Result<(), ProfileError> {
        let total = self.profile.size();
        if new_start >= total || new_end >= total {
            return Err(ProfileError::SegmentUpdate(format!(
                "new bounds {new_start}-{new_end} are outside the profile (length {total})"
            )));
        }
        let pos = self.segment_position(id)?;
        let n = self.segments.len();
        if n == 1 {
            return Err(ProfileError::SegmentUpdate(
                "a single spanning segment has no movable boundaries".into(),
            ));
        }
        let cur = &self.segments[pos];
        let prev = &self.segments[(pos + n - 1) % n];
        let next = &self.segments[(pos + 1) % n];

        if cur.is_locked() && new_start != cur.start_index() {
            return Err(ProfileError::SegmentUpdate(format!(
                "segment {} start index is locked",
                cur.id()
            )));
        }
        if next.is_locked() && new_end != cur.end_index() {
            return Err(ProfileError::SegmentUpdate(format!(
                "next segment {} start index is locked",
                next.id()
            )));
        }

        // A boundary may only move within the segments it currently joins.
        if !cur.contains(new_start) && !prev.contains(new_start) {
            return Err(ProfileError::SegmentUpdate(format!(
                "new start {new_start} is in neither this segment nor the previous one"
            )));
        }
        if !cur.contains(new_end) && !next.contains(new_end) && new_end != next.start_index() {
            return Err(ProfileError::SegmentUpdate(format!(
                "new end {new_end} is in neither this segment nor the next one"
            )));
        }

        let ring_len = |from: usize, to: usize| -> usize {
            (to as isize - from as isize).rem_euclid(total as isize) as usize
        };
        let new_cur_len = ring_len(new_start, new_end);
        // With two segments the neighbour on both sides is the same
        // segment; its new length is everything the moved segment freed.
        let affected: Vec<(usize, Uuid)> = if n == 2 {
            vec![
                (new_cur_len, cur.id()),
                (total - new_cur_len, next.id()),
            ]
        } else {
            vec![
                (new_cur_len, cur.id()),
                (ring_len(prev.start_index(), new_start), prev.id()),
                (ring_len(new_end, next.end_index()), next.id()),
            ]
        };
        for &(len, seg_id) in &affected {
            if len < MIN_SEGMENT_SIZE {
                return Err(ProfileError::SegmentUpdate(format!(
                    "segment {seg_id} would shrink to {len}, below the minimum ({MIN_SEGMENT_SIZE})"
                )));
            }
        }

        let saved = self.segments.clone();
        let prev_pos = (pos + n - 1) % n;
        let next_pos = (pos + 1) % n;
        let prev_start = self.segments[prev_pos].start_index();
        let next_end = self.segments[next_pos].end_index();
        self.segments[pos].set_bounds(new_start, new_end);
        if n == 2 {
            self.segments[next_pos].set_bounds(new_end, new_start);
        } else {
            self.segments[prev_pos].set_bounds(prev_start, new_start);
            self.segments[next_pos].set_bounds(new_end, next_end);
        }
        match validate_ring(std::mem::take(&mut self.segments), total) {
            Ok(ring) => {
                self.segments = ring;
                Ok(())
            }
            Err(e) => {
                self.segments = saved;
                Err(e)
            }
        }
    }

    /// Merge two adjacent segments into one carrying both as provenance.
    pub fn merge_segments(
        &mut self,
        id_a: Uuid,
        id_b: Uuid,
        new_id: Uuid,
    ) -> Result<(), ProfileError> {
        if id_a == id_b {
            return Err(ProfileError::SegmentUpdate(
                "cannot merge a segment with itself".into(),
            ));
        }
        let a = self.segment(id_a)?.clone();
        let b = self.segment(id_b)?.clone();

        // Order the pair so `first` runs into `second` around the ring.
        let (first, second) = if a.end_index() == b.start_index() {
            (a, b)
        } else if b.end_index() == a.start_index() {
            (b, a)
        } else {
            return Err(ProfileError::SegmentUpdate(format!(
                "segments {id_a} and {id_b} are not adjacent"
            )));
        };
        if first.is_locked() || second.is_locked() {
            return Err(ProfileError::SegmentUpdate(
                "cannot merge a locked segment".into(),
            ));
        }

        let mut merged = ProfileSegment::new(
            first.start_index(),
            second.end_index(),
            self.profile.size(),
            new_id,
        )?;
        merged.set_merge_sources(first.clone(), second.clone());

        let saved = self.segments.clone();
        self.segments.retain(|s| s.id() != first.id() && s.id() != second.id());
        self.segments.push(merged);
        match validate_ring(std::mem::take(&mut self.segments), self.profile.size()) {
            Ok(ring) => {
                self.segments = ring;
                Ok(())
            }
            Err(e) => {
                self.segments = saved;
                Err(e)
            }
        }
    }

    pub fn is_splittable(&self, id: Uuid, index: usize) -> bool {
        match self.segment(id) {
            Ok(seg) => {
                if seg.has_merge_sources() || !seg.contains(index) {
                    return false;
                }
                let left = (index as isize - seg.start_index() as isize)
                    .rem_euclid(seg.total_length() as isize) as usize;
                let right = seg.length() - left;
                left >= MIN_SEGMENT_SIZE && right >= MIN_SEGMENT_SIZE
            }
            Err(_) => false,
        }
    }

    /// Split a segment at `index` into two new segments. A merged segment
    /// cannot be split directly; unmerge it instead.
    pub fn split_segment(
        &mut self,
        id: Uuid,
        index: usize,
        id_left: Uuid,
        id_right: Uuid,
    ) -> Result<(), ProfileError> {
        let seg = self.segment(id)?.clone();
        if seg.has_merge_sources() {
            return Err(ProfileError::SegmentUpdate(format!(
                "segment {id} was merged; unmerge it instead of splitting"
            )));
        }
        if !seg.contains(index) {
            return Err(ProfileError::SegmentUpdate(format!(
                "split index {index} is not within segment {id}"
            )));
        }
        let total = self.profile.size();
        let left = ProfileSegment::new(seg.start_index(), index, total, id_left)?;
        let right = ProfileSegment::new(index, seg.end_index(), total, id_right)?;

        let saved = self.segments.clone();
        let pos = self.segment_position(id)?;
        self.segments.remove(pos);
        self.segments.push(left);
        self.segments.push(right);
        match validate_ring(std::mem::take(&mut self.segments), total) {
            Ok(ring) => {
                self.segments = ring;
                Ok(())
            }
            Err(e) => {
                self.segments = saved;
                Err(e)
            }
        }
    }

    /// Restore the two merge sources of a merged segment. The internal
    /// boundary is recomputed from the sources' relative lengths at merge
    /// time, not their literal stored indices, so unmerge stays correct
    /// after the profile has been re-interpolated.
    pub fn unmerge_segment(&mut self, id: Uuid) -> Result<(), ProfileError> {
        let seg = self.segment(id)?.clone();
        let (src_a, src_b) = match seg.merge_sources() {
            Some(pair) => pair,
            None => {
                return Err(ProfileError::SegmentUpdate(format!(
                    "segment {id} has no merge sources to restore"
                )))
            }
        };
        let len_a = src_a.length() as f64;
        let len_b = src_b.length() as f64;
        let boundary = seg.proportional_index(len_a / (len_a + len_b));

        let total = self.profile.size();
        let mut left = ProfileSegment::new(seg.start_index(), boundary, total, src_a.id())?;
        let mut right = ProfileSegment::new(boundary, seg.end_index(), total, src_b.id())?;
        if let Some((a0, a1)) = src_a.merge_sources() {
            left.set_merge_sources(a0.clone(), a1.clone());
        }
        if let Some((b0, b1)) = src_b.merge_sources() {
            right.set_merge_sources(b0.clone(), b1.clone());
        }

        let saved = self.segments.clone();
        let pos = self.segment_position(id)?;
        self.segments.remove(pos);
        self.segments.push(left);
        self.segments.push(right);
        match validate_ring(std::mem::take(&mut self.segments), total) {
            Ok(ring) => {
                self.segments = ring;
                Ok(())
            }
            Err(e) => {
                self.segments = saved;
                Err(e)
            }
        }
    }

    /// Rotate values and segments together so `offset` becomes index 0.
    pub fn start_from(&self, offset: isize) -> Result<SegmentedProfile, ProfileError> {
        let profile = self.profile.start_from(offset);
        let segments: Vec<ProfileSegment> =
            self.segments.iter().map(|s| s.offset(-offset)).collect();
        SegmentedProfile::with_segments(profile, segments)
    }

    /// Resample profile and ring to a new length. Segment starts scale
    /// proportionally; a corrective pass keeps every segment at least
    /// [`MIN_SEGMENT_SIZE`] long so the ring still tiles the new range.
    pub fn interpolate(&self, new_length: usize) -> Result<SegmentedProfile, ProfileError> {
        let old_length = self.profile.size();
        let profile = self.profile.interpolate(new_length)?;
        if self.segments.len() == 1 {
            let span = ProfileSegment::spanning(new_length, self.segments[0].id())?;
            return SegmentedProfile::with_segments(profile, vec![span]);
        }

        let mut new_starts: Vec<usize> = self
            .segments
            .iter()
            .map(|s| proportional_index(old_length, s.start_index(), new_length))
            .collect();

        // Rounding can collapse neighbours; push starts forward until every
        // segment keeps the minimum length, then check the wrap-around gap.
        for i in 1..new_starts.len() {
            if new_starts[i] < new_starts[i - 1] + MIN_SEGMENT_SIZE {
                new_starts[i] = new_starts[i - 1] + MIN_SEGMENT_SIZE;
            }
        }
        let first = new_starts[0];
        let last = new_starts[new_starts.len() - 1];
        if last >= new_length || new_length - last + first < MIN_SEGMENT_SIZE {
            return Err(ProfileError::SegmentUpdate(format!(
                "cannot fit {} segments into an interpolated length of {new_length}",
                self.segments.len()
            )));
        }

        let mut segments = Vec::with_capacity(self.segments.len());
        for (i, seg) in self.segments.iter().enumerate() {
            let start = new_starts[i];
            let end = new_starts[(i + 1) % new_starts.len()];
            let mut scaled = ProfileSegment::new(start, end, new_length, seg.id())?;
            if let Some((a, b)) = seg.merge_sources() {
                scaled.set_merge_sources(
                    rescale_snapshot(a, old_length, new_length),
                    rescale_snapshot(b, old_length, new_length),
                );
            }
            scaled.set_locked(seg.is_locked());
            segments.push(scaled);
        }
        SegmentedProfile::with_segments(profile, segments)
    }
}

/// Scale a merge-source snapshot onto a new total length. Only the relative
/// lengths matter for later unmerging, but keeping the totals consistent
/// makes the snapshots meaningful to inspect.
fn rescale_snapshot(seg: &ProfileSegment, old_total: usize, new_total: usize) -> ProfileSegment {
    let mut scaled = seg.clone();
    scaled.set_bounds(
        proportional_index(old_total, seg.start_index(), new_total),
        proportional_index(old_total, seg.end_index(), new_total),
    );
    scaled.set_total_length(new_total);
    if let Some((a, b)) = seg.merge_sources() {
        scaled.set_merge_sources(
            rescale_snapshot(a, old_total, new_total),
            rescale_snapshot(b, old_total, new_total),
        );
    }
    scaled
}

/// Check the segment-ring invariant: sorted by start index the segments
/// tile `[0, total)` exactly once. Returns the segments in ring order.
pub fn validate_ring(
    mut segments: Vec<ProfileSegment>,
    total: usize,
) -> Result<Vec<ProfileSegment>, ProfileError> {
    if segments.is_empty() {
        return Err(ProfileError::SegmentUpdate("segment list is empty".into()));
    }
    for seg in &segments {
        if seg.total_length() != total {
            return Err(ProfileError::LengthMismatch {
                expected: total,
                actual: seg.total_length(),
            });
        }
    }
    if segments.len() == 1 {
        let seg = &segments[0];
        if seg.length() != total {
            return Err(ProfileError::SegmentUpdate(format!(
                "single segment {seg} does not span the whole profile"
            )));
        }
        return Ok(segments);
    }

    segments.sort_by_key(|s| s.start_index());
    let mut covered = 0usize;
    for (seg, next) in segments.iter().circular_tuple_windows::<(_, _)>() {
        if seg.end_index() != next.start_index() {
            return Err(ProfileError::SegmentUpdate(format!(
                "ring gap or overlap between {seg} and {next}"
            )));
        }
        if seg.length() < MIN_SEGMENT_SIZE {
            return Err(ProfileError::SegmentUpdate(format!(
                "segment {seg} is shorter than the minimum ({MIN_SEGMENT_SIZE})"
            )));
        }
        covered += seg.length();
    }
    if covered != total {
        return Err(ProfileError::SegmentUpdate(format!(
            "segments cover {covered} of {total} indices"
        )));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(n: usize) -> Profile {
        Profile::uniform(180.0, n).unwrap()
    }

    fn three_ring(total: usize) -> SegmentedProfile {
        let segs = vec![
            ProfileSegment::with_random_id(0, 40, total).unwrap(),
            ProfileSegment::with_random_id(40, 70, total).unwrap(),
            ProfileSegment::with_random_id(70, 0, total).unwrap(),
        ];
        SegmentedProfile::with_segments(flat(total), segs).unwrap()
    }

    #[test]
    fn test_ring_invariant_accepts_tiling() {
        let sp = three_ring(100);
        assert_eq!(sp.segment_count(), 3);
        let lengths: usize = sp.segments().iter().map(|s| s.length()).sum();
        assert_eq!(lengths, 100);
    }

    #[test]
    fn test_ring_invariant_rejects_gap() {
        let segs = vec![
            ProfileSegment::with_random_id(0, 40, 100).unwrap(),
            ProfileSegment::with_random_id(50, 0, 100).unwrap(),
        ];
        assert!(SegmentedProfile::with_segments(flat(100), segs).is_err());
    }

    #[test]
    fn test_ring_invariant_rejects_overlap() {
        let segs = vec![
            ProfileSegment::with_random_id(0, 50, 100).unwrap(),
            ProfileSegment::with_random_id(40, 0, 100).unwrap(),
        ];
        assert!(SegmentedProfile::with_segments(flat(100), segs).is_err());
    }

    #[test]
    fn test_update_moves_boundary_and_neighbour() {
        let mut sp = three_ring(100);
        let id = sp.segments()[1].id();
        sp.update(id, 35, 70).unwrap();
        assert_eq!(sp.segment(id).unwrap().start_index(), 35);
        assert_eq!(sp.segments()[0].end_index(), 35);
        let lengths: usize = sp.segments().iter().map(|s| s.length()).sum();
        assert_eq!(lengths, 100);
    }

    #[test]
    fn test_update_rejects_sub_minimum_neighbour() {
        let mut sp = three_ring(100);
        let id = sp.segments()[1].id();
        // Moving the start to 5 would leave the first segment 5 long.
        let err = sp.update(id, 5, 70).unwrap_err();
        assert!(err.to_string().contains("minimum"));
        assert_eq!(sp.segment(id).unwrap().start_index(), 40);
    }

    #[test]
    fn test_update_rejects_locked_segment() {
        let mut sp = three_ring(100);
        let id = sp.segments()[1].id();
        sp.set_segment_locked(id, true).unwrap();
        assert!(sp.update(id, 35, 70).is_err());
        sp.set_segment_locked(id, false).unwrap();
        assert!(sp.update(id, 35, 70).is_ok());
    }

    #[test]
    fn test_random_moves_near_edges_are_rejected() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let mut sp = three_ring(100);
            let id = sp.segments()[1].id();
            // Requests landing within MIN_SEGMENT_SIZE of a neighbour edge
            // must never produce a sub-minimum segment.
            let new_start: usize = rng.gen_range(0..10);
            let _ = sp.update(id, new_start, 70);
            for seg in sp.segments() {
                assert!(seg.length() >= MIN_SEGMENT_SIZE);
            }
        }
    }

    #[test]
    fn test_merge_records_provenance() {
        let mut sp = three_ring(100);
        let id_a = sp.segments()[0].id();
        let id_b = sp.segments()[1].id();
        let merged_id = Uuid::new_v4();
        sp.merge_segments(id_a, id_b, merged_id).unwrap();
        assert_eq!(sp.segment_count(), 2);
        let merged = sp.segment(merged_id).unwrap();
        assert_eq!(merged.start_index(), 0);
        assert_eq!(merged.end_index(), 70);
        assert_eq!(merged.merge_source_ids(), vec![id_a, id_b]);
    }

    #[test]
    fn test_merge_rejects_non_adjacent() {
        let segs = vec![
            ProfileSegment::with_random_id(0, 25, 100).unwrap(),
            ProfileSegment::with_random_id(25, 50, 100).unwrap(),
            ProfileSegment::with_random_id(50, 75, 100).unwrap(),
            ProfileSegment::with_random_id(75, 0, 100).unwrap(),
        ];
        let ids: Vec<Uuid> = segs.iter().map(|s| s.id()).collect();
        let mut sp = SegmentedProfile::with_segments(flat(100), segs).unwrap();
        assert!(sp.merge_segments(ids[0], ids[2], Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_merge_unmerge_round_trip() {
        let total = 100;
        let segs = vec![
            ProfileSegment::with_random_id(10, 40, total).unwrap(),
            ProfileSegment::with_random_id(40, 70, total).unwrap(),
            ProfileSegment::with_random_id(70, 10, total).unwrap(),
        ];
        let id_a = segs[0].id();
        let id_b = segs[1].id();
        let mut sp = SegmentedProfile::with_segments(flat(total), segs).unwrap();
        let merged_id = Uuid::new_v4();
        sp.merge_segments(id_a, id_b, merged_id).unwrap();
        sp.unmerge_segment(merged_id).unwrap();

        let a = sp.segment(id_a).unwrap();
        let b = sp.segment(id_b).unwrap();
        assert_eq!(a.start_index(), 10);
        assert_eq!(a.end_index(), 40);
        assert_eq!(b.start_index(), 40);
        assert_eq!(b.end_index(), 70);
    }

    #[test]
    fn test_unmerge_after_interpolation_is_proportional() {
        let total = 100;
        let segs = vec![
            ProfileSegment::with_random_id(0, 40, total).unwrap(),
            ProfileSegment::with_random_id(40, 70, total).unwrap(),
            ProfileSegment::with_random_id(70, 0, total).unwrap(),
        ];
        let id_a = segs[0].id();
        let id_b = segs[1].id();
        let mut sp = SegmentedProfile::with_segments(flat(total), segs).unwrap();
        let merged_id = Uuid::new_v4();
        sp.merge_segments(id_a, id_b, merged_id).unwrap();

        // Resample to double length, then unmerge: the restored boundary
        // should sit at the proportional position, within rounding.
        let mut doubled = sp.interpolate(200).unwrap();
        doubled.unmerge_segment(merged_id).unwrap();
        let a = doubled.segment(id_a).unwrap();
        assert!((a.end_index() as isize - 80).abs() <= 1);
    }

    #[test]
    fn test_split_segment() {
        let mut sp = three_ring(100);
        let id = sp.segments()[0].id();
        let (l, r) = (Uuid::new_v4(), Uuid::new_v4());
        sp.split_segment(id, 20, l, r).unwrap();
        assert_eq!(sp.segment_count(), 4);
        assert!(!sp.has_segment(id));
        assert_eq!(sp.segment(l).unwrap().end_index(), 20);
        assert_eq!(sp.segment(r).unwrap().start_index(), 20);
    }

    #[test]
    fn test_split_of_merged_segment_fails_and_ring_unchanged() {
        let mut sp = three_ring(100);
        let id_a = sp.segments()[0].id();
        let id_b = sp.segments()[1].id();
        let merged_id = Uuid::new_v4();
        sp.merge_segments(id_a, id_b, merged_id).unwrap();
        let before = sp.segments().to_vec();
        let err = sp
            .split_segment(merged_id, 30, Uuid::new_v4(), Uuid::new_v4())
            .unwrap_err();
        assert!(err.to_string().contains("unmerge"));
        assert_eq!(sp.segments(), &before[..]);
    }

    #[test]
    fn test_split_rejects_short_half() {
        let mut sp = three_ring(100);
        let id = sp.segments()[0].id();
        assert!(sp
            .split_segment(id, 5, Uuid::new_v4(), Uuid::new_v4())
            .is_err());
        assert_eq!(sp.segment_count(), 3);
    }

    #[test]
    fn test_start_from_keeps_ring_valid() {
        let sp = three_ring(100);
        let ids = sp.segment_ids();
        let rotated = sp.start_from(40).unwrap();
        assert_eq!(rotated.segment_ids().len(), 3);
        for id in ids {
            assert!(rotated.has_segment(id));
        }
        // The segment that started at 40 now starts at 0.
        assert_eq!(rotated.segment_containing(0).unwrap().start_index(), 0);
    }

    #[test]
    fn test_interpolate_scales_ring() {
        let sp = three_ring(100);
        let scaled = sp.interpolate(250).unwrap();
        assert_eq!(scaled.size(), 250);
        assert_eq!(scaled.segment_count(), 3);
        let lengths: usize = scaled.segments().iter().map(|s| s.length()).sum();
        assert_eq!(lengths, 250);
        // Starts map proportionally: 40 → 100, 70 → 175.
        assert_eq!(scaled.segments()[1].start_index(), 100);
        assert_eq!(scaled.segments()[2].start_index(), 175);
    }
}
