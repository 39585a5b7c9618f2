//! The canonical segmentation pattern and landmark offsets of a population.
//!
//! Stores, per profile type, the population aggregate built from member
//! profiles, the landmark indexes within the canonical zero-offset frame
//! (the reference point is pinned to index 0), and the canonical segment
//! ring. Quartile profiles are cached per (type, quartile, landmark); the
//! cache entries for a landmark are invalidated when that landmark moves.

use crate::aggregate::{ProfileAggregate, Quartile};
use crate::error::ProfileError;
use crate::landmark::{Landmark, ProfileType};
use crate::profile::Profile;
use crate::segment::ProfileSegment;
use crate::segmented_profile::{validate_ring, SegmentedProfile, DEFAULT_SEGMENT_ID};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

type ProfileKey = (ProfileType, Quartile, Landmark);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileCollection {
    /// Indexes of landmarks in the canonical frame, reference point at 0.
    landmarks: HashMap<Landmark, usize>,
    /// Canonical segment ring in the reference-point frame.
    segments: Vec<ProfileSegment>,
    /// Working length of the aggregates and the canonical ring.
    length: usize,
    #[serde(skip)]
    aggregates: HashMap<ProfileType, ProfileAggregate>,
    #[serde(skip)]
    cache: HashMap<ProfileKey, Profile>,
}

impl ProfileCollection {
    pub fn new() -> Self {
        let mut landmarks = HashMap::new();
        landmarks.insert(Landmark::ReferencePoint, 0);
        ProfileCollection {
            landmarks,
            segments: Vec::new(),
            length: 0,
            aggregates: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    #[inline(always)]
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn has_landmark(&self, tag: Landmark) -> bool {
        self.landmarks.contains_key(&tag)
    }

    pub fn landmarks(&self) -> Vec<Landmark> {
        self.landmarks.keys().copied().collect()
    }

    pub fn landmark_index(&self, tag: Landmark) -> Result<usize, ProfileError> {
        self.landmarks
            .get(&tag)
            .copied()
            .ok_or(ProfileError::MissingLandmark(tag))
    }

    /// Move a landmark within the canonical frame. The reference point is
    /// pinned to index 0 and silently keeps its position; cached profiles
    /// anchored on the moved landmark are invalidated.
    pub fn set_landmark(&mut self, tag: Landmark, index: usize) {
        if tag == Landmark::ReferencePoint {
            return;
        }
        self.cache.retain(|(_, _, t), _| *t != tag);
        self.landmarks.insert(tag, index % self.length.max(1));
    }

    pub fn has_segments(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment_ids(&self) -> Vec<Uuid> {
        self.segments.iter().map(|s| s.id()).collect()
    }

    /// The canonical ring rotated into the given landmark's frame. The
    /// segments are copied before rotation so callers can never mutate
    /// canonical storage through a view.
    pub fn segments(&self, tag: Landmark) -> Result<Vec<ProfileSegment>, ProfileError> {
        let offset = self.landmark_index(tag)? as isize;
        let rotated: Vec<ProfileSegment> = self.segments.iter().map(|s| s.offset(-offset)).collect();
        validate_ring(rotated, self.length)
    }

    /// Replace the canonical ring. The incoming segments are in the
    /// reference-point frame and must match the working length.
    pub fn set_segments(&mut self, segments: Vec<ProfileSegment>) -> Result<(), ProfileError> {
        if let Some(seg) = segments.first() {
            if seg.total_length() != self.length {
                return Err(ProfileError::LengthMismatch {
                    expected: self.length,
                    actual: seg.total_length(),
                });
            }
        }
        self.segments = validate_ring(segments, self.length)?;
        Ok(())
    }

    /// Rebuild the aggregates from member profiles at the given working
    /// length. Existing canonical segments are interpolated onto the new
    /// length; the cache is cleared and the reference point re-anchored at
    /// zero.
    pub fn create_aggregates(
        &mut self,
        members: &HashMap<ProfileType, Vec<Profile>>,
        length: usize,
    ) -> Result<(), ProfileError> {
        if length == 0 {
            return Err(ProfileError::EmptyProfile);
        }
        if members.values().all(|v| v.is_empty()) {
            return Err(ProfileError::EmptyPopulation);
        }

        // Carry an existing segmentation pattern across the length change.
        if !self.segments.is_empty() && self.length != length {
            let template = Profile::uniform(0.0, self.length)?;
            let segmented = SegmentedProfile::with_segments(template, self.segments.clone())?;
            self.segments = segmented.interpolate(length)?.segments().to_vec();
            for tag in self.landmarks.keys().copied().collect::<Vec<_>>() {
                let old = self.landmarks[&tag];
                let moved = crate::segment::proportional_index(self.length, old, length);
                self.landmarks.insert(tag, moved);
            }
        }
        if self.segments.is_empty() {
            self.segments = vec![ProfileSegment::spanning(length, DEFAULT_SEGMENT_ID)?];
        }

        self.length = length;
        self.landmarks.insert(Landmark::ReferencePoint, 0);
        self.cache.clear();
        self.aggregates.clear();
        log::debug!("Rebuilding profile aggregates at working length {length}");
        for (&profile_type, profiles) in members {
            if profiles.is_empty() {
                continue;
            }
            self.aggregates
                .insert(profile_type, ProfileAggregate::build(profiles, length)?);
        }
        Ok(())
    }

    /// The quartile profile rotated so index 0 sits on the given landmark.
    /// Cache misses trigger one aggregation pass that fills all three
    /// quartiles for the (type, landmark) pair.
    pub fn profile(
        &mut self,
        profile_type: ProfileType,
        tag: Landmark,
        quartile: Quartile,
    ) -> Result<Profile, ProfileError> {
        let offset = self.landmark_index(tag)? as isize;
        let key = (profile_type, quartile, tag);
        if !self.cache.contains_key(&key) {
            let agg = self
                .aggregates
                .get(&profile_type)
                .ok_or(ProfileError::MissingProfileType(profile_type))?;
            for q in [Quartile::Lower, Quartile::Median, Quartile::Upper] {
                let rotated = agg.quartile(q).start_from(offset);
                self.cache.insert((profile_type, q, tag), rotated);
            }
        }
        Ok(self.cache[&key].clone())
    }

    /// The interquartile range profile for the landmark's frame.
    pub fn iqr_profile(
        &mut self,
        profile_type: ProfileType,
        tag: Landmark,
    ) -> Result<Profile, ProfileError> {
        let upper = self.profile(profile_type, tag, Quartile::Upper)?;
        let lower = self.profile(profile_type, tag, Quartile::Lower)?;
        upper.subtract(&lower)
    }

    /// The quartile profile paired with the ring, both in the landmark's
    /// frame.
    pub fn segmented_profile(
        &mut self,
        profile_type: ProfileType,
        tag: Landmark,
        quartile: Quartile,
    ) -> Result<SegmentedProfile, ProfileError> {
        let profile = self.profile(profile_type, tag, quartile)?;
        let segments = self.segments(tag)?;
        SegmentedProfile::with_segments(profile, segments)
    }

    pub fn proportion_of_index(&self, index: usize) -> f64 {
        index as f64 / self.length as f64
    }

    pub fn index_of_proportion(&self, proportion: f64) -> usize {
        ((proportion * self.length as f64).round() as usize) % self.length.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(lengths: &[usize]) -> HashMap<ProfileType, Vec<Profile>> {
        let mut map = HashMap::new();
        map.insert(
            ProfileType::Angle,
            lengths
                .iter()
                .map(|&l| {
                    Profile::new(
                        (0..l)
                            .map(|i| 180.0 + (i as f64 * std::f64::consts::TAU / l as f64).sin())
                            .collect(),
                    )
                    .unwrap()
                })
                .collect(),
        );
        map
    }

    #[test]
    fn test_reference_point_is_immovable() {
        let mut pc = ProfileCollection::new();
        pc.create_aggregates(&members(&[100, 100]), 100).unwrap();
        pc.set_landmark(Landmark::ReferencePoint, 40);
        assert_eq!(pc.landmark_index(Landmark::ReferencePoint).unwrap(), 0);
    }

    #[test]
    fn test_profile_rotated_to_landmark() {
        let mut pc = ProfileCollection::new();
        pc.create_aggregates(&members(&[100, 100, 100]), 100).unwrap();
        pc.set_landmark(Landmark::OrientationPoint, 30);
        let rp = pc
            .profile(ProfileType::Angle, Landmark::ReferencePoint, Quartile::Median)
            .unwrap();
        let op = pc
            .profile(ProfileType::Angle, Landmark::OrientationPoint, Quartile::Median)
            .unwrap();
        assert_eq!(op.size(), 100);
        assert!((op.get(0) - rp.get(30)).abs() < 1e-9);
    }

    #[test]
    fn test_cache_invalidated_on_landmark_move() {
        let mut pc = ProfileCollection::new();
        pc.create_aggregates(&members(&[100, 100]), 100).unwrap();
        pc.set_landmark(Landmark::OrientationPoint, 30);
        let before = pc
            .profile(ProfileType::Angle, Landmark::OrientationPoint, Quartile::Median)
            .unwrap();
        pc.set_landmark(Landmark::OrientationPoint, 60);
        let after = pc
            .profile(ProfileType::Angle, Landmark::OrientationPoint, Quartile::Median)
            .unwrap();
        assert!((after.get(0) - before.get(30)).abs() < 1e-9);
        // Entries for other landmarks stay valid.
        let rp = pc
            .profile(ProfileType::Angle, Landmark::ReferencePoint, Quartile::Median)
            .unwrap();
        assert!((rp.get(60) - after.get(0)).abs() < 1e-9);
    }

    #[test]
    fn test_set_segments_rejects_length_mismatch() {
        let mut pc = ProfileCollection::new();
        pc.create_aggregates(&members(&[100, 100]), 100).unwrap();
        let wrong = vec![ProfileSegment::with_random_id(0, 0, 80).unwrap()];
        assert!(matches!(
            pc.set_segments(wrong),
            Err(ProfileError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_segments_view_does_not_mutate_canonical() {
        let mut pc = ProfileCollection::new();
        pc.create_aggregates(&members(&[100, 100]), 100).unwrap();
        let ring = vec![
            ProfileSegment::with_random_id(0, 50, 100).unwrap(),
            ProfileSegment::with_random_id(50, 0, 100).unwrap(),
        ];
        pc.set_segments(ring).unwrap();
        pc.set_landmark(Landmark::OrientationPoint, 50);
        let view = pc.segments(Landmark::OrientationPoint).unwrap();
        assert_eq!(view[0].start_index(), 0);
        // Canonical storage still starts at the reference point.
        let canonical = pc.segments(Landmark::ReferencePoint).unwrap();
        assert_eq!(canonical[0].start_index(), 0);
        assert_eq!(canonical[0].end_index(), 50);
    }

    #[test]
    fn test_aggregate_length_change_interpolates_ring() {
        let mut pc = ProfileCollection::new();
        pc.create_aggregates(&members(&[100, 100]), 100).unwrap();
        let ring = vec![
            ProfileSegment::with_random_id(0, 40, 100).unwrap(),
            ProfileSegment::with_random_id(40, 0, 100).unwrap(),
        ];
        let ids: Vec<Uuid> = ring.iter().map(|s| s.id()).collect();
        pc.set_segments(ring).unwrap();

        pc.create_aggregates(&members(&[200, 200]), 200).unwrap();
        assert_eq!(pc.length(), 200);
        let segs = pc.segments(Landmark::ReferencePoint).unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].id(), ids[0]);
        assert_eq!(segs[1].id(), ids[1]);
        assert_eq!(segs[1].start_index(), 80);
        let covered: usize = segs.iter().map(|s| s.length()).sum();
        assert_eq!(covered, 200);
    }
}
