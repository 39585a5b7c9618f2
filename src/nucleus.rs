//! A single segmented nucleus outline.
//!
//! Each nucleus owns its native-length profiles (one per profile type, all
//! rotated so index 0 is the reference point), its own segmented angle
//! profile whose segment ids mirror the population's canonical ids after
//! synchronisation, and its landmark tag indexes.

use crate::error::ProfileError;
use crate::landmark::{Landmark, ProfileType};
use crate::profile::Profile;
use crate::segmented_profile::SegmentedProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Nucleus {
    id: Uuid,
    name: String,
    profiles: HashMap<ProfileType, Profile>,
    segmented: Option<SegmentedProfile>,
    landmarks: HashMap<Landmark, usize>,
    /// Locked nuclei are excluded from landmark best-fit updates.
    locked: bool,
}

impl Nucleus {
    pub fn new(name: &str, profiles: HashMap<ProfileType, Profile>) -> Result<Self, ProfileError> {
        let angle = profiles
            .get(&ProfileType::Angle)
            .ok_or(ProfileError::MissingProfileType(ProfileType::Angle))?;
        let native = angle.size();
        for p in profiles.values() {
            if p.size() != native {
                return Err(ProfileError::LengthMismatch {
                    expected: native,
                    actual: p.size(),
                });
            }
        }
        let mut landmarks = HashMap::new();
        landmarks.insert(Landmark::ReferencePoint, 0);
        Ok(Nucleus {
            id: Uuid::new_v4(),
            name: name.to_string(),
            profiles,
            segmented: None,
            landmarks,
            locked: false,
        })
    }

    #[inline(always)]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The native length of this nucleus's profiles.
    pub fn native_length(&self) -> usize {
        self.profiles[&ProfileType::Angle].size()
    }

    pub fn profile(&self, profile_type: ProfileType) -> Result<&Profile, ProfileError> {
        self.profiles
            .get(&profile_type)
            .ok_or(ProfileError::MissingProfileType(profile_type))
    }

    pub fn has_segments(&self) -> bool {
        self.segmented.is_some()
    }

    pub fn segmented_profile(&self) -> Result<&SegmentedProfile, ProfileError> {
        self.segmented
            .as_ref()
            .ok_or(ProfileError::MissingProfileType(ProfileType::Angle))
    }

    pub fn segmented_profile_mut(&mut self) -> Result<&mut SegmentedProfile, ProfileError> {
        self.segmented
            .as_mut()
            .ok_or(ProfileError::MissingProfileType(ProfileType::Angle))
    }

    pub fn set_segmented_profile(
        &mut self,
        segmented: SegmentedProfile,
    ) -> Result<(), ProfileError> {
        if segmented.size() != self.native_length() {
            return Err(ProfileError::LengthMismatch {
                expected: self.native_length(),
                actual: segmented.size(),
            });
        }
        self.segmented = Some(segmented);
        Ok(())
    }

    pub fn landmark_index(&self, tag: Landmark) -> Result<usize, ProfileError> {
        self.landmarks
            .get(&tag)
            .copied()
            .ok_or(ProfileError::MissingLandmark(tag))
    }

    pub fn has_landmark(&self, tag: Landmark) -> bool {
        self.landmarks.contains_key(&tag)
    }

    /// The reference point stays at index 0 of the nucleus frame.
    pub fn set_landmark(&mut self, tag: Landmark, index: usize) {
        if tag == Landmark::ReferencePoint {
            return;
        }
        self.landmarks.insert(tag, index % self.native_length());
    }

    /// The landmark at the given index, if any.
    pub fn landmark_at(&self, index: usize) -> Option<Landmark> {
        self.landmarks
            .iter()
            .find(|&(_, &i)| i == index)
            .map(|(&tag, _)| tag)
    }

    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn set_segment_lock(&mut self, id: Uuid, locked: bool) -> Result<(), ProfileError> {
        self.segmented_profile_mut()?.set_segment_locked(id, locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nucleus(len: usize) -> Nucleus {
        let mut profiles = HashMap::new();
        profiles.insert(ProfileType::Angle, Profile::uniform(180.0, len).unwrap());
        Nucleus::new("test", profiles).unwrap()
    }

    #[test]
    fn test_requires_angle_profile() {
        assert!(Nucleus::new("x", HashMap::new()).is_err());
    }

    #[test]
    fn test_rejects_mismatched_profile_lengths() {
        let mut profiles = HashMap::new();
        profiles.insert(ProfileType::Angle, Profile::uniform(180.0, 100).unwrap());
        profiles.insert(ProfileType::Radius, Profile::uniform(5.0, 90).unwrap());
        assert!(Nucleus::new("x", profiles).is_err());
    }

    #[test]
    fn test_reference_point_pinned() {
        let mut n = nucleus(100);
        n.set_landmark(Landmark::ReferencePoint, 40);
        assert_eq!(n.landmark_index(Landmark::ReferencePoint).unwrap(), 0);
        n.set_landmark(Landmark::OrientationPoint, 40);
        assert_eq!(n.landmark_index(Landmark::OrientationPoint).unwrap(), 40);
    }

    #[test]
    fn test_segmented_profile_length_checked() {
        let mut n = nucleus(100);
        let wrong = SegmentedProfile::new(Profile::uniform(1.0, 80).unwrap()).unwrap();
        assert!(n.set_segmented_profile(wrong).is_err());
        let right = SegmentedProfile::new(Profile::uniform(1.0, 100).unwrap()).unwrap();
        assert!(n.set_segmented_profile(right).is_ok());
        assert!(n.has_segments());
    }
}
