//! A population of nuclei with its canonical profile collection.

use crate::error::ProfileError;
use crate::landmark::ProfileType;
use crate::nucleus::Nucleus;
use crate::profile::Profile;
use crate::profile_collection::ProfileCollection;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NucleusPopulation {
    name: String,
    nuclei: Vec<Nucleus>,
    /// Synthetic averaged shape, kept in sync with the canonical pattern
    /// like any member nucleus.
    consensus: Option<Nucleus>,
    collection: ProfileCollection,
}

impl NucleusPopulation {
    pub fn new(name: &str, nuclei: Vec<Nucleus>) -> Result<Self, ProfileError> {
        if nuclei.is_empty() {
            return Err(ProfileError::EmptyPopulation);
        }
        Ok(NucleusPopulation {
            name: name.to_string(),
            nuclei,
            consensus: None,
            collection: ProfileCollection::new(),
        })
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn nuclei(&self) -> &[Nucleus] {
        &self.nuclei
    }

    #[inline(always)]
    pub fn nuclei_mut(&mut self) -> &mut [Nucleus] {
        &mut self.nuclei
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.nuclei.len()
    }

    pub fn nucleus(&self, id: Uuid) -> Option<&Nucleus> {
        self.nuclei.iter().find(|n| n.id() == id)
    }

    pub fn nucleus_mut(&mut self, id: Uuid) -> Option<&mut Nucleus> {
        self.nuclei.iter_mut().find(|n| n.id() == id)
    }

    pub fn has_consensus(&self) -> bool {
        self.consensus.is_some()
    }

    pub fn consensus(&self) -> Option<&Nucleus> {
        self.consensus.as_ref()
    }

    pub fn consensus_mut(&mut self) -> Option<&mut Nucleus> {
        self.consensus.as_mut()
    }

    pub fn set_consensus(&mut self, consensus: Nucleus) {
        self.consensus = Some(consensus);
    }

    #[inline(always)]
    pub fn collection(&self) -> &ProfileCollection {
        &self.collection
    }

    #[inline(always)]
    pub fn collection_mut(&mut self) -> &mut ProfileCollection {
        &mut self.collection
    }

    /// The median of the members' native profile lengths: the default
    /// working length for aggregation.
    pub fn median_native_length(&self) -> usize {
        let mut lengths: Vec<usize> = self.nuclei.iter().map(|n| n.native_length()).collect();
        lengths.sort_unstable();
        lengths[lengths.len() / 2]
    }

    /// Member profiles grouped per type, for aggregate construction.
    pub fn profiles_by_type(&self) -> HashMap<ProfileType, Vec<Profile>> {
        let mut map: HashMap<ProfileType, Vec<Profile>> = HashMap::new();
        for profile_type in ProfileType::all() {
            let profiles: Vec<Profile> = self
                .nuclei
                .iter()
                .filter_map(|n| n.profile(profile_type).ok().cloned())
                .collect();
            if !profiles.is_empty() {
                map.insert(profile_type, profiles);
            }
        }
        map
    }

    /// Rebuild the profile collection's aggregates at the population's
    /// median native length.
    pub fn build_collection(&mut self) -> Result<(), ProfileError> {
        let length = self.median_native_length();
        let members = self.profiles_by_type();
        self.collection.create_aggregates(&members, length)
    }

    /// Rebuild at an explicit working length, e.g. to keep an existing
    /// segmentation pattern aligned after members change.
    pub fn rebuild_collection_at(&mut self, length: usize) -> Result<(), ProfileError> {
        let members = self.profiles_by_type();
        self.collection.create_aggregates(&members, length)
    }

    /// The nucleus whose profile is closest to the population median by
    /// sum-of-squares distance at the working length. Used to seed
    /// consensus refolding.
    pub fn most_similar_to_median(
        &mut self,
        profile_type: ProfileType,
    ) -> Result<Uuid, ProfileError> {
        use crate::aggregate::Quartile;
        use crate::landmark::Landmark;
        let length = self.collection.length();
        let median =
            self.collection
                .profile(profile_type, Landmark::ReferencePoint, Quartile::Median)?;
        let scored: Vec<(Uuid, f64)> = self
            .nuclei
            .par_iter()
            .filter_map(|n| {
                let p = n.profile(profile_type).ok()?;
                let d = p.absolute_square_difference(&median, length).ok()?;
                Some((n.id(), d))
            })
            .collect();
        scored
            .into_iter()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(id, _)| id)
            .ok_or(ProfileError::EmptyPopulation)
    }

    /// Lock or unlock the start index of every segment in every nucleus
    /// except the given one, which gets the opposite state. Called before
    /// an interactive boundary drag so only the target segment's
    /// neighbours are free to absorb the change.
    pub fn set_lock_on_all_segments_except(&mut self, id: Uuid, locked: bool) {
        let ids = self.collection.segment_ids();
        for nucleus in &mut self.nuclei {
            for &seg_id in &ids {
                let state = if seg_id == id { !locked } else { locked };
                let _ = nucleus.set_segment_lock(seg_id, state);
            }
        }
    }

    pub fn set_lock_on_all_segments(&mut self, locked: bool) {
        let ids = self.collection.segment_ids();
        for nucleus in &mut self.nuclei {
            for &seg_id in &ids {
                let _ = nucleus.set_segment_lock(seg_id, locked);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Quartile;
    use crate::landmark::Landmark;

    fn flat_nucleus(len: usize, value: f64) -> Nucleus {
        let mut profiles = HashMap::new();
        profiles.insert(ProfileType::Angle, Profile::uniform(value, len).unwrap());
        Nucleus::new(&format!("n{len}"), profiles).unwrap()
    }

    fn population() -> NucleusPopulation {
        let nuclei = vec![
            flat_nucleus(80, 100.0),
            flat_nucleus(90, 101.0),
            flat_nucleus(100, 102.0),
            flat_nucleus(110, 103.0),
            flat_nucleus(120, 104.0),
        ];
        NucleusPopulation::new("pop", nuclei).unwrap()
    }

    #[test]
    fn test_median_native_length() {
        assert_eq!(population().median_native_length(), 100);
    }

    #[test]
    fn test_collection_built_at_median_length() {
        let mut pop = population();
        pop.build_collection().unwrap();
        assert_eq!(pop.collection().length(), 100);
        let median = pop
            .collection_mut()
            .profile(ProfileType::Angle, Landmark::ReferencePoint, Quartile::Median)
            .unwrap();
        assert_eq!(median.size(), 100);
        // Flat members: the median at every index is the middle value.
        assert!((median.get(0) - 102.0).abs() < 1e-9);
    }

    #[test]
    fn test_most_similar_to_median() {
        let mut pop = population();
        pop.build_collection().unwrap();
        let best = pop.most_similar_to_median(ProfileType::Angle).unwrap();
        let best_nucleus = pop.nucleus(best).unwrap();
        assert_eq!(best_nucleus.native_length(), 100);
    }

    #[test]
    fn test_empty_population_rejected() {
        assert!(NucleusPopulation::new("x", vec![]).is_err());
    }
}
