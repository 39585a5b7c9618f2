//! Detection of segment boundaries within a periodic boundary profile.
//!
//! Boundaries are called at inflection points: local extrema of the
//! smoothed profile whose second derivative stands out from the noise
//! floor. The reference point is index 0 by construction and always starts
//! a segment; forced landmark indices always become boundaries.

use crate::aggregate::Quartile;
use crate::error::ProfileError;
use crate::landmark::{Landmark, ProfileType};
use crate::population::NucleusPopulation;
use crate::profile::{BooleanProfile, Profile};
use crate::segment::{ProfileSegment, MIN_SEGMENT_SIZE};
use crate::segmented_profile::SegmentedProfile;
use std::collections::HashMap;

/// Window size for smoothing profiles before analysis.
const SMOOTH_WINDOW: usize = 2;
/// Window size for calculating minima and maxima.
const MAXIMA_WINDOW: usize = 5;
/// Window size for calculating deltas.
const DELTA_WINDOW: usize = 2;
/// A maximum must be above this angle, a minimum below it, to count as a
/// biologically plausible convex or concave point.
const ANGLE_THRESHOLD: f64 = 180.0;
/// Fraction of the second-derivative range below which a candidate
/// inflection is treated as noise.
const MIN_RATE_OF_CHANGE: f64 = 0.02;

pub struct ProfileSegmenter {
    profile: Profile,
    /// Boundary indices that must be honoured, ascending, spaced at least
    /// [`MIN_SEGMENT_SIZE`] apart from each other and from index 0.
    forced: Vec<usize>,
    /// Forced landmarks that conflicted with an earlier boundary and were
    /// dropped.
    dropped: Vec<(Landmark, usize)>,
    inflection_points: BooleanProfile,
    delta_profile: Profile,
    min_rate_of_change: f64,
}

impl ProfileSegmenter {
    pub fn new(profile: &Profile, forced_landmarks: &HashMap<Landmark, usize>) -> Self {
        let smoothed = profile.smooth(SMOOTH_WINDOW);
        let maxima = smoothed.local_maxima_above(MAXIMA_WINDOW, ANGLE_THRESHOLD);
        let minima = smoothed.local_minima_below(MAXIMA_WINDOW, ANGLE_THRESHOLD);
        let inflection_points = minima.or(&maxima);

        // Second differential: minima and maxima of the profile sit near
        // zero in the first pass, so the rate of change of the deltas
        // approximates local curvature.
        let deltas = smoothed.calculate_deltas(DELTA_WINDOW);
        let delta_profile = deltas.smooth(SMOOTH_WINDOW).calculate_deltas(DELTA_WINDOW);
        let variation_range = (delta_profile.max_value() - delta_profile.min_value()).abs();
        let min_rate_of_change = variation_range * MIN_RATE_OF_CHANGE;

        let (forced, dropped) = resolve_forced_boundaries(forced_landmarks, profile.size());

        ProfileSegmenter {
            profile: profile.clone(),
            forced,
            dropped,
            inflection_points,
            delta_profile,
            min_rate_of_change,
        }
    }

    /// Forced landmarks that were discarded because they fell within
    /// [`MIN_SEGMENT_SIZE`] of an earlier boundary.
    pub fn dropped_forced(&self) -> &[(Landmark, usize)] {
        &self.dropped
    }

    /// Scan the profile for boundaries and build the initial segment ring.
    pub fn segment(&self) -> Result<SegmentedProfile, ProfileError> {
        let size = self.profile.size();
        let mut boundaries = vec![0usize];
        let mut segment_start = 0usize;

        for index in 1..size {
            if self.is_boundary(index, segment_start) {
                boundaries.push(index);
                segment_start = index;
            }
        }

        // The final segment closes the ring back to index 0; boundaries can
        // never be called within MIN_SEGMENT_SIZE of the profile end, so
        // there is always room for it.
        if boundaries.len() == 1 {
            let span = ProfileSegment::with_random_id(0, 0, size)?;
            return SegmentedProfile::with_segments(self.profile.clone(), vec![span]);
        }

        let mut segments = Vec::with_capacity(boundaries.len());
        for (i, &start) in boundaries.iter().enumerate() {
            let end = boundaries[(i + 1) % boundaries.len()];
            let seg = ProfileSegment::with_random_id(start, end, size)?;
            log::debug!("New segment found in profile: {seg}");
            segments.push(seg);
        }
        SegmentedProfile::with_segments(self.profile.clone(), segments)
    }

    fn is_boundary(&self, index: usize, segment_start: usize) -> bool {
        let size = self.profile.size();

        // A forced landmark is always a boundary.
        if self.forced.contains(&index) {
            return true;
        }

        // The first segment must meet the length limit.
        if index < MIN_SEGMENT_SIZE {
            return false;
        }
        // Close to the profile end no boundary can be called, even at a
        // clean inflection point: the ring closure back to the reference
        // point would be too short.
        if index > size - MIN_SEGMENT_SIZE {
            return false;
        }
        // The segment being built must be long enough.
        if index - segment_start < MIN_SEGMENT_SIZE {
            return false;
        }
        // Stay clear of forced boundaries.
        if self
            .forced
            .iter()
            .any(|&f| ring_distance(index, f, size) < MIN_SEGMENT_SIZE)
        {
            return false;
        }

        self.inflection_points.get(index as isize)
            && self.delta_profile.get(index as isize).abs() > self.min_rate_of_change
    }
}

/// Keep forced landmark indices that are at least [`MIN_SEGMENT_SIZE`]
/// apart from index 0 and from each other; drop later conflicting ones.
/// Dropped landmarks are reported to the caller as well as logged, since a
/// silently vanishing boundary is indistinguishable from a detection bug.
fn resolve_forced_boundaries(
    forced_landmarks: &HashMap<Landmark, usize>,
    size: usize,
) -> (Vec<usize>, Vec<(Landmark, usize)>) {
    let mut entries: Vec<(usize, Landmark)> = forced_landmarks
        .iter()
        .map(|(&tag, &index)| (index % size, tag))
        .collect();
    entries.sort_by_key(|&(index, _)| index);

    let mut accepted = vec![0usize];
    let mut dropped = Vec::new();
    for (index, tag) in entries {
        if index == 0 {
            continue; // the reference point is already a boundary
        }
        if accepted
            .iter()
            .any(|&a| ring_distance(index, a, size) < MIN_SEGMENT_SIZE)
        {
            log::warn!(
                "Forced boundary for {tag} at index {index} is within {MIN_SEGMENT_SIZE} of an earlier boundary; dropping it"
            );
            dropped.push((tag, index));
        } else {
            accepted.push(index);
        }
    }
    accepted.retain(|&i| i != 0);
    (accepted, dropped)
}

fn ring_distance(a: usize, b: usize, size: usize) -> usize {
    let d = (a as isize - b as isize).rem_euclid(size as isize) as usize;
    d.min(size - d)
}

/// Run the full initial segmentation over a population: build the
/// aggregates, segment the median angle profile, install the canonical
/// ring, and assign the pattern to every nucleus (and the consensus) at
/// its native length.
pub fn segment_population(
    population: &mut NucleusPopulation,
    forced_landmarks: &HashMap<Landmark, usize>,
) -> Result<(), ProfileError> {
    population.build_collection()?;
    let median = population.collection_mut().profile(
        ProfileType::Angle,
        Landmark::ReferencePoint,
        Quartile::Median,
    )?;

    let segmenter = ProfileSegmenter::new(&median, forced_landmarks);
    let template = segmenter.segment()?;
    log::info!(
        "Found {} segments in the median profile",
        template.segment_count()
    );
    population
        .collection_mut()
        .set_segments(template.segments().to_vec())?;
    for (&tag, &index) in forced_landmarks {
        if segmenter.dropped_forced().iter().any(|&(t, _)| t == tag) {
            continue;
        }
        population.collection_mut().set_landmark(tag, index);
    }

    for nucleus in population.nuclei_mut() {
        let scaled = template.interpolate(nucleus.native_length())?;
        let segmented = SegmentedProfile::with_segments(
            nucleus.profile(ProfileType::Angle)?.clone(),
            scaled.segments().to_vec(),
        )?;
        nucleus.set_segmented_profile(segmented)?;
    }
    if let Some(consensus) = population.consensus_mut() {
        let scaled = template.interpolate(consensus.native_length())?;
        let segmented = SegmentedProfile::with_segments(
            consensus.profile(ProfileType::Angle)?.clone(),
            scaled.segments().to_vec(),
        )?;
        consensus.set_segmented_profile(segmented)?;
    }
    Ok(())
}
