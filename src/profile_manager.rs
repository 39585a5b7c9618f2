//! Population-level segment editing.
//!
//! Every edit originates at the population median: it is applied to the
//! canonical segmented profile first, written back to the collection on
//! success, and then replayed onto each nucleus (and the consensus shape)
//! by proportional position rather than literal index, since native
//! lengths differ from the working length. A nucleus that rejects the
//! replayed edit is reported and logged but the canonical change is kept;
//! re-running detection repairs a single nucleus independently.

use crate::aggregate::Quartile;
use crate::error::ProfileError;
use crate::landmark::{Landmark, LandmarkKind, ProfileType};
use crate::nucleus::Nucleus;
use crate::population::NucleusPopulation;
use crate::profile::Profile;
use crate::segment::proportional_index;
use crate::segmented_profile::SegmentedProfile;
use uuid::Uuid;

/// A single population-level segment edit, applied atomically to the
/// canonical ring and best-effort to the members.
#[derive(Clone, Debug)]
pub enum SegmentEdit {
    MoveBoundary {
        segment_id: Uuid,
        /// True to move the segment's start, false to move its end.
        move_start: bool,
        new_index: usize,
    },
    Merge {
        segment_a: Uuid,
        segment_b: Uuid,
        new_id: Uuid,
    },
    Split {
        segment_id: Uuid,
        /// Split position in the canonical frame; the segment midpoint
        /// when absent.
        index: Option<usize>,
        new_ids: (Uuid, Uuid),
    },
    Unmerge {
        segment_id: Uuid,
    },
}

/// The outcome of one [`SegmentEdit`]: the canonical result plus the
/// per-nucleus propagation results. Partial failure is data, not a log
/// side effect.
#[derive(Debug)]
pub struct EditReport {
    pub edit: SegmentEdit,
    pub canonical: Result<(), ProfileError>,
    pub nuclei: Vec<(Uuid, Result<(), ProfileError>)>,
    pub consensus: Option<Result<(), ProfileError>>,
}

impl EditReport {
    pub fn canonical_succeeded(&self) -> bool {
        self.canonical.is_ok()
    }

    /// Ids of nuclei whose segments are now out of sync with the
    /// canonical pattern.
    pub fn failed_nuclei(&self) -> Vec<Uuid> {
        self.nuclei
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Hook invoked for every nucleus a population edit touched, so oriented
/// copies can be refreshed by the caller.
pub type AlignmentRefresh = Box<dyn FnMut(&mut Nucleus)>;

pub struct ProfileManager<'a> {
    population: &'a mut NucleusPopulation,
    alignment_refresh: Option<AlignmentRefresh>,
}

impl<'a> ProfileManager<'a> {
    pub fn new(population: &'a mut NucleusPopulation) -> Self {
        ProfileManager {
            population,
            alignment_refresh: None,
        }
    }

    pub fn with_alignment_refresh(mut self, hook: AlignmentRefresh) -> Self {
        self.alignment_refresh = Some(hook);
        self
    }

    /// Move one boundary of a median segment. The edit is atomic: either
    /// the canonical ring is updated (tracking the orientation point if
    /// the moved boundary carried it), or nothing changes and the report
    /// holds the reason. Boundary moves do not fan out to nuclei; member
    /// segments follow on the next synchronisation.
    pub fn update_median_profile_segment_index(
        &mut self,
        move_start: bool,
        segment_id: Uuid,
        new_index: usize,
    ) -> EditReport {
        self.apply_edit(SegmentEdit::MoveBoundary {
            segment_id,
            move_start,
            new_index,
        })
    }

    pub fn merge_segments(&mut self, segment_a: Uuid, segment_b: Uuid) -> EditReport {
        self.apply_edit(SegmentEdit::Merge {
            segment_a,
            segment_b,
            new_id: Uuid::new_v4(),
        })
    }

    pub fn split_segment(&mut self, segment_id: Uuid, index: Option<usize>) -> EditReport {
        self.apply_edit(SegmentEdit::Split {
            segment_id,
            index,
            new_ids: (Uuid::new_v4(), Uuid::new_v4()),
        })
    }

    pub fn unmerge_segments(&mut self, segment_id: Uuid) -> EditReport {
        self.apply_edit(SegmentEdit::Unmerge { segment_id })
    }

    /// Apply a segment edit canonical-first, then propagate to members.
    pub fn apply_edit(&mut self, edit: SegmentEdit) -> EditReport {
        match self.apply_canonical(&edit) {
            Ok(split_proportion) => {
                let (nuclei, consensus) = self.propagate(&edit, split_proportion);
                EditReport {
                    edit,
                    canonical: Ok(()),
                    nuclei,
                    consensus,
                }
            }
            Err(e) => EditReport {
                edit,
                canonical: Err(e),
                nuclei: Vec::new(),
                consensus: None,
            },
        }
    }

    /// Apply the edit to the canonical median ring and write it back.
    /// Returns the split proportion when the edit was a split, so the
    /// propagation step can translate it per nucleus.
    fn apply_canonical(&mut self, edit: &SegmentEdit) -> Result<Option<f64>, ProfileError> {
        let mut median = self.population.collection_mut().segmented_profile(
            ProfileType::Angle,
            Landmark::ReferencePoint,
            Quartile::Median,
        )?;
        let mut split_proportion = None;
        let mut tracked_landmark: Option<(Landmark, usize)> = None;

        match *edit {
            SegmentEdit::MoveBoundary {
                segment_id,
                move_start,
                new_index,
            } => {
                let seg = median.segment(segment_id)?.clone();
                let old_boundary = if move_start {
                    seg.start_index()
                } else {
                    seg.end_index()
                };
                // The reference point anchors the canonical frame; the
                // boundary carrying it cannot be dragged.
                if old_boundary == 0 {
                    return Err(ProfileError::SegmentUpdate(
                        "boundary carries the reference point and cannot be moved".into(),
                    ));
                }
                let (new_start, new_end) = if move_start {
                    (new_index, seg.end_index())
                } else {
                    (seg.start_index(), new_index)
                };
                median.update(segment_id, new_start, new_end)?;
                // A boundary that carried the orientation point drags the
                // landmark with it.
                if self
                    .population
                    .collection()
                    .landmark_index(Landmark::OrientationPoint)
                    .map_or(false, |op| op == old_boundary)
                {
                    tracked_landmark = Some((Landmark::OrientationPoint, new_index));
                }
            }
            SegmentEdit::Merge {
                segment_a,
                segment_b,
                new_id,
            } => {
                self.test_segments_mergeable(segment_a, segment_b)?;
                median.merge_segments(segment_a, segment_b, new_id)?;
            }
            SegmentEdit::Split {
                segment_id,
                index,
                new_ids,
            } => {
                let seg = median.segment(segment_id)?.clone();
                let split_index = index.unwrap_or_else(|| seg.midpoint_index());
                split_proportion = Some(seg.index_proportion(split_index)?);
                median.split_segment(segment_id, split_index, new_ids.0, new_ids.1)?;
            }
            SegmentEdit::Unmerge { segment_id } => {
                median.unmerge_segment(segment_id)?;
            }
        }

        let collection = self.population.collection_mut();
        collection.set_segments(median.segments().to_vec())?;
        if let Some((tag, index)) = tracked_landmark {
            collection.set_landmark(tag, index);
        }
        Ok(split_proportion)
    }

    /// Replay a merge, split or unmerge onto every nucleus and the
    /// consensus. Boundary moves stay canonical-only. Failures keep the
    /// canonical change; the affected nucleus is reported for repair.
    fn propagate(
        &mut self,
        edit: &SegmentEdit,
        split_proportion: Option<f64>,
    ) -> (Vec<(Uuid, Result<(), ProfileError>)>, Option<Result<(), ProfileError>>) {
        if matches!(edit, SegmentEdit::MoveBoundary { .. }) {
            return (Vec::new(), None);
        }

        let apply_to = |segmented: &mut SegmentedProfile| -> Result<(), ProfileError> {
            match *edit {
                SegmentEdit::MoveBoundary { .. } => Ok(()),
                SegmentEdit::Merge {
                    segment_a,
                    segment_b,
                    new_id,
                } => segmented.merge_segments(segment_a, segment_b, new_id),
                SegmentEdit::Split {
                    segment_id,
                    new_ids,
                    ..
                } => {
                    let proportion = split_proportion.expect("split edits carry a proportion");
                    let seg = segmented.segment(segment_id)?;
                    let target = seg.proportional_index(proportion);
                    segmented.split_segment(segment_id, target, new_ids.0, new_ids.1)
                }
                SegmentEdit::Unmerge { segment_id } => segmented.unmerge_segment(segment_id),
            }
        };

        let mut outcomes = Vec::with_capacity(self.population.size());
        for nucleus in self.population.nuclei_mut() {
            let result = nucleus
                .segmented_profile_mut()
                .and_then(|sp| apply_to(sp));
            if let Err(e) = &result {
                log::warn!(
                    "Nucleus {} is out of sync after population edit: {e}",
                    nucleus.name()
                );
            } else if let Some(hook) = self.alignment_refresh.as_mut() {
                hook(nucleus);
            }
            outcomes.push((nucleus.id(), result));
        }

        let consensus_outcome = self.population.consensus_mut().map(|consensus| {
            let result = consensus
                .segmented_profile_mut()
                .and_then(|sp| apply_to(sp));
            if let Err(e) = &result {
                log::warn!("Consensus shape is out of sync after population edit: {e}");
            }
            result
        });
        if let (Some(Ok(())), Some(hook)) = (&consensus_outcome, self.alignment_refresh.as_mut()) {
            if let Some(consensus) = self.population.consensus_mut() {
                hook(consensus);
            }
        }
        (outcomes, consensus_outcome)
    }

    /// A merge is refused when the shared boundary between the segments
    /// carries a core landmark: merging across it would make the
    /// landmark's position ambiguous.
    pub fn test_segments_mergeable(
        &self,
        segment_a: Uuid,
        segment_b: Uuid,
    ) -> Result<(), ProfileError> {
        let collection = self.population.collection();
        let segments = collection.segments(Landmark::ReferencePoint)?;
        let a = segments
            .iter()
            .find(|s| s.id() == segment_a)
            .ok_or(ProfileError::MissingSegment(segment_a))?;
        let b = segments
            .iter()
            .find(|s| s.id() == segment_b)
            .ok_or(ProfileError::MissingSegment(segment_b))?;

        let shared = if a.end_index() == b.start_index() {
            a.end_index()
        } else if b.end_index() == a.start_index() {
            b.end_index()
        } else {
            return Err(ProfileError::SegmentUpdate(format!(
                "segments {segment_a} and {segment_b} are not adjacent"
            )));
        };

        for tag in Landmark::core_landmarks() {
            if let Ok(index) = collection.landmark_index(tag) {
                if index == shared {
                    return Err(ProfileError::SegmentUpdate(format!(
                        "cannot merge across the {tag} at index {index}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Copy the canonical segment pattern and every landmark offset onto a
    /// freshly aggregated destination population, interpolating across the
    /// difference in working lengths. Segment ids must survive the copy.
    pub fn copy_segments_and_landmarks_to(
        &mut self,
        destination: &mut NucleusPopulation,
    ) -> Result<(), ProfileError> {
        destination.build_collection()?;

        let source = self.population.collection();
        let source_length = source.length();
        let dest_length = destination.collection().length();
        let source_ids = source.segment_ids();

        for tag in source.landmarks() {
            let index = source.landmark_index(tag)?;
            let moved = proportional_index(source_length, index, dest_length);
            destination.collection_mut().set_landmark(tag, moved);
        }

        // Interpolate the ring through a template profile; the values are
        // irrelevant, only the boundary positions scale.
        let template = Profile::uniform(0.0, source_length)?;
        let segmented = SegmentedProfile::with_segments(
            template,
            source.segments(Landmark::ReferencePoint)?,
        )?;
        let scaled = segmented.interpolate(dest_length)?;
        destination
            .collection_mut()
            .set_segments(scaled.segments().to_vec())?;

        let dest_ids = destination.collection().segment_ids();
        if source_ids != dest_ids {
            return Err(ProfileError::SegmentUpdate(
                "segment ids are not consistent after copying to destination".into(),
            ));
        }
        Ok(())
    }

    /// Move a landmark in the canonical frame and re-fit it in every
    /// unlocked nucleus by best-fit offset against the landmark-anchored
    /// median profile.
    pub fn update_landmark(&mut self, tag: Landmark, index: usize) -> Result<(), ProfileError> {
        if tag == Landmark::ReferencePoint {
            return Err(ProfileError::SegmentUpdate(
                "the reference point is fixed at index 0".into(),
            ));
        }
        self.population.collection_mut().set_landmark(tag, index);
        if tag.kind() == LandmarkKind::Core {
            // Core landmarks sit on segment boundaries; the segmentation
            // pattern must be re-detected to follow them.
            log::warn!("Core landmark {tag} moved; segment re-detection is required");
            return Ok(());
        }

        let median =
            self.population
                .collection_mut()
                .profile(ProfileType::Angle, tag, Quartile::Median)?;
        for nucleus in self.population.nuclei_mut() {
            if nucleus.is_locked() {
                continue;
            }
            match nucleus
                .profile(ProfileType::Angle)
                .and_then(|p| p.find_best_fit_offset(&median))
            {
                Ok(offset) => nucleus.set_landmark(tag, offset),
                Err(e) => log::warn!(
                    "Could not fit landmark {tag} in nucleus {}: {e}",
                    nucleus.name()
                ),
            }
        }
        if let Some(consensus) = self.population.consensus_mut() {
            if let Ok(offset) = consensus
                .profile(ProfileType::Angle)
                .and_then(|p| p.find_best_fit_offset(&median))
            {
                consensus.set_landmark(tag, offset);
            }
        }
        Ok(())
    }
}
