//! Segmentation and landmark alignment for nucleus boundary profiles.
//!
//! Boundary outlines are analysed as periodic signals: segments are
//! detected in the population median profile, aggregated into quartile
//! profiles anchored at shared landmarks, and kept identity-consistent
//! across every nucleus as segments are merged, split or re-indexed.

pub mod aggregate;
pub mod dataset;
pub mod error;
pub mod landmark;
pub mod nucleus;
pub mod population;
pub mod profile;
pub mod profile_collection;
pub mod profile_manager;
pub mod segment;
pub mod segmented_profile;
pub mod segmenter;
