//! Periodic boundary signals and the boolean masks derived from them.
//!
//! A [`Profile`] is a circular sequence of measurements sampled around a
//! nucleus outline. Index arithmetic is modulo the profile length, so
//! negative offsets and offsets beyond the end wrap rather than error.

use crate::error::ProfileError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Profiles shorter than this cannot be meaningfully interpolated.
pub const MINIMUM_PROFILE_LENGTH: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    values: Vec<f64>,
}

impl Profile {
    pub fn new(values: Vec<f64>) -> Result<Self, ProfileError> {
        if values.is_empty() {
            return Err(ProfileError::EmptyProfile);
        }
        Ok(Profile { values })
    }

    /// A profile holding the same value at every index.
    pub fn uniform(value: f64, length: usize) -> Result<Self, ProfileError> {
        if length == 0 {
            return Err(ProfileError::EmptyProfile);
        }
        Ok(Profile {
            values: vec![value; length],
        })
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    #[inline(always)]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Wrap any signed index onto `[0, size)`.
    #[inline(always)]
    pub fn wrap(&self, index: isize) -> usize {
        index.rem_euclid(self.values.len() as isize) as usize
    }

    /// Circular-safe accessor: `get(i) == get(i + k * size)` for any k.
    #[inline(always)]
    pub fn get(&self, index: isize) -> f64 {
        self.values[self.wrap(index)]
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::MIN, f64::max)
    }

    pub fn min_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::MAX, f64::min)
    }

    /// Index of the largest value among indices where `limits` is true.
    pub fn index_of_max(&self, limits: &BooleanProfile) -> Result<usize, ProfileError> {
        self.index_of_extremum(limits, |a, b| a > b, "maximum")
    }

    /// Index of the smallest value among indices where `limits` is true.
    pub fn index_of_min(&self, limits: &BooleanProfile) -> Result<usize, ProfileError> {
        self.index_of_extremum(limits, |a, b| a < b, "minimum")
    }

    fn index_of_extremum(
        &self,
        limits: &BooleanProfile,
        better: fn(f64, f64) -> bool,
        what: &str,
    ) -> Result<usize, ProfileError> {
        if limits.size() != self.size() {
            return Err(ProfileError::LengthMismatch {
                expected: self.size(),
                actual: limits.size(),
            });
        }
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.values.iter().enumerate() {
            if !limits.get(i as isize) {
                continue;
            }
            if best.map_or(true, |(_, b)| better(v, b)) {
                best = Some((i, v));
            }
        }
        best.map(|(i, _)| i).ok_or_else(|| {
            ProfileError::NoDetectedIndex(format!("no true indices in mask for {what} search"))
        })
    }

    /// Fraction of the profile covered up to the given index, 0 at the start.
    pub fn fraction_of_index(&self, index: usize) -> f64 {
        index as f64 / self.values.len() as f64
    }

    /// The index at the given fraction of the profile length.
    pub fn index_of_fraction(&self, fraction: f64) -> usize {
        debug_assert!((0.0..=1.0).contains(&fraction));
        (((self.values.len() as f64) * fraction) as usize) % self.values.len()
    }

    /// Moving average over a window of `2 * window + 1` points, wrapping at
    /// the profile ends.
    pub fn smooth(&self, window: usize) -> Profile {
        let n = self.values.len() as isize;
        let mut result = Vec::with_capacity(self.values.len());
        for i in 0..n {
            let mut sum = 0.0;
            for j in -(window as isize)..=(window as isize) {
                sum += self.get(i + j);
            }
            result.push(sum / (window as f64 * 2.0 + 1.0));
        }
        Profile { values: result }
    }

    /// Windowed discrete derivative: the accumulated change across the
    /// window either side of each index, wrapping circularly.
    pub fn calculate_deltas(&self, window: usize) -> Profile {
        let mut result = Vec::with_capacity(self.values.len());
        for i in 0..self.values.len() as isize {
            let mut delta = 0.0;
            for k in 0..window as isize {
                delta += self.get(i - k) - self.get(i - k - 1);
                delta += self.get(i + k + 1) - self.get(i + k);
            }
            result.push(delta);
        }
        Profile { values: result }
    }

    /// Mark indices that are lower than every value in the window either
    /// side, with the window values strictly rising away from the index.
    pub fn local_minima(&self, window: usize) -> BooleanProfile {
        self.local_extrema(window, |inner, outer| inner < outer)
    }

    /// As [`Self::local_minima`], keeping only minima below `threshold`.
    pub fn local_minima_below(&self, window: usize, threshold: f64) -> BooleanProfile {
        let minima = self.local_minima(window);
        let mask: Vec<bool> = (0..self.values.len())
            .map(|i| minima.get(i as isize) && self.values[i] < threshold)
            .collect();
        BooleanProfile::new(mask)
    }

    /// Mark indices that are higher than every value in the window either
    /// side, with the window values strictly falling away from the index.
    pub fn local_maxima(&self, window: usize) -> BooleanProfile {
        self.local_extrema(window, |inner, outer| inner > outer)
    }

    /// As [`Self::local_maxima`], keeping only maxima above `threshold`.
    pub fn local_maxima_above(&self, window: usize, threshold: f64) -> BooleanProfile {
        let maxima = self.local_maxima(window);
        let mask: Vec<bool> = (0..self.values.len())
            .map(|i| maxima.get(i as isize) && self.values[i] > threshold)
            .collect();
        BooleanProfile::new(mask)
    }

    fn local_extrema(&self, window: usize, dominates: fn(f64, f64) -> bool) -> BooleanProfile {
        let mut mask = Vec::with_capacity(self.values.len());
        for i in 0..self.values.len() as isize {
            let mut is_extremum = true;
            for k in 0..window as isize {
                // Values must keep receding from the candidate on both sides.
                let (prev_in, prev_out) = (self.get(i - k), self.get(i - k - 1));
                let (next_in, next_out) = (self.get(i + k), self.get(i + k + 1));
                if !dominates(prev_in, prev_out) || !dominates(next_in, next_out) {
                    is_extremum = false;
                    break;
                }
            }
            mask.push(is_extremum);
        }
        BooleanProfile::new(mask)
    }

    /// Linear resample to `new_length`, preserving relative position around
    /// the ring. Resampling to the current length returns an equal profile.
    pub fn interpolate(&self, new_length: usize) -> Result<Profile, ProfileError> {
        if new_length < MINIMUM_PROFILE_LENGTH {
            return Err(ProfileError::LengthMismatch {
                expected: MINIMUM_PROFILE_LENGTH,
                actual: new_length,
            });
        }
        if new_length == self.values.len() {
            return Ok(self.clone());
        }
        let old_len = self.values.len();
        let ratio = old_len as f64 / new_length as f64;
        let mut result = Vec::with_capacity(new_length);
        for i in 0..new_length {
            let j = i as f64 * ratio;
            let j0 = (j as usize) % old_len;
            let j1 = (j0 + 1) % old_len;
            let frac = j - j.floor();
            result.push(self.values[j0] + (self.values[j1] - self.values[j0]) * frac);
        }
        Ok(Profile { values: result })
    }

    /// Rotate so that `offset` becomes index 0. Non-destructive.
    pub fn start_from(&self, offset: isize) -> Profile {
        let start = self.wrap(offset);
        let mut values = Vec::with_capacity(self.values.len());
        values.extend_from_slice(&self.values[start..]);
        values.extend_from_slice(&self.values[..start]);
        Profile { values }
    }

    /// A new profile reading the values in the opposite direction.
    pub fn reversed(&self) -> Profile {
        let mut values = self.values.clone();
        values.reverse();
        Profile { values }
    }

    /// The window of `2 * window + 1` values centred on `index`.
    pub fn get_window(&self, index: isize, window: usize) -> Profile {
        let mut values = Vec::with_capacity(window * 2 + 1);
        for j in -(window as isize)..=(window as isize) {
            values.push(self.get(index + j));
        }
        Profile { values }
    }

    /// The inclusive subregion from `start` to `end`, wrapping past the
    /// profile end when `end < start`.
    pub fn get_subregion(&self, start: usize, end: usize) -> Result<Profile, ProfileError> {
        if start >= self.values.len() || end >= self.values.len() {
            return Err(ProfileError::LengthMismatch {
                expected: self.values.len(),
                actual: start.max(end),
            });
        }
        let mut values = Vec::new();
        let mut i = start;
        loop {
            values.push(self.values[i]);
            if i == end {
                break;
            }
            i = (i + 1) % self.values.len();
        }
        Ok(Profile { values })
    }

    /// Σ(aᵢ−bᵢ)² after interpolating both profiles to `common_length`.
    /// The distance metric for similarity-to-median and variability scores.
    pub fn absolute_square_difference(
        &self,
        other: &Profile,
        common_length: usize,
    ) -> Result<f64, ProfileError> {
        let a = self.interpolate(common_length)?;
        let b = other.interpolate(common_length)?;
        Ok(square_difference(&a.values, &b.values))
    }

    /// The rotation of this profile that minimises the square difference
    /// against `template`. Used to align a landmark to a median profile.
    pub fn find_best_fit_offset(&self, template: &Profile) -> Result<usize, ProfileError> {
        let template = template.interpolate(self.values.len())?;
        let mut best_offset = 0;
        let mut best_score = f64::MAX;
        for offset in 0..self.values.len() {
            let mut score = 0.0;
            for i in 0..self.values.len() {
                let d = self.get((i + offset) as isize) - template.values[i];
                score += d * d;
            }
            if score < best_score {
                best_score = score;
                best_offset = offset;
            }
        }
        Ok(best_offset)
    }

    pub fn add(&self, other: &Profile) -> Result<Profile, ProfileError> {
        self.zip_with(other, |a, b| a + b)
    }

    pub fn subtract(&self, other: &Profile) -> Result<Profile, ProfileError> {
        self.zip_with(other, |a, b| a - b)
    }

    pub fn add_scalar(&self, value: f64) -> Profile {
        self.map(|v| v + value)
    }

    pub fn multiply_scalar(&self, value: f64) -> Profile {
        self.map(|v| v * value)
    }

    pub fn divide_scalar(&self, value: f64) -> Profile {
        self.map(|v| v / value)
    }

    pub fn absolute(&self) -> Profile {
        self.map(f64::abs)
    }

    pub fn to_power_of(&self, exponent: f64) -> Profile {
        self.map(|v| v.powf(exponent))
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Profile {
        Profile {
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    fn zip_with(&self, other: &Profile, f: fn(f64, f64) -> f64) -> Result<Profile, ProfileError> {
        if self.size() != other.size() {
            return Err(ProfileError::LengthMismatch {
                expected: self.size(),
                actual: other.size(),
            });
        }
        Ok(Profile {
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.values)
    }
}

fn square_difference(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum()
}

/// A boolean mask over a profile, with the same circular indexing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BooleanProfile {
    values: Vec<bool>,
}

impl BooleanProfile {
    pub fn new(values: Vec<bool>) -> Self {
        BooleanProfile { values }
    }

    pub fn filled(value: bool, length: usize) -> Self {
        BooleanProfile {
            values: vec![value; length],
        }
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    #[inline(always)]
    pub fn get(&self, index: isize) -> bool {
        self.values[index.rem_euclid(self.values.len() as isize) as usize]
    }

    pub fn count_true(&self) -> usize {
        self.values.iter().filter(|&&v| v).count()
    }

    pub fn or(&self, other: &BooleanProfile) -> BooleanProfile {
        self.zip_with(other, |a, b| a || b)
    }

    pub fn and(&self, other: &BooleanProfile) -> BooleanProfile {
        self.zip_with(other, |a, b| a && b)
    }

    pub fn invert(&self) -> BooleanProfile {
        BooleanProfile {
            values: self.values.iter().map(|&v| !v).collect(),
        }
    }

    fn zip_with(&self, other: &BooleanProfile, f: fn(bool, bool) -> bool) -> BooleanProfile {
        assert_eq!(self.size(), other.size(), "mask sizes do not match");
        BooleanProfile {
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Profile {
        Profile::new((0..n).map(|i| i as f64).collect()).unwrap()
    }

    #[test]
    fn test_empty_profile_rejected() {
        assert!(Profile::new(vec![]).is_err());
    }

    #[test]
    fn test_circular_indexing() {
        let p = ramp(10);
        for k in -3isize..=3 {
            assert_eq!(p.get(2), p.get(2 + k * 10));
        }
        assert_eq!(p.get(-1), 9.0);
    }

    #[test]
    fn test_smooth_uniform_is_unchanged() {
        let p = Profile::uniform(5.0, 20).unwrap();
        let s = p.smooth(2);
        for i in 0..20 {
            assert!((s.get(i as isize) - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_interpolate_identity() {
        let p = ramp(50);
        let q = p.interpolate(50).unwrap();
        assert_eq!(p, q);
        assert_eq!(p.interpolate(120).unwrap().size(), 120);
        assert_eq!(p.interpolate(17).unwrap().size(), 17);
    }

    #[test]
    fn test_interpolate_preserves_relative_position() {
        // A single spike keeps its relative position through resampling.
        let mut values = vec![0.0; 100];
        values[50] = 10.0;
        let p = Profile::new(values).unwrap();
        let q = p.interpolate(200).unwrap();
        let mask = BooleanProfile::filled(true, 200);
        let peak = q.index_of_max(&mask).unwrap();
        assert!((peak as isize - 100).abs() <= 1);
    }

    #[test]
    fn test_start_from_rotates() {
        let p = ramp(10);
        let q = p.start_from(3);
        assert_eq!(q.get(0), 3.0);
        assert_eq!(q.get(7), 0.0);
        assert_eq!(q.size(), 10);
        // Negative offsets wrap.
        let r = p.start_from(-2);
        assert_eq!(r.get(0), 8.0);
    }

    #[test]
    fn test_local_maxima_detects_peak() {
        let p = Profile::new(
            (0..100)
                .map(|i| 180.0 + 40.0 * (i as f64 * std::f64::consts::TAU / 100.0).sin())
                .collect(),
        )
        .unwrap();
        let maxima = p.local_maxima_above(5, 180.0);
        assert!(maxima.count_true() >= 1);
        assert!(maxima.get(25));
        let minima = p.local_minima_below(5, 180.0);
        assert!(minima.get(75));
    }

    #[test]
    fn test_absolute_square_difference_zero_for_equal() {
        let p = ramp(40);
        assert!(p.absolute_square_difference(&p, 60).unwrap() < 1e-9);
    }

    #[test]
    fn test_find_best_fit_offset_recovers_rotation() {
        let p = Profile::new(
            (0..80)
                .map(|i| (i as f64 * std::f64::consts::TAU / 80.0).sin())
                .collect(),
        )
        .unwrap();
        let rotated = p.start_from(13);
        // Rotating the rotated profile by the found offset restores p.
        let offset = rotated.find_best_fit_offset(&p).unwrap();
        assert_eq!(offset, 80 - 13);
    }

    #[test]
    fn test_subregion_wraps() {
        let p = ramp(10);
        let sub = p.get_subregion(8, 1).unwrap();
        assert_eq!(sub.values(), &[8.0, 9.0, 0.0, 1.0]);
    }

    #[test]
    fn test_mask_combinators() {
        let a = BooleanProfile::new(vec![true, false, true, false]);
        let b = BooleanProfile::new(vec![true, true, false, false]);
        assert_eq!(a.or(&b).count_true(), 3);
        assert_eq!(a.and(&b).count_true(), 1);
        assert_eq!(a.invert().count_true(), 2);
    }
}
