//! Population-level quartile profiles.
//!
//! Every member profile is interpolated to a common working length, then
//! the 25th, 50th and 75th percentiles are taken per index across the
//! population. The three quartiles share one aggregation pass.

use crate::error::ProfileError;
use crate::profile::Profile;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quartile {
    Lower,
    Median,
    Upper,
}

impl Quartile {
    fn percentile(&self) -> f64 {
        match self {
            Quartile::Lower => 25.0,
            Quartile::Median => 50.0,
            Quartile::Upper => 75.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProfileAggregate {
    lower: Profile,
    median: Profile,
    upper: Profile,
    member_count: usize,
}

impl ProfileAggregate {
    /// Build the three quartile profiles from the members' native-length
    /// profiles. Member profiles are immutable, so the per-index reduction
    /// is parallelised over index ranges.
    pub fn build(members: &[Profile], length: usize) -> Result<Self, ProfileError> {
        if members.is_empty() {
            return Err(ProfileError::EmptyPopulation);
        }
        let interpolated: Vec<Profile> = members
            .par_iter()
            .map(|p| p.interpolate(length))
            .collect::<Result<_, _>>()?;

        let columns: Vec<(f64, f64, f64)> = (0..length)
            .into_par_iter()
            .map(|i| {
                let mut column: Vec<f64> =
                    interpolated.iter().map(|p| p.get(i as isize)).collect();
                column.sort_by(|a, b| a.partial_cmp(b).unwrap());
                (
                    percentile(&column, Quartile::Lower.percentile()),
                    percentile(&column, Quartile::Median.percentile()),
                    percentile(&column, Quartile::Upper.percentile()),
                )
            })
            .collect();

        Ok(ProfileAggregate {
            lower: Profile::new(columns.iter().map(|c| c.0).collect())?,
            median: Profile::new(columns.iter().map(|c| c.1).collect())?,
            upper: Profile::new(columns.iter().map(|c| c.2).collect())?,
            member_count: members.len(),
        })
    }

    pub fn quartile(&self, q: Quartile) -> &Profile {
        match q {
            Quartile::Lower => &self.lower,
            Quartile::Median => &self.median,
            Quartile::Upper => &self.upper,
        }
    }

    #[inline(always)]
    pub fn length(&self) -> usize {
        self.median.size()
    }

    #[inline(always)]
    pub fn member_count(&self) -> usize {
        self.member_count
    }
}

/// Percentile of a sorted slice with linear interpolation between closest
/// ranks.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-9);
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-9);
        assert!((percentile(&values, 100.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_of_uniform_members() {
        // Five nuclei of different native lengths, each flat at its own
        // value: the median profile is the median of the values at every
        // index, independent of native length.
        let lengths = [80usize, 90, 100, 110, 120];
        let members: Vec<Profile> = lengths
            .iter()
            .enumerate()
            .map(|(i, &l)| Profile::uniform(100.0 + i as f64, l).unwrap())
            .collect();
        let agg = ProfileAggregate::build(&members, 100).unwrap();
        assert_eq!(agg.length(), 100);
        assert_eq!(agg.member_count(), 5);
        for i in 0..100 {
            assert!((agg.quartile(Quartile::Median).get(i) - 102.0).abs() < 1e-9);
            assert!((agg.quartile(Quartile::Lower).get(i) - 101.0).abs() < 1e-9);
            assert!((agg.quartile(Quartile::Upper).get(i) - 103.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_population_rejected() {
        assert!(matches!(
            ProfileAggregate::build(&[], 100),
            Err(ProfileError::EmptyPopulation)
        ));
    }
}
