//! JSON persistence for a whole analysis dataset.
//!
//! Quartile aggregates and caches are derived data and are not persisted;
//! call [`Dataset::rebuild`] after loading to restore them at the stored
//! working length.

use crate::error::ProfileError;
use crate::population::NucleusPopulation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dataset {
    pub population: NucleusPopulation,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Dataset {
    pub fn new(population: NucleusPopulation) -> Self {
        Dataset {
            population,
            metadata: HashMap::new(),
        }
    }

    pub fn load_from_path(path: &str) -> Result<Self, ProfileError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save_to_path(&self, path: &str) -> Result<(), ProfileError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Rebuild the derived aggregates at the stored working length, so the
    /// canonical ring does not slip against a recomputed median length.
    pub fn rebuild(&mut self) -> Result<(), ProfileError> {
        let length = self.population.collection().length();
        if length == 0 {
            self.population.build_collection()
        } else {
            self.population.rebuild_collection_at(length)
        }
    }
}
