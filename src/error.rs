use crate::landmark::{Landmark, ProfileType};
use std::error::Error;
use std::fmt;
use uuid::Uuid;

#[derive(Debug)]
pub enum ProfileError {
    /// A boundary move, merge, split or unmerge was rejected.
    /// The payload is the reason reported to the caller.
    SegmentUpdate(String),
    MissingLandmark(Landmark),
    MissingProfileType(ProfileType),
    MissingSegment(Uuid),
    LengthMismatch { expected: usize, actual: usize },
    NoDetectedIndex(String),
    EmptyProfile,
    EmptyPopulation,
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl Error for ProfileError {}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProfileError::SegmentUpdate(reason) => write!(f, "Segment update rejected: {reason}"),
            ProfileError::MissingLandmark(tag) => {
                write!(f, "Landmark {tag} is not present in this collection")
            }
            ProfileError::MissingProfileType(t) => write!(f, "Profile type {t} is not present"),
            ProfileError::MissingSegment(id) => write!(f, "Segment with id {id} not found"),
            ProfileError::LengthMismatch { expected, actual } => write!(
                f,
                "Profile length mismatch: expected {expected}, got {actual}"
            ),
            ProfileError::NoDetectedIndex(what) => write!(f, "No index detected: {what}"),
            ProfileError::EmptyProfile => write!(f, "Profile must contain at least one value"),
            ProfileError::EmptyPopulation => write!(f, "Population contains no nuclei"),
            ProfileError::Io(e) => write!(f, "I/O error: {e}"),
            ProfileError::Serde(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl From<std::io::Error> for ProfileError {
    fn from(err: std::io::Error) -> Self {
        ProfileError::Io(err)
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        ProfileError::Serde(err)
    }
}
