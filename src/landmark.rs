//! Landmark tags and profile types shared across the collection and nuclei.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named reference index within a profile's canonical frame. The reference
/// point is pinned to index 0 of the canonical frame and never moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Landmark {
    ReferencePoint,
    OrientationPoint,
    TopVertical,
    BottomVertical,
}

/// Core landmarks sit on segment boundaries and constrain segment edits.
/// Extended landmarks are free annotations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LandmarkKind {
    Core,
    Extended,
}

impl Landmark {
    pub fn kind(&self) -> LandmarkKind {
        match self {
            Landmark::ReferencePoint | Landmark::OrientationPoint => LandmarkKind::Core,
            Landmark::TopVertical | Landmark::BottomVertical => LandmarkKind::Extended,
        }
    }

    pub fn core_landmarks() -> [Landmark; 2] {
        [Landmark::ReferencePoint, Landmark::OrientationPoint]
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Landmark::ReferencePoint => "reference point",
            Landmark::OrientationPoint => "orientation point",
            Landmark::TopVertical => "top vertical",
            Landmark::BottomVertical => "bottom vertical",
        };
        write!(f, "{name}")
    }
}

/// The kind of measurement sampled around the nucleus boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileType {
    Angle,
    Diameter,
    Radius,
}

impl ProfileType {
    pub fn all() -> [ProfileType; 3] {
        [ProfileType::Angle, ProfileType::Diameter, ProfileType::Radius]
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ProfileType::Angle => "angle",
            ProfileType::Diameter => "diameter",
            ProfileType::Radius => "radius",
        };
        write!(f, "{name}")
    }
}
