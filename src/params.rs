//! Validated per-call parameters.
//!
//! These types are the interface between the [`api`](crate::api) facade (which
//! validates caller input) and the [`native`](crate::native) codec (which only
//! ever sees values that already passed validation).
//!
//! - [`Quality`]: compression quality, 0–100 inclusive. Rejected, not clamped, when out of range.
//! - [`Rotation`]: clockwise quarter turn of 90, 180 or 270 degrees. 0 and 360 are
//!   not rotations and are rejected like any other angle.

use crate::error::Error;
use std::fmt;

/// Compression quality (0-100). Semantics of the scale belong to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    pub const HIGH: Quality = Quality(90);
    pub const MEDIUM: Quality = Quality(60);
    pub const LOW: Quality = Quality(30);

    pub fn new(value: i32) -> Result<Self, Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or_else(|| Error::invalid(format!("quality must be 0-100, got {value}")))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clockwise rotation by a non-identity multiple of 90 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 3] = [Rotation::Deg90, Rotation::Deg180, Rotation::Deg270];

    pub fn new(degrees: i32) -> Result<Self, Error> {
        match degrees {
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(Error::invalid(format!(
                "rotation angle must be 90, 180 or 270, got {degrees}"
            ))),
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}
