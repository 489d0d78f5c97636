use crate::types::Coords;
use anyhow::{Result, bail};

/// One-shot device position lookup.
pub trait Geolocator {
    fn current_position(&self) -> Result<Coords>;
}

/// A position known up front, e.g. given on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coords);

impl Geolocator for FixedPosition {
    fn current_position(&self) -> Result<Coords> {
        Ok(self.0)
    }
}

/// Location access denied or unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPosition;

impl Geolocator for NoPosition {
    fn current_position(&self) -> Result<Coords> {
        bail!("device position unavailable")
    }
}

/// Position from `Some`, denial from `None`.
impl Geolocator for Option<Coords> {
    fn current_position(&self) -> Result<Coords> {
        match self {
            Some(c) => FixedPosition(*c).current_position(),
            None => NoPosition.current_position(),
        }
    }
}
