//! Negotiated frame geometry, discovered once per stream.

use crate::error::{StreamError, StreamResult};

/// Bytes per packed-RGB pixel.
pub const RGB_BYTES_PER_PIXEL: usize = 3;

/// Width and height of decoded frames; `-1` until discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub const UNDISCOVERED: i32 = -1;

    pub const fn undiscovered() -> Self {
        Self {
            width: Self::UNDISCOVERED,
            height: Self::UNDISCOVERED,
        }
    }

    pub fn is_discovered(&self) -> bool {
        self.width != Self::UNDISCOVERED && self.height != Self::UNDISCOVERED
    }

    /// Records the negotiated size. Later calls are ignored once discovered.
    pub fn discover(&mut self, width: i32, height: i32) -> StreamResult<()> {
        if self.is_discovered() {
            return Ok(());
        }
        if width <= 0 || height <= 0 {
            return Err(StreamError::geometry_unavailable(format!(
                "negotiated size {}x{} is not usable",
                width, height
            )));
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Size a packed-RGB frame must have, once discovered.
    pub fn expected_len(&self) -> Option<usize> {
        if !self.is_discovered() {
            return None;
        }
        Some(self.width as usize * self.height as usize * RGB_BYTES_PER_PIXEL)
    }

    /// Checks a decoded payload against the discovered size.
    pub fn check_len(&self, actual: usize) -> StreamResult<()> {
        match self.expected_len() {
            Some(expected) if expected != actual => {
                Err(StreamError::size_invariant(expected, actual))
            }
            Some(_) => Ok(()),
            None => Err(StreamError::geometry_unavailable(
                "frame arrived before geometry was discovered",
            )),
        }
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.is_discovered()
            .then_some((self.width as u32, self.height as u32))
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::undiscovered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FallbackAction;
    use crate::error::Recoverable;

    #[test]
    fn test_starts_undiscovered() {
        let geometry = Geometry::default();
        assert!(!geometry.is_discovered());
        assert_eq!(geometry.width, -1);
        assert_eq!(geometry.expected_len(), None);
        assert_eq!(geometry.dimensions(), None);
    }

    #[test]
    fn test_discover_is_idempotent() {
        let mut geometry = Geometry::default();
        geometry.discover(1280, 720).unwrap();
        geometry.discover(640, 480).unwrap();
        assert_eq!(geometry.dimensions(), Some((1280, 720)));
        assert_eq!(geometry.expected_len(), Some(1280 * 720 * 3));
    }

    #[test]
    fn test_discover_rejects_nonsense() {
        let mut geometry = Geometry::default();
        assert!(geometry.discover(0, 720).is_err());
        assert!(!geometry.is_discovered());
    }

    #[test]
    fn test_size_mismatch_is_fatal() {
        let mut geometry = Geometry::default();
        geometry.discover(4, 2).unwrap();
        assert!(geometry.check_len(24).is_ok());
        let err = geometry.check_len(23).unwrap_err();
        assert_eq!(err.fallback(), FallbackAction::Abort);
    }
}
