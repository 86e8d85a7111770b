//! Platform layer for the overlay window
//!
//! Gamescope hosts external overlays through XWayland, so the only backend
//! is X11. The window is transparent (32-bit ARGB visual), undecorated,
//! click-through, and tagged with `GAMESCOPE_EXTERNAL_OVERLAY` so gamescope
//! composites it as an overlay layer.

pub mod x11;

pub use x11::OverlayWindow;

use thiserror::Error;

/// The usable area of the primary monitor, excluding panels and docks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkArea {
    /// X position in screen space
    pub x: i32,
    /// Y position in screen space
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl WorkArea {
    /// Intersect with another area; an empty intersection yields `None`
    pub fn intersect(self, other: WorkArea) -> Option<WorkArea> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width as i32).min(other.x + other.width as i32);
        let y1 = (self.y + self.height as i32).min(other.y + other.height as i32);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(WorkArea {
            x: x0,
            y: y0,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// Errors that can occur in platform operations
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to connect to the X server: {0}")]
    Connection(String),
    #[error("required X extension unavailable: {0}")]
    UnsupportedFeature(&'static str),
    #[error("no 32-bit ARGB visual available (a compositor is required)")]
    NoArgbVisual,
    #[error("shared memory buffer: {0}")]
    Buffer(String),
    #[error("X11 request failed: {0}")]
    Request(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_clips_to_the_overlap() {
        let monitor = WorkArea {
            x: 0,
            y: 0,
            width: 1280,
            height: 800,
        };
        let workarea = WorkArea {
            x: 0,
            y: 30,
            width: 1280,
            height: 770,
        };
        assert_eq!(monitor.intersect(workarea), Some(workarea));
    }

    #[test]
    fn intersect_of_disjoint_areas_is_none() {
        let left = WorkArea {
            x: 0,
            y: 0,
            width: 100,
            height: 100,
        };
        let right = WorkArea {
            x: 200,
            y: 0,
            width: 100,
            height: 100,
        };
        assert_eq!(left.intersect(right), None);
    }
}
