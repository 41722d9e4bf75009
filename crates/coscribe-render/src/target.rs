//! Drawing target abstraction.
//!
//! The actual pixel backend (a PDF rasterizer painting into an image
//! surface) lives outside this crate; rendering logic only needs a small
//! painting vocabulary plus a factory that produces backdrop-initialized
//! surfaces.

use coscribe_core::{Color, Page};
use kurbo::{Point, Rect};
use thiserror::Error;

/// Target creation errors.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The page backend could not rasterize (e.g. a broken PDF page).
    /// Reported to the user, never fatal to the session.
    #[error("Backdrop rendering failed: {0}")]
    Backdrop(String),
    #[error("Surface allocation failed: {0}")]
    Allocation(String),
}

/// A device-pixel surface that stroke content is painted onto.
///
/// Geometry arrives in page space together with the page-to-device scale;
/// the target applies the scale itself so implementations can batch the
/// transform however suits them.
pub trait DrawTarget {
    /// Surface width in device pixels.
    fn width(&self) -> u32;

    /// Surface height in device pixels.
    fn height(&self) -> u32;

    /// Paint a polyline with round caps and joins. A single-point polyline
    /// is painted as a filled dot of the stroke width.
    fn stroke_polyline(&mut self, points: &[Point], color: Color, width: f64, scale: f64);

    /// Fill a page-space rectangle (used for the search highlight).
    fn fill_rect(&mut self, rect: Rect, color: Color, scale: f64);
}

/// Produces drawing targets whose initial content is the page backdrop.
pub trait TargetFactory {
    type Target: DrawTarget;

    /// Create a surface of the given device size with the page's backdrop
    /// (the rasterized PDF page) already painted.
    fn create(&mut self, page: &Page, width: u32, height: u32)
    -> Result<Self::Target, TargetError>;
}
