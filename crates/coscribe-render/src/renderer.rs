//! Cached incremental page rendering.
//!
//! Each page keeps one backbuffer at the current display width. Appending a
//! stroke paints just that stroke into the cache and reports a small dirty
//! rect; anything else (deletes, zoom changes, highlight changes) invalidates
//! the cache and the next `prepare` rebuilds it from the data model.

use crate::target::{DrawTarget, TargetError, TargetFactory};
use coscribe_core::{Color, Page, PageId, Stroke};
use kurbo::Rect;
use std::collections::HashMap;

/// Padding in device pixels added around incremental dirty rects, covering
/// antialiasing bleed at the stroke edge.
const DIRTY_RECT_PADDING: f64 = 2.0;

/// Fill color for the search result highlight.
const SEARCH_HIGHLIGHT: Color = Color {
    r: 255,
    g: 235,
    b: 59,
    a: 96,
};

/// Paint one stroke and return the device-space rect it touched.
///
/// Pure with respect to the page: the same stroke at the same scale yields
/// the same dirty rect on every target.
pub fn draw_stroke<T: DrawTarget + ?Sized>(target: &mut T, stroke: &Stroke, scale: f64) -> Rect {
    target.stroke_polyline(stroke.points(), stroke.color(), stroke.width(), scale);
    let b = stroke.ink_bounds();
    Rect::new(b.x0 * scale, b.y0 * scale, b.x1 * scale, b.y1 * scale)
}

/// Cached renderer for a single page.
pub struct PageRenderer<T: DrawTarget> {
    backbuffer: Option<T>,
    /// Display width the backbuffer was built for, in device pixels.
    display_width: u32,
    /// Page-to-device scale of the backbuffer.
    scale: f64,
    valid: bool,
}

impl<T: DrawTarget> PageRenderer<T> {
    pub fn new() -> Self {
        Self {
            backbuffer: None,
            display_width: 0,
            scale: 1.0,
            valid: false,
        }
    }

    /// Whether the cache can be blitted as-is at this width.
    pub fn is_valid_for(&self, display_width: u32) -> bool {
        self.valid && self.backbuffer.is_some() && self.display_width == display_width
    }

    /// Page-to-device scale of the current backbuffer.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Return a backbuffer ready to blit at `display_width`, rebuilding it
    /// if the cache is stale.
    ///
    /// A rebuild paints the backdrop, then every stroke in layer z-order,
    /// then the search highlight. In-progress tool previews are never part
    /// of the result.
    pub fn prepare<F>(
        &mut self,
        page: &Page,
        display_width: u32,
        factory: &mut F,
    ) -> Result<&T, TargetError>
    where
        F: TargetFactory<Target = T>,
    {
        if !self.is_valid_for(display_width) {
            self.rebuild(page, display_width, factory)?;
        }
        // rebuild either installed a backbuffer or returned the error
        match self.backbuffer.as_ref() {
            Some(buf) => Ok(buf),
            None => Err(TargetError::Allocation("no backbuffer".to_string())),
        }
    }

    fn rebuild<F>(
        &mut self,
        page: &Page,
        display_width: u32,
        factory: &mut F,
    ) -> Result<(), TargetError>
    where
        F: TargetFactory<Target = T>,
    {
        let scale = display_width as f64 / page.width();
        let display_height = (page.height() * scale).ceil() as u32;
        log::debug!(
            "rebuilding page {} at {}x{}",
            page.id(),
            display_width,
            display_height
        );

        let mut target = factory.create(page, display_width, display_height)?;
        for layer in page.layers() {
            for stroke in layer.strokes() {
                draw_stroke(&mut target, stroke, scale);
            }
        }
        if let Some(rect) = page.search_highlight() {
            target.fill_rect(rect, SEARCH_HIGHLIGHT, scale);
        }

        self.backbuffer = Some(target);
        self.display_width = display_width;
        self.scale = scale;
        self.valid = true;
        Ok(())
    }

    /// Paint one newly committed stroke into the cache.
    ///
    /// Returns the device-space dirty rect to repaint, or `None` when the
    /// cache is stale for `display_width`, in which case the caller falls
    /// back to `prepare`.
    pub fn blit_stroke(&mut self, stroke: &Stroke, display_width: u32) -> Option<Rect> {
        if !self.is_valid_for(display_width) {
            return None;
        }
        let scale = self.scale;
        let buf = self.backbuffer.as_mut()?;
        let dirty = draw_stroke(buf, stroke, scale);
        Some(dirty.inflate(DIRTY_RECT_PADDING, DIRTY_RECT_PADDING))
    }

    /// Mark the cache stale. The backbuffer is kept for reuse as stale
    /// content until the next `prepare` replaces it.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

impl<T: DrawTarget> Default for PageRenderer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Renderer state for all pages, keyed by page identity.
///
/// Pages know nothing about rendering; views look their renderer up here
/// and drop it when the page leaves the visible set.
pub struct RendererRegistry<T: DrawTarget> {
    renderers: HashMap<PageId, PageRenderer<T>>,
}

impl<T: DrawTarget> RendererRegistry<T> {
    pub fn new() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Renderer for a page, created on first use.
    pub fn renderer_mut(&mut self, page: PageId) -> &mut PageRenderer<T> {
        self.renderers.entry(page).or_default()
    }

    pub fn get(&self, page: PageId) -> Option<&PageRenderer<T>> {
        self.renderers.get(&page)
    }

    /// Drop the renderer (and its backbuffer) for a page that is no longer
    /// displayed.
    pub fn remove(&mut self, page: PageId) {
        self.renderers.remove(&page);
    }

    /// Invalidate every cache, e.g. after a zoom change.
    pub fn invalidate_all(&mut self) {
        for renderer in self.renderers.values_mut() {
            renderer.invalidate();
        }
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl<T: DrawTarget> Default for RendererRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
