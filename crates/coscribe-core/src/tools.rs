//! Tool system for annotating pages.

use crate::color::Color;
use crate::page::Page;
use crate::stroke::{Stroke, StrokeId, StrokeIdGen};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Pen,
    Eraser,
    Pan,
}

/// Pointer buttons as the view reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// Fixed button-to-tool mapping: primary draws, middle pans, secondary
    /// erases.
    pub fn tool(self) -> ToolKind {
        match self {
            PointerButton::Primary => ToolKind::Pen,
            PointerButton::Middle => ToolKind::Pan,
            PointerButton::Secondary => ToolKind::Eraser,
        }
    }
}

/// Pen appearance for strokes committed by one controller.
///
/// Each controller carries its own style; two views over the same document
/// can draw in different colors at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenStyle {
    pub color: Color,
    pub width: f64,
}

impl Default for PenStyle {
    fn default() -> Self {
        Self {
            color: Color::pen_blue(),
            width: 1.5,
        }
    }
}

/// What a pointer event did, for the view to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEffect {
    /// Nothing to repaint or scroll.
    None,
    /// The in-progress pen preview changed; repaint the overlay.
    PreviewChanged,
    /// Scroll the viewport by this device-space delta.
    ScrollBy(Vec2),
    /// A pen gesture finished and the stroke was committed to the page.
    StrokeCommitted { layer: usize, id: StrokeId },
    /// An eraser event removed these strokes from the page.
    StrokesErased { layer: usize, ids: Vec<StrokeId> },
}

/// State of a tool gesture.
#[derive(Debug, Clone, Default)]
enum ToolState {
    /// No button held.
    #[default]
    Idle,
    /// Pen down, accumulating page-space points.
    Drawing { points: Vec<Point> },
    /// Eraser down.
    Erasing,
    /// Middle button down, tracking the last device-space position.
    Panning { last: Point },
}

/// In-progress pen stroke, for the view to paint as an overlay.
///
/// Never part of any cached rendering; it exists only between press and
/// release.
#[derive(Debug, Clone, PartialEq)]
pub struct PenPreview<'a> {
    pub points: &'a [Point],
    pub style: PenStyle,
}

/// Translates pointer events into page edits, one gesture at a time.
///
/// A second button press while a gesture is active is ignored; release of
/// the active button always returns the controller to idle. Device
/// coordinates are converted to page space by dividing by the view's scale,
/// so committed strokes are zoom-independent.
#[derive(Debug, Clone)]
pub struct ToolController {
    state: ToolState,
    active_button: Option<PointerButton>,
    pub pen_style: PenStyle,
    /// Page-space pick radius for the eraser, added to each stroke's half
    /// width during hit testing.
    pub eraser_tolerance: f64,
    ids: StrokeIdGen,
}

impl ToolController {
    pub fn new(ids: StrokeIdGen) -> Self {
        Self {
            state: ToolState::Idle,
            active_button: None,
            pen_style: PenStyle::default(),
            eraser_tolerance: 3.0,
            ids,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, ToolState::Idle)
    }

    /// The in-progress pen stroke, if one is being drawn.
    pub fn preview(&self) -> Option<PenPreview<'_>> {
        match &self.state {
            ToolState::Drawing { points } => Some(PenPreview {
                points,
                style: self.pen_style,
            }),
            _ => None,
        }
    }

    /// Begin a gesture. `device` is in device pixels; `scale` maps page
    /// space to device space.
    pub fn press(
        &mut self,
        page: &mut Page,
        button: PointerButton,
        device: Point,
        scale: f64,
    ) -> GestureEffect {
        if self.is_active() {
            return GestureEffect::None;
        }
        self.active_button = Some(button);
        match button.tool() {
            ToolKind::Pen => {
                self.state = ToolState::Drawing {
                    points: vec![to_page(device, scale)],
                };
                GestureEffect::PreviewChanged
            }
            ToolKind::Eraser => {
                self.state = ToolState::Erasing;
                self.erase_at(page, to_page(device, scale))
            }
            ToolKind::Pan => {
                self.state = ToolState::Panning { last: device };
                GestureEffect::None
            }
        }
    }

    /// Continue the active gesture. Motion with no gesture active is a hover
    /// and does nothing.
    pub fn motion(&mut self, page: &mut Page, device: Point, scale: f64) -> GestureEffect {
        match &mut self.state {
            ToolState::Idle => GestureEffect::None,
            ToolState::Drawing { points } => {
                points.push(to_page(device, scale));
                GestureEffect::PreviewChanged
            }
            ToolState::Erasing => self.erase_at(page, to_page(device, scale)),
            ToolState::Panning { last } => {
                let delta = device - *last;
                *last = device;
                GestureEffect::ScrollBy(delta)
            }
        }
    }

    /// End the active gesture. Only the button that started the gesture ends
    /// it; releasing another button mid-gesture is ignored.
    pub fn release(&mut self, page: &mut Page, button: PointerButton) -> GestureEffect {
        if self.active_button != Some(button) {
            return GestureEffect::None;
        }
        self.active_button = None;
        match std::mem::take(&mut self.state) {
            ToolState::Idle => GestureEffect::None,
            ToolState::Drawing { points } => {
                // A press with no motion is a dot; still a valid stroke.
                if points.is_empty() {
                    return GestureEffect::None;
                }
                let stroke = Stroke::new(
                    self.ids.next_id(),
                    self.pen_style.color,
                    self.pen_style.width,
                    points,
                );
                let id = stroke.id();
                if page.commit_stroke(0, stroke) {
                    GestureEffect::StrokeCommitted { layer: 0, id }
                } else {
                    GestureEffect::None
                }
            }
            ToolState::Erasing => GestureEffect::None,
            ToolState::Panning { .. } => GestureEffect::None,
        }
    }

    /// Abort the active gesture, discarding any in-progress stroke.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.active_button = None;
    }

    fn erase_at(&self, page: &mut Page, point: Point) -> GestureEffect {
        let hits: Vec<StrokeId> = page
            .layer(0)
            .map(|layer| {
                layer
                    .strokes()
                    .iter()
                    .filter(|s| s.hit_test(point, self.eraser_tolerance))
                    .map(|s| s.id())
                    .collect()
            })
            .unwrap_or_default();
        if hits.is_empty() {
            return GestureEffect::None;
        }
        for id in &hits {
            page.delete_stroke(0, *id);
        }
        GestureEffect::StrokesErased { layer: 0, ids: hits }
    }
}

fn to_page(device: Point, scale: f64) -> Point {
    Point::new(device.x / scale, device.y / scale)
}
