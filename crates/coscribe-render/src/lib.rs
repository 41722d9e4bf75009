//! Coscribe Render Library
//!
//! Cached, incremental rendering of annotated pages. The pixel backend is
//! abstracted behind [`DrawTarget`]/[`TargetFactory`] so the PDF rasterizer
//! stays outside the rendering logic.

mod renderer;
mod target;

pub use renderer::{PageRenderer, RendererRegistry, draw_stroke};
pub use target::{DrawTarget, TargetError, TargetFactory};
