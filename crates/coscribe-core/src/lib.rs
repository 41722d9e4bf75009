//! Coscribe Core Library
//!
//! Data model, tools and replication logic for collaborative document
//! annotation. Rendering lives in `coscribe-render`; this crate knows nothing
//! about pixels beyond page dimensions.

pub mod color;
pub mod document;
pub mod geometry;
pub mod layer;
pub mod page;
pub mod replication;
pub mod storage;
pub mod stroke;
pub mod tools;

pub use color::Color;
pub use document::{Document, RemoteApply};
pub use layer::Layer;
pub use page::{Page, PageEvent, PageId, PageSource, SubscriptionId};
pub use replication::{ClientMessage, ConnectionState, ServerMessage, SessionEvent, StrokeEvent};
pub use storage::{DocumentExporter, StorageError, StorageResult};
pub use stroke::{PeerId, Stroke, StrokeId, StrokeIdGen};
pub use tools::{GestureEffect, PenStyle, PointerButton, ToolController, ToolKind};

#[cfg(not(target_arch = "wasm32"))]
pub use replication::RelayClient;
