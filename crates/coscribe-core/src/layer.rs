//! Ordered stroke container within a page.

use crate::stroke::{Stroke, StrokeId};
use serde::{Deserialize, Serialize};

/// An annotation layer: strokes in z-order (insertion order).
///
/// Strokes are addressed by [`StrokeId`], never by index, since indices
/// shift under concurrent deletes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    strokes: Vec<Stroke>,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stroke at the top of the z-order.
    pub fn push(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Remove a stroke by identity.
    ///
    /// Local callers (the eraser) only remove strokes they just hit, so a
    /// `None` there is a bug; remote apply treats `None` as a benign no-op,
    /// since a racing delete may have won.
    pub fn remove(&mut self, id: StrokeId) -> Option<Stroke> {
        let pos = self.strokes.iter().position(|s| s.id() == id)?;
        Some(self.strokes.remove(pos))
    }

    pub fn contains(&self, id: StrokeId) -> bool {
        self.strokes.iter().any(|s| s.id() == id)
    }

    pub fn get(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.iter().find(|s| s.id() == id)
    }

    /// Strokes in z-order (back to front).
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::stroke::{PeerId, StrokeIdGen};
    use kurbo::Point;

    fn stroke(ids: &StrokeIdGen) -> Stroke {
        Stroke::new(
            ids.next_id(),
            Color::black(),
            2.0,
            vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
        )
    }

    #[test]
    fn test_push_preserves_order() {
        let ids = StrokeIdGen::new(PeerId(1));
        let mut layer = Layer::new();
        let a = stroke(&ids);
        let b = stroke(&ids);
        let (ida, idb) = (a.id(), b.id());

        layer.push(a);
        layer.push(b);

        let order: Vec<_> = layer.strokes().iter().map(|s| s.id()).collect();
        assert_eq!(order, vec![ida, idb]);
    }

    #[test]
    fn test_remove_by_identity() {
        let ids = StrokeIdGen::new(PeerId(1));
        let mut layer = Layer::new();
        let a = stroke(&ids);
        let id = a.id();
        layer.push(a);

        assert!(layer.remove(id).is_some());
        assert!(layer.is_empty());
    }

    #[test]
    fn test_remove_absent_is_none() {
        let ids = StrokeIdGen::new(PeerId(1));
        let mut layer = Layer::new();
        let id = ids.next_id();
        assert!(layer.remove(id).is_none());
    }

    #[test]
    fn test_double_remove_idempotent() {
        let ids = StrokeIdGen::new(PeerId(1));
        let mut layer = Layer::new();
        let a = stroke(&ids);
        let id = a.id();
        layer.push(a);

        assert!(layer.remove(id).is_some());
        let after_first = layer.clone();
        assert!(layer.remove(id).is_none());
        assert_eq!(layer, after_first);
    }
}
