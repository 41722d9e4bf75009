//! A single annotated page: PDF-backed surface dimensions plus stroke layers.

use crate::layer::Layer;
use crate::stroke::{Stroke, StrokeId};
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable page identity, used to key renderer state externally.
pub type PageId = Uuid;

/// The external page backend (PDF rasterizer).
///
/// The core only needs the page's dimensions in page-space units; painting
/// happens through the render crate's target factory.
pub trait PageSource {
    fn size(&self) -> Size;
}

/// A change to a page's stroke content, dispatched to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    StrokeAdded { layer: usize, stroke: Stroke },
    StrokeDeleted { layer: usize, id: StrokeId },
}

/// Handle returned by [`Page::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&PageEvent)>;

/// One page of the document.
///
/// Owns its layers exclusively. Rendering state lives in an external registry
/// keyed by [`PageId`]; the page itself knows nothing about widgets.
#[derive(Serialize, Deserialize)]
pub struct Page {
    id: PageId,
    width: f64,
    height: f64,
    layers: Vec<Layer>,
    search_highlight: Option<Rect>,
    #[serde(skip)]
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    #[serde(skip)]
    next_subscription: u64,
}

impl Page {
    /// Create a page with the given page-space dimensions and one empty
    /// drawable layer (the PDF background is the implicit layer below it).
    pub fn new(size: Size) -> Self {
        Self {
            id: Uuid::new_v4(),
            width: size.width,
            height: size.height,
            layers: vec![Layer::new()],
            search_highlight: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn from_source(source: &dyn PageSource) -> Self {
        Self::new(source.size())
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn search_highlight(&self) -> Option<Rect> {
        self.search_highlight
    }

    pub fn set_search_highlight(&mut self, rect: Option<Rect>) {
        self.search_highlight = rect;
    }

    /// Register a subscriber for page events.
    ///
    /// Subscribers run synchronously, in registration order, on the thread
    /// that produced the event. Dispatch is not reentrant: a subscriber must
    /// not commit or delete strokes on this page from inside the callback.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&PageEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Remove a subscriber. Returns false if the id was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Append a committed stroke to a layer and notify subscribers.
    ///
    /// Returns false (and logs) if the layer index is out of range.
    pub fn commit_stroke(&mut self, layer: usize, stroke: Stroke) -> bool {
        let Some(target) = self.layers.get_mut(layer) else {
            log::warn!("commit_stroke: no layer {layer} on page {}", self.id);
            return false;
        };
        let event = PageEvent::StrokeAdded {
            layer,
            stroke: stroke.clone(),
        };
        target.push(stroke);
        self.dispatch(&event);
        true
    }

    /// Remove a stroke by identity and notify subscribers.
    pub fn delete_stroke(&mut self, layer: usize, id: StrokeId) -> Option<Stroke> {
        let removed = self.layers.get_mut(layer)?.remove(id)?;
        self.dispatch(&PageEvent::StrokeDeleted { layer, id });
        Some(removed)
    }

    fn dispatch(&mut self, event: &PageEvent) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber(event);
        }
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layers", &self.layers)
            .field("search_highlight", &self.search_highlight)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::stroke::{PeerId, StrokeIdGen};
    use kurbo::Point;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn page() -> Page {
        Page::new(Size::new(612.0, 792.0))
    }

    fn stroke(ids: &StrokeIdGen) -> Stroke {
        Stroke::new(
            ids.next_id(),
            Color::black(),
            2.0,
            vec![Point::new(10.0, 10.0), Point::new(20.0, 20.0)],
        )
    }

    #[test]
    fn test_new_page_has_one_layer() {
        let p = page();
        assert_eq!(p.layers().len(), 1);
        assert!(p.layer(0).unwrap().is_empty());
    }

    #[test]
    fn test_commit_appends_and_notifies() {
        let ids = StrokeIdGen::new(PeerId(1));
        let mut p = page();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        p.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let s = stroke(&ids);
        let id = s.id();
        assert!(p.commit_stroke(0, s));

        assert_eq!(p.layer(0).unwrap().len(), 1);
        let events = seen.borrow();
        assert_eq!(events.len(), 1);
        match &events[0] {
            PageEvent::StrokeAdded { layer, stroke } => {
                assert_eq!(*layer, 0);
                assert_eq!(stroke.id(), id);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_commit_bad_layer_rejected() {
        let ids = StrokeIdGen::new(PeerId(1));
        let mut p = page();
        assert!(!p.commit_stroke(3, stroke(&ids)));
    }

    #[test]
    fn test_delete_notifies() {
        let ids = StrokeIdGen::new(PeerId(1));
        let mut p = page();
        let s = stroke(&ids);
        let id = s.id();
        p.commit_stroke(0, s);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        p.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        assert!(p.delete_stroke(0, id).is_some());
        assert!(p.layer(0).unwrap().is_empty());
        assert_eq!(
            seen.borrow()[0],
            PageEvent::StrokeDeleted { layer: 0, id }
        );
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let ids = StrokeIdGen::new(PeerId(1));
        let mut p = page();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in 0..3 {
            let sink = order.clone();
            p.subscribe(move |_| sink.borrow_mut().push(tag));
        }
        p.commit_stroke(0, stroke(&ids));

        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_unsubscribe() {
        let ids = StrokeIdGen::new(PeerId(1));
        let mut p = page();
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        let sub = p.subscribe(move |_| *sink.borrow_mut() += 1);

        p.commit_stroke(0, stroke(&ids));
        assert!(p.unsubscribe(sub));
        assert!(!p.unsubscribe(sub));
        p.commit_stroke(0, stroke(&ids));

        assert_eq!(*count.borrow(), 1);
    }
}
