//! In-memory platform used by tests and the headless runner.
//!
//! Mirrors the attach/detach semantics of a browser element: attaching an
//! identical `(name, listener, capture)` triple twice keeps a single binding,
//! and capture listeners run before bubble listeners.

use super::{same_listener, ElementLookup, ElementRef, NativeElement, NativeEvent, NativeListener};
use compact_str::CompactString;
use dashmap::DashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::trace;

#[derive(Clone)]
struct Binding {
    listener: NativeListener,
    use_capture: bool,
}

/// A headless element holding its native listeners in memory
pub struct HeadlessElement {
    id: Option<CompactString>,
    legacy_key_events: bool,
    bindings: DashMap<CompactString, SmallVec<[Binding; 2]>>,
}

impl HeadlessElement {
    pub fn new(id: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            id: id.map(CompactString::new),
            legacy_key_events: false,
            bindings: DashMap::new(),
        })
    }

    /// An element that reports legacy key handling (see
    /// [`NativeElement::legacy_key_events`])
    pub fn legacy(id: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            id: id.map(CompactString::new),
            legacy_key_events: true,
            bindings: DashMap::new(),
        })
    }

    /// View this element as a platform element reference
    pub fn as_element(self: &Arc<Self>) -> ElementRef {
        Arc::clone(self) as ElementRef
    }

    /// Deliver a native event to the listeners bound for its type.
    ///
    /// Returns how many listeners ran.
    pub fn dispatch(&self, event: &mut NativeEvent) -> usize {
        if event.target.is_none() {
            event.target = self.id.clone();
        }

        let snapshot = match self.bindings.get(event.kind.as_str()) {
            Some(entry) => entry.value().clone(),
            None => return 0,
        };

        let ordered = snapshot
            .iter()
            .filter(|binding| binding.use_capture)
            .chain(snapshot.iter().filter(|binding| !binding.use_capture));

        let mut invoked = 0;
        for binding in ordered {
            (binding.listener)(event);
            invoked += 1;
        }
        trace!("🖱️ Dispatched {} to {} native listeners", event.kind, invoked);
        invoked
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.bindings.get(name).map(|entry| entry.len()).unwrap_or(0)
    }

    pub fn total_listeners(&self) -> usize {
        self.bindings.iter().map(|entry| entry.len()).sum()
    }
}

impl NativeElement for HeadlessElement {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn add_event_listener(&self, name: &str, listener: &NativeListener, use_capture: bool) {
        let mut entry = self.bindings.entry(CompactString::new(name)).or_default();
        let exists = entry.iter().any(|binding| {
            binding.use_capture == use_capture && same_listener(&binding.listener, listener)
        });
        if !exists {
            entry.push(Binding {
                listener: Arc::clone(listener),
                use_capture,
            });
        }
    }

    fn remove_event_listener(&self, name: &str, listener: &NativeListener, use_capture: bool) {
        let now_empty = match self.bindings.get_mut(name) {
            Some(mut entry) => {
                entry.retain(|binding| {
                    binding.use_capture != use_capture
                        || !same_listener(&binding.listener, listener)
                });
                entry.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.bindings.remove_if(name, |_, bindings| bindings.is_empty());
        }
    }

    fn legacy_key_events(&self) -> bool {
        self.legacy_key_events
    }
}

/// Id-indexed collection of headless elements
#[derive(Default)]
pub struct HeadlessDocument {
    elements: DashMap<CompactString, Arc<HeadlessElement>>,
}

impl HeadlessDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and index an element with the given id
    pub fn create_element(&self, id: &str) -> Arc<HeadlessElement> {
        let element = HeadlessElement::new(Some(id));
        self.elements.insert(CompactString::new(id), Arc::clone(&element));
        element
    }

    /// Index an existing element under its id. Elements without an id are
    /// not indexed.
    pub fn insert(&self, element: Arc<HeadlessElement>) -> bool {
        match element.id.clone() {
            Some(id) => {
                self.elements.insert(id, element);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<HeadlessElement>> {
        self.elements.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl ElementLookup for HeadlessDocument {
    fn element_by_id(&self, id: &str) -> Option<ElementRef> {
        self.get(id).map(|element| element.as_element())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::native_listener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_identical_binding_is_kept_once() {
        let element = HeadlessElement::new(Some("button"));
        let listener = native_listener(|_| {});

        element.add_event_listener("click", &listener, false);
        element.add_event_listener("click", &listener, false);
        element.add_event_listener("click", &listener, true);

        assert_eq!(element.listener_count("click"), 2);
        element.remove_event_listener("click", &listener, false);
        assert_eq!(element.listener_count("click"), 1);
        element.remove_event_listener("click", &listener, true);
        assert_eq!(element.total_listeners(), 0);
    }

    #[test]
    fn test_capture_runs_before_bubble() {
        let element = HeadlessElement::new(None);
        let order = Arc::new(Mutex::new(Vec::new()));

        let bubble_order = order.clone();
        let bubble = native_listener(move |_| bubble_order.lock().unwrap().push("bubble"));
        let capture_order = order.clone();
        let capture = native_listener(move |_| capture_order.lock().unwrap().push("capture"));

        element.add_event_listener("click", &bubble, false);
        element.add_event_listener("click", &capture, true);

        let mut event = NativeEvent::new("click");
        assert_eq!(element.dispatch(&mut event), 2);
        assert_eq!(*order.lock().unwrap(), vec!["capture", "bubble"]);
    }

    #[test]
    fn test_dispatch_sets_target_and_ignores_other_types() {
        let element = HeadlessElement::new(Some("canvas"));
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let listener = native_listener(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        element.add_event_listener("mousedown", &listener, false);

        let mut other = NativeEvent::new("mouseup");
        assert_eq!(element.dispatch(&mut other), 0);

        let mut event = NativeEvent::new("mousedown");
        element.dispatch(&mut event);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(event.target.as_deref(), Some("canvas"));
    }

    #[test]
    fn test_document_lookup() {
        let document = HeadlessDocument::new();
        let panel = document.create_element("panel");
        assert!(!document.insert(HeadlessElement::new(None)));

        let found = document.element_by_id("panel").expect("indexed element");
        assert!(crate::platform::same_element(&found, &panel.as_element()));
        assert!(document.element_by_id("missing").is_none());
        assert_eq!(document.len(), 1);
    }
}
