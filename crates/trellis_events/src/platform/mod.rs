//! Native platform seam: elements, native listeners and native events.
//!
//! The registry and emitter never talk to a concrete platform. Anything that
//! can attach and detach listeners by name implements [`NativeElement`]; the
//! [`headless`] module provides an in-memory implementation.

pub mod headless;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Signature of a native event listener
pub type NativeListenerFn = dyn Fn(&mut NativeEvent) + Send + Sync;

/// Shared native listener. Identity is the allocation, so clones of the same
/// `Arc` compare equal and two separately created listeners never do.
pub type NativeListener = Arc<NativeListenerFn>;

/// Wraps a closure as a [`NativeListener`]
pub fn native_listener<F>(listener: F) -> NativeListener
where
    F: Fn(&mut NativeEvent) + Send + Sync + 'static,
{
    Arc::new(listener)
}

/// An externally owned element that native listeners can be attached to
pub trait NativeElement: Send + Sync {
    /// The element's own identifier, if it has one
    fn id(&self) -> Option<&str>;

    fn add_event_listener(&self, name: &str, listener: &NativeListener, use_capture: bool);

    fn remove_event_listener(&self, name: &str, listener: &NativeListener, use_capture: bool);

    /// Whether this element comes from a platform without native `keypress`
    /// detach support; such requests are served with `keydown` instead.
    fn legacy_key_events(&self) -> bool {
        false
    }
}

/// Shared reference to a platform element
pub type ElementRef = Arc<dyn NativeElement>;

/// Resolves element identifiers to elements
pub trait ElementLookup: Send + Sync {
    fn element_by_id(&self, id: &str) -> Option<ElementRef>;
}

pub fn same_element(a: &ElementRef, b: &ElementRef) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

pub fn same_listener(a: &NativeListener, b: &NativeListener) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// One active touch contact
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TouchPoint {
    pub client_x: f64,
    pub client_y: f64,
}

impl TouchPoint {
    pub fn new(client_x: f64, client_y: f64) -> Self {
        Self { client_x, client_y }
    }
}

/// A native event as delivered by the platform
#[derive(Debug, Clone, Default)]
pub struct NativeEvent {
    /// Native event type, e.g. `click` or `touchmove`
    pub kind: CompactString,
    pub client_x: f64,
    pub client_y: f64,
    /// Active touch contacts, empty for non-touch events
    pub touches: SmallVec<[TouchPoint; 2]>,
    pub key: Option<CompactString>,
    /// Identifier of the element the event was dispatched on
    pub target: Option<CompactString>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl NativeEvent {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: CompactString::new(kind),
            ..Self::default()
        }
    }

    pub fn at(mut self, client_x: f64, client_y: f64) -> Self {
        self.client_x = client_x;
        self.client_y = client_y;
        self
    }

    pub fn with_touches<I>(mut self, touches: I) -> Self
    where
        I: IntoIterator<Item = TouchPoint>,
    {
        self.touches = touches.into_iter().collect();
        self
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(CompactString::new(key));
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop propagation and, unless `allow_default`, cancel the default action
    pub fn stop(&mut self, allow_default: bool) {
        if !allow_default {
            self.prevent_default();
        }
        self.stop_propagation();
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Replace the primary coordinates with the mean of all touch contacts.
    ///
    /// Returns `false` and leaves the event untouched when there are none.
    pub fn average_touches(&mut self) -> bool {
        if self.touches.is_empty() {
            return false;
        }
        let count = self.touches.len() as f64;
        let (sum_x, sum_y) = self
            .touches
            .iter()
            .fold((0.0, 0.0), |(x, y), touch| (x + touch.client_x, y + touch.client_y));
        self.client_x = sum_x / count;
        self.client_y = sum_y / count;
        true
    }
}
