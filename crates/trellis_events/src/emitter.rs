//! Per-object custom event bus, optionally bound to a platform element

use crate::payload::{same_receiver, CustomEvent, Receiver};
use crate::platform::{native_listener, ElementRef, NativeEvent, NativeListener};
use crate::registry::{EventRegistry, Target};
use compact_str::CompactString;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::{debug, trace, warn};

/// Native events a bound emitter translates into custom events
pub const NATIVE_EVENTS: [&str; 16] = [
    "mouseover",
    "mouseout",
    "mousedown",
    "mouseup",
    "mousemove",
    "click",
    "dblclick",
    "rightclick",
    "dblrightclick",
    "resize",
    "focus",
    "blur",
    "touchstart",
    "touchmove",
    "touchend",
    "keydown",
];

/// Native event whose default action a bound emitter always suppresses
pub const DRAG_START: &str = "dragstart";

/// Signature of a custom event listener.
///
/// The returned value becomes the emission result when this listener runs
/// last; returning `Value::Bool(false)` halts the emission.
pub type CallbackFn = dyn Fn(&Receiver, &mut CustomEvent<'_>) -> Value + Send + Sync;

/// Shared listener callback, compared by identity
pub type Callback = Arc<CallbackFn>;

/// Wraps a closure as a [`Callback`]
pub fn callback<F>(body: F) -> Callback
where
    F: Fn(&Receiver, &mut CustomEvent<'_>) -> Value + Send + Sync + 'static,
{
    Arc::new(body)
}

fn default_native_events() -> Vec<CompactString> {
    NATIVE_EVENTS.iter().map(|name| CompactString::new(name)).collect()
}

/// Emitter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// Leave the originating native event alone after dispatch instead of
    /// stopping it
    #[serde(default)]
    pub fall_through: bool,
    /// Native events observed when bound to an element
    #[serde(default = "default_native_events")]
    pub native_events: Vec<CompactString>,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            fall_through: false,
            native_events: default_native_events(),
        }
    }
}

#[derive(Clone)]
struct Listener {
    receiver: Receiver,
    callback: Callback,
}

impl Listener {
    fn matches(&self, receiver: &Receiver, callback: &Callback) -> bool {
        same_receiver(&self.receiver, receiver)
            && Arc::as_ptr(&self.callback) as *const () == Arc::as_ptr(callback) as *const ()
    }
}

/// Bulk subscription: event types paired with callbacks, with an optional
/// receiver (`scope`) shared by every entry
#[derive(Clone, Default)]
pub struct Registration {
    scope: Option<Receiver>,
    entries: Vec<(CompactString, Callback)>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(mut self, receiver: Receiver) -> Self {
        self.scope = Some(receiver);
        self
    }

    pub fn on(mut self, kind: &str, callback: &Callback) -> Self {
        self.entries.push((CompactString::new(kind), Arc::clone(callback)));
        self
    }
}

/// Native side of a bound emitter
struct Binding {
    element: ElementRef,
    registry: Arc<EventRegistry>,
    handler: NativeListener,
    drag_guard: NativeListener,
}

/// A per-object publish/subscribe bus.
///
/// Listeners for a type run in registration order over a snapshot taken when
/// the emission starts, so listeners added or removed during an emission
/// only affect later ones. An emitter bound to an element also receives the
/// element's native events through an [`EventRegistry`] and re-emits those
/// that have listeners.
pub struct EventEmitter {
    owner: RwLock<Option<Receiver>>,
    listeners: DashMap<CompactString, SmallVec<[Listener; 4]>>,
    fall_through: AtomicBool,
    native_events: Vec<CompactString>,
    binding: Option<Binding>,
    destroyed: AtomicBool,
}

impl EventEmitter {
    /// Create an emitter that is not bound to any element
    pub fn new(owner: Receiver, config: EmitterConfig) -> Self {
        Self {
            owner: RwLock::new(Some(owner)),
            listeners: DashMap::new(),
            fall_through: AtomicBool::new(config.fall_through),
            native_events: config.native_events,
            binding: None,
            destroyed: AtomicBool::new(false),
        }
    }

    /// Create an emitter bound to `element`.
    ///
    /// Registers one internal handler for every configured native event and a
    /// `dragstart` listener that suppresses the default drag behavior.
    pub fn bound(
        owner: Receiver,
        element: ElementRef,
        registry: Arc<EventRegistry>,
        config: EmitterConfig,
    ) -> Arc<Self> {
        let emitter = Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let handler = native_listener(move |event| {
                if let Some(emitter) = weak.upgrade() {
                    emitter.handle_native_event(event);
                }
            });
            let drag_guard = native_listener(|event| event.stop(false));

            Self {
                binding: Some(Binding {
                    element,
                    registry,
                    handler,
                    drag_guard,
                }),
                ..Self::new(owner, config)
            }
        });
        emitter.attach_to_element();
        emitter
    }

    fn attach_to_element(&self) {
        let Some(binding) = &self.binding else {
            return;
        };
        let names = self.native_event_names();
        let target = Target::Element(&binding.element);
        match binding.registry.on(target, &names, &binding.handler, false) {
            Some(handle) => {
                debug!("📎 Emitter bound to {} ({} native events)", handle, self.native_events.len())
            }
            None => warn!("⚠️ Emitter has no native events to observe"),
        }
        binding.registry.on(target, DRAG_START, &binding.drag_guard, false);
    }

    fn native_event_names(&self) -> String {
        self.native_events
            .iter()
            .map(CompactString::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Handle a native event delivered by the bound element.
    ///
    /// Does nothing when the event type has no listeners. Touch contacts are
    /// averaged into the primary coordinates before the event is re-emitted.
    pub fn handle_native_event(&self, event: &mut NativeEvent) {
        if !self.has_listeners(&event.kind) {
            trace!("🔇 No listeners for native {}", event.kind);
            return;
        }
        event.average_touches();
        let kind = event.kind.clone();
        self.trigger_event(&kind, Some(CustomEvent::from_native(event)));
    }

    /// Subscribe `callback` to `kind`, bound to `receiver` or the owner.
    ///
    /// No deduplication: the same pair added twice runs twice.
    pub fn on(&self, kind: &str, callback: &Callback, receiver: Option<&Receiver>) {
        if self.is_destroyed() {
            warn!("⚠️ Ignoring subscription to {} on a destroyed emitter", kind);
            return;
        }
        let Some(receiver) = receiver.cloned().or_else(|| self.owner()) else {
            warn!("⚠️ Ignoring subscription to {} without a receiver", kind);
            return;
        };

        self.listeners
            .entry(CompactString::new(kind))
            .or_default()
            .push(Listener {
                receiver,
                callback: Arc::clone(callback),
            });
        debug!("📝 Registered listener for {}", kind);
    }

    /// Remove the first subscription matching `callback` and `receiver` (or
    /// the owner). Returns whether one was removed.
    pub fn un(&self, kind: &str, callback: &Callback, receiver: Option<&Receiver>) -> bool {
        let Some(receiver) = receiver.cloned().or_else(|| self.owner()) else {
            return false;
        };
        let Some(mut listeners) = self.listeners.get_mut(kind) else {
            return false;
        };
        match listeners.iter().position(|listener| listener.matches(&receiver, callback)) {
            Some(position) => {
                listeners.remove(position);
                debug!("🗑️ Removed listener for {}", kind);
                true
            }
            None => false,
        }
    }

    /// Drop every listener for `kind`
    pub fn remove(&self, kind: &str) {
        if let Some(mut listeners) = self.listeners.get_mut(kind) {
            listeners.clear();
        }
    }

    pub fn register(&self, registration: &Registration) {
        for (kind, callback) in &registration.entries {
            self.on(kind, callback, registration.scope.as_ref());
        }
    }

    pub fn unregister(&self, registration: &Registration) {
        for (kind, callback) in &registration.entries {
            self.un(kind, callback, registration.scope.as_ref());
        }
    }

    /// Emit `kind` to its listeners.
    ///
    /// Returns `None` without side effects when `kind` has no listeners.
    /// Otherwise the payload is enriched with the type (unless already set),
    /// the owner and the bound element, and listeners run in order until one
    /// returns `false`. The last listener's return value is the result. A
    /// native event inside the payload is stopped afterwards unless the
    /// emitter falls through.
    pub fn trigger_event(&self, kind: &str, payload: Option<CustomEvent<'_>>) -> Option<Value> {
        if self.is_destroyed() {
            warn!("⚠️ Ignoring {} on a destroyed emitter", kind);
            return None;
        }
        let snapshot = self.listeners.get(kind).map(|entry| entry.value().clone())?;
        if snapshot.is_empty() {
            return None;
        }

        let mut event = payload.unwrap_or_default();
        event.enrich(kind, self.owner(), self.element().cloned());

        let mut result = Value::Null;
        for listener in snapshot.iter() {
            result = (listener.callback)(&listener.receiver, &mut event);
            if result == Value::Bool(false) {
                debug!("⛔ Emission of {} halted by a listener", kind);
                break;
            }
        }

        if !self.fall_through() && event.stop_native() {
            trace!("🛑 Stopped native {}", kind);
        }
        Some(result)
    }

    /// Clear listeners, drop the owner and release the emitter's own native
    /// bindings. The emitter ignores further use.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.listeners.clear();
        *self.owner.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.fall_through.store(false, Ordering::SeqCst);

        if let Some(binding) = &self.binding {
            let target = Target::Element(&binding.element);
            binding.registry.un(target, &self.native_event_names(), &binding.handler, false);
            binding.registry.un(target, DRAG_START, &binding.drag_guard, false);
        }
        debug!("💥 Emitter destroyed");
    }

    /// Native events observed while bound
    pub fn native_events(&self) -> &[CompactString] {
        &self.native_events
    }

    pub fn owner(&self) -> Option<Receiver> {
        self.owner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn element(&self) -> Option<&ElementRef> {
        self.binding.as_ref().map(|binding| &binding.element)
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn fall_through(&self) -> bool {
        self.fall_through.load(Ordering::SeqCst)
    }

    pub fn set_fall_through(&self, fall_through: bool) {
        self.fall_through.store(fall_through, Ordering::SeqCst);
    }

    pub fn listener_count(&self, kind: &str) -> usize {
        self.listeners.get(kind).map(|entry| entry.len()).unwrap_or(0)
    }

    pub fn has_listeners(&self, kind: &str) -> bool {
        self.listener_count(kind) > 0
    }

    /// Event types with at least one listener
    pub fn event_types(&self) -> Vec<CompactString> {
        self.listeners
            .iter()
            .filter(|entry| !entry.is_empty())
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("bound", &self.is_bound())
            .field("types", &self.listeners.len())
            .field("fall_through", &self.fall_through())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
