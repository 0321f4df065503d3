//! # Trellis Events
//!
//! Event plumbing for UI components: a registry that tracks every native
//! listener attached to platform elements, and a per-object emitter that turns
//! native input into custom events.
//!
//! ## Core Features
//!
//! - **Observer registry**: bindings grouped per element under an opaque
//!   handle, released individually, per element, per event name or all at once
//! - **Custom events**: ordered listeners with receivers, early halt on a
//!   `false` return and snapshot dispatch that tolerates re-entrant callbacks
//! - **Native bridging**: bound emitters observe mouse, touch, focus and key
//!   input, average multi-touch coordinates and stop handled native events
//! - **Class integration**: the `observable` trait bundle exposes an emitter
//!   as methods on class-system instances
//! - **Headless platform**: an in-memory element and document for tests and
//!   scripted replays
//!
//! ## Quick Start Example
//!
//! ```rust
//! use serde_json::json;
//! use std::sync::Arc;
//! use trellis_events::*;
//!
//! let registry = Arc::new(EventRegistry::new());
//! let button = HeadlessElement::new(Some("ok"));
//! let emitter = EventEmitter::bound(
//!     Arc::new("dialog"),
//!     button.as_element(),
//!     Arc::clone(&registry),
//!     EmitterConfig::default(),
//! );
//!
//! emitter.on("click", &callback(|_, event| json!(event.native().map(|n| n.client_x))), None);
//!
//! let mut click = NativeEvent::new("click").at(12.0, 4.0);
//! button.dispatch(&mut click);
//! assert!(click.is_propagation_stopped());
//!
//! assert_eq!(emitter.trigger_event("click", None), Some(json!(null)));
//! registry.unload_cache();
//! ```

// Core modules
pub mod emitter;
pub mod observable;
pub mod payload;
pub mod platform;
pub mod registry;
pub mod utils;

pub use emitter::{
    callback, Callback, CallbackFn, EmitterConfig, EventEmitter, Registration, DRAG_START,
    NATIVE_EVENTS,
};
pub use observable::{
    attach_bound_emitter, attach_emitter, declared_native_events, emitter_of, events_class,
    observable_trait, NATIVE_EVENTS_MEMBER,
};
pub use payload::{same_receiver, CustomEvent, Receiver};
pub use platform::headless::{HeadlessDocument, HeadlessElement};
pub use platform::{
    native_listener, same_element, same_listener, ElementLookup, ElementRef, NativeElement,
    NativeEvent, NativeListener, NativeListenerFn, TouchPoint,
};
pub use registry::{ElementHandle, EventRegistry, ObserverRecord, RegistryConfig, Target};
pub use utils::{split_names, unique_id, DEFAULT_ID_PREFIX};

/// Crate version, reported by the runner at startup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
