//! Registry of native listener bindings.
//!
//! Every native listener attached through the registry gets exactly one
//! [`ObserverRecord`], grouped per element under an opaque [`ElementHandle`].
//! The registry never mutates the elements it tracks; it remembers which
//! handle belongs to which element itself. Bindings live until they are
//! released with [`EventRegistry::un`], [`EventRegistry::stop_observing_element`],
//! [`EventRegistry::stop_event_observer`] or [`EventRegistry::unload_cache`].

use crate::platform::{
    same_element, same_listener, ElementLookup, ElementRef, NativeElement, NativeListener,
};
use crate::utils::{split_names, unique_id};
use compact_str::CompactString;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

fn default_handle_prefix() -> String {
    "eventCacheID_".to_string()
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base prefix for element handles. Elements with an id get
    /// `"{id}_{prefix}"` instead.
    #[serde(default = "default_handle_prefix")]
    pub handle_prefix: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            handle_prefix: default_handle_prefix(),
        }
    }
}

/// Opaque per-element key grouping that element's observer records
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(CompactString);

impl ElementHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a registry call applies to
#[derive(Clone, Copy)]
pub enum Target<'a> {
    Element(&'a ElementRef),
    Handle(&'a ElementHandle),
    /// Element id, resolved through the registry's [`ElementLookup`]
    Id(&'a str),
}

impl<'a> From<&'a ElementRef> for Target<'a> {
    fn from(element: &'a ElementRef) -> Self {
        Target::Element(element)
    }
}

impl<'a> From<&'a ElementHandle> for Target<'a> {
    fn from(handle: &'a ElementHandle) -> Self {
        Target::Handle(handle)
    }
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(id: &'a str) -> Self {
        Target::Id(id)
    }
}

/// One tracked native binding
#[derive(Clone)]
pub struct ObserverRecord {
    pub element: ElementRef,
    pub name: CompactString,
    pub listener: NativeListener,
    pub use_capture: bool,
}

impl ObserverRecord {
    fn matches(&self, name: &str, listener: &NativeListener, use_capture: bool) -> bool {
        self.name.as_str() == name
            && self.use_capture == use_capture
            && same_listener(&self.listener, listener)
    }
}

impl fmt::Debug for ObserverRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRecord")
            .field("element", &self.element.id())
            .field("name", &self.name)
            .field("use_capture", &self.use_capture)
            .finish()
    }
}

struct Stamp {
    element: Weak<dyn NativeElement>,
    handle: ElementHandle,
}

fn element_key(element: &ElementRef) -> usize {
    Arc::as_ptr(element) as *const () as usize
}

/// Rewrite `keypress` to `keydown` for elements without native keypress
/// detach support
fn normalize_name(element: &ElementRef, name: &str) -> CompactString {
    if name == "keypress" && element.legacy_key_events() {
        CompactString::new("keydown")
    } else {
        CompactString::new(name)
    }
}

/// Tracks native listener bindings so they can be released individually or
/// in bulk.
///
/// Construct one per UI tree (or per test) and share it by `Arc` with every
/// component that binds native events.
pub struct EventRegistry {
    config: RegistryConfig,
    observers: DashMap<ElementHandle, Vec<ObserverRecord>>,
    stamps: DashMap<usize, Stamp>,
    next_id: AtomicU64,
    lookup: Option<Arc<dyn ElementLookup>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            observers: DashMap::new(),
            stamps: DashMap::new(),
            next_id: AtomicU64::new(0),
            lookup: None,
        }
    }

    /// Resolve [`Target::Id`] through `lookup`
    pub fn with_lookup(mut self, lookup: Arc<dyn ElementLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Attach `listener` to every name in the whitespace separated `names`.
    ///
    /// Registering an identical binding twice tracks two records.
    ///
    /// # Arguments
    ///
    /// * `target` - Element reference, handle or id (ids need an [`ElementLookup`])
    /// * `names` - One or more event names separated by whitespace
    /// * `listener` - Native listener attached for each name
    /// * `use_capture` - Capture phase flag, part of the binding's identity
    ///
    /// # Returns
    ///
    /// The element's handle, or `None` when `names` is empty or the target
    /// cannot be resolved.
    ///
    /// # Example
    ///
    /// ```rust
    /// use trellis_events::{native_listener, EventRegistry, HeadlessElement, NativeEvent};
    ///
    /// let registry = EventRegistry::new();
    /// let button = HeadlessElement::new(Some("save"));
    /// let element = button.as_element();
    /// let listener = native_listener(|event| event.stop(true));
    ///
    /// let handle = registry.on(&element, "click dblclick", &listener, false).unwrap();
    /// assert_eq!(registry.observer_count(&handle), 2);
    ///
    /// let mut click = NativeEvent::new("click");
    /// button.dispatch(&mut click);
    /// assert!(click.is_propagation_stopped());
    /// ```
    pub fn on<'a>(
        &self,
        target: impl Into<Target<'a>>,
        names: &str,
        listener: &NativeListener,
        use_capture: bool,
    ) -> Option<ElementHandle> {
        let names = split_names(names);
        if names.is_empty() {
            return None;
        }
        let element = self.resolve(target.into())?;
        let handle = self.stamp(&element);

        for name in names {
            let name = normalize_name(&element, &name);
            self.observers
                .entry(handle.clone())
                .or_default()
                .push(ObserverRecord {
                    element: Arc::clone(&element),
                    name: name.clone(),
                    listener: Arc::clone(listener),
                    use_capture,
                });
            element.add_event_listener(&name, listener, use_capture);
            debug!("🔗 Observing {} on {} (capture: {})", name, handle, use_capture);
        }
        Some(handle)
    }

    /// Release the first matching record for every name in `names`.
    ///
    /// Returns `true` when at least one record was removed.
    pub fn un<'a>(
        &self,
        target: impl Into<Target<'a>>,
        names: &str,
        listener: &NativeListener,
        use_capture: bool,
    ) -> bool {
        let names = split_names(names);
        if names.is_empty() {
            return false;
        }
        let Some(element) = self.resolve(target.into()) else {
            return false;
        };
        let Some(handle) = self.handle_of(&element) else {
            return false;
        };

        let mut removed = false;
        for name in names {
            let name = normalize_name(&element, &name);
            if let Some(record) = self.take_record(&handle, &name, listener, use_capture) {
                record
                    .element
                    .remove_event_listener(&record.name, &record.listener, record.use_capture);
                debug!("✂️ Released {} on {}", name, handle);
                removed = true;
            }
        }
        removed
    }

    /// Release every binding tracked for the target element.
    ///
    /// Returns how many records were released.
    pub fn stop_observing_element<'a>(&self, target: impl Into<Target<'a>>) -> usize {
        match self.resolve_handle(target.into()) {
            Some(handle) => self.release_where(&handle, |_| true),
            None => 0,
        }
    }

    /// Release every binding for one event name on the target element
    pub fn stop_event_observer<'a>(&self, target: impl Into<Target<'a>>, name: &str) -> usize {
        let Some(handle) = self.resolve_handle(target.into()) else {
            return 0;
        };
        self.release_where(&handle, |record| record.name.as_str() == name)
    }

    /// Release every tracked binding on every element.
    ///
    /// Meant to run once at teardown. Element handles stay assigned, so an
    /// element bound again afterwards keeps its handle.
    pub fn unload_cache(&self) -> usize {
        let handles: Vec<ElementHandle> =
            self.observers.iter().map(|entry| entry.key().clone()).collect();
        let released: usize = handles
            .iter()
            .map(|handle| self.release_where(handle, |_| true))
            .sum();
        self.observers.clear();
        debug!("🧹 Unloaded listener cache ({} bindings released)", released);
        released
    }

    /// The handle assigned to `element`, if it was ever bound
    pub fn handle_of(&self, element: &ElementRef) -> Option<ElementHandle> {
        let stamp = self.stamps.get(&element_key(element))?;
        let alive = stamp
            .element
            .upgrade()
            .is_some_and(|stamped| same_element(&stamped, element));
        alive.then(|| stamp.handle.clone())
    }

    /// Snapshot of the records tracked for the target element
    pub fn records<'a>(&self, target: impl Into<Target<'a>>) -> Vec<ObserverRecord> {
        self.resolve_handle(target.into())
            .and_then(|handle| self.observers.get(&handle).map(|entry| entry.value().clone()))
            .unwrap_or_default()
    }

    pub fn observer_count<'a>(&self, target: impl Into<Target<'a>>) -> usize {
        self.resolve_handle(target.into())
            .and_then(|handle| self.observers.get(&handle).map(|entry| entry.len()))
            .unwrap_or(0)
    }

    /// Number of elements with at least one tracked binding
    pub fn element_count(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    fn resolve(&self, target: Target<'_>) -> Option<ElementRef> {
        let element = match target {
            Target::Element(element) => Some(Arc::clone(element)),
            Target::Handle(handle) => self.element_for_handle(handle),
            Target::Id(id) => self.lookup.as_ref().and_then(|lookup| lookup.element_by_id(id)),
        };
        if element.is_none() {
            warn!("⚠️ Could not resolve event target");
        }
        element
    }

    fn resolve_handle(&self, target: Target<'_>) -> Option<ElementHandle> {
        match target {
            Target::Handle(handle) => Some(handle.clone()),
            other => self.resolve(other).and_then(|element| self.handle_of(&element)),
        }
    }

    fn element_for_handle(&self, handle: &ElementHandle) -> Option<ElementRef> {
        self.stamps
            .iter()
            .find(|stamp| stamp.handle == *handle)
            .and_then(|stamp| stamp.element.upgrade())
    }

    /// Return the element's handle, assigning a new one on first use
    fn stamp(&self, element: &ElementRef) -> ElementHandle {
        if let Some(handle) = self.handle_of(element) {
            return handle;
        }

        // Addresses of dropped elements may be reused by new ones.
        self.stamps.retain(|_, stamp| stamp.element.strong_count() > 0);

        let prefix = match element.id() {
            Some(id) => format!("{}_{}", id, self.config.handle_prefix),
            None => self.config.handle_prefix.clone(),
        };
        let id = unique_id(Some(prefix.as_str()), &self.next_id);
        let handle = ElementHandle(CompactString::from(id));
        self.stamps.insert(
            element_key(element),
            Stamp {
                element: Arc::downgrade(element),
                handle: handle.clone(),
            },
        );
        debug!("🏷️ Assigned handle {}", handle);
        handle
    }

    fn take_record(
        &self,
        handle: &ElementHandle,
        name: &str,
        listener: &NativeListener,
        use_capture: bool,
    ) -> Option<ObserverRecord> {
        let (record, now_empty) = {
            let mut records = self.observers.get_mut(handle)?;
            let position = records
                .iter()
                .position(|record| record.matches(name, listener, use_capture))?;
            let record = records.remove(position);
            (record, records.is_empty())
        };
        if now_empty {
            self.observers.remove_if(handle, |_, records| records.is_empty());
        }
        Some(record)
    }

    /// Release matching records newest first, detaching each native listener
    fn release_where<F>(&self, handle: &ElementHandle, predicate: F) -> usize
    where
        F: Fn(&ObserverRecord) -> bool,
    {
        let snapshot = match self.observers.get(handle) {
            Some(records) => records.value().clone(),
            None => return 0,
        };

        let mut released = 0;
        for record in snapshot.iter().rev().filter(|record| predicate(record)) {
            let taken =
                self.take_record(handle, &record.name, &record.listener, record.use_capture);
            if let Some(taken) = taken {
                taken
                    .element
                    .remove_event_listener(&taken.name, &taken.listener, taken.use_capture);
                released += 1;
            }
        }
        released
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("config", &self.config)
            .field("elements", &self.observers.len())
            .field("stamps", &self.stamps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::HeadlessElement;
    use crate::platform::native_listener;

    #[test]
    fn test_handle_prefix_uses_element_id() {
        let registry = EventRegistry::new();
        let named = HeadlessElement::new(Some("toolbar")).as_element();
        let anonymous = HeadlessElement::new(None).as_element();
        let listener = native_listener(|_| {});

        let first = registry.on(&named, "click", &listener, false).unwrap();
        let second = registry.on(&anonymous, "click", &listener, false).unwrap();

        assert_eq!(first.as_str(), "toolbar_eventCacheID_0");
        assert_eq!(second.as_str(), "eventCacheID_1");
    }

    #[test]
    fn test_handle_is_assigned_once_per_element() {
        let registry = EventRegistry::new();
        let element = HeadlessElement::new(Some("list")).as_element();
        let listener = native_listener(|_| {});

        let first = registry.on(&element, "click", &listener, false).unwrap();
        let second = registry.on(&element, "focus blur", &listener, false).unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.handle_of(&element), Some(first));
        assert_eq!(registry.observer_count(&element), 3);
    }

    #[test]
    fn test_custom_prefix() {
        let registry = EventRegistry::with_config(RegistryConfig {
            handle_prefix: "obs.".to_string(),
        });
        let element = HeadlessElement::new(None).as_element();
        let handle = registry.on(&element, "click", &native_listener(|_| {}), false).unwrap();
        assert_eq!(handle.as_str(), "obs_0");
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let registry = EventRegistry::new();
        let element = HeadlessElement::new(None).as_element();
        let listener = native_listener(|_| {});

        assert!(registry.on(&element, "   ", &listener, false).is_none());
        assert!(!registry.un(&element, "", &listener, false));
        assert!(registry.is_empty());
        assert!(registry.handle_of(&element).is_none());
    }

    #[test]
    fn test_unknown_id_target() {
        let registry = EventRegistry::new();
        let listener = native_listener(|_| {});
        assert!(registry.on("missing", "click", &listener, false).is_none());
        assert!(!registry.un("missing", "click", &listener, false));
    }

    #[test]
    fn test_record_debug_omits_listener() {
        let registry = EventRegistry::new();
        let element = HeadlessElement::new(Some("row")).as_element();
        registry.on(&element, "click", &native_listener(|_| {}), true);

        let records = registry.records(&element);
        let rendered = format!("{:?}", records[0]);
        assert!(rendered.contains("\"row\""));
        assert!(rendered.contains("use_capture: true"));
    }
}
