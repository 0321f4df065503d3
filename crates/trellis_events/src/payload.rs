//! Custom event payloads

use crate::platform::{ElementRef, NativeEvent};
use compact_str::CompactString;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The object a listener callback is bound to.
///
/// Receivers compare by identity: two receivers are equal only when they
/// point at the same allocation.
pub type Receiver = Arc<dyn Any + Send + Sync>;

pub fn same_receiver(a: &Receiver, b: &Receiver) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Payload handed to custom event listeners.
///
/// Holds open-ended data plus the fields filled in at dispatch time: the
/// event type (when the caller did not set one), the emitter's owning object
/// and its bound element. Payloads built from a native event borrow it, so
/// listeners can inspect it and the emitter can stop it after dispatch.
#[derive(Default)]
pub struct CustomEvent<'n> {
    kind: Option<CompactString>,
    obj: Option<Receiver>,
    el: Option<ElementRef>,
    data: Map<String, Value>,
    native: Option<&'n mut NativeEvent>,
}

impl<'n> CustomEvent<'n> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A payload with its type preset, which dispatch will not overwrite
    pub fn of_type(kind: &str) -> Self {
        Self {
            kind: Some(CompactString::new(kind)),
            ..Self::default()
        }
    }

    /// Wrap a native event; the payload type is the native event's type
    pub fn from_native(native: &'n mut NativeEvent) -> Self {
        Self {
            kind: Some(native.kind.clone()),
            native: Some(native),
            ..Self::default()
        }
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Shallow-copy every non-null entry of `source` into the payload data
    pub fn mixin(&mut self, source: &Map<String, Value>) {
        for (key, value) in source {
            if !value.is_null() {
                self.data.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// The emitter's owning object
    pub fn obj(&self) -> Option<&Receiver> {
        self.obj.as_ref()
    }

    /// The owning object downcast to a concrete type
    pub fn owner<T: Any>(&self) -> Option<&T> {
        self.obj.as_deref().and_then(|obj| obj.downcast_ref::<T>())
    }

    /// The element the emitter is bound to
    pub fn el(&self) -> Option<&ElementRef> {
        self.el.as_ref()
    }

    pub fn native(&self) -> Option<&NativeEvent> {
        self.native.as_deref()
    }

    pub fn native_mut(&mut self) -> Option<&mut NativeEvent> {
        self.native.as_deref_mut()
    }

    pub(crate) fn enrich(&mut self, kind: &str, obj: Option<Receiver>, el: Option<ElementRef>) {
        self.obj = obj;
        self.el = el;
        if self.kind.is_none() {
            self.kind = Some(CompactString::new(kind));
        }
    }

    /// Stop propagation of the wrapped native event and cancel its default
    /// action. Returns `false` when there is no native event.
    pub(crate) fn stop_native(&mut self) -> bool {
        match self.native.as_deref_mut() {
            Some(native) => {
                native.stop(false);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for CustomEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEvent")
            .field("kind", &self.kind)
            .field("has_obj", &self.obj.is_some())
            .field("el", &self.el.as_ref().and_then(|el| el.id()))
            .field("data", &self.data)
            .field("native", &self.native)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mixin_skips_null_values() {
        let mut event = CustomEvent::new().with("keep", json!(1)).with("replace", json!("old"));
        let source = json!({"replace": "new", "skip": null, "added": [1, 2]});
        event.mixin(source.as_object().unwrap());

        assert_eq!(event.get("keep"), Some(&json!(1)));
        assert_eq!(event.get("replace"), Some(&json!("new")));
        assert_eq!(event.get("added"), Some(&json!([1, 2])));
        assert!(event.get("skip").is_none());
    }

    #[test]
    fn test_enrich_keeps_preset_type() {
        let mut preset = CustomEvent::of_type("custom");
        preset.enrich("click", None, None);
        assert_eq!(preset.kind(), Some("custom"));

        let mut blank = CustomEvent::new();
        let owner: Receiver = Arc::new("owner");
        blank.enrich("click", Some(owner), None);
        assert_eq!(blank.kind(), Some("click"));
        assert_eq!(blank.owner::<&str>(), Some(&"owner"));
        assert!(blank.owner::<String>().is_none());
    }

    #[test]
    fn test_native_payload_can_stop_the_event() {
        let mut native = NativeEvent::new("touchend");
        {
            let mut event = CustomEvent::from_native(&mut native);
            assert_eq!(event.kind(), Some("touchend"));
            assert!(event.stop_native());
        }
        assert!(native.is_default_prevented());
        assert!(native.is_propagation_stopped());

        assert!(!CustomEvent::new().stop_native());
    }

    #[test]
    fn test_receiver_identity() {
        let a: Receiver = Arc::new(1u8);
        let b: Receiver = Arc::new(1u8);
        assert!(same_receiver(&a, &a.clone()));
        assert!(!same_receiver(&a, &b));
    }
}
