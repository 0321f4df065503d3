//! Event support for class-system components.
//!
//! [`observable_trait`] is a trait bundle that gives a class `trigger_event`,
//! `remove_listeners`, `has_listeners` and `destroy_events` methods. They
//! operate on the [`EventEmitter`] stored in the instance's extension slot,
//! which [`attach_emitter`] or [`attach_bound_emitter`] put there.

use crate::emitter::{EmitterConfig, EventEmitter};
use crate::payload::{CustomEvent, Receiver};
use crate::platform::ElementRef;
use crate::registry::EventRegistry;
use compact_str::CompactString;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;
use trellis_class::{ClassBuilder, ClassDefinition, ClassError, Instance, MethodContext, Trait};

/// Class member a component declares to replace the configured native
/// event list
pub const NATIVE_EVENTS_MEMBER: &str = "native_events";

/// Fetch the emitter attached to `instance`
pub fn emitter_of(instance: &Instance) -> Result<Arc<EventEmitter>, ClassError> {
    instance.extension::<EventEmitter>().ok_or_else(|| {
        ClassError::MissingExtension(format!("{} has no event emitter", instance.class().name()))
    })
}

/// Attach an unbound emitter owned by `instance`.
///
/// The emitter keeps the instance alive until `destroy_events` runs.
pub fn attach_emitter(instance: &Arc<Instance>, config: EmitterConfig) -> Arc<EventEmitter> {
    let owner: Receiver = Arc::clone(instance) as Receiver;
    let emitter = Arc::new(EventEmitter::new(owner, config));
    instance.insert_extension(Arc::clone(&emitter));
    emitter
}

/// Native events declared on the instance or its class chain, if any.
///
/// The member must be an array of event names; anything else is ignored.
pub fn declared_native_events(instance: &Instance) -> Option<Vec<CompactString>> {
    let declared = instance.get(NATIVE_EVENTS_MEMBER)?;
    let names = declared
        .as_array()
        .and_then(|items| items.iter().map(|item| item.as_str().map(CompactString::new)).collect());
    if names.is_none() {
        warn!(
            "⚠️ {} declares {} that is not a list of event names; using configured events",
            instance.class().name(),
            NATIVE_EVENTS_MEMBER
        );
    }
    names
}

/// Attach an emitter owned by `instance` and bound to `element`.
///
/// A `native_events` list declared by the instance's class replaces the one
/// in `config`, so a subclass can observe a different set of native events.
pub fn attach_bound_emitter(
    instance: &Arc<Instance>,
    element: ElementRef,
    registry: Arc<EventRegistry>,
    mut config: EmitterConfig,
) -> Arc<EventEmitter> {
    if let Some(names) = declared_native_events(instance) {
        config.native_events = names;
    }
    let owner: Receiver = Arc::clone(instance) as Receiver;
    let emitter = EventEmitter::bound(owner, element, registry, config);
    instance.insert_extension(Arc::clone(&emitter));
    emitter
}

fn type_arg<'v>(cx: &MethodContext<'_>, args: &'v [Value]) -> Result<&'v str, ClassError> {
    args.first().and_then(Value::as_str).ok_or_else(|| {
        ClassError::InvalidArgument(format!(
            "{} expects an event type as its first argument",
            cx.method_name()
        ))
    })
}

fn trigger_event(cx: &MethodContext<'_>, args: &[Value]) -> Result<Value, ClassError> {
    let kind = type_arg(cx, args)?;
    let mut payload = CustomEvent::new();
    match args.get(1) {
        Some(Value::Object(data)) => payload.mixin(data),
        Some(Value::Null) | None => {}
        Some(_) => {
            return Err(ClassError::InvalidArgument(
                "trigger_event payload must be an object".to_string(),
            ))
        }
    }
    let emitter = emitter_of(cx.this())?;
    Ok(emitter.trigger_event(kind, Some(payload)).unwrap_or(Value::Null))
}

fn remove_listeners(cx: &MethodContext<'_>, args: &[Value]) -> Result<Value, ClassError> {
    let kind = type_arg(cx, args)?;
    emitter_of(cx.this())?.remove(kind);
    Ok(Value::Null)
}

fn has_listeners(cx: &MethodContext<'_>, args: &[Value]) -> Result<Value, ClassError> {
    let kind = type_arg(cx, args)?;
    Ok(Value::Bool(emitter_of(cx.this())?.has_listeners(kind)))
}

fn destroy_events(cx: &MethodContext<'_>, _args: &[Value]) -> Result<Value, ClassError> {
    if let Some(emitter) = cx.this().remove_extension::<EventEmitter>() {
        emitter.destroy();
    }
    Ok(Value::Null)
}

/// Trait bundle exposing an instance's emitter as class methods
pub fn observable_trait() -> Trait {
    Trait::new("observable")
        .method("trigger_event", trigger_event)
        .method("remove_listeners", remove_listeners)
        .method("has_listeners", has_listeners)
        .method("destroy_events", destroy_events)
}

/// Root class carrying the observable bundle
pub fn events_class() -> Arc<ClassDefinition> {
    ClassBuilder::root("Events").with_trait(observable_trait()).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::{callback, NATIVE_EVENTS};
    use crate::platform::headless::HeadlessElement;
    use serde_json::json;

    #[test]
    fn test_trigger_event_method_forwards_payload() {
        let class = events_class();
        let instance = class.instantiate(&[]).unwrap();
        let emitter = attach_emitter(&instance, EmitterConfig::default());
        emitter.on(
            "resize",
            &callback(|_, event| event.get("width").cloned().unwrap_or(Value::Null)),
            None,
        );

        let result = instance.call("trigger_event", &[json!("resize"), json!({"width": 320})]);
        assert_eq!(result, Ok(json!(320)));
        assert_eq!(instance.call("trigger_event", &[json!("other")]), Ok(Value::Null));
        assert_eq!(instance.call("has_listeners", &[json!("resize")]), Ok(json!(true)));
    }

    #[test]
    fn test_missing_emitter_is_reported() {
        let instance = events_class().instantiate(&[]).unwrap();
        let err = instance.call("has_listeners", &[json!("click")]).unwrap_err();
        assert!(matches!(err, ClassError::MissingExtension(_)));
    }

    #[test]
    fn test_invalid_arguments() {
        let instance = events_class().instantiate(&[]).unwrap();
        attach_emitter(&instance, EmitterConfig::default());

        assert!(matches!(
            instance.call("trigger_event", &[]),
            Err(ClassError::InvalidArgument(_))
        ));
        assert!(matches!(
            instance.call("trigger_event", &[json!("click"), json!(5)]),
            Err(ClassError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_destroy_events_releases_emitter() {
        let instance = events_class().instantiate(&[]).unwrap();
        let emitter = attach_emitter(&instance, EmitterConfig::default());
        emitter.on("open", &callback(|_, _| Value::Null), None);

        assert_eq!(instance.call("remove_listeners", &[json!("open")]), Ok(Value::Null));
        assert!(!emitter.has_listeners("open"));

        instance.call("destroy_events", &[]).unwrap();
        assert!(emitter.is_destroyed());
        assert!(emitter_of(&instance).is_err());
        assert_eq!(Arc::strong_count(&instance), 1);
    }

    #[test]
    fn test_subclass_native_events_override_config() {
        let base = events_class();
        let pointer_only = ClassBuilder::extend("PointerOnly", &base)
            .value(NATIVE_EVENTS_MEMBER, json!(["click", "mousedown"]))
            .build();
        let registry = Arc::new(EventRegistry::new());

        let plain = base.instantiate(&[]).unwrap();
        let plain_el: ElementRef = HeadlessElement::new(Some("plain"));
        let config = EmitterConfig::default();
        let emitter =
            attach_bound_emitter(&plain, Arc::clone(&plain_el), Arc::clone(&registry), config);
        assert_eq!(emitter.native_events().len(), NATIVE_EVENTS.len());
        assert_eq!(registry.observer_count(&plain_el), NATIVE_EVENTS.len() + 1);

        let narrowed = pointer_only.instantiate(&[]).unwrap();
        let narrowed_el: ElementRef = HeadlessElement::new(Some("narrowed"));
        let config = EmitterConfig::default();
        let emitter = attach_bound_emitter(
            &narrowed,
            Arc::clone(&narrowed_el),
            Arc::clone(&registry),
            config,
        );
        let names: Vec<&str> =
            emitter.native_events().iter().map(CompactString::as_str).collect();
        assert_eq!(names, vec!["click", "mousedown"]);
        assert_eq!(registry.observer_count(&narrowed_el), 3);

        narrowed.call("destroy_events", &[]).unwrap();
        plain.call("destroy_events", &[]).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_malformed_native_events_fall_back_to_config() {
        let class = ClassBuilder::extend("Broken", &events_class())
            .value(NATIVE_EVENTS_MEMBER, json!("click"))
            .build();
        let instance = class.instantiate(&[]).unwrap();
        assert!(declared_native_events(&instance).is_none());
        assert!(declared_native_events(&events_class().instantiate(&[]).unwrap()).is_none());
    }
}
