use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use trellis_events::*;

fn counter() -> (Arc<AtomicUsize>, Callback) {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);
    let cb = callback(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        Value::Null
    });
    (hits, cb)
}

fn bound_button() -> (Arc<EventRegistry>, Arc<HeadlessElement>, Arc<EventEmitter>) {
    let registry = Arc::new(EventRegistry::new());
    let button = HeadlessElement::new(Some("button"));
    let emitter = EventEmitter::bound(
        Arc::new("button-component"),
        button.as_element(),
        Arc::clone(&registry),
        EmitterConfig::default(),
    );
    (registry, button, emitter)
}

#[test_log::test]
fn test_no_listeners_returns_none_and_leaves_native_event() {
    let (_registry, button, _emitter) = bound_button();

    let mut click = NativeEvent::new("click");
    button.dispatch(&mut click);
    assert!(!click.is_propagation_stopped());
    assert!(!click.is_default_prevented());

    let emitter = EventEmitter::new(Arc::new(()), EmitterConfig::default());
    let mut native = NativeEvent::new("click");
    let result = emitter.trigger_event("click", Some(CustomEvent::from_native(&mut native)));
    assert_eq!(result, None);
    assert!(!native.is_propagation_stopped());
}

#[test]
fn test_on_then_un_stops_delivery() {
    let emitter = EventEmitter::new(Arc::new(()), EmitterConfig::default());
    let receiver: Receiver = Arc::new("receiver");
    let (hits, cb) = counter();

    emitter.on("select", &cb, Some(&receiver));
    assert!(emitter.un("select", &cb, Some(&receiver)));
    emitter.trigger_event("select", None);

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(!emitter.has_listeners("select"));
}

#[test]
fn test_register_then_unregister_with_scope() {
    let emitter = EventEmitter::new(Arc::new(()), EmitterConfig::default());
    let scope: Receiver = Arc::new(42u32);
    let (hits, cb) = counter();
    let seen_scope = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&seen_scope);
    let scoped = callback(move |receiver, _| {
        *seen.lock().unwrap() = receiver.downcast_ref::<u32>().copied();
        Value::Null
    });

    let registration = Registration::new()
        .scope(Arc::clone(&scope))
        .on("click", &cb)
        .on("focus", &scoped);
    emitter.register(&registration);
    emitter.trigger_event("click", None);
    emitter.trigger_event("focus", None);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(*seen_scope.lock().unwrap(), Some(42));

    emitter.unregister(&registration);
    assert_eq!(emitter.trigger_event("click", None), None);
    assert_eq!(emitter.listener_count("click"), 0);
    assert_eq!(emitter.listener_count("focus"), 0);
}

#[test]
fn test_false_return_halts_later_listeners() {
    let emitter = EventEmitter::new(Arc::new(()), EmitterConfig::default());
    let order = Arc::new(Mutex::new(Vec::new()));

    let first_order = Arc::clone(&order);
    emitter.on(
        "close",
        &callback(move |_, _| {
            first_order.lock().unwrap().push("first");
            Value::Bool(false)
        }),
        None,
    );
    let second_order = Arc::clone(&order);
    emitter.on(
        "close",
        &callback(move |_, _| {
            second_order.lock().unwrap().push("second");
            json!(true)
        }),
        None,
    );

    assert_eq!(emitter.trigger_event("close", None), Some(Value::Bool(false)));
    assert_eq!(*order.lock().unwrap(), vec!["first"]);
}

#[test]
fn test_touches_are_averaged_before_forwarding() {
    let (_registry, button, emitter) = bound_button();
    let coords = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&coords);
    emitter.on(
        "touchmove",
        &callback(move |_, event| {
            *seen.lock().unwrap() = event.native().map(|native| (native.client_x, native.client_y));
            Value::Null
        }),
        None,
    );

    let mut touch = NativeEvent::new("touchmove")
        .with_touches([TouchPoint::new(0.0, 0.0), TouchPoint::new(10.0, 10.0)]);
    button.dispatch(&mut touch);

    assert_eq!(*coords.lock().unwrap(), Some((5.0, 5.0)));
    assert!(touch.is_propagation_stopped());
    assert!(touch.is_default_prevented());
}

#[test]
fn test_identical_registrations_fire_twice() {
    let emitter = EventEmitter::new(Arc::new(()), EmitterConfig::default());
    let receiver: Receiver = Arc::new("receiver");
    let (hits, cb) = counter();

    emitter.on("tick", &cb, Some(&receiver));
    emitter.on("tick", &cb, Some(&receiver));
    emitter.trigger_event("tick", None);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    assert!(emitter.un("tick", &cb, Some(&receiver)));
    emitter.trigger_event("tick", None);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[test]
fn test_listeners_added_during_emission_wait_for_next_emission() {
    let emitter = Arc::new(EventEmitter::new(Arc::new(()), EmitterConfig::default()));
    let (late_hits, late) = counter();

    let weak = Arc::downgrade(&emitter);
    let adder = callback(move |_, _| {
        if let Some(emitter) = weak.upgrade() {
            emitter.on("grow", &late, None);
        }
        Value::Null
    });
    emitter.on("grow", &adder, None);

    emitter.trigger_event("grow", None);
    assert_eq!(late_hits.load(Ordering::SeqCst), 0);
    assert_eq!(emitter.listener_count("grow"), 2);

    emitter.trigger_event("grow", None);
    assert_eq!(late_hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_listener_removed_during_emission_still_runs_once() {
    let emitter = Arc::new(EventEmitter::new(Arc::new(()), EmitterConfig::default()));
    let (hits, victim) = counter();

    let weak = Arc::downgrade(&emitter);
    let victim_ref = victim.clone();
    let remover = callback(move |_, _| {
        if let Some(emitter) = weak.upgrade() {
            emitter.un("change", &victim_ref, None);
        }
        Value::Null
    });
    emitter.on("change", &remover, None);
    emitter.on("change", &victim, None);

    emitter.trigger_event("change", None);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    emitter.trigger_event("change", None);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_payload_is_enriched() {
    let (_registry, button, emitter) = bound_button();
    let checked = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&checked);
    let element = button.as_element();
    emitter.on(
        "open",
        &callback(move |_, event| {
            assert_eq!(event.kind(), Some("open"));
            assert_eq!(event.owner::<&str>(), Some(&"button-component"));
            assert!(same_element(event.el().unwrap(), &element));
            assert_eq!(event.get("reason"), Some(&json!("user")));
            seen.fetch_add(1, Ordering::SeqCst);
            Value::Null
        }),
        None,
    );

    emitter.trigger_event("open", Some(CustomEvent::new().with("reason", json!("user"))));
    emitter.trigger_event("open", Some(CustomEvent::of_type("open").with("reason", json!("user"))));
    assert_eq!(checked.load(Ordering::SeqCst), 2);
}

#[test]
fn test_fall_through_leaves_native_event_running() {
    let registry = Arc::new(EventRegistry::new());
    let canvas = HeadlessElement::new(Some("canvas"));
    let config = EmitterConfig {
        fall_through: true,
        ..EmitterConfig::default()
    };
    let emitter = EventEmitter::bound(Arc::new(()), canvas.as_element(), registry, config);
    let (hits, cb) = counter();
    emitter.on("mousedown", &cb, None);

    let mut press = NativeEvent::new("mousedown");
    canvas.dispatch(&mut press);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!press.is_propagation_stopped());

    emitter.set_fall_through(false);
    let mut press = NativeEvent::new("mousedown");
    canvas.dispatch(&mut press);
    assert!(press.is_propagation_stopped());
}

#[test]
fn test_dragstart_is_always_suppressed() {
    let (_registry, button, _emitter) = bound_button();
    let mut drag = NativeEvent::new(DRAG_START);
    assert_eq!(button.dispatch(&mut drag), 1);
    assert!(drag.is_default_prevented());
    assert!(drag.is_propagation_stopped());
}

#[test]
fn test_bound_emitter_registers_native_events() {
    let (registry, button, emitter) = bound_button();
    let element = button.as_element();

    assert!(emitter.is_bound());
    assert_eq!(registry.observer_count(&element), NATIVE_EVENTS.len() + 1);
    assert_eq!(button.listener_count("keydown"), 1);
    assert_eq!(button.listener_count("keypress"), 0);

    emitter.destroy();
    assert_eq!(registry.observer_count(&element), 0);
    assert_eq!(button.total_listeners(), 0);

    let mut click = NativeEvent::new("click");
    assert_eq!(button.dispatch(&mut click), 0);
}

#[test]
fn test_destroyed_emitter_ignores_native_input() {
    let (registry, button, emitter) = bound_button();
    let (hits, cb) = counter();
    emitter.on("click", &cb, None);

    registry.unload_cache();
    emitter.destroy();

    let mut click = NativeEvent::new("click");
    button.dispatch(&mut click);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(emitter.owner().is_none());
}
