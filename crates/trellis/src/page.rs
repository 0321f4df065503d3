//! A headless page: scenario elements, the components bound to them and the
//! registry tracking their native listeners.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::scenario::{Scenario, ScriptedEvent};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use trellis_class::{ClassBuilder, ClassDefinition, Instance};
use trellis_events::{
    attach_bound_emitter, callback, events_class, Callback, ElementLookup, EmitterConfig,
    EventRegistry, HeadlessDocument, HeadlessElement,
};

/// Outcome of replaying scripted native events
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    /// Native events dispatched on an element
    pub dispatched: usize,
    /// Custom events delivered to component listeners
    pub delivered: usize,
    /// Native events stopped by a component
    pub stopped: usize,
    /// Native events no native listener saw
    pub unhandled: usize,
}

struct Component {
    name: String,
    instance: Arc<Instance>,
}

pub struct Page {
    config: AppConfig,
    base: Arc<ClassDefinition>,
    document: Arc<HeadlessDocument>,
    registry: Arc<EventRegistry>,
    components: Vec<Component>,
    delivered: Arc<AtomicUsize>,
}

impl Page {
    pub fn new(config: &AppConfig) -> Self {
        let document = Arc::new(HeadlessDocument::new());
        let registry =
            EventRegistry::with_config(config.registry.clone()).with_lookup(document.clone());
        Self {
            config: config.clone(),
            base: events_class(),
            document,
            registry: Arc::new(registry),
            components: Vec::new(),
            delivered: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create the scenario's elements and bind its components
    pub fn mount(&mut self, scenario: &Scenario) -> Result<(), AppError> {
        for declared in &scenario.elements {
            let element = if declared.legacy_key_events {
                HeadlessElement::legacy(Some(declared.id.as_str()))
            } else {
                HeadlessElement::new(Some(declared.id.as_str()))
            };
            self.document.insert(element);
        }

        for mounted in &scenario.components {
            let element = self
                .document
                .element_by_id(&mounted.element)
                .ok_or_else(|| {
                    AppError::Scenario(format!("unknown element {:?}", mounted.element))
                })?;

            let class = ClassBuilder::extend(&mounted.name, &self.base)
                .initialize(|cx, args| {
                    cx.this().set("element", args.first().cloned().unwrap_or(Value::Null));
                    Ok(())
                })
                .build();
            let instance = class.instantiate(&[json!(mounted.element)])?;

            let config = EmitterConfig {
                fall_through: mounted.fall_through.unwrap_or(self.config.events.fall_through),
                ..self.config.events.clone()
            };
            let emitter =
                attach_bound_emitter(&instance, element, Arc::clone(&self.registry), config);

            let listener = self.delivery_logger(&mounted.name);
            for kind in &mounted.listen {
                if !emitter.native_events().iter().any(|name| name.as_str() == kind.as_str()) {
                    warn!(
                        "⚠️ {} listens for {} which its element does not observe natively",
                        mounted.name, kind
                    );
                }
                emitter.on(kind, &listener, None);
            }

            info!(
                "🧩 Mounted {} on #{} ({} listeners)",
                mounted.name,
                mounted.element,
                mounted.listen.len()
            );
            self.components.push(Component {
                name: mounted.name.clone(),
                instance,
            });
        }
        Ok(())
    }

    fn delivery_logger(&self, component: &str) -> Callback {
        let component = component.to_string();
        let delivered = Arc::clone(&self.delivered);
        callback(move |_, event| {
            let (x, y) = event
                .native()
                .map(|native| (native.client_x, native.client_y))
                .unwrap_or_default();
            info!("🎯 {} received {} at ({}, {})", component, event.kind().unwrap_or("?"), x, y);
            delivered.fetch_add(1, Ordering::Relaxed);
            Value::Null
        })
    }

    /// Dispatch each scripted event on its target element
    pub fn replay(&self, events: &[ScriptedEvent]) -> ReplayReport {
        let delivered_before = self.delivered.load(Ordering::Relaxed);
        let mut report = ReplayReport::default();

        for scripted in events {
            let Some(element) = self.document.get(&scripted.target) else {
                warn!("⚠️ Skipping {}: no element #{}", scripted.kind, scripted.target);
                report.unhandled += 1;
                continue;
            };

            let mut native = scripted.to_native();
            let listeners = element.dispatch(&mut native);
            report.dispatched += 1;
            if listeners == 0 {
                report.unhandled += 1;
            }
            if native.is_propagation_stopped() {
                report.stopped += 1;
            }
            debug!(
                "▶️ Replayed {} on #{} ({} native listeners)",
                scripted.kind, scripted.target, listeners
            );
        }

        report.delivered = self.delivered.load(Ordering::Relaxed) - delivered_before;
        report
    }

    /// Release every native binding, then destroy each component's emitter.
    ///
    /// Returns the number of bindings the registry released.
    pub fn teardown(&mut self) -> usize {
        let released = self.registry.unload_cache();
        for component in self.components.drain(..) {
            if let Err(e) = component.instance.call("destroy_events", &[]) {
                warn!("⚠️ Failed to destroy events of {}: {}", component.name, e);
            }
        }
        info!("🧹 Page torn down ({} native bindings released)", released);
        released
    }

    pub fn registry(&self) -> &Arc<EventRegistry> {
        &self.registry
    }

    pub fn component(&self, name: &str) -> Option<&Arc<Instance>> {
        self.components
            .iter()
            .find(|component| component.name == name)
            .map(|component| &component.instance)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}
