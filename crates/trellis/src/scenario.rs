//! Scenario files: the elements of a headless page, the components bound to
//! them and the native events to replay.
//!
//! ```toml
//! [[elements]]
//! id = "canvas"
//!
//! [[components]]
//! name = "Sketch"
//! element = "canvas"
//! listen = ["touchmove", "click"]
//!
//! [[events]]
//! kind = "touchmove"
//! target = "canvas"
//! touches = [{ client_x = 0.0, client_y = 0.0 }, { client_x = 10.0, client_y = 10.0 }]
//! ```

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use trellis_events::{NativeEvent, TouchPoint};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
}

/// A headless element to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub id: String,
    /// Serve `keypress` bindings with `keydown`
    #[serde(default)]
    pub legacy_key_events: bool,
}

/// A component class instantiated and bound to an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub element: String,
    /// Custom event types the component logs
    #[serde(default)]
    pub listen: Vec<String>,
    /// Overrides the configured fall-through setting
    #[serde(default)]
    pub fall_through: Option<bool>,
}

/// A native event dispatched on an element during replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedEvent {
    pub kind: String,
    pub target: String,
    #[serde(default)]
    pub client_x: f64,
    #[serde(default)]
    pub client_y: f64,
    #[serde(default)]
    pub touches: Vec<TouchPoint>,
    #[serde(default)]
    pub key: Option<String>,
}

impl ScriptedEvent {
    pub fn to_native(&self) -> NativeEvent {
        let event = NativeEvent::new(&self.kind)
            .at(self.client_x, self.client_y)
            .with_touches(self.touches.iter().copied());
        match &self.key {
            Some(key) => event.with_key(key),
            None => event,
        }
    }
}

impl Scenario {
    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parses and validates a scenario document
    pub fn parse(content: &str) -> Result<Self, AppError> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Checks that every reference names a declared element
    pub fn validate(&self) -> Result<(), AppError> {
        let mut ids = HashSet::new();
        for element in &self.elements {
            if element.id.trim().is_empty() {
                return Err(AppError::Scenario("element ids cannot be empty".to_string()));
            }
            if !ids.insert(element.id.as_str()) {
                return Err(AppError::Scenario(format!("duplicate element id {:?}", element.id)));
            }
        }

        for component in &self.components {
            if !ids.contains(component.element.as_str()) {
                return Err(AppError::Scenario(format!(
                    "component {} is bound to unknown element {:?}",
                    component.name, component.element
                )));
            }
        }

        for event in &self.events {
            if event.kind.trim().is_empty() {
                return Err(AppError::Scenario("event kinds cannot be empty".to_string()));
            }
            if !ids.contains(event.target.as_str()) {
                return Err(AppError::Scenario(format!(
                    "{} targets unknown element {:?}",
                    event.kind, event.target
                )));
            }
        }
        Ok(())
    }
}
