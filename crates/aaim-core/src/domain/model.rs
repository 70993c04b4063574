use crate::domain::behavior_config::{BehaviorConfig, ServiceCallConfig};
use crate::CoreError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// An Abstract Application Interaction Model (AAIM)
///
/// The document is read-only once loaded. States and behavior configurations
/// are reference counted so the interpreter and the coordinator can compare
/// them by identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionModel {
    /// The name of the initial state
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub initial: Option<String>,

    /// All states of the model
    #[serde(default)]
    pub states: Vec<Arc<State>>,
}

/// A single state of an interaction model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    /// The unique name of the state
    pub name: String,

    /// The behavior executed on entering the state
    #[serde(rename = "do", default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<Arc<BehaviorConfig>>,

    /// Events triggering transitions, in declaration order
    #[serde(default)]
    pub events: Vec<Event>,
}

/// A transition triggered by a named event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    /// The name of the trigger
    pub on: String,

    /// The name of the target state
    pub goto: String,

    /// Service call executed before entering the target state
    #[serde(rename = "do", default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Arc<ServiceCallConfig>>,
}

impl InteractionModel {
    /// Create a model from its initial state name and states
    pub fn new(initial: impl Into<String>, states: Vec<State>) -> Self {
        Self {
            initial: Some(initial.into()),
            states: states.into_iter().map(Arc::new).collect(),
        }
    }

    /// Read a model from an untyped document
    ///
    /// Fails when the document is not a structured object or does not match
    /// the model shape. An empty state list is accepted here; the interpreter
    /// refuses to load it.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        if !value.is_object() {
            return Err(CoreError::ModelError(
                "An interaction model has to be a structured object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| CoreError::ModelError(e.to_string()))
    }

    /// Parse a model from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Parse a model from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CoreError> {
        Self::from_value(serde_yaml::from_str(yaml)?)
    }

    /// Find the first state declared with the given name
    pub fn state(&self, name: &str) -> Option<&Arc<State>> {
        self.states.iter().find(|state| state.name == name)
    }
}

impl State {
    /// Create a state without behavior or events
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the entry behavior
    pub fn with_behavior(mut self, behavior: BehaviorConfig) -> Self {
        self.behavior = Some(Arc::new(behavior));
        self
    }

    /// Append an event
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }
}

impl Event {
    /// Create an event moving to `goto` when `on` is fired
    pub fn new(on: impl Into<String>, goto: impl Into<String>) -> Self {
        Self {
            on: on.into(),
            goto: goto.into(),
            transition: None,
        }
    }

    /// Set the transition behavior
    pub fn with_transition(mut self, transition: ServiceCallConfig) -> Self {
        self.transition = Some(Arc::new(transition));
        self
    }
}

// A non-string initial state is kept loadable; activation refuses it later.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(name) => Ok(Some(name)),
        _ => Ok(None),
    }
}
