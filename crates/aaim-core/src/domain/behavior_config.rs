use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A structured object configuring the behavior on entering a state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorConfig {
    /// The name of the situation handed over to the situation factory
    pub situation: String,

    /// The situation parameters or a service call fetching them
    #[serde(default, skip_serializing_if = "ParameterSource::is_none")]
    pub parameters: ParameterSource,

    /// Service calls mapping the resolved parameters one by one, matched by index
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter_mapping: Vec<Option<ServiceCallConfig>>,
}

impl BehaviorConfig {
    /// Create a behavior configuration for a situation without parameters
    pub fn new(situation: impl Into<String>) -> Self {
        Self {
            situation: situation.into(),
            ..Self::default()
        }
    }

    /// Set the parameter source
    pub fn with_parameters(mut self, parameters: impl Into<ParameterSource>) -> Self {
        self.parameters = parameters.into();
        self
    }

    /// Set the parameter mapping
    pub fn with_parameter_mapping(mut self, mapping: Vec<Option<ServiceCallConfig>>) -> Self {
        self.parameter_mapping = mapping;
        self
    }
}

/// A structured object defining a service call to be executed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCallConfig {
    /// The registered service to call, `None` for the default service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// The name of the service method to call
    #[serde(default)]
    pub name: String,

    /// The method parameters or another service call fetching them
    #[serde(default, skip_serializing_if = "ParameterSource::is_none")]
    pub parameters: ParameterSource,

    /// Service calls mapping the parameters one by one, matched by index
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter_mapping: Vec<Option<ServiceCallConfig>>,

    /// Service call mapping the result of this call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_mapping: Option<Box<ServiceCallConfig>>,
}

impl ServiceCallConfig {
    /// Call `method` on the default service
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            name: method.into(),
            ..Self::default()
        }
    }

    /// Call `method` on the service registered as `service`
    pub fn on(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            ..Self::new(method)
        }
    }

    /// Set the parameter source
    pub fn with_parameters(mut self, parameters: impl Into<ParameterSource>) -> Self {
        self.parameters = parameters.into();
        self
    }

    /// Set the parameter mapping
    pub fn with_parameter_mapping(mut self, mapping: Vec<Option<ServiceCallConfig>>) -> Self {
        self.parameter_mapping = mapping;
        self
    }

    /// Set the result mapping
    pub fn with_result_mapping(mut self, mapping: ServiceCallConfig) -> Self {
        self.result_mapping = Some(Box::new(mapping));
        self
    }
}

/// Where the parameters of a call or situation come from
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterSource {
    /// Literal values and `${...}` references into the data context
    Literal(Vec<Value>),

    /// The result of another service call
    Derived(Box<ServiceCallConfig>),

    /// Nothing configured
    #[default]
    None,
}

impl ParameterSource {
    /// Whether no parameters are configured
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, ParameterSource::None)
    }
}

impl From<Vec<Value>> for ParameterSource {
    fn from(values: Vec<Value>) -> Self {
        ParameterSource::Literal(values)
    }
}

impl From<ServiceCallConfig> for ParameterSource {
    fn from(config: ServiceCallConfig) -> Self {
        ParameterSource::Derived(Box::new(config))
    }
}

// Arrays are literal lists, objects are service calls and anything else
// counts as not configured.
impl<'de> Deserialize<'de> for ParameterSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Array(values) => Ok(ParameterSource::Literal(values)),
            value @ Value::Object(_) => serde_json::from_value(value)
                .map(|config| ParameterSource::Derived(Box::new(config)))
                .map_err(serde::de::Error::custom),
            _ => Ok(ParameterSource::None),
        }
    }
}
