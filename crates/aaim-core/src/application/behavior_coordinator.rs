use crate::{
    application::interpreter::StateBehavior,
    domain::behavior_config::{BehaviorConfig, ParameterSource, ServiceCallConfig},
    domain::parameters,
    domain::service::Service,
    domain::situation::{NoopSituationFactory, SituationFactory},
    types::{BehaviorFuture, DataContext, ServiceFuture},
    CoreError,
};
use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::{self, FutureExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Registry key of the default service
const DEFAULT_SERVICE_KEY: &str = "";

/// Central coordinator of the behavior on state changes and transitions
///
/// The coordinator resolves declarative parameter and service call graphs
/// into asynchronous service invocations and hands the results to the
/// situation factory. Cloning yields another handle onto the same registry,
/// data context and last executed configuration.
///
/// Configuration errors are reported synchronously by the outer `Result` of
/// every operation, before any asynchronous work starts. Failures of service
/// methods are reported by the returned future.
#[derive(Clone)]
pub struct BehaviorCoordinator {
    /// Factory materializing situations
    factory: Arc<dyn SituationFactory>,

    /// Registered services by name, the default service under the empty key
    services: Arc<DashMap<String, Arc<dyn Service>>>,

    /// The data context
    data: DataContext,

    /// The last executed state configuration
    current_config: Arc<Mutex<Option<Arc<BehaviorConfig>>>>,
}

impl Default for BehaviorCoordinator {
    fn default() -> Self {
        Self::new(Arc::new(NoopSituationFactory))
    }
}

impl BehaviorCoordinator {
    /// Create a coordinator without services
    pub fn new(factory: Arc<dyn SituationFactory>) -> Self {
        Self {
            factory,
            services: Arc::new(DashMap::new()),
            data: DataContext::new(),
            current_config: Arc::new(Mutex::new(None)),
        }
    }

    /// Use `service` for calls without a service name
    pub fn with_default_service(self, service: Arc<dyn Service>) -> Self {
        self.services.insert(DEFAULT_SERVICE_KEY.to_string(), service);
        self
    }

    /// Use an existing data context
    pub fn with_data_context(mut self, data: DataContext) -> Self {
        self.data = data;
        self
    }

    /// The shared data context
    pub fn data_context(&self) -> &DataContext {
        &self.data
    }

    /// Check if a service is registered under `name`
    pub fn has_service(&self, name: &str) -> bool {
        !name.is_empty() && self.services.contains_key(name)
    }

    /// Check if a default service is configured
    pub fn has_default_service(&self) -> bool {
        self.services.contains_key(DEFAULT_SERVICE_KEY)
    }

    /// Register a service under a non-empty, unused name
    pub fn register_service(
        &self,
        name: &str,
        service: Arc<dyn Service>,
    ) -> Result<(), CoreError> {
        if name.is_empty() {
            return Err(CoreError::ServiceRegistration(
                "A service cannot be registered without a name.".to_string(),
            ));
        }

        match self.services.entry(name.to_string()) {
            Entry::Occupied(_) => Err(CoreError::ServiceRegistration(format!(
                "There is already a service named '{}'.",
                name
            ))),
            Entry::Vacant(slot) => {
                slot.insert(service);
                debug!(service = %name, "Registered service");
                Ok(())
            }
        }
    }

    /// Resolve a parameter list against the data context
    pub fn resolve_parameters(&self, parameters: &[Value]) -> Vec<Value> {
        parameters::resolve_parameters(parameters, &self.data)
    }

    /// Execute a state configuration
    ///
    /// The returned future resolves the situation parameters and then either
    /// refreshes the current situation, when `config` is the very configuration
    /// executed last, or creates a new one.
    pub fn execute_state(&self, config: &Arc<BehaviorConfig>) -> Result<BehaviorFuture<()>, CoreError> {
        let source = self.prepare_parameters(&config.parameters)?;
        let mapping = self.prepare_mapping(&config.parameter_mapping)?;

        let coordinator = self.clone();
        let config = Arc::clone(config);

        Ok(async move {
            let data = coordinator.data.clone();
            let parameters = match source {
                PreparedParameters::Literal(values) => parameters::resolve_parameters(&values, &data),
                PreparedParameters::Derived(call) => into_parameter_list(call.run(data.clone(), None).await?),
                PreparedParameters::None => Vec::new(),
            };
            let parameters = map_parameters(parameters, mapping, &data).await?;

            coordinator.materialize(&config, parameters).await;
            Ok(())
        }
        .boxed())
    }

    /// Execute a transition configuration
    ///
    /// Without a configuration the returned future is already resolved.
    pub fn execute_transition(
        &self,
        config: Option<&ServiceCallConfig>,
    ) -> Result<BehaviorFuture<Value>, CoreError> {
        match config {
            Some(config) => self.call_service(config, None),
            None => Ok(future::ready(Ok(Value::Null)).boxed()),
        }
    }

    /// Perform a service call including fetching, resolving and mapping its
    /// parameters and mapping its result
    ///
    /// `default_parameters` are used when the configuration has none.
    pub fn call_service(
        &self,
        config: &ServiceCallConfig,
        default_parameters: Option<Vec<Value>>,
    ) -> Result<ServiceFuture, CoreError> {
        let call = self.prepare(config)?;
        Ok(call.run(self.data.clone(), default_parameters))
    }

    /// Validate a call configuration and everything nested in it
    fn prepare(&self, config: &ServiceCallConfig) -> Result<PreparedCall, CoreError> {
        if config.name.is_empty() {
            return Err(CoreError::InvalidServiceConfig(
                "'name' is required!".to_string(),
            ));
        }
        if matches!(config.service.as_deref(), Some("")) {
            return Err(CoreError::InvalidServiceConfig(
                "'service' has to be a non-empty string, if defined!".to_string(),
            ));
        }

        let (service, label) = self.lookup(config.service.as_deref())?;
        if !service.provides(&config.name) {
            return Err(CoreError::MethodNotProvided {
                service: label,
                method: config.name.clone(),
            });
        }

        Ok(PreparedCall {
            service,
            label,
            method: config.name.clone(),
            parameters: self.prepare_parameters(&config.parameters)?,
            parameter_mapping: self.prepare_mapping(&config.parameter_mapping)?,
            result_mapping: config
                .result_mapping
                .as_deref()
                .map(|mapping| self.prepare(mapping).map(Box::new))
                .transpose()?,
        })
    }

    fn prepare_parameters(&self, source: &ParameterSource) -> Result<PreparedParameters, CoreError> {
        Ok(match source {
            ParameterSource::Literal(values) => PreparedParameters::Literal(values.clone()),
            ParameterSource::Derived(call) => PreparedParameters::Derived(Box::new(self.prepare(call)?)),
            ParameterSource::None => PreparedParameters::None,
        })
    }

    fn prepare_mapping(
        &self,
        mapping: &[Option<ServiceCallConfig>],
    ) -> Result<Vec<Option<PreparedCall>>, CoreError> {
        mapping
            .iter()
            .map(|entry| entry.as_ref().map(|call| self.prepare(call)).transpose())
            .collect()
    }

    fn lookup(&self, name: Option<&str>) -> Result<(Arc<dyn Service>, String), CoreError> {
        match name {
            Some(name) => self
                .services
                .get(name)
                .map(|service| (Arc::clone(service.value()), format!("Service '{}'", name)))
                .ok_or_else(|| CoreError::ServiceNotFound(format!("service named '{}'", name))),
            None => self
                .services
                .get(DEFAULT_SERVICE_KEY)
                .map(|service| (Arc::clone(service.value()), "Default service".to_string()))
                .ok_or_else(|| CoreError::ServiceNotFound("default service".to_string())),
        }
    }

    async fn materialize(&self, config: &Arc<BehaviorConfig>, parameters: Vec<Value>) {
        let refresh = {
            let mut current = self.current_config.lock().await;
            match current.as_ref() {
                Some(previous) if Arc::ptr_eq(previous, config) => true,
                _ => {
                    *current = Some(Arc::clone(config));
                    false
                }
            }
        };

        if refresh {
            debug!(situation = %config.situation, "Refreshing situation");
            self.factory.refresh(&config.situation, parameters, &self.data);
        } else {
            debug!(situation = %config.situation, "Creating situation");
            self.factory.create(&config.situation, parameters, &self.data);
        }
    }
}

impl StateBehavior for BehaviorCoordinator {
    fn execute_state(&self, config: &Arc<BehaviorConfig>) -> Result<BehaviorFuture<()>, CoreError> {
        BehaviorCoordinator::execute_state(self, config)
    }

    fn execute_transition(
        &self,
        config: &Arc<ServiceCallConfig>,
    ) -> Result<BehaviorFuture<Value>, CoreError> {
        BehaviorCoordinator::execute_transition(self, Some(config.as_ref()))
    }
}

/// A validated service call with its service resolved
struct PreparedCall {
    service: Arc<dyn Service>,
    label: String,
    method: String,
    parameters: PreparedParameters,
    parameter_mapping: Vec<Option<PreparedCall>>,
    result_mapping: Option<Box<PreparedCall>>,
}

enum PreparedParameters {
    Literal(Vec<Value>),
    Derived(Box<PreparedCall>),
    None,
}

impl PreparedCall {
    fn run(self, data: DataContext, default_parameters: Option<Vec<Value>>) -> ServiceFuture {
        async move {
            let parameters = match self.parameters {
                PreparedParameters::Literal(values) => parameters::resolve_parameters(&values, &data),
                PreparedParameters::Derived(call) => vec![call.run(data.clone(), None).await?],
                PreparedParameters::None => default_parameters.unwrap_or_default(),
            };
            let parameters = map_parameters(parameters, self.parameter_mapping, &data).await?;

            trace!(
                service = %self.label,
                method = %self.method,
                parameters = ?parameters,
                "Calling service method"
            );
            let result = self.service.execute(&self.method, parameters).await?;

            match self.result_mapping {
                Some(mapping) => mapping.run(data, Some(vec![result])).await,
                None => Ok(result),
            }
        }
        .boxed()
    }
}

/// Replace each parameter that has a mapping entry at its index by the
/// result of that mapping call; the calls run concurrently
async fn map_parameters(
    parameters: Vec<Value>,
    mapping: Vec<Option<PreparedCall>>,
    data: &DataContext,
) -> Result<Vec<Value>, CoreError> {
    if mapping.is_empty() {
        return Ok(parameters);
    }

    let mut mapping = mapping.into_iter();
    let calls = parameters.into_iter().map(|value| match mapping.next().flatten() {
        Some(call) => call.run(data.clone(), Some(vec![value])),
        None => future::ready(Ok(value)).boxed(),
    });

    future::try_join_all(calls).await
}

/// Situation parameters fetched by a service call: arrays are the list itself
fn into_parameter_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(values) => values,
        value => vec![value],
    }
}
