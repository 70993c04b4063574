use thiserror::Error;

/// Core error type for the AAIM runtime
///
/// Configuration failures (`InvalidServiceConfig`, `ServiceNotFound`,
/// `MethodNotProvided`, `ServiceRegistration`) are returned synchronously.
/// `ServiceExecution` only ever comes out of a resolved future.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Malformed service call configuration
    #[error("Invalid service configuration: {0}")]
    InvalidServiceConfig(String),

    /// No service registered under the requested name
    #[error("Invalid service configuration: There is no {0}!")]
    ServiceNotFound(String),

    /// The resolved service does not provide the requested method
    #[error("Invalid service configuration: {service} does not provide a method '{method}'!")]
    MethodNotProvided {
        /// Display name of the service ("Service 'x'" or "Default service")
        service: String,
        /// The requested method
        method: String,
    },

    /// Service registration rejected
    #[error("Service registration error: {0}")]
    ServiceRegistration(String),

    /// A service method failed while executing
    #[error("Service execution error: {0}")]
    ServiceExecution(String),

    /// An interaction model document could not be read
    #[error("Model error: {0}")]
    ModelError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Stable code identifying the error family
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidServiceConfig(_) => "ERR_AAIM_INVALID_SERVICE_CONFIG",
            CoreError::ServiceNotFound(_) => "ERR_AAIM_SERVICE_NOT_FOUND",
            CoreError::MethodNotProvided { .. } => "ERR_AAIM_METHOD_NOT_PROVIDED",
            CoreError::ServiceRegistration(_) => "ERR_AAIM_SERVICE_REGISTRATION",
            CoreError::ServiceExecution(_) => "ERR_AAIM_SERVICE_EXECUTION",
            CoreError::ModelError(_) => "ERR_AAIM_MODEL",
            CoreError::SerializationError(_) => "ERR_AAIM_SERIALIZATION",
            CoreError::Other(_) => "ERR_AAIM_OTHER",
        }
    }

    /// Whether this error belongs to the synchronous configuration channel
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidServiceConfig(_)
                | CoreError::ServiceNotFound(_)
                | CoreError::MethodNotProvided { .. }
                | CoreError::ServiceRegistration(_)
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

impl From<&str> for CoreError {
    fn from(err: &str) -> Self {
        CoreError::Other(err.to_string())
    }
}
