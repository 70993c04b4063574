//! The service contract and a reusable function-table implementation.

use async_trait::async_trait;
use futures::future::{self, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::types::ServiceFuture;
use crate::CoreError;

/// A pluggable unit exposing named, asynchronously invocable methods
///
/// `execute` reports every failure through its result; callers never see a
/// synchronous failure from a service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Service: Send + Sync {
    /// Check if a method with the given name is provided
    fn provides(&self, method: &str) -> bool;

    /// Call a method by its name with the given parameters
    async fn execute(&self, method: &str, parameters: Vec<Value>) -> Result<Value, CoreError>;
}

type ServiceFunction = Arc<dyn Fn(Vec<Value>) -> ServiceFuture + Send + Sync>;

/// A service backed by a table of named functions
///
/// Plain functions have their return value (or error) wrapped into a ready
/// future, asynchronous functions have their future forwarded as is.
#[derive(Clone, Default)]
pub struct FunctionService {
    functions: HashMap<String, ServiceFunction>,
}

impl FunctionService {
    /// Create a service without any functions
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain function
    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, CoreError> + Send + Sync + 'static,
    {
        self.register(name, move |params| future::ready(function(params)).boxed());
        self
    }

    /// Add a function returning a future
    pub fn with_async_function<F, Fut>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, CoreError>> + Send + 'static,
    {
        self.register(name, move |params| function(params).boxed());
        self
    }

    /// Names of all provided functions
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(Vec<Value>) -> ServiceFuture + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }
}

impl fmt::Debug for FunctionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.function_names().collect();
        names.sort_unstable();
        f.debug_struct("FunctionService")
            .field("functions", &names)
            .finish()
    }
}

#[async_trait]
impl Service for FunctionService {
    fn provides(&self, method: &str) -> bool {
        self.functions.contains_key(method)
    }

    async fn execute(&self, method: &str, parameters: Vec<Value>) -> Result<Value, CoreError> {
        let function = self.functions.get(method).cloned().ok_or_else(|| {
            CoreError::ServiceExecution(format!(
                "Function '{}' is not provided by this service.",
                method
            ))
        })?;

        function(parameters).await
    }
}
