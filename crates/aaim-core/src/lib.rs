//!
//! AAIM Core - Runtime for Abstract Application Interaction Models
//!
//! This crate interprets interaction models: state machines whose states and
//! transitions declare the behavior to execute on entering them. The
//! interpreter tracks states and fires events, the behavior coordinator turns
//! declarative service call graphs into asynchronous service invocations and
//! hands the results to a situation factory.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - interaction models, configurations and contracts
pub mod domain;

/// Application services - interpreter and behavior coordinator
pub mod application;

/// Core types
pub mod types;

/// Error types
pub mod error;

// Re-export key types
pub use error::CoreError;
pub use types::{BehaviorFuture, DataContext, ServiceFuture};

// Re-export main API types for easy use
pub use application::behavior_coordinator::BehaviorCoordinator;
pub use application::interpreter::{Interpreter, StateBehavior};
pub use domain::behavior_config::{BehaviorConfig, ParameterSource, ServiceCallConfig};
pub use domain::model::{Event, InteractionModel, State};
pub use domain::service::{FunctionService, Service};
pub use domain::situation::{NoopSituationFactory, SituationFactory};
