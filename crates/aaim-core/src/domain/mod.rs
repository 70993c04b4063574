/// Interaction model documents
pub mod model;

/// State behavior and service call configurations
pub mod behavior_config;

/// Parameter reference resolution
pub mod parameters;

/// Service contract
pub mod service;

/// Situation factory contract
pub mod situation;
