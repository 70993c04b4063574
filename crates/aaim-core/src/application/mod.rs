/// State machine interpreter
pub mod interpreter;

/// Behavior coordinator executing states and transitions
pub mod behavior_coordinator;
