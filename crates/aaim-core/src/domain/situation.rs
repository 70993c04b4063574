use serde_json::Value;

use crate::types::DataContext;

/// External consumer materializing situations from behavior configurations
///
/// Both calls are fire-and-forget from the coordinator's point of view.
#[cfg_attr(test, mockall::automock)]
pub trait SituationFactory: Send + Sync {
    /// Materialize a new situation
    fn create(&self, situation: &str, parameters: Vec<Value>, context: &DataContext);

    /// Refresh the current situation with newly resolved parameters
    fn refresh(&self, situation: &str, parameters: Vec<Value>, context: &DataContext);
}

/// A situation factory that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSituationFactory;

impl SituationFactory for NoopSituationFactory {
    fn create(&self, situation: &str, _parameters: Vec<Value>, _context: &DataContext) {
        tracing::trace!(situation = %situation, "Ignoring situation creation");
    }

    fn refresh(&self, situation: &str, _parameters: Vec<Value>, _context: &DataContext) {
        tracing::trace!(situation = %situation, "Ignoring situation refresh");
    }
}
