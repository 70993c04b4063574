use crate::{
    domain::behavior_config::{BehaviorConfig, ServiceCallConfig},
    domain::model::{InteractionModel, State},
    types::BehaviorFuture,
    CoreError,
};
use futures::future::{join_all, BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Executes the behavior of states and transitions on behalf of the interpreter
///
/// Both operations report configuration errors synchronously and execution
/// errors through the returned future.
#[cfg_attr(test, mockall::automock)]
pub trait StateBehavior: Send + Sync {
    /// Execute the behavior configured for entering a state
    fn execute_state(&self, config: &Arc<BehaviorConfig>) -> Result<BehaviorFuture<()>, CoreError>;

    /// Execute the service call configured for a transition
    fn execute_transition(
        &self,
        config: &Arc<ServiceCallConfig>,
    ) -> Result<BehaviorFuture<Value>, CoreError>;
}

/// Interprets the state machine of an interaction model
///
/// Behavior is spawned onto the current Tokio runtime. Outside of a runtime
/// the behavior chains are queued and only run when [`Interpreter::settle`]
/// is polled. The interpreter never waits for dispatched behavior otherwise.
pub struct Interpreter {
    behavior: Option<Arc<dyn StateBehavior>>,
    running: bool,
    model: Option<Arc<InteractionModel>>,
    current_state: Option<Arc<State>>,
    states: HashMap<String, Arc<State>>,
    pending: Vec<JoinHandle<()>>,
    deferred: FuturesUnordered<BoxFuture<'static, ()>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::detached()
    }
}

impl Interpreter {
    /// Create an interpreter delegating to `behavior`
    pub fn new(behavior: Arc<dyn StateBehavior>) -> Self {
        Self {
            behavior: Some(behavior),
            ..Self::detached()
        }
    }

    /// Create an interpreter that only tracks states
    pub fn detached() -> Self {
        Self {
            behavior: None,
            running: false,
            model: None,
            current_state: None,
            states: HashMap::new(),
            pending: Vec::new(),
            deferred: FuturesUnordered::new(),
        }
    }

    /// Whether the interpreter is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The loaded model
    pub fn model(&self) -> Option<&Arc<InteractionModel>> {
        self.model.as_ref()
    }

    /// The current state
    pub fn current_state(&self) -> Option<&Arc<State>> {
        self.current_state.as_ref()
    }

    /// Load a model
    ///
    /// Models can only be replaced while paused and need at least one state.
    /// The current state is kept; call [`Interpreter::reset`] to start over.
    pub fn load(&mut self, model: impl Into<Arc<InteractionModel>>) -> bool {
        if self.running {
            debug!("Refusing to load a model while running");
            return false;
        }

        let model = model.into();
        if model.states.is_empty() {
            debug!("Refusing to load a model without states");
            return false;
        }

        let mut states = HashMap::with_capacity(model.states.len());
        for state in &model.states {
            states
                .entry(state.name.clone())
                .or_insert_with(|| Arc::clone(state));
        }

        info!(
            initial = ?model.initial,
            states = states.len(),
            "Loaded interaction model"
        );
        self.states = states;
        self.model = Some(model);
        true
    }

    /// Load a model from an untyped document
    pub fn load_value(&mut self, document: Value) -> bool {
        if self.running {
            debug!("Refusing to load a model while running");
            return false;
        }

        match InteractionModel::from_value(document) {
            Ok(model) => self.load(model),
            Err(e) => {
                debug!(error = %e, "Refusing to load an invalid model document");
                false
            }
        }
    }

    /// Run or pause the interpreter
    ///
    /// Running the first time enters the initial state of the loaded model;
    /// without a resolvable initial state the interpreter stays paused.
    /// Resuming keeps the current state. Pausing always succeeds. Errors are
    /// configuration errors of the initial state behavior.
    pub fn set_running(&mut self, run: bool) -> Result<(), CoreError> {
        if !run {
            if self.running {
                info!("Pausing interpreter");
            }
            self.running = false;
            return Ok(());
        }

        if self.running {
            return Ok(());
        }
        let Some(model) = self.model.clone() else {
            debug!("Cannot run without a loaded model");
            return Ok(());
        };

        if self.current_state.is_some() {
            info!("Resuming interpreter");
            self.running = true;
            return Ok(());
        }

        let Some(initial) = model
            .initial
            .as_deref()
            .and_then(|name| self.states.get(name))
            .cloned()
        else {
            debug!(initial = ?model.initial, "Cannot run without an existing initial state");
            return Ok(());
        };

        info!(state = %initial.name, "Starting interpreter");
        self.running = true;
        self.perform_transition(initial, None)
    }

    /// Return a paused interpreter to its initial state
    pub fn reset(&mut self) {
        if self.running {
            debug!("Ignoring reset while running");
            return;
        }
        self.current_state = None;
    }

    /// Fire an event on the current state
    ///
    /// Events that are unknown to the current state, or whose target state
    /// does not exist, have no effect.
    pub fn execute_event(&mut self, name: &str) -> Result<(), CoreError> {
        if !self.running {
            debug!(event = %name, "Ignoring event while paused");
            return Ok(());
        }
        let Some(current) = self.current_state.clone() else {
            return Ok(());
        };

        let matched = current.events.iter().find_map(|event| {
            if event.on != name {
                return None;
            }
            self.states
                .get(&event.goto)
                .map(|target| (Arc::clone(target), event.transition.clone()))
        });

        match matched {
            Some((target, transition)) => {
                debug!(event = %name, from = %current.name, to = %target.name, "Transition");
                self.perform_transition(target, transition)
            }
            None => {
                debug!(event = %name, state = %current.name, "No transition for event");
                Ok(())
            }
        }
    }

    /// Wait for all dispatched behavior to finish
    ///
    /// Queued behavior chains are driven by the executor polling this future.
    pub async fn settle(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for result in join_all(pending).await {
            if let Err(e) = result {
                error!(error = %e, "Behavior task failed");
            }
        }
        while self.deferred.next().await.is_some() {}
    }

    fn perform_transition(
        &mut self,
        target: Arc<State>,
        transition: Option<Arc<ServiceCallConfig>>,
    ) -> Result<(), CoreError> {
        self.current_state = Some(Arc::clone(&target));

        let Some(behavior) = self.behavior.clone() else {
            return Ok(());
        };

        let task: BoxFuture<'static, ()> = match transition {
            Some(config) => {
                let transition = behavior.execute_transition(&config)?;
                async move {
                    if let Err(e) = transition.await {
                        warn!(state = %target.name, error = %e, "Transition behavior failed");
                        return;
                    }
                    if let Some(config) = &target.behavior {
                        enter_state(behavior.as_ref(), &target.name, config).await;
                    }
                }
                .boxed()
            }
            None => match &target.behavior {
                Some(config) => {
                    let state = behavior.execute_state(config)?;
                    let name = target.name.clone();
                    async move {
                        if let Err(e) = state.await {
                            warn!(state = %name, error = %e, "State behavior failed");
                        }
                    }
                    .boxed()
                }
                None => return Ok(()),
            },
        };

        match Handle::try_current() {
            Ok(runtime) => {
                self.pending.retain(|handle| !handle.is_finished());
                self.pending.push(runtime.spawn(task));
            }
            Err(_) => {
                debug!("No runtime, queueing behavior until settled");
                self.deferred.push(task);
            }
        }
        Ok(())
    }
}

async fn enter_state(behavior: &dyn StateBehavior, state: &str, config: &Arc<BehaviorConfig>) {
    match behavior.execute_state(config) {
        Ok(future) => {
            if let Err(e) = future.await {
                warn!(state = %state, error = %e, "State behavior failed");
            }
        }
        Err(e) => error!(state = %state, error = %e, "Invalid state behavior"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Event;
    use futures::future;
    use mockall::Sequence;
    use serde_json::json;

    fn model() -> InteractionModel {
        InteractionModel::new(
            "Init",
            vec![
                State::new("Init")
                    .with_behavior(BehaviorConfig::new("Welcome"))
                    .with_event(Event::new("next", "Second").with_transition(ServiceCallConfig::new("save"))),
                State::new("Second").with_behavior(BehaviorConfig::new("Overview")),
            ],
        )
    }

    fn ready_state() -> Result<BehaviorFuture<()>, CoreError> {
        Ok(future::ready(Ok(())).boxed())
    }

    #[tokio::test]
    async fn test_running_enters_the_initial_state() {
        let mut behavior = MockStateBehavior::new();
        behavior
            .expect_execute_state()
            .withf(|config| config.situation == "Welcome")
            .times(1)
            .returning(|_| ready_state());
        behavior.expect_execute_transition().never();
        let mut interpreter = Interpreter::new(Arc::new(behavior));

        assert!(interpreter.load(model()));
        interpreter.set_running(true).unwrap();
        interpreter.settle().await;

        assert!(interpreter.is_running());
        assert_eq!(interpreter.current_state().unwrap().name, "Init");
    }

    #[tokio::test]
    async fn test_transition_behavior_runs_before_state_behavior() {
        let mut sequence = Sequence::new();
        let mut behavior = MockStateBehavior::new();
        behavior
            .expect_execute_state()
            .withf(|config| config.situation == "Welcome")
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| ready_state());
        behavior
            .expect_execute_transition()
            .withf(|config| config.name == "save")
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(future::ready(Ok(json!("saved"))).boxed()));
        behavior
            .expect_execute_state()
            .withf(|config| config.situation == "Overview")
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| ready_state());
        let mut interpreter = Interpreter::new(Arc::new(behavior));

        interpreter.load(model());
        interpreter.set_running(true).unwrap();
        interpreter.settle().await;
        interpreter.execute_event("next").unwrap();
        interpreter.settle().await;

        assert_eq!(interpreter.current_state().unwrap().name, "Second");
    }

    #[tokio::test]
    async fn test_failed_transition_skips_state_behavior() {
        let mut behavior = MockStateBehavior::new();
        behavior
            .expect_execute_state()
            .withf(|config| config.situation == "Welcome")
            .times(1)
            .returning(|_| ready_state());
        behavior
            .expect_execute_transition()
            .times(1)
            .returning(|_| Ok(future::ready(Err(CoreError::ServiceExecution("down".into()))).boxed()));
        behavior
            .expect_execute_state()
            .withf(|config| config.situation == "Overview")
            .never();
        let mut interpreter = Interpreter::new(Arc::new(behavior));

        interpreter.load(model());
        interpreter.set_running(true).unwrap();
        interpreter.execute_event("next").unwrap();
        interpreter.settle().await;

        assert_eq!(interpreter.current_state().unwrap().name, "Second");
    }

    #[tokio::test]
    async fn test_configuration_errors_are_returned() {
        let mut behavior = MockStateBehavior::new();
        behavior
            .expect_execute_state()
            .times(1)
            .returning(|_| Err(CoreError::ServiceNotFound("default service".into())));
        let mut interpreter = Interpreter::new(Arc::new(behavior));

        interpreter.load(model());
        let result = interpreter.set_running(true);

        assert_eq!(
            result,
            Err(CoreError::ServiceNotFound("default service".into()))
        );
        assert_eq!(interpreter.current_state().unwrap().name, "Init");
    }

    #[test]
    fn test_unknown_initial_state_keeps_the_interpreter_paused() {
        let mut interpreter = Interpreter::detached();
        interpreter.load(InteractionModel::new("Missing", vec![State::new("Init")]));

        let result = interpreter.set_running(true);

        assert_eq!(result, Ok(()));
        assert!(!interpreter.is_running());
        assert!(interpreter.current_state().is_none());
    }

    #[test]
    fn test_load_is_refused_while_running() {
        let mut interpreter = Interpreter::detached();
        assert!(interpreter.load(model()));
        interpreter.set_running(true).unwrap();

        assert!(!interpreter.load(model()));
        assert!(!interpreter.load_value(json!({ "initial": "A", "states": [{ "name": "A" }] })));
    }

    #[test]
    fn test_load_value_checks_the_document() {
        let mut interpreter = Interpreter::detached();

        assert!(!interpreter.load_value(json!(null)));
        assert!(!interpreter.load_value(json!({ "initial": "A" })));
        assert!(!interpreter.load_value(json!({ "initial": "A", "states": [] })));
        assert!(interpreter.model().is_none());

        assert!(interpreter.load_value(json!({ "initial": "A", "states": [{ "name": "A" }] })));
        assert_eq!(interpreter.model().unwrap().initial.as_deref(), Some("A"));
    }
}
