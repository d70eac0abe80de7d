//! In-memory rule engine that replays scripted outcomes.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::context::EvalContext;
use crate::traits::{EngineError, EngineResult, EvaluationResult, PolicyModule, RuleEngine};

type Responder = Arc<dyn Fn(&Value) -> EngineResult<EvaluationResult> + Send + Sync>;

enum Script {
    Fixed(EngineResult<EvaluationResult>),
    Respond(Responder),
    Hang,
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(outcome) => f.debug_tuple("Fixed").field(outcome).finish(),
            Self::Respond(_) => f.write_str("Respond(..)"),
            Self::Hang => f.write_str("Hang"),
        }
    }
}

/// Rule engine that returns pre-scripted results without interpreting any policy.
///
/// Records every compiled module set and every evaluation input so tests can
/// assert on what the caller handed to the engine.
#[derive(Debug)]
pub struct ScriptedEngine {
    compile_error: Option<EngineError>,
    script: Script,
    compiled: Mutex<Vec<Vec<String>>>,
    inputs: Mutex<Vec<Value>>,
}

impl ScriptedEngine {
    fn with_script(script: Script) -> Self {
        Self {
            compile_error: None,
            script,
            compiled: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Engine whose evaluations always return `result`.
    #[must_use]
    pub fn returning(result: EvaluationResult) -> Self {
        Self::with_script(Script::Fixed(Ok(result)))
    }

    /// Engine whose evaluations always fail with `error`.
    #[must_use]
    pub fn failing(error: EngineError) -> Self {
        Self::with_script(Script::Fixed(Err(error)))
    }

    /// Engine that computes each result from the evaluation input.
    #[must_use]
    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&Value) -> EngineResult<EvaluationResult> + Send + Sync + 'static,
    {
        Self::with_script(Script::Respond(Arc::new(responder)))
    }

    /// Engine whose evaluations never finish until the context fires.
    #[must_use]
    pub fn hanging() -> Self {
        Self::with_script(Script::Hang)
    }

    /// Makes compilation fail with `error`.
    #[must_use]
    pub fn with_compile_error(mut self, error: EngineError) -> Self {
        self.compile_error = Some(error);
        self
    }

    /// Returns the module names of every compilation, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal store lock has been poisoned.
    #[must_use]
    pub fn compiled(&self) -> Vec<Vec<String>> {
        self.compiled
            .lock()
            .expect("scripted engine store poisoned")
            .clone()
    }

    /// Returns every evaluation input, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal store lock has been poisoned.
    #[must_use]
    pub fn inputs(&self) -> Vec<Value> {
        self.inputs
            .lock()
            .expect("scripted engine store poisoned")
            .clone()
    }
}

#[async_trait]
impl RuleEngine for ScriptedEngine {
    type Prepared = ();

    fn compile(&self, modules: &[PolicyModule], _query: &str) -> EngineResult<()> {
        self.compiled
            .lock()
            .expect("scripted engine store poisoned")
            .push(modules.iter().map(|m| m.name().to_owned()).collect());

        match &self.compile_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn evaluate(
        &self,
        _prepared: (),
        input: Value,
        ctx: &EvalContext,
    ) -> EngineResult<EvaluationResult> {
        ctx.check()?;
        self.inputs
            .lock()
            .expect("scripted engine store poisoned")
            .push(input.clone());

        match &self.script {
            Script::Fixed(outcome) => outcome.clone(),
            Script::Respond(responder) => responder(&input),
            Script::Hang => Err(ctx.done().await),
        }
    }
}
