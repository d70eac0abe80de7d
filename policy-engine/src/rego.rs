//! Rule engine backed by the `regorus` Rego interpreter.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::context::EvalContext;
use crate::traits::{Bindings, EngineError, EngineResult, EvaluationResult, PolicyModule, RuleEngine};

/// Modules and query that parsed successfully, ready to evaluate.
#[derive(Clone, Debug)]
pub struct PreparedRego {
    modules: Vec<PolicyModule>,
    query: String,
}

impl PreparedRego {
    /// Returns the compiled modules.
    #[must_use]
    pub fn modules(&self) -> &[PolicyModule] {
        &self.modules
    }

    /// Returns the query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Adapter over [`regorus::Engine`].
///
/// Each evaluation loads a fresh interpreter on the blocking thread pool, so
/// no interpreter state is shared between requests. A semaphore bounds how
/// many evaluations may occupy blocking threads at once.
///
/// An interpreter run cannot be interrupted. When the context is cancelled or
/// its deadline passes, the caller gets an error immediately but the run keeps
/// its thread and its permit until it finishes on its own. Hosts that must exit
/// promptly should shut their runtime down with
/// [`Runtime::shutdown_background`](tokio::runtime::Runtime::shutdown_background).
#[derive(Clone, Debug)]
pub struct RegoEngine {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl RegoEngine {
    /// Creates the adapter, allowing one evaluation per available core.
    #[must_use]
    pub fn new() -> Self {
        let cores = std::thread::available_parallelism().map_or(4, NonZeroUsize::get);
        Self::with_max_concurrent(cores)
    }

    /// Creates the adapter with an explicit bound on concurrent evaluations.
    ///
    /// A bound of zero is raised to one.
    #[must_use]
    pub fn with_max_concurrent(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Returns the bound on concurrent evaluations.
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Returns how many evaluations could start right now.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    fn load(modules: &[PolicyModule]) -> EngineResult<regorus::Engine> {
        let mut engine = regorus::Engine::new();
        for module in modules {
            engine
                .add_policy(module.name().to_owned(), module.source().to_owned())
                .map_err(|err| EngineError::compile(format!("{}: {err:#}", module.name())))?;
        }
        Ok(engine)
    }
}

impl Default for RegoEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleEngine for RegoEngine {
    type Prepared = PreparedRego;

    fn compile(&self, modules: &[PolicyModule], query: &str) -> EngineResult<PreparedRego> {
        if modules.is_empty() {
            return Err(EngineError::compile("no policy modules to compile"));
        }
        if query.trim().is_empty() {
            return Err(EngineError::compile("query is empty"));
        }

        Self::load(modules)?;
        debug!(modules = modules.len(), query, "compiled rego modules");

        Ok(PreparedRego {
            modules: modules.to_vec(),
            query: query.to_owned(),
        })
    }

    async fn evaluate(
        &self,
        prepared: PreparedRego,
        input: Value,
        ctx: &EvalContext,
    ) -> EngineResult<EvaluationResult> {
        ctx.check()?;

        let permit = tokio::select! {
            permit = Arc::clone(&self.permits).acquire_owned() => permit
                .map_err(|_| EngineError::evaluation("evaluation pool is closed"))?,
            err = ctx.done() => return Err(err),
        };

        // The permit moves into the task so an abandoned run keeps counting
        // against the bound until it really finishes.
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            evaluate_blocking(&prepared, &input)
        });

        tokio::select! {
            joined = task => joined
                .map_err(|err| EngineError::evaluation(format!("evaluation task failed: {err}")))?,
            err = ctx.done() => {
                warn!(error = %err, "abandoning running rego evaluation");
                Err(err)
            }
        }
    }
}

fn evaluate_blocking(prepared: &PreparedRego, input: &Value) -> EngineResult<EvaluationResult> {
    let mut engine = RegoEngine::load(&prepared.modules)?;
    let input = regorus::Value::from_json_str(&input.to_string())
        .map_err(|err| EngineError::evaluation(format!("cannot load input: {err:#}")))?;
    engine.set_input(input);

    let results = engine
        .eval_query(prepared.query.clone(), false)
        .map_err(|err| EngineError::evaluation(format!("{err:#}")))?;

    let solutions = results
        .result
        .into_iter()
        .map(|solution| into_bindings(&solution.bindings))
        .collect::<EngineResult<Vec<_>>>()?;
    debug!(solutions = solutions.len(), "evaluated rego query");

    Ok(EvaluationResult::new(solutions))
}

fn into_bindings(bindings: &regorus::Value) -> EngineResult<Bindings> {
    match serde_json::to_value(bindings) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Bindings::new()),
        Ok(other) => Err(EngineError::evaluation(format!(
            "query bindings are not an object: {other}"
        ))),
        Err(err) => Err(EngineError::evaluation(format!(
            "cannot convert query bindings: {err}"
        ))),
    }
}
