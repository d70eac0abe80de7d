//! Seeds responses from requests and runs the policy function end to end.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "rego")]
use policy_engine::RegoEngine;
use policy_engine::{DEFAULT_QUERY, EvalContext, RuleEngine};
use policy_state::{DEFAULT_TTL, FunctionRequest, FunctionResponse, ResponseMeta};
use tracing::{debug, info, warn};

use crate::error::{FunctionError, MergeResult};
use crate::input::FunctionInput;
use crate::merge::merge_evaluation;

/// Default upper bound on a single evaluation.
pub const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable settings shared by every invocation of a [`PolicyFunction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSettings {
    ttl: Duration,
    query: String,
    eval_timeout: Option<Duration>,
}

impl FunctionSettings {
    /// Sets the response time-to-live.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the query evaluated against the policy modules.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Sets the evaluation timeout; `None` lets evaluations run until cancelled.
    #[must_use]
    pub fn with_eval_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.eval_timeout = timeout;
        self
    }

    /// Returns the response time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the evaluation timeout.
    #[must_use]
    pub const fn eval_timeout(&self) -> Option<Duration> {
        self.eval_timeout
    }
}

impl Default for FunctionSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            query: DEFAULT_QUERY.to_owned(),
            eval_timeout: Some(DEFAULT_EVAL_TIMEOUT),
        }
    }
}

/// Creates the response for `request`, passing its desired state and context
/// through unchanged and tagging it with the request's correlation tag.
#[must_use]
pub fn seed(request: &FunctionRequest, ttl: Duration) -> FunctionResponse {
    let mut response = FunctionResponse::new().with_meta(ResponseMeta::new(request.tag(), ttl));
    response.set_desired(request.desired().cloned());
    response.set_context(request.context().cloned());
    response
}

/// Hands the response back to the pipeline.
#[must_use]
pub fn finalize(response: FunctionResponse) -> FunctionResponse {
    response
}

/// Policy function that evaluates request-supplied modules with a rule engine.
#[derive(Debug)]
pub struct PolicyFunction<E>
where
    E: RuleEngine + 'static,
{
    engine: Arc<E>,
    settings: FunctionSettings,
}

impl<E> Clone for PolicyFunction<E>
where
    E: RuleEngine + 'static,
{
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            settings: self.settings.clone(),
        }
    }
}

impl<E> PolicyFunction<E>
where
    E: RuleEngine + 'static,
{
    /// Creates a function using the provided engine and default settings.
    #[must_use]
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            settings: FunctionSettings::default(),
        }
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: FunctionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &FunctionSettings {
        &self.settings
    }

    /// Returns the underlying engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Runs the function for one request.
    ///
    /// Always returns a response: failures become a single fatal result, and
    /// the desired state from the request is preserved.
    pub async fn run_function(
        &self,
        request: &FunctionRequest,
        ctx: &EvalContext,
    ) -> FunctionResponse {
        let tag = request.tag();
        info!(tag, "running function");

        let mut response = seed(request, self.settings.ttl());
        if let Err(err) = self.evaluate(request, &mut response, ctx).await {
            warn!(tag, error = %err, "policy evaluation failed");
            response.fatal(err.to_string());
        }

        debug!(
            tag,
            results = response.results().len(),
            fatal = response.has_fatal(),
            "function finished"
        );
        finalize(response)
    }

    async fn evaluate(
        &self,
        request: &FunctionRequest,
        response: &mut FunctionResponse,
        ctx: &EvalContext,
    ) -> MergeResult<()> {
        let modules = FunctionInput::from_request(request)?.modules();
        if modules.is_empty() {
            return Err(FunctionError::no_scripts());
        }

        let ctx = match self.settings.eval_timeout() {
            Some(timeout) => ctx.clone().with_timeout(timeout),
            None => ctx.clone(),
        };

        merge_evaluation(
            self.engine.as_ref(),
            request,
            response,
            &modules,
            self.settings.query(),
            &ctx,
        )
        .await
    }
}

#[cfg(feature = "rego")]
impl PolicyFunction<RegoEngine> {
    /// Creates a function backed by the Rego interpreter.
    #[must_use]
    pub fn rego() -> Self {
        Self::new(Arc::new(RegoEngine::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy_engine::{EngineError, EvaluationResult, RESPONSE_BINDING, ScriptedEngine};
    use policy_state::{Resource, State};
    use serde_json::{Map, json};

    fn request_with_scripts(scripts: serde_json::Value) -> FunctionRequest {
        FunctionRequest::new().with_tag("hello").with_input(json!({
            "apiVersion": "rego.fn.example.org/v1beta1",
            "kind": "Input",
            "spec": {"scripts": scripts}
        }))
    }

    #[test]
    fn seed_copies_desired_and_context() {
        let desired = State::new().with_resource("foo", Resource::from_value(json!({"a": 1})));
        let mut context = Map::new();
        context.insert("example.org/key".into(), json!("value"));
        let request = FunctionRequest::new()
            .with_tag("hello")
            .with_desired(desired.clone())
            .with_context(context.clone());

        let response = seed(&request, DEFAULT_TTL);

        assert_eq!(response.meta(), Some(&ResponseMeta::new("hello", DEFAULT_TTL)));
        assert_eq!(response.desired(), Some(&desired));
        assert_eq!(response.context(), Some(&context));
        assert!(response.results().is_empty());
        assert_eq!(finalize(response.clone()), response);
    }

    #[tokio::test]
    async fn no_scripts_is_fatal_without_engine_call() {
        let engine = Arc::new(ScriptedEngine::returning(EvaluationResult::default()));
        let function = PolicyFunction::new(Arc::clone(&engine));

        let response = function
            .run_function(&request_with_scripts(json!({})), &EvalContext::new())
            .await;

        assert_eq!(response.results().len(), 1);
        assert!(response.results()[0].is_fatal());
        assert_eq!(response.results()[0].message(), "no scripts supplied");
        assert!(engine.compiled().is_empty());
    }

    #[tokio::test]
    async fn malformed_input_is_fatal() {
        let engine = Arc::new(ScriptedEngine::returning(EvaluationResult::default()));
        let function = PolicyFunction::new(engine);
        let request = FunctionRequest::new().with_input(json!("not an object"));

        let response = function.run_function(&request, &EvalContext::new()).await;

        assert!(response.has_fatal());
        assert!(
            response.results()[0]
                .message()
                .starts_with("cannot get function input from request")
        );
    }

    #[tokio::test]
    async fn uses_configured_ttl_and_query() {
        let engine = Arc::new(ScriptedEngine::responding(|input| {
            Ok(EvaluationResult::single(RESPONSE_BINDING, input["response"].clone()))
        }));
        let settings = FunctionSettings::default()
            .with_ttl(Duration::from_secs(5))
            .with_query("response = data.custom.response");
        let function = PolicyFunction::new(engine).with_settings(settings);

        let response = function
            .run_function(
                &request_with_scripts(json!({"p.rego": "package custom"})),
                &EvalContext::new(),
            )
            .await;

        assert!(response.results().is_empty());
        assert_eq!(
            response.meta().and_then(ResponseMeta::ttl),
            Some(Duration::from_secs(5))
        );
        assert_eq!(function.settings().query(), "response = data.custom.response");
    }

    #[tokio::test]
    async fn eval_timeout_becomes_fatal_result() {
        let engine = Arc::new(ScriptedEngine::hanging());
        let settings =
            FunctionSettings::default().with_eval_timeout(Some(Duration::from_millis(5)));
        let function = PolicyFunction::new(engine).with_settings(settings);

        let response = function
            .run_function(
                &request_with_scripts(json!({"p.rego": "package crossplane"})),
                &EvalContext::new(),
            )
            .await;

        assert_eq!(
            response.results()[0].message(),
            format!(
                "cannot evaluate rego query: {}",
                EngineError::DeadlineExceeded
            )
        );
    }
}
