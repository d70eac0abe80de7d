//! Evaluates policy modules and merges their output into the response.

use std::ops::{Deref, DerefMut};

use policy_engine::{EvalContext, EvaluationResult, PolicyModule, RESPONSE_BINDING, RuleEngine};
use policy_state::{FunctionRequest, FunctionResponse, ResponseMeta};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FunctionError, MergeResult};

/// Bundle exposed to policies as `input`.
#[derive(Debug, Serialize)]
struct QueryInput<'a> {
    request: &'a FunctionRequest,
    response: &'a FunctionResponse,
}

/// Holds the response with its metadata removed and puts the metadata back on drop.
struct MetaGuard<'a> {
    response: &'a mut FunctionResponse,
    meta: Option<ResponseMeta>,
}

impl<'a> MetaGuard<'a> {
    fn capture(response: &'a mut FunctionResponse) -> Self {
        let meta = response.take_meta();
        Self { response, meta }
    }
}

impl Deref for MetaGuard<'_> {
    type Target = FunctionResponse;

    fn deref(&self) -> &FunctionResponse {
        &*self.response
    }
}

impl DerefMut for MetaGuard<'_> {
    fn deref_mut(&mut self) -> &mut FunctionResponse {
        &mut *self.response
    }
}

impl Drop for MetaGuard<'_> {
    fn drop(&mut self) {
        self.response.set_meta(self.meta.take());
    }
}

/// Evaluates `modules` against the request and the response so far, then
/// replaces the response's results, desired state, and context with the
/// single response the policies bound.
///
/// The response metadata is hidden from the policies and restored afterwards
/// on every path, so nothing a policy returns can change it. On error the
/// response is left exactly as it was.
///
/// # Errors
///
/// Returns [`FunctionError::Compile`] or [`FunctionError::Evaluation`] when the
/// engine fails, [`FunctionError::Cardinality`] unless there is exactly one
/// solution, and [`FunctionError::Decode`] when the bound value does not match
/// the response shape.
pub async fn merge_evaluation<E>(
    engine: &E,
    request: &FunctionRequest,
    response: &mut FunctionResponse,
    modules: &[PolicyModule],
    query: &str,
    ctx: &EvalContext,
) -> MergeResult<()>
where
    E: RuleEngine + ?Sized,
{
    let mut response = MetaGuard::capture(response);

    let input = serde_json::to_value(QueryInput {
        request,
        response: &*response,
    })
    .map_err(|err| FunctionError::encode(err.to_string()))?;

    let prepared = engine
        .compile(modules, query)
        .map_err(|source| FunctionError::Compile { source })?;
    let evaluation = engine
        .evaluate(prepared, input, ctx)
        .await
        .map_err(|source| FunctionError::Evaluation { source })?;
    debug!(solutions = evaluation.len(), "evaluated policy modules");

    let decoded = decode_single(evaluation)?;
    let (desired, results, context) = (
        decoded.desired().cloned(),
        decoded.results().to_vec(),
        decoded.context().cloned(),
    );
    response.set_results(results);
    response.set_desired(desired);
    response.set_context(context);

    Ok(())
}

fn decode_single(evaluation: EvaluationResult) -> MergeResult<FunctionResponse> {
    let count = evaluation.len();
    let Some(mut bindings) = evaluation.into_solutions().pop().filter(|_| count == 1) else {
        return Err(FunctionError::Cardinality { count });
    };

    let Some(value) = bindings.remove(RESPONSE_BINDING) else {
        return Err(FunctionError::decode(
            format!("query did not bind `{RESPONSE_BINDING}`"),
            serde_json::Value::Object(bindings).to_string(),
        ));
    };

    FunctionResponse::deserialize(&value)
        .map_err(|err| FunctionError::decode(err.to_string(), value.to_string()))
}
