use crate::envelope::ResultEnvelope;
use crate::errors::{MetabaseError, MetabaseResult};

const UPSTREAM_NAME: &str = "Metabase";

/// Turns the outcome of the build/call/format span into an envelope.
/// Validation errors never reach this point.
pub fn normalize(result: MetabaseResult<String>) -> ResultEnvelope {
    match result {
        Ok(text) => ResultEnvelope::text(text),
        Err(err) => soft_failure(&err),
    }
}

pub fn soft_failure(err: &MetabaseError) -> ResultEnvelope {
    let message = err.upstream_message();
    tracing::error!(error = ?err, "Tool execution failed: {message}");
    ResultEnvelope::error(format!("{UPSTREAM_NAME} API error: {message}"))
}
