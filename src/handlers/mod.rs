//! Per-capability validate / build / format strategies.
//!
//! Single-call capabilities implement [`ToolHandler`]. Capabilities that must
//! read the current resource before writing implement [`MergeHandler`]; they
//! run as `fetch_current → merge_fields → write` with no concurrency guard, so
//! a concurrent write between the two calls is lost (last writer wins).

pub mod cards;
pub mod collections;
pub mod dashboards;
pub mod databases;
pub mod tables;

use serde_json::{json, Map, Value};

use crate::dispatcher::arguments::Arguments;
use crate::errors::{MetabaseError, MetabaseResult, ValidationError};
use crate::transport::ApiRequest;

pub trait ToolHandler {
    /// Arguments after validation.
    type Args: Send + Sync;

    /// Checks required arguments. Performs no I/O.
    fn validate(args: &Arguments) -> Result<Self::Args, ValidationError>;

    fn build(args: &Self::Args) -> ApiRequest;

    /// Renders the upstream result as the text of the single content block.
    fn format(args: &Self::Args, response: Option<Value>) -> MetabaseResult<String>;
}

pub trait MergeHandler {
    type Args: Send + Sync;

    fn validate(args: &Arguments) -> Result<Self::Args, ValidationError>;

    /// Request that reads the resource about to be modified.
    fn fetch_current(args: &Self::Args) -> ApiRequest;

    /// Combines the current resource with the supplied fields into the write.
    fn merge_fields(args: &Self::Args, current: Value) -> MetabaseResult<ApiRequest>;

    fn format(args: &Self::Args, response: Option<Value>) -> MetabaseResult<String>;
}

/// 2-space indented JSON; an absent body renders as `null`.
pub(crate) fn pretty(value: &Option<Value>) -> MetabaseResult<String> {
    Ok(serde_json::to_string_pretty(value.as_ref().unwrap_or(&Value::Null))?)
}

/// Number of items when the result is a sequence.
pub(crate) fn item_count(value: &Option<Value>) -> Option<usize> {
    value.as_ref().and_then(Value::as_array).map(Vec::len)
}

pub(crate) fn require_body(response: Option<Value>, what: &str) -> MetabaseResult<Value> {
    response.ok_or_else(|| MetabaseError::UnexpectedResponse(format!("empty response for {what}")))
}

/// Renders an id argument for interpolation into a resource path. Callers
/// pass ids checked by `Arguments::require_id`.
pub(crate) fn path_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Structured payload the dataset endpoint expects for raw SQL.
pub(crate) fn native_query(query: &Value, database: &Value) -> Value {
    json!({
        "type": "native",
        "native": {
            "query": query,
            "template_tags": {}
        },
        "database": database
    })
}

/// Inserts `source` under `name` when it exists upstream; absent keys stay absent.
pub(crate) fn copy_field(target: &mut Map<String, Value>, name: &str, source: Option<&Value>) {
    if let Some(value) = source {
        target.insert(name.to_string(), value.clone());
    }
}

/// Pass-through formatter shared by the read-only listing capabilities.
pub(crate) fn format_listing(response: Option<Value>, noun: &str) -> MetabaseResult<String> {
    if let Some(count) = item_count(&response) {
        tracing::info!(count, "Successfully retrieved {count} {noun}");
    }
    pretty(&response)
}
