use serde_json::{json, Map, Value};

use crate::dispatcher::arguments::Arguments;
use crate::errors::{MetabaseError, MetabaseResult, ValidationError};
use crate::handlers::{copy_field, path_segment, pretty, ToolHandler};
use crate::transport::ApiRequest;

pub struct ListDatabases;

impl ToolHandler for ListDatabases {
    type Args = ();

    fn validate(_args: &Arguments) -> Result<(), ValidationError> {
        Ok(())
    }

    fn build(_args: &()) -> ApiRequest {
        tracing::debug!("Fetching all databases from Metabase");
        ApiRequest::get("/api/database")
    }

    /// Newer Metabase versions wrap the listing as `{ "data": [...] }`.
    fn format(_args: &(), response: Option<Value>) -> MetabaseResult<String> {
        let databases = match &response {
            Some(Value::Array(items)) => items,
            Some(Value::Object(body)) => body
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| MetabaseError::UnexpectedResponse("database listing without data".into()))?,
            _ => {
                return Err(MetabaseError::UnexpectedResponse(
                    "database listing is not a list".into(),
                ))
            }
        };

        let projected: Vec<Value> = databases
            .iter()
            .map(|db| {
                let mut entry = Map::new();
                copy_field(&mut entry, "id", db.get("id"));
                copy_field(&mut entry, "name", db.get("name"));
                copy_field(&mut entry, "dbname", db.pointer("/details/dbname"));
                Value::Object(entry)
            })
            .collect();

        tracing::info!("Successfully retrieved {} databases", projected.len());
        pretty(&Some(Value::Array(projected)))
    }
}

pub struct ExecuteQueryArgs {
    database_id: Value,
    query: Value,
    native_parameters: Value,
}

pub struct ExecuteQuery;

impl ToolHandler for ExecuteQuery {
    type Args = ExecuteQueryArgs;

    fn validate(args: &Arguments) -> Result<ExecuteQueryArgs, ValidationError> {
        let database_id = args.require_id("database_id", "Database ID parameter is required")?;
        let query = args.require("query", "SQL query parameter is required")?.clone();
        Ok(ExecuteQueryArgs {
            database_id,
            query,
            native_parameters: args
                .cloned("native_parameters")
                .unwrap_or_else(|| Value::Array(Vec::new())),
        })
    }

    fn build(args: &ExecuteQueryArgs) -> ApiRequest {
        tracing::debug!(database_id = %args.database_id, "Executing SQL query");
        ApiRequest::post(
            "/api/dataset",
            json!({
                "type": "native",
                "native": {
                    "query": args.query,
                    "template_tags": {}
                },
                "parameters": args.native_parameters,
                "database": args.database_id
            }),
        )
    }

    fn format(args: &ExecuteQueryArgs, response: Option<Value>) -> MetabaseResult<String> {
        tracing::info!(
            "Successfully executed SQL query against database: {}",
            path_segment(&args.database_id)
        );
        pretty(&response)
    }
}
