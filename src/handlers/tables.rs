use serde_json::{json, Map, Value};

use crate::dispatcher::arguments::{is_present, Arguments};
use crate::errors::{MetabaseResult, ValidationError};
use crate::handlers::{copy_field, path_segment, pretty, require_body, ToolHandler};
use crate::transport::ApiRequest;

const FOREIGN_KEY_TYPE: &str = "type/FK";

/// Text of a field for one-line rendering; missing or falsy values are empty.
fn text_or_empty(value: Option<&Value>) -> String {
    match value {
        Some(v) if is_present(Some(v)) => path_segment(v),
        _ => String::new(),
    }
}

fn items<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    body.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

pub struct ListTables;

impl ToolHandler for ListTables {
    type Args = Value;

    fn validate(args: &Arguments) -> Result<Value, ValidationError> {
        args.require_id("database_id", "Database ID parameter is required")
    }

    fn build(database_id: &Value) -> ApiRequest {
        tracing::debug!(database_id = %database_id, "Fetching tables for database");
        ApiRequest::get(format!("/api/database/{}/metadata", path_segment(database_id)))
    }

    /// One line per table: `ID: <id> | <schema>.<name> - <description>`.
    fn format(database_id: &Value, response: Option<Value>) -> MetabaseResult<String> {
        let metadata = require_body(response, "list_tables")?;
        let tables = items(&metadata, "tables");
        let lines: Vec<String> = tables
            .iter()
            .map(|t| {
                format!(
                    "ID: {} | {}.{} - {}",
                    t.get("id").map(path_segment).unwrap_or_default(),
                    text_or_empty(t.get("schema")),
                    text_or_empty(t.get("name")),
                    text_or_empty(t.get("description")),
                )
            })
            .collect();
        tracing::info!(
            "Successfully retrieved {} tables from database: {}",
            tables.len(),
            path_segment(database_id)
        );
        pretty(&Some(json!(lines)))
    }
}

pub struct GetTableFields;

impl ToolHandler for GetTableFields {
    type Args = Value;

    fn validate(args: &Arguments) -> Result<Value, ValidationError> {
        args.require_id("table_id", "Table ID parameter is required")
    }

    fn build(table_id: &Value) -> ApiRequest {
        tracing::debug!(table_id = %table_id, "Fetching fields for table");
        ApiRequest::get(format!("/api/table/{}/query_metadata", path_segment(table_id)))
    }

    fn format(table_id: &Value, response: Option<Value>) -> MetabaseResult<String> {
        let metadata = require_body(response, "get_table_fields")?;
        let fields = items(&metadata, "fields");
        tracing::info!(
            "Successfully retrieved {} fields from table: {}",
            fields.len(),
            path_segment(table_id)
        );

        let projected: Vec<Value> = fields.iter().map(project_field).collect();
        pretty(&Some(Value::Array(projected)))
    }
}

/// `{id, name, display_name, type, foreign_key}`; `foreign_key` is the target
/// table for FK fields and `"No"` otherwise.
fn project_field(field: &Value) -> Value {
    let mut entry = Map::new();
    copy_field(&mut entry, "id", field.get("id"));
    copy_field(&mut entry, "name", field.get("name"));
    copy_field(&mut entry, "display_name", field.get("display_name"));
    copy_field(&mut entry, "type", field.get("base_type"));

    let foreign_key = if field.get("semantic_type").and_then(Value::as_str) == Some(FOREIGN_KEY_TYPE) {
        let mut target = Map::new();
        copy_field(&mut target, "target_table_id", field.pointer("/target/table_id"));
        Value::Object(target)
    } else {
        Value::String("No".into())
    };
    entry.insert("foreign_key".into(), foreign_key);
    Value::Object(entry)
}
