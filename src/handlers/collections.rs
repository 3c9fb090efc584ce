use serde_json::{Map, Value};

use crate::dispatcher::arguments::Arguments;
use crate::errors::{MetabaseResult, ValidationError};
use crate::handlers::{format_listing, path_segment, pretty, require_body, ToolHandler};
use crate::transport::ApiRequest;

pub struct ListCollections;

impl ToolHandler for ListCollections {
    type Args = ();

    fn validate(_args: &Arguments) -> Result<(), ValidationError> {
        Ok(())
    }

    fn build(_args: &()) -> ApiRequest {
        tracing::debug!("Fetching all collections from Metabase");
        ApiRequest::get("/api/collection")
    }

    fn format(_args: &(), response: Option<Value>) -> MetabaseResult<String> {
        format_listing(response, "collections")
    }
}

pub struct CreateCollection;

impl ToolHandler for CreateCollection {
    /// Ready-to-send payload; `color` and `parent_id` appear only when supplied.
    type Args = Map<String, Value>;

    fn validate(args: &Arguments) -> Result<Map<String, Value>, ValidationError> {
        let name = args
            .require("name", "Collection name parameter is required")?
            .clone();

        let mut payload = Map::new();
        payload.insert("name".into(), name);
        payload.insert(
            "description".into(),
            args.cloned("description")
                .unwrap_or_else(|| Value::String(String::new())),
        );
        if let Some(color) = args.cloned("color") {
            payload.insert("color".into(), color);
        }
        if let Some(parent_id) = args.cloned("parent_id") {
            payload.insert("parent_id".into(), parent_id);
        }
        Ok(payload)
    }

    fn build(payload: &Map<String, Value>) -> ApiRequest {
        tracing::debug!(name = ?payload.get("name"), "Creating collection");
        ApiRequest::post("/api/collection", Value::Object(payload.clone()))
    }

    fn format(payload: &Map<String, Value>, response: Option<Value>) -> MetabaseResult<String> {
        let created = require_body(response, "create_collection")?;
        let id = created.get("id").cloned().unwrap_or_default();
        tracing::info!(
            "Successfully created collection: {} with ID: {}",
            payload.get("name").map(path_segment).unwrap_or_default(),
            id
        );
        pretty(&Some(created))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn optional_fields_are_omitted_unless_supplied() {
        let payload = CreateCollection::validate(&Arguments::from_value(json!({
            "name": "Finance",
            "parent_id": 0
        })))
        .unwrap();
        assert_eq!(
            CreateCollection::build(&payload).body,
            Some(json!({ "name": "Finance", "description": "" }))
        );
    }

    #[test]
    fn color_and_parent_are_forwarded() {
        let payload = CreateCollection::validate(&Arguments::from_value(json!({
            "name": "Finance",
            "description": "Money",
            "color": "#509EE3",
            "parent_id": 4
        })))
        .unwrap();
        assert_eq!(
            CreateCollection::build(&payload).body,
            Some(json!({
                "name": "Finance",
                "description": "Money",
                "color": "#509EE3",
                "parent_id": 4
            }))
        );
    }

    #[test]
    fn name_is_required() {
        assert_eq!(
            CreateCollection::validate(&Arguments::default()).unwrap_err(),
            ValidationError::invalid_params("Collection name parameter is required")
        );
    }
}
