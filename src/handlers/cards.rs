use serde_json::{json, Map, Value};

use crate::dispatcher::arguments::Arguments;
use crate::errors::{MetabaseResult, ValidationError};
use crate::handlers::{
    format_listing, native_query, path_segment, pretty, require_body, MergeHandler, ToolHandler,
};
use crate::transport::ApiRequest;

const CARD_ID_REQUIRED: &str = "Card ID parameter is required";
pub const UPDATE_FIELDS_REQUIRED: &str = "At least one modifiable field (name, query, description, collection_id, visualization_settings) must be provided for update.";
pub const VISUALIZATION_SETTINGS_NOT_OBJECT: &str =
    "Visualization settings must be a non-empty object";
const DEFAULT_DISPLAY: &str = "table";

fn card_path(card_id: &Value) -> String {
    format!("/api/card/{}", path_segment(card_id))
}

fn require_card_id(args: &Arguments) -> Result<Value, ValidationError> {
    args.require_id("card_id", CARD_ID_REQUIRED)
}

pub struct ListCards;

impl ToolHandler for ListCards {
    type Args = ();

    fn validate(_args: &Arguments) -> Result<(), ValidationError> {
        Ok(())
    }

    fn build(_args: &()) -> ApiRequest {
        tracing::debug!("Fetching all cards/questions from Metabase");
        ApiRequest::get("/api/card")
    }

    fn format(_args: &(), response: Option<Value>) -> MetabaseResult<String> {
        format_listing(response, "cards/questions")
    }
}

pub struct GetCardDetails;

impl ToolHandler for GetCardDetails {
    type Args = Value;

    fn validate(args: &Arguments) -> Result<Value, ValidationError> {
        require_card_id(args)
    }

    fn build(card_id: &Value) -> ApiRequest {
        tracing::debug!(card_id = %card_id, "Fetching card details");
        ApiRequest::get(card_path(card_id))
    }

    fn format(card_id: &Value, response: Option<Value>) -> MetabaseResult<String> {
        tracing::info!("Successfully retrieved details for card ID: {}", path_segment(card_id));
        pretty(&response)
    }
}

pub struct ExecuteCardArgs {
    card_id: Value,
    parameters: Value,
}

pub struct ExecuteCard;

impl ToolHandler for ExecuteCard {
    type Args = ExecuteCardArgs;

    fn validate(args: &Arguments) -> Result<ExecuteCardArgs, ValidationError> {
        Ok(ExecuteCardArgs {
            card_id: require_card_id(args)?,
            parameters: args.cloned("parameters").unwrap_or_else(|| json!({})),
        })
    }

    fn build(args: &ExecuteCardArgs) -> ApiRequest {
        tracing::debug!(card_id = %args.card_id, "Executing card");
        ApiRequest::post(
            format!("{}/query", card_path(&args.card_id)),
            json!({ "parameters": args.parameters }),
        )
    }

    fn format(args: &ExecuteCardArgs, response: Option<Value>) -> MetabaseResult<String> {
        tracing::info!("Successfully executed card: {}", path_segment(&args.card_id));
        pretty(&response)
    }
}

pub struct CreateCardArgs {
    name: Value,
    database_id: Value,
    query: Value,
    description: Option<Value>,
    collection_id: Option<Value>,
    visualization_settings: Option<Value>,
}

pub struct CreateCard;

impl ToolHandler for CreateCard {
    type Args = CreateCardArgs;

    fn validate(args: &Arguments) -> Result<CreateCardArgs, ValidationError> {
        let (Some(name), Some(database_id), Some(query)) =
            (args.cloned("name"), args.cloned("database_id"), args.cloned("query"))
        else {
            tracing::warn!("Missing required parameters in create_card request");
            return Err(ValidationError::invalid_params(
                "Name, database ID and query parameters are required",
            ));
        };
        Ok(CreateCardArgs {
            name,
            database_id,
            query,
            description: args.cloned("description"),
            collection_id: args.cloned("collection_id"),
            visualization_settings: args.cloned("visualization_settings"),
        })
    }

    fn build(args: &CreateCardArgs) -> ApiRequest {
        tracing::debug!(name = %args.name, "Creating card");
        let description = args
            .description
            .clone()
            .unwrap_or_else(|| Value::String(String::new()));
        let collection_id = args.collection_id.clone().unwrap_or(Value::Null);
        let visualization_settings = args
            .visualization_settings
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));
        ApiRequest::post(
            "/api/card",
            json!({
                "name": args.name,
                "dataset_query": native_query(&args.query, &args.database_id),
                "display": DEFAULT_DISPLAY,
                "description": description,
                "collection_id": collection_id,
                "visualization_settings": visualization_settings,
            }),
        )
    }

    fn format(args: &CreateCardArgs, response: Option<Value>) -> MetabaseResult<String> {
        let created = require_body(response, "create_card")?;
        let id = created.get("id").cloned().unwrap_or_default();
        tracing::info!(
            "Successfully created card: {} with ID: {}",
            path_segment(&args.name),
            id
        );
        pretty(&Some(created))
    }
}

pub struct UpdateCardArgs {
    card_id: Value,
    patch: Map<String, Value>,
}

pub struct UpdateCard;

impl ToolHandler for UpdateCard {
    type Args = UpdateCardArgs;

    /// Only supplied fields enter the patch; a field that fails the presence
    /// test is treated as not provided rather than cleared.
    fn validate(args: &Arguments) -> Result<UpdateCardArgs, ValidationError> {
        let card_id = require_card_id(args)?;

        let mut patch = Map::new();
        if let Some(name) = args.cloned("name") {
            patch.insert("name".into(), name);
        }
        if let Some(query) = args.cloned("query") {
            patch.insert(
                "dataset_query".into(),
                json!({ "type": "native", "native": { "query": query } }),
            );
        }
        for field in ["description", "collection_id", "visualization_settings"] {
            if let Some(value) = args.cloned(field) {
                patch.insert(field.into(), value);
            }
        }

        if patch.is_empty() {
            tracing::warn!(card_id = %card_id, "No modifiable fields in update_card request");
            return Err(ValidationError::invalid_params(UPDATE_FIELDS_REQUIRED));
        }
        Ok(UpdateCardArgs { card_id, patch })
    }

    fn build(args: &UpdateCardArgs) -> ApiRequest {
        tracing::debug!(
            card_id = %args.card_id,
            fields = ?args.patch.keys().collect::<Vec<_>>(),
            "Updating card"
        );
        ApiRequest::put(card_path(&args.card_id), Value::Object(args.patch.clone()))
    }

    fn format(args: &UpdateCardArgs, response: Option<Value>) -> MetabaseResult<String> {
        tracing::info!("Successfully updated card ID: {}", path_segment(&args.card_id));
        pretty(&response)
    }
}

pub struct DeleteCard;

impl ToolHandler for DeleteCard {
    type Args = Value;

    fn validate(args: &Arguments) -> Result<Value, ValidationError> {
        require_card_id(args)
    }

    fn build(card_id: &Value) -> ApiRequest {
        tracing::debug!(card_id = %card_id, "Deleting card");
        ApiRequest::delete(card_path(card_id))
    }

    /// The upstream body, if any, is ignored.
    fn format(card_id: &Value, _response: Option<Value>) -> MetabaseResult<String> {
        let id = path_segment(card_id);
        tracing::info!("Successfully deleted card ID: {id}");
        Ok(format!("Card ID {id} deleted successfully."))
    }
}

pub struct UpdateCardVisualizationArgs {
    card_id: Value,
    settings: Map<String, Value>,
    display: Option<Value>,
}

/// Merges new visualization settings over the card's current ones.
pub struct UpdateCardVisualization;

impl MergeHandler for UpdateCardVisualization {
    type Args = UpdateCardVisualizationArgs;

    fn validate(args: &Arguments) -> Result<UpdateCardVisualizationArgs, ValidationError> {
        let card_id = require_card_id(args)?;
        let settings = args
            .require(
                "visualization_settings",
                "Visualization settings parameter is required",
            )?
            .as_object()
            .filter(|settings| !settings.is_empty())
            .cloned()
            .ok_or_else(|| {
                tracing::warn!(card_id = %card_id, "visualization_settings is not a non-empty object");
                ValidationError::invalid_params(VISUALIZATION_SETTINGS_NOT_OBJECT)
            })?;
        Ok(UpdateCardVisualizationArgs {
            card_id,
            settings,
            display: args.cloned("display"),
        })
    }

    fn fetch_current(args: &UpdateCardVisualizationArgs) -> ApiRequest {
        tracing::debug!(card_id = %args.card_id, "Fetching card before visualization update");
        ApiRequest::get(card_path(&args.card_id))
    }

    fn merge_fields(args: &UpdateCardVisualizationArgs, current: Value) -> MetabaseResult<ApiRequest> {
        let mut merged = current
            .get("visualization_settings")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for (key, value) in &args.settings {
            merged.insert(key.clone(), value.clone());
        }

        let mut body = Map::new();
        body.insert("visualization_settings".into(), Value::Object(merged));
        if let Some(display) = &args.display {
            body.insert("display".into(), display.clone());
        }
        Ok(ApiRequest::put(card_path(&args.card_id), Value::Object(body)))
    }

    fn format(args: &UpdateCardVisualizationArgs, response: Option<Value>) -> MetabaseResult<String> {
        tracing::info!(
            "Successfully updated visualization for card ID: {}",
            path_segment(&args.card_id)
        );
        pretty(&response)
    }
}
