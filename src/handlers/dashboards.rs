use serde_json::{json, Map, Value};

use crate::dispatcher::arguments::Arguments;
use crate::errors::{MetabaseResult, ValidationError};
use crate::handlers::{
    copy_field, format_listing, path_segment, pretty, MergeHandler, ToolHandler,
};
use crate::transport::ApiRequest;

const DASHBOARD_ID_REQUIRED: &str = "Dashboard ID parameter is required";
const DEFAULT_CARD_SIZE: u64 = 4;
/// Metabase treats negative dashcard ids as "create".
const NEW_DASHCARD_ID: i64 = -1;

fn dashboard_path(dashboard_id: &Value) -> String {
    format!("/api/dashboard/{}", path_segment(dashboard_id))
}

pub struct ListDashboards;

impl ToolHandler for ListDashboards {
    type Args = ();

    fn validate(_args: &Arguments) -> Result<(), ValidationError> {
        Ok(())
    }

    fn build(_args: &()) -> ApiRequest {
        tracing::debug!("Fetching all dashboards from Metabase");
        ApiRequest::get("/api/dashboard")
    }

    fn format(_args: &(), response: Option<Value>) -> MetabaseResult<String> {
        format_listing(response, "dashboards")
    }
}

pub struct GetDashboardDetails;

impl ToolHandler for GetDashboardDetails {
    type Args = Value;

    fn validate(args: &Arguments) -> Result<Value, ValidationError> {
        args.require_id("dashboard_id", DASHBOARD_ID_REQUIRED)
    }

    fn build(dashboard_id: &Value) -> ApiRequest {
        tracing::debug!(dashboard_id = %dashboard_id, "Fetching dashboard details");
        ApiRequest::get(dashboard_path(dashboard_id))
    }

    fn format(dashboard_id: &Value, response: Option<Value>) -> MetabaseResult<String> {
        tracing::info!(
            "Successfully retrieved details for dashboard ID: {}",
            path_segment(dashboard_id)
        );
        pretty(&response)
    }
}

pub struct CreateDashboard;

impl ToolHandler for CreateDashboard {
    type Args = Value;

    fn validate(args: &Arguments) -> Result<Value, ValidationError> {
        let name = args
            .require("name", "Dashboard name parameter is required")?
            .clone();
        let description = args
            .cloned("description")
            .unwrap_or_else(|| Value::String(String::new()));
        let collection_id = args.cloned("collection_id").unwrap_or(Value::Null);
        let parameters = args
            .cloned("parameters")
            .unwrap_or_else(|| Value::Array(Vec::new()));
        Ok(json!({
            "name": name,
            "description": description,
            "collection_id": collection_id,
            "parameters": parameters
        }))
    }

    fn build(payload: &Value) -> ApiRequest {
        tracing::debug!(name = %payload["name"], "Creating dashboard");
        ApiRequest::post("/api/dashboard", payload.clone())
    }

    fn format(payload: &Value, response: Option<Value>) -> MetabaseResult<String> {
        let id = response
            .as_ref()
            .and_then(|r| r.get("id"))
            .cloned()
            .unwrap_or_default();
        tracing::info!(
            "Successfully created dashboard: {} with ID: {}",
            path_segment(&payload["name"]),
            id
        );
        pretty(&response)
    }
}

pub struct AddCardToDashboardArgs {
    dashboard_id: Value,
    card_id: Value,
    row: Option<u64>,
    col: u64,
    size_x: u64,
    size_y: u64,
    visualization_settings: Value,
}

/// Appends a card to a dashboard's layout.
///
/// The cards endpoint replaces the whole layout, so the current dashcards are
/// fetched first and sent back alongside the new one.
pub struct AddCardToDashboard;

impl MergeHandler for AddCardToDashboard {
    type Args = AddCardToDashboardArgs;

    fn validate(args: &Arguments) -> Result<AddCardToDashboardArgs, ValidationError> {
        let dashboard_id = args.require_id("dashboard_id", DASHBOARD_ID_REQUIRED)?;
        let card_id = args.require_id("card_id", "Card ID parameter is required")?;
        Ok(AddCardToDashboardArgs {
            dashboard_id,
            card_id,
            row: args.u64("row"),
            col: args.u64("col").unwrap_or(0),
            size_x: args.u64("size_x").unwrap_or(DEFAULT_CARD_SIZE),
            size_y: args.u64("size_y").unwrap_or(DEFAULT_CARD_SIZE),
            visualization_settings: args
                .cloned("visualization_settings")
                .unwrap_or_else(|| Value::Object(Map::new())),
        })
    }

    fn fetch_current(args: &AddCardToDashboardArgs) -> ApiRequest {
        tracing::debug!(dashboard_id = %args.dashboard_id, "Fetching dashboard layout");
        ApiRequest::get(dashboard_path(&args.dashboard_id))
    }

    fn merge_fields(args: &AddCardToDashboardArgs, current: Value) -> MetabaseResult<ApiRequest> {
        // Older Metabase releases call the layout `ordered_cards`.
        let existing = current
            .get("dashcards")
            .or_else(|| current.get("ordered_cards"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut cards: Vec<Value> = existing.iter().map(layout_entry).collect();
        let row = args.row.unwrap_or_else(|| next_free_row(existing));
        cards.push(json!({
            "id": NEW_DASHCARD_ID,
            "card_id": args.card_id,
            "row": row,
            "col": args.col,
            "size_x": args.size_x,
            "size_y": args.size_y,
            "parameter_mappings": [],
            "visualization_settings": args.visualization_settings
        }));

        tracing::debug!(
            dashboard_id = %args.dashboard_id,
            existing = existing.len(),
            row,
            "Merged new dashcard into layout"
        );
        Ok(ApiRequest::put(
            format!("{}/cards", dashboard_path(&args.dashboard_id)),
            json!({ "cards": cards }),
        ))
    }

    fn format(args: &AddCardToDashboardArgs, response: Option<Value>) -> MetabaseResult<String> {
        tracing::info!(
            "Successfully added card {} to dashboard {}",
            path_segment(&args.card_id),
            path_segment(&args.dashboard_id)
        );
        pretty(&response)
    }
}

/// Fields the layout endpoint accepts for an existing dashcard.
fn layout_entry(dashcard: &Value) -> Value {
    let mut entry = Map::new();
    for key in [
        "id",
        "card_id",
        "row",
        "col",
        "size_x",
        "size_y",
        "series",
        "parameter_mappings",
        "visualization_settings",
    ] {
        copy_field(&mut entry, key, dashcard.get(key));
    }
    Value::Object(entry)
}

/// First row below every existing dashcard.
fn next_free_row(dashcards: &[Value]) -> u64 {
    dashcards
        .iter()
        .map(|card| {
            let row = card.get("row").and_then(Value::as_u64).unwrap_or(0);
            let height = card.get("size_y").and_then(Value::as_u64).unwrap_or(0);
            row.saturating_add(height)
        })
        .max()
        .unwrap_or(0)
}
