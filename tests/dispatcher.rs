mod support;

use std::sync::Arc;

use rstest::rstest;
use serde_json::{json, Value};

use metabase_dispatch::dispatcher::{Dispatcher, ToolCall};
use metabase_dispatch::errors::{ErrorCode, MetabaseError, ValidationError};
use metabase_dispatch::handlers::cards::UPDATE_FIELDS_REQUIRED;
use metabase_dispatch::transport::{ApiRequest, HttpMethod};

use support::{dispatcher_with, pretty, FixedIds, RecordingTransport, RejectedLogin};

fn call(name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(name, arguments)
}

#[rstest]
#[case("execute_card", "card_id", "Card ID parameter is required")]
#[case("get_card_details", "card_id", "Card ID parameter is required")]
#[case("update_card", "card_id", "Card ID parameter is required")]
#[case("delete_card", "card_id", "Card ID parameter is required")]
#[case("update_card_visualization", "card_id", "Card ID parameter is required")]
#[case("execute_query", "database_id", "Database ID parameter is required")]
#[case("list_tables", "database_id", "Database ID parameter is required")]
#[case("get_table_fields", "table_id", "Table ID parameter is required")]
#[case("get_dashboard_details", "dashboard_id", "Dashboard ID parameter is required")]
#[case("add_card_to_dashboard", "dashboard_id", "Dashboard ID parameter is required")]
#[tokio::test]
async fn missing_ids_raise_invalid_params_without_requests(
    #[case] tool: &str,
    #[case] id_field: &str,
    #[case] message: &str,
    #[values(None, Some(json!(0)), Some(json!("")))] id_value: Option<Value>,
) {
    let mut arguments = json!({ "name": "n", "query": "SELECT 1", "card_id": 1 });
    let fields = arguments.as_object_mut().unwrap();
    match id_value {
        Some(value) => {
            fields.insert(id_field.to_string(), value);
        }
        None => {
            fields.remove(id_field);
        }
    }

    let transport = Arc::new(RecordingTransport::default());
    let err = dispatcher_with(transport.clone())
        .execute(call(tool, arguments))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidParams);
    assert_eq!(err.message, message);
    assert!(transport.requests().is_empty());
}

#[rstest]
#[case("delete_card", json!({ "card_id": "1/../../collection/3" }), "card_id")]
#[case("get_card_details", json!({ "card_id": "12?archived=true" }), "card_id")]
#[case("update_card", json!({ "card_id": "../dashboard/4", "name": "x" }), "card_id")]
#[case("get_dashboard_details", json!({ "dashboard_id": "101/cards" }), "dashboard_id")]
#[case("add_card_to_dashboard", json!({ "dashboard_id": 101, "card_id": -4 }), "card_id")]
#[case("list_tables", json!({ "database_id": "1%2F.." }), "database_id")]
#[case("get_table_fields", json!({ "table_id": 2.5 }), "table_id")]
#[case("execute_query", json!({ "database_id": "two", "query": "SELECT 1" }), "database_id")]
#[tokio::test]
async fn ids_unfit_for_a_path_are_rejected_without_requests(
    #[case] tool: &str,
    #[case] arguments: Value,
    #[case] id_field: &str,
) {
    let transport = Arc::new(RecordingTransport::default().respond_empty());

    let err = dispatcher_with(transport.clone())
        .execute(call(tool, arguments))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ValidationError::invalid_params(format!("{id_field} must be a positive integer"))
    );
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn numeric_string_ids_are_accepted() {
    let transport = Arc::new(RecordingTransport::default().respond_empty());

    let envelope = dispatcher_with(transport.clone())
        .execute(call("delete_card", json!({ "card_id": "789" })))
        .await
        .unwrap();

    assert!(!envelope.is_error);
    assert_eq!(transport.requests(), vec![ApiRequest::delete("/api/card/789")]);
}

#[rstest]
#[case("list_cards", json!({}), "/api/card")]
#[case("list_collections", json!({}), "/api/collection")]
#[case("list_dashboards", json!({}), "/api/dashboard")]
#[case("get_card_details", json!({ "card_id": 123 }), "/api/card/123")]
#[case("get_dashboard_details", json!({ "dashboard_id": 101 }), "/api/dashboard/101")]
#[tokio::test]
async fn pass_through_reads_return_pretty_upstream_json(
    #[case] tool: &str,
    #[case] arguments: Value,
    #[case] path: &str,
) {
    let upstream = json!([{ "id": 1, "name": "Dashboard 1" }, { "id": 2, "name": "Dashboard 2" }]);
    let transport = Arc::new(RecordingTransport::default().respond_with(upstream.clone()));

    let envelope = dispatcher_with(transport.clone())
        .execute(call(tool, arguments))
        .await
        .unwrap();

    assert!(!envelope.is_error);
    assert_eq!(envelope.content.len(), 1);
    assert_eq!(envelope.first_text(), Some(pretty(&upstream).as_str()));
    assert_eq!(transport.requests(), vec![ApiRequest::get(path)]);
}

#[rstest]
#[case::card("create_card", json!({ "name": "Revenue", "database_id": 2, "query": "SELECT 1" }), "/api/card")]
#[case::collection("create_collection", json!({ "name": "Finance" }), "/api/collection")]
#[case::dashboard("create_dashboard", json!({ "name": "Sales" }), "/api/dashboard")]
#[tokio::test]
async fn creations_return_the_created_resource(
    #[case] tool: &str,
    #[case] arguments: Value,
    #[case] path: &str,
    #[values(json!({ "id": 77, "name": "created" }), json!({ "name": "created without id" }))]
    created: Value,
) {
    let transport = Arc::new(RecordingTransport::default().respond_with(created.clone()));

    let envelope = dispatcher_with(transport.clone())
        .execute(call(tool, arguments))
        .await
        .unwrap();

    assert!(!envelope.is_error);
    assert_eq!(envelope.first_text(), Some(pretty(&created).as_str()));
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].path, path);
}

#[tokio::test]
async fn update_card_sends_only_the_supplied_subset() {
    let updated = json!({ "id": 456, "name": "Updated Test Card" });
    let transport = Arc::new(RecordingTransport::default().respond_with(updated.clone()));

    let envelope = dispatcher_with(transport.clone())
        .execute(call("update_card", json!({ "card_id": 456, "name": "Updated Test Card" })))
        .await
        .unwrap();

    assert_eq!(
        transport.requests(),
        vec![ApiRequest::put("/api/card/456", json!({ "name": "Updated Test Card" }))]
    );
    assert_eq!(envelope.first_text(), Some(pretty(&updated).as_str()));
}

#[tokio::test]
async fn update_card_with_query_builds_native_dataset_query() {
    let transport = Arc::new(RecordingTransport::default().respond_with(json!({ "id": 456 })));

    dispatcher_with(transport.clone())
        .execute(call(
            "update_card",
            json!({ "card_id": 456, "query": "SELECT * FROM new_table" }),
        ))
        .await
        .unwrap();

    assert_eq!(
        transport.requests()[0].body,
        Some(json!({
            "dataset_query": { "type": "native", "native": { "query": "SELECT * FROM new_table" } }
        }))
    );
}

#[tokio::test]
async fn update_card_without_modifiable_fields_is_rejected() {
    let transport = Arc::new(RecordingTransport::default());

    let err = dispatcher_with(transport.clone())
        .execute(call("update_card", json!({ "card_id": 456 })))
        .await
        .unwrap_err();

    assert_eq!(err, ValidationError::invalid_params(UPDATE_FIELDS_REQUIRED));
    assert!(err.message.contains("name, query, description, collection_id, visualization_settings"));
    assert!(transport.requests().is_empty());
}

#[rstest]
#[case::no_content(None)]
#[case::with_body(Some(json!({ "deleted": true })))]
#[tokio::test]
async fn delete_card_confirms_regardless_of_body(#[case] upstream: Option<Value>) {
    let transport = match upstream {
        Some(body) => RecordingTransport::default().respond_with(body),
        None => RecordingTransport::default().respond_empty(),
    };
    let transport = Arc::new(transport);

    let envelope = dispatcher_with(transport.clone())
        .execute(call("delete_card", json!({ "card_id": 789 })))
        .await
        .unwrap();

    assert_eq!(transport.requests(), vec![ApiRequest::delete("/api/card/789")]);
    assert!(!envelope.is_error);
    assert_eq!(envelope.first_text(), Some("Card ID 789 deleted successfully."));
}

#[tokio::test]
async fn structured_upstream_error_becomes_soft_failure() {
    let transport = Arc::new(RecordingTransport::default().fail_with(MetabaseError::Api {
        status: 400,
        message: "API request failed with status 400: Bad Request".into(),
        data: Some(json!({ "message": "X" })),
    }));

    let envelope = dispatcher_with(transport)
        .execute(call("execute_query", json!({ "database_id": 1, "query": "SELEC" })))
        .await
        .unwrap();

    assert!(envelope.is_error);
    assert_eq!(envelope.first_text(), Some("Metabase API error: X"));
}

#[tokio::test]
async fn unexpected_response_shape_becomes_soft_failure() {
    let transport = Arc::new(RecordingTransport::default().respond_empty());

    let envelope = dispatcher_with(transport)
        .execute(call("list_tables", json!({ "database_id": 1 })))
        .await
        .unwrap();

    assert!(envelope.is_error);
    assert!(envelope
        .first_text()
        .unwrap()
        .starts_with("Metabase API error: Unexpected response"));
}

#[tokio::test]
async fn unknown_tool_is_a_soft_failure_without_requests() {
    let transport = Arc::new(RecordingTransport::default());

    let envelope = dispatcher_with(transport.clone())
        .execute(call("drop_database", json!({ "database_id": 0 })))
        .await
        .unwrap();

    assert!(envelope.is_error);
    assert_eq!(envelope.first_text(), Some("Unknown tool: drop_database"));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn missing_name_routes_as_unknown() {
    let call: ToolCall = serde_json::from_value(json!({ "arguments": {} })).unwrap();
    let envelope = dispatcher_with(Arc::new(RecordingTransport::default()))
        .execute(call)
        .await
        .unwrap();
    assert_eq!(envelope.first_text(), Some("Unknown tool: unknown"));
}

#[tokio::test]
async fn session_failure_is_a_soft_failure() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = Dispatcher::new(transport.clone(), Arc::new(RejectedLogin), Arc::new(FixedIds));

    let envelope = dispatcher
        .execute(call("list_cards", json!({})))
        .await
        .unwrap();

    assert!(envelope.is_error);
    assert_eq!(
        envelope.first_text(),
        Some("Metabase API error: Session error: authentication failed with status 401")
    );
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn execute_query_posts_native_payload() {
    let transport = Arc::new(RecordingTransport::default().respond_with(json!({ "data": { "rows": [[1]] } })));

    dispatcher_with(transport.clone())
        .execute(call(
            "execute_query",
            json!({ "database_id": 2, "query": "SELECT 1", "native_parameters": [{ "type": "number" }] }),
        ))
        .await
        .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.path, "/api/dataset");
    assert_eq!(
        request.body,
        Some(json!({
            "type": "native",
            "native": { "query": "SELECT 1", "template_tags": {} },
            "parameters": [{ "type": "number" }],
            "database": 2
        }))
    );
}

#[tokio::test]
async fn add_card_to_dashboard_reads_then_writes_layout() {
    let dashboard = json!({
        "id": 101,
        "dashcards": [{ "id": 5, "card_id": 9, "row": 0, "col": 0, "size_x": 4, "size_y": 2 }]
    });
    let transport = Arc::new(
        RecordingTransport::default()
            .respond_with(dashboard)
            .respond_with(json!([{ "id": 5 }, { "id": 6 }])),
    );

    let envelope = dispatcher_with(transport.clone())
        .execute(call("add_card_to_dashboard", json!({ "dashboard_id": 101, "card_id": 42 })))
        .await
        .unwrap();

    assert!(!envelope.is_error);
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], ApiRequest::get("/api/dashboard/101"));
    assert_eq!(requests[1].method, HttpMethod::Put);
    assert_eq!(requests[1].path, "/api/dashboard/101/cards");
    let cards = requests[1].body.as_ref().unwrap()["cards"].as_array().unwrap().clone();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[1]["card_id"], json!(42));
    assert_eq!(cards[1]["row"], json!(2));
}

#[tokio::test]
async fn failed_read_skips_the_write() {
    let transport = Arc::new(RecordingTransport::default().fail_with(MetabaseError::Api {
        status: 404,
        message: "API request failed with status 404: Not Found".into(),
        data: None,
    }));

    let envelope = dispatcher_with(transport.clone())
        .execute(call(
            "update_card_visualization",
            json!({ "card_id": 3, "visualization_settings": { "graph.show_values": true } }),
        ))
        .await
        .unwrap();

    assert!(envelope.is_error);
    assert_eq!(
        envelope.first_text(),
        Some("Metabase API error: API request failed with status 404: Not Found")
    );
    assert_eq!(transport.requests(), vec![ApiRequest::get("/api/card/3")]);
}

#[tokio::test]
async fn dispatcher_is_shareable_across_tasks() {
    let transport = Arc::new(
        RecordingTransport::default()
            .respond_with(json!([]))
            .respond_with(json!([])),
    );
    let dispatcher = dispatcher_with(transport.clone());

    let first = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.execute(call("list_cards", json!({}))).await }
    });
    let second = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.execute(call("list_collections", json!({}))).await }
    });

    assert!(!first.await.unwrap().unwrap().is_error);
    assert!(!second.await.unwrap().unwrap().is_error);
    assert_eq!(transport.requests().len(), 2);
}
