//! Cluster API integration tests

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use cluster_gateway::ErrorCode;
use cluster_gateway::dispatch::{DispatchSettings, Operation};
use cluster_gateway::security::RbacPolicy;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{
    FakeNodeClient, NodeBehavior, TablePolicy, body_json, build_app, build_app_with_budget, get,
    master, put, token, worker,
};

fn three_nodes() -> Vec<cluster_gateway::Node> {
    vec![
        master(),
        worker("worker1", "10.0.0.2"),
        worker("worker2", "10.0.0.3"),
    ]
}

fn app_with_denial(client: Arc<FakeNodeClient>) -> axum::Router {
    build_app(
        three_nodes(),
        Arc::new(TablePolicy::new().deny("alice", "worker1")),
        client,
        DispatchSettings::default(),
    )
}

#[tokio::test]
async fn test_health_is_public() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/health")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["nodes"], 3);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/cluster/status")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], 6000);
}

#[tokio::test]
async fn test_bad_signature_is_unauthorized() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    let response = app
        .oneshot(get("/cluster/status", "not-a-jwt"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_single_denied_node_is_forbidden() {
    let client = Arc::new(FakeNodeClient::new());
    let app = app_with_denial(client.clone());

    let response = app
        .oneshot(get("/cluster/worker1/status", &token("alice", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], 4000);
    assert!(client.called_nodes().is_empty());
}

#[tokio::test]
async fn test_single_denied_node_via_nodes_list_is_forbidden() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    let response = app
        .oneshot(get(
            "/cluster/healthcheck?nodes_list=worker1",
            &token("alice", &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_partial_denial_is_folded_into_envelope() {
    let client = Arc::new(FakeNodeClient::new());
    let app = app_with_denial(client.clone());

    let response = app
        .oneshot(put(
            "/cluster/restart?nodes_list=worker1,worker2",
            &token("alice", &[]),
            "",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["data"],
        json!({
            "affected_items": ["worker2"],
            "failed_items": [{
                "error": {"code": 4000, "message": ErrorCode::PERMISSION_DENIED.message()},
                "id": ["worker1"],
            }],
            "total_affected_items": 1,
            "total_failed_items": 1,
        })
    );
    assert_eq!(body["error"], 1);
    assert_eq!(body["message"], "Restart request was not sent to some nodes");
    assert_eq!(client.called_nodes(), ["worker2"]);
}

#[tokio::test]
async fn test_all_nodes_in_registry_order() {
    let app = build_app(
        vec![worker("worker2", "10.0.0.3"), master()],
        Arc::new(TablePolicy::new()),
        Arc::new(FakeNodeClient::new()),
        DispatchSettings::default(),
    );

    let response = app
        .oneshot(get("/cluster/healthcheck", &token("alice", &[])))
        .await
        .unwrap();

    let body = body_json(response).await;
    let names: Vec<&str> = body["data"]["affected_items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["master-node", "worker2"]);
    assert_eq!(body["data"]["failed_items"], json!([]));
    assert_eq!(body["error"], 0);
}

#[tokio::test]
async fn test_unknown_and_unreachable_nodes_are_grouped() {
    let client = FakeNodeClient::new().with(
        "worker2",
        NodeBehavior::Fail(ErrorCode::NODE_UNREACHABLE, "connection refused"),
    );
    let app = app_with_denial(Arc::new(client));

    let response = app
        .oneshot(get(
            "/cluster/status?nodes_list=worker2,ghost,master-node,phantom",
            &token("bob", &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let data = &body["data"];
    assert_eq!(data["total_affected_items"], 1);
    assert_eq!(data["total_failed_items"], 3);
    assert_eq!(data["failed_items"][0]["error"]["code"], 3023);
    assert_eq!(data["failed_items"][0]["id"], json!(["worker2"]));
    assert_eq!(data["failed_items"][1]["error"]["code"], 3022);
    assert_eq!(data["failed_items"][1]["id"], json!(["ghost", "phantom"]));
}

#[tokio::test]
async fn test_denied_unknown_node_reports_denial() {
    let app = build_app(
        three_nodes(),
        Arc::new(TablePolicy::new().deny("alice", "ghost")),
        Arc::new(FakeNodeClient::new()),
        DispatchSettings::default(),
    );

    let response = app
        .oneshot(get(
            "/cluster/status?nodes_list=ghost,worker2",
            &token("alice", &[]),
        ))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["data"]["failed_items"][0]["error"]["code"], 4000);
}

#[tokio::test]
async fn test_limit_truncates_but_totals_do_not() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    let response = app
        .oneshot(get("/cluster/nodes?limit=1", &token("bob", &[])))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["data"]["affected_items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["total_affected_items"], 3);
}

#[tokio::test]
async fn test_offset_and_sort() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    let response = app
        .oneshot(get(
            "/cluster/nodes?sort=-name&offset=1&select=ip",
            &token("bob", &[]),
        ))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(
        body["data"]["affected_items"],
        json!([
            {"name": "worker1", "ip": "10.0.0.2"},
            {"name": "master-node", "ip": "10.0.0.1"},
        ])
    );
}

#[tokio::test]
async fn test_invalid_limit_is_bad_request() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    for uri in [
        "/cluster/nodes?limit=0",
        "/cluster/nodes?limit=501",
        "/cluster/nodes?limit=abc",
        "/cluster/nodes?type=leader",
    ] {
        let response = app
            .clone()
            .oneshot(get(uri, &token("bob", &[])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body_json(response).await["error"], 1400);
    }
}

#[tokio::test]
async fn test_type_filter_narrows_totals() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    let response = app
        .oneshot(get("/cluster/nodes?type=master", &token("bob", &[])))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["data"]["total_affected_items"], 1);
    assert_eq!(body["data"]["affected_items"][0]["name"], "master-node");
    assert_eq!(body["data"]["affected_items"][0]["type"], "master");
}

#[tokio::test]
async fn test_search_on_listing() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    let response = app
        .oneshot(get("/cluster/nodes?search=worker", &token("bob", &[])))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["data"]["total_affected_items"], 2);
}

#[tokio::test]
async fn test_search_ignores_field_names() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    for needle in ["ip", "name", "type"] {
        let response = app
            .clone()
            .oneshot(get(
                &format!("/cluster/nodes?search={needle}"),
                &token("bob", &[]),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["total_affected_items"], 0, "{needle}");
    }
}

#[tokio::test]
async fn test_filter_narrowing_named_pair_keeps_envelope() {
    let client = Arc::new(FakeNodeClient::new());
    let app = app_with_denial(client.clone());

    let response = app
        .oneshot(get(
            "/cluster/status?nodes_list=master-node,worker1&type=worker",
            &token("alice", &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["total_affected_items"], 0);
    assert_eq!(data["total_failed_items"], 1);
    assert_eq!(data["failed_items"][0]["error"]["code"], 4000);
    assert_eq!(data["failed_items"][0]["id"], json!(["worker1"]));
    assert!(client.called_nodes().is_empty());
}

#[tokio::test]
async fn test_configuration_validation_reaches_every_node() {
    let client = Arc::new(FakeNodeClient::new());
    let app = app_with_denial(client.clone());

    let response = app
        .oneshot(get("/cluster/configuration/validation", &token("bob", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total_affected_items"], 3);
    assert_eq!(body["error"], 0);
    assert_eq!(
        body["message"],
        "Validation was successfully checked in all nodes"
    );

    let calls = client.calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(_, op, _)| *op == Operation::ValidateConfig));
}

#[tokio::test]
async fn test_node_info_targets_named_node() {
    let client = Arc::new(
        FakeNodeClient::new().with("worker2", NodeBehavior::Reply(json!({"version": "4.8.0"}))),
    );
    let app = app_with_denial(client.clone());

    let response = app
        .oneshot(get("/cluster/worker2/info", &token("alice", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["affected_items"],
        json!([{"name": "worker2", "version": "4.8.0"}])
    );

    let calls = client.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "worker2");
    assert_eq!(calls[0].1, Operation::GetInfo);
}

#[tokio::test]
async fn test_request_budget_rejects_excess_but_not_health() {
    let app = build_app_with_budget(
        three_nodes(),
        Arc::new(TablePolicy::new()),
        Arc::new(FakeNodeClient::new()),
        DispatchSettings::default(),
        Some(2),
    );
    let bob = token("bob", &[]);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(get("/cluster/nodes", &bob))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get("/cluster/nodes", &bob))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["error"], 6001);
    assert_eq!(body["message"], ErrorCode::RATE_LIMITED.message());

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/health")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_put_configuration_forwards_body() {
    let client = Arc::new(FakeNodeClient::new());
    let app = app_with_denial(client.clone());

    let response = app
        .oneshot(put(
            "/cluster/worker2/configuration",
            &token("alice", &[]),
            "<ossec_config/>",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["affected_items"], json!(["worker2"]));

    let calls = client.calls.lock().unwrap();
    assert_eq!(calls[0].1, Operation::PutConfig);
    assert_eq!(calls[0].2.body.as_deref(), Some("<ossec_config/>"));
}

#[tokio::test]
async fn test_put_configuration_rejects_empty_body() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    let response = app
        .oneshot(put("/cluster/worker2/configuration", &token("alice", &[]), "  "))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_local_alias_targets_local_node() {
    let client = FakeNodeClient::new().with("master-node", NodeBehavior::Reply(json!({"version": "4.8.0"})));
    let app = app_with_denial(Arc::new(client));

    let response = app
        .oneshot(get("/cluster/local/info", &token("alice", &[])))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(
        body["data"]["affected_items"],
        json!([{"name": "master-node", "version": "4.8.0"}])
    );
}

#[tokio::test]
async fn test_logs_forward_filters() {
    let client = Arc::new(FakeNodeClient::new());
    let app = app_with_denial(client.clone());

    let response = app
        .oneshot(get(
            "/cluster/worker2/logs?level=error&tag=cluster-daemon",
            &token("alice", &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let calls = client.calls.lock().unwrap();
    assert_eq!(calls[0].1, Operation::GetLogs);
    assert_eq!(calls[0].2.filters["level"], "error");
    assert_eq!(calls[0].2.filters["tag"], "cluster-daemon");
}

#[tokio::test]
async fn test_pretty_output_is_indented() {
    let app = app_with_denial(Arc::new(FakeNodeClient::new()));

    let response = app
        .oneshot(get("/cluster/nodes?pretty=true", &token("bob", &[])))
        .await
        .unwrap();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("\n  \"data\""));
}

#[tokio::test]
async fn test_rbac_readonly_cannot_restart() {
    let app = build_app(
        three_nodes(),
        Arc::new(RbacPolicy::new(RbacPolicy::default_roles())),
        Arc::new(FakeNodeClient::new()),
        DispatchSettings::default(),
    );

    let response = app
        .clone()
        .oneshot(put("/cluster/restart", &token("viewer", &["readonly"]), ""))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["total_failed_items"], 3);
    assert_eq!(body["data"]["failed_items"][0]["error"]["code"], 4000);
    assert_eq!(body["message"], "Restart request was not sent to any node");

    let response = app
        .oneshot(get("/cluster/status", &token("viewer", &["readonly"])))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["data"]["total_affected_items"], 3);
}

#[tokio::test(start_paused = true)]
async fn test_slow_node_times_out_without_failing_request() {
    let client = FakeNodeClient::new().with("worker1", NodeBehavior::Hang(Duration::from_secs(60)));
    let app = build_app(
        three_nodes(),
        Arc::new(TablePolicy::new()),
        Arc::new(client),
        DispatchSettings {
            max_concurrency: 8,
            node_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        },
    );

    let response = app
        .oneshot(get("/cluster/status", &token("bob", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total_affected_items"], 2);
    assert_eq!(body["data"]["failed_items"][0]["error"]["code"], 3020);
    assert_eq!(body["data"]["failed_items"][0]["id"], json!(["worker1"]));
}

#[tokio::test(start_paused = true)]
async fn test_request_deadline_and_wait_for_complete() {
    let settings = DispatchSettings {
        max_concurrency: 8,
        node_timeout: Duration::from_secs(10),
        request_timeout: Duration::from_secs(2),
    };
    let app = build_app(
        three_nodes(),
        Arc::new(TablePolicy::new()),
        Arc::new(FakeNodeClient::new().with("worker2", NodeBehavior::Hang(Duration::from_secs(60)))),
        settings,
    );

    let response = app
        .clone()
        .oneshot(get("/cluster/status", &token("bob", &[])))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["failed_items"][0]["error"]["code"], 3021);

    let response = app
        .oneshot(get(
            "/cluster/status?wait_for_complete=true",
            &token("bob", &[]),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["failed_items"][0]["error"]["code"], 3020);
}
