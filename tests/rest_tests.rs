//! End-to-end tests for the HTTP exposure
//!
//! The full router (gate, handlers, facade) runs over the in-memory backend
//! and session provider.

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use roost::config::AdminConfig;
use roost::prelude::*;

const STAFF_TOKEN: &str = "staff-token";
const MEMBER_TOKEN: &str = "member-token";

// =============================================================================
// Helper function to create test server
// =============================================================================

fn create_test_server() -> (TestServer, InMemoryBackend, InMemorySessionProvider) {
    let backend = InMemoryBackend::new();
    backend
        .seed(
            "amenities",
            vec![
                json!({"id": 1, "name": "Hide", "category_id": 3}),
                json!({"id": 2, "name": "Parking", "category_id": 1}),
                json!({"id": 3, "name": "Feeder", "category_id": 3}),
            ],
        )
        .unwrap();
    backend.register_rpc("get_pending_reports_with_details", |args| {
        let page = args["current_page"].as_u64().unwrap_or(1);
        Ok(json!([
            {"id": page * 10, "status": "pending", "total_count": "31"}
        ]))
    });

    let sessions = InMemorySessionProvider::new()
        .with_session(STAFF_TOKEN, "u-admin")
        .with_role("u-admin", "admin")
        .with_session(MEMBER_TOKEN, "u-member")
        .with_role("u-member", "user");

    let app = ServerBuilder::new()
        .with_config(AdminConfig::default_config())
        .with_backend(backend.clone())
        .with_session_provider(sessions.clone())
        .build()
        .expect("Failed to build app");

    let server = TestServer::try_new(app).expect("Failed to create test server");

    (server, backend, sessions)
}

// =============================================================================
// Health Check Tests
// =============================================================================

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_not_gated() {
        let (server, _, _) = create_test_server();

        for path in ["/health", "/healthz"] {
            let response = server.get(path).await;
            response.assert_status_ok();

            let body: Value = response.json();
            assert_eq!(body["status"], "ok");
            assert_eq!(body["service"], "roost-admin");
        }
    }
}

// =============================================================================
// Gate Tests
// =============================================================================

mod gate_tests {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_request_redirects_to_login() {
        let (server, _, _) = create_test_server();

        let response = server.get("/api/amenities").await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION), "/login");
    }

    #[tokio::test]
    async fn test_cookie_session_is_accepted() {
        let (server, _, _) = create_test_server();

        let response = server
            .get("/api/amenities")
            .add_header(
                header::COOKIE,
                HeaderValue::from_static("sb-access-token=staff-token"),
            )
            .await;

        response.assert_status_ok();
    }

    #[tokio::test]
    async fn test_member_is_signed_out_and_cookie_cleared() {
        let (server, _, sessions) = create_test_server();

        let response = server
            .get("/reports")
            .authorization_bearer(MEMBER_TOKEN)
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION), "/login");
        let cookie = response.header(header::SET_COOKIE);
        assert!(cookie.to_str().unwrap().starts_with("sb-access-token=;"));
        assert!(!sessions.is_active(MEMBER_TOKEN));
    }

    #[tokio::test]
    async fn test_signed_in_staff_sent_home_from_login() {
        let (server, _, _) = create_test_server();

        let response = server.get("/login").authorization_bearer(STAFF_TOKEN).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION), "/");
    }

    #[tokio::test]
    async fn test_unrouted_public_path_falls_through() {
        let (server, _, _) = create_test_server();

        let response = server.get("/login").await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["code"], "ROUTE_NOT_FOUND");
    }
}

// =============================================================================
// Resource Tests
// =============================================================================

mod resource_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_with_pagination_meta() {
        let (server, _, _) = create_test_server();

        let response = server
            .get("/api/amenities")
            .add_query_param("current", 2)
            .add_query_param("pageSize", 2)
            .add_query_param("sorters", r#"[{"field":"id","order":"asc"}]"#)
            .authorization_bearer(STAFF_TOKEN)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 3);
        assert_eq!(body["data"], json!([{"id": 3, "name": "Feeder", "category_id": 3}]));
        assert_eq!(body["pagination"]["page"], 2);
        assert_eq!(body["pagination"]["pageSize"], 2);
        assert_eq!(body["pagination"]["totalPages"], 2);
        assert_eq!(body["pagination"]["hasNext"], false);
        assert_eq!(body["pagination"]["hasPrev"], true);
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let (server, _, _) = create_test_server();

        let response = server
            .get("/api/amenities")
            .add_query_param(
                "filters",
                r#"[{"field":"category_id","operator":"eq","value":3}]"#,
            )
            .authorization_bearer(STAFF_TOKEN)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 2);
    }

    #[tokio::test]
    async fn test_list_bad_page_values_use_defaults() {
        let (server, _, _) = create_test_server();

        let response = server
            .get("/api/amenities")
            .add_query_param("current", "abc")
            .add_query_param("pageSize", "-4")
            .authorization_bearer(STAFF_TOKEN)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["page"], 1);
        assert_eq!(body["pagination"]["pageSize"], 10);
    }

    #[tokio::test]
    async fn test_list_huge_page_values_return_empty_page() {
        let (server, _, _) = create_test_server();

        let response = server
            .get("/api/amenities")
            .add_query_param("current", "99999999999999999999")
            .add_query_param("pageSize", "99999999999999999999")
            .authorization_bearer(STAFF_TOKEN)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["total"], 3);
        assert_eq!(body["pagination"]["pageSize"], 1000);
        assert_eq!(body["pagination"]["hasNext"], false);
    }

    #[tokio::test]
    async fn test_unsupported_operator_is_rejected() {
        let (server, _, _) = create_test_server();

        let response = server
            .get("/api/amenities")
            .add_query_param("filters", r#"[{"field":"name","operator":"contains","value":"H"}]"#)
            .authorization_bearer(STAFF_TOKEN)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "UNSUPPORTED_FILTER_OPERATOR");
    }

    #[tokio::test]
    async fn test_reports_total_from_procedure() {
        let (server, _, _) = create_test_server();

        let response = server
            .get("/api/reports")
            .add_query_param("current", 3)
            .add_query_param("filters", r#"[{"field":"status","operator":"eq","value":"resolved"}]"#)
            .authorization_bearer(STAFF_TOKEN)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 31);
        assert_eq!(body["data"][0]["id"], 30);
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let (server, backend, _) = create_test_server();

        let response = server
            .post("/api/services")
            .authorization_bearer(STAFF_TOKEN)
            .json(&json!({"name": "Test"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Value = response.json();
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let response = server
            .get(&format!("/api/services/{id}"))
            .authorization_bearer(STAFF_TOKEN)
            .await;
        response.assert_status_ok();
        let fetched: Value = response.json();
        assert_eq!(fetched["data"]["name"], "Test");

        let response = server
            .patch(&format!("/api/services/{id}"))
            .authorization_bearer(STAFF_TOKEN)
            .json(&json!({"name": "Guided walk"}))
            .await;
        response.assert_status_ok();
        let updated: Value = response.json();
        assert_eq!(updated["data"]["name"], "Guided walk");

        let response = server
            .delete(&format!("/api/services/{id}"))
            .authorization_bearer(STAFF_TOKEN)
            .await;
        response.assert_status_ok();
        let deleted: Value = response.json();
        assert_eq!(deleted, json!({"data": {"id": id}}));
        assert!(backend.rows("services").unwrap().is_empty());

        let response = server
            .get(&format!("/api/services/{id}"))
            .authorization_bearer(STAFF_TOKEN)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["code"], "RECORD_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_payload() {
        let (server, _, _) = create_test_server();

        let response = server
            .post("/api/services")
            .authorization_bearer(STAFF_TOKEN)
            .json(&json!(["not", "a", "record"]))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_MUTATION");
    }

    #[tokio::test]
    async fn test_invalid_resource_name() {
        let (server, _, _) = create_test_server();

        let response = server
            .get("/api/amenities;drop/1")
            .authorization_bearer(STAFF_TOKEN)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
