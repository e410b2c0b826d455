//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses are properly formatted
//! - Error conversions work correctly

use axum::http::StatusCode;
use axum::response::IntoResponse;
use roost::core::error::{ConfigError, ResourceError, StorageError, ValidationError};
use roost::prelude::*;

fn backend_error(status: u16) -> AdminError {
    AdminError::Storage(StorageError::Backend {
        status,
        code: Some("PGRST116".to_string()),
        message: "JSON object requested, multiple (or no) rows returned".to_string(),
        details: Some("The result contains 0 rows".to_string()),
        hint: None,
    })
}

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_record_not_found_returns_404() {
        let err = AdminError::Resource(ResourceError::NotFound {
            resource: "amenities".to_string(),
            id: "42".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_backend_client_errors_keep_status() {
        assert_eq!(backend_error(406).status_code(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(backend_error(409).status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_backend_server_errors_are_bad_gateway() {
        assert_eq!(backend_error(500).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(backend_error(503).status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_transport_error_is_bad_gateway() {
        let err = AdminError::Storage(StorageError::Transport {
            message: "connection refused".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_validation_errors_return_400() {
        let errors = [
            ValidationError::UnsupportedOperator {
                field: "name".to_string(),
                operator: "ilike".to_string(),
            },
            ValidationError::InvalidSortOrder {
                field: "name".to_string(),
                order: "sideways".to_string(),
            },
            ValidationError::InvalidField {
                field: "name;".to_string(),
            },
        ];
        for err in errors {
            assert_eq!(AdminError::from(err).status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_config_error_returns_500() {
        let err = AdminError::Config(ConfigError::InvalidValue {
            field: "backend.url".to_string(),
            value: "ftp://x".to_string(),
            message: "must be an http(s) URL".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

// =============================================================================
// Error Response Tests
// =============================================================================

mod error_response_tests {
    use super::*;

    #[test]
    fn test_backend_error_response_carries_details() {
        let response = backend_error(406).to_response();

        assert_eq!(response.code, "BACKEND_ERROR");
        assert!(response.message.contains("multiple (or no) rows"));
        let details = response.details.unwrap();
        assert_eq!(details["code"], "PGRST116");
        assert_eq!(details["status"], 406);
    }

    #[test]
    fn test_not_found_response_names_record() {
        let err = AdminError::Resource(ResourceError::NotFound {
            resource: "photos".to_string(),
            id: "p-9".to_string(),
        });
        let response = err.to_response();

        assert_eq!(response.code, "RECORD_NOT_FOUND");
        let details = response.details.unwrap();
        assert_eq!(details["resource"], "photos");
        assert_eq!(details["id"], "p-9");
    }

    #[test]
    fn test_validation_response_has_no_details() {
        let err = AdminError::from(ValidationError::InvalidSelection {
            selection: "id&x=1".to_string(),
        });
        let response = err.to_response();

        assert_eq!(response.code, "INVALID_SELECTION");
        assert!(response.details.is_none());
    }
}

// =============================================================================
// Error Conversion Tests
// =============================================================================

mod error_conversion_tests {
    use super::*;

    #[test]
    fn test_serde_json_error_converts() {
        let json_err = serde_json::from_str::<Value>("{not json").unwrap_err();
        let err: AdminError = json_err.into();
        assert_eq!(err.error_code(), "INVALID_JSON");
    }

    #[test]
    fn test_config_error_converts() {
        let err: AdminError = ConfigError::IoError {
            message: "cannot read 'roost.yaml'".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("roost.yaml"));
    }
}

// =============================================================================
// IntoResponse Tests
// =============================================================================

mod into_response_tests {
    use super::*;

    #[test]
    fn test_admin_error_into_response_status() {
        let response = AdminError::Resource(ResourceError::NotFound {
            resource: "states".to_string(),
            id: "OR".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unsupported_operator_into_response_status() {
        let response = AdminError::from(ValidationError::UnsupportedOperator {
            field: "name".to_string(),
            operator: "in".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
