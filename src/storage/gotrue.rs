//! GoTrue-compatible session provider over HTTP
//!
//! Sessions are validated against `{url}/auth/v1/user` and ended with
//! `{url}/auth/v1/logout`. Roles are read from the profile table through a
//! [`PostgrestClient`] holding the service-role key, which bypasses row-level
//! security.

use crate::core::auth::{SessionProvider, SessionUser};
use crate::core::error::{AdminResult, StorageError};
use crate::storage::postgrest::{PostgrestClient, fetch_column};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;

/// Session provider backed by a GoTrue auth server
#[derive(Clone)]
pub struct GoTrueSessionProvider {
    http: reqwest::Client,
    auth_url: String,
    api_key: String,
    profiles: PostgrestClient,
    profiles_table: String,
    role_column: String,
}

impl fmt::Debug for GoTrueSessionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoTrueSessionProvider")
            .field("auth_url", &self.auth_url)
            .field("profiles", &self.profiles)
            .field("profiles_table", &self.profiles_table)
            .field("role_column", &self.role_column)
            .finish()
    }
}

impl GoTrueSessionProvider {
    /// Provider for the project at `base_url`
    ///
    /// `api_key` is the public key sent with auth requests; `profiles` must be
    /// a privileged client able to read every profile row.
    pub fn new(base_url: &str, api_key: impl Into<String>, profiles: PostgrestClient) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_url: format!("{}/auth/v1", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            profiles,
            profiles_table: "profiles".to_string(),
            role_column: "role".to_string(),
        }
    }

    /// Read roles from another table or column
    pub fn with_profile_source(
        mut self,
        table: impl Into<String>,
        role_column: impl Into<String>,
    ) -> Self {
        self.profiles_table = table.into();
        self.role_column = role_column.into();
        self
    }

    fn request(&self, method: reqwest::Method, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.auth_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }
}

fn auth_error(status: StatusCode, body: String) -> StorageError {
    StorageError::Backend {
        status: status.as_u16(),
        code: None,
        message: if body.is_empty() {
            status.canonical_reason().unwrap_or("auth request failed").to_string()
        } else {
            body
        },
        details: None,
        hint: None,
    }
}

#[async_trait]
impl SessionProvider for GoTrueSessionProvider {
    async fn current_user(&self, access_token: &str) -> AdminResult<Option<SessionUser>> {
        let response = self
            .request(reqwest::Method::GET, "user", access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.json::<SessionUser>().await?)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(auth_error(status, response.text().await.unwrap_or_default()).into()),
        }
    }

    async fn lookup_role(&self, user_id: &str) -> AdminResult<Option<String>> {
        let role = fetch_column(
            &self.profiles,
            &self.profiles_table,
            "id",
            user_id,
            &self.role_column,
        )
        .await?;

        Ok(role.and_then(|value| match value {
            Value::String(s) => Some(s),
            _ => None,
        }))
    }

    async fn sign_out(&self, access_token: &str) -> AdminResult<()> {
        let response = self
            .request(reqwest::Method::POST, "logout", access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Already expired or revoked.
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(()),
            status => Err(auth_error(status, response.text().await.unwrap_or_default()).into()),
        }
    }
}
