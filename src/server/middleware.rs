//! Access gate middleware
//!
//! Runs [`AccessPolicyGate::evaluate`] for every request. Allowed requests
//! continue with the session token attached as a [`SessionToken`] extension;
//! the others are answered with a `303 See Other` redirect.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use super::handlers::SessionToken;
use crate::core::auth::{AccessOutcome, AccessPolicyGate};

/// State for [`access_gate`]
#[derive(Clone)]
pub struct GateState {
    pub gate: Arc<AccessPolicyGate>,
    pub session_cookie: String,
}

/// Access token from `Authorization: Bearer ..` or the session cookie
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn expired_cookie(cookie_name: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{cookie_name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"
    ))
    .ok()
}

pub async fn access_gate(
    State(state): State<GateState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(request.headers(), &state.session_cookie);
    let path = request.uri().path().to_string();
    let decision = state.gate.evaluate(&path, token.as_deref()).await;
    let policy = state.gate.policy();

    match decision.outcome {
        AccessOutcome::Allow => {
            if let Some(token) = token.filter(|_| decision.authenticated) {
                request.extensions_mut().insert(SessionToken(token));
            }
            next.run(request).await
        }
        AccessOutcome::RedirectHome => Redirect::to(&policy.home_path).into_response(),
        AccessOutcome::RedirectLogin => {
            let mut response = Redirect::to(&policy.login_path).into_response();
            if decision.session_terminated {
                if let Some(cookie) = expired_cookie(&state.session_cookie) {
                    response.headers_mut().append(header::SET_COOKIE, cookie);
                }
            }
            response
        }
    }
}
