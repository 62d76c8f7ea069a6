//! Session-cookie authentication middleware.
//!
//! Sessions are HS256 tokens carried in the `jwt` cookie (or an
//! `Authorization: Bearer` header for programmatic callers). The middleware
//! only resolves the tenant; identity management lives elsewhere.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::api::ApiError;
use crate::state::AppState;
use switchyard_core::Error;

const SESSION_COOKIE: &str = "jwt";

#[derive(Debug, Clone, Deserialize)]
pub struct SessionClaims {
    pub username: String,
    pub tenant_name: String,
    pub exp: usize,
}

/// Authenticated request context made available to handlers.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub username: String,
    pub tenant: String,
}

pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Option<AuthContext> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.key, &self.validation).ok()?;
        Some(AuthContext {
            username: data.claims.username,
            tenant: data.claims.tenant_name,
        })
    }
}

/// Reject unauthenticated requests with a 401 `{message}` body.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = bearer_token(request.headers())
        .or_else(|| cookie_token(request.headers()))
        .and_then(|token| state.auth.verify(&token));
    match context {
        Some(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        None => ApiError::from(Error::Unauthenticated).into_response(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}
