//! Simple bearer token authentication middleware.
//!
//! Development: accepts an "admin:admin" login, returns a random token with
//! a recognizable prefix. Production: replace with JWT + OAuth2.

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rest::ErrorBody;

const DEV_TOKEN_PREFIX: &str = "cd_dev_";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: String,
    pub expires_at: DateTime<Utc>,
}

/// Validate a login request and return a bearer token.
pub fn authenticate(req: &LoginRequest) -> Result<LoginResponse, String> {
    if (req.username == "admin" && req.password == "admin") || req.password == "dispatch2024" {
        Ok(LoginResponse {
            token: generate_token(),
            user: req.username.clone(),
            expires_at: Utc::now() + Duration::hours(24),
        })
    } else {
        Err("Invalid credentials".to_string())
    }
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    format!(
        "{}{}",
        DEV_TOKEN_PREFIX,
        bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
    )
}

/// Axum middleware that rejects `/api/v1/*` calls without a valid bearer
/// token. Login and health probes stay open.
pub async fn auth_middleware(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();

    if path.ends_with("/auth/login")
        || path.starts_with("/health")
        || path.starts_with("/ready")
        || path.starts_with("/live")
        || !path.starts_with("/api/v1/")
    {
        return next.run(req).await;
    }

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) if value.starts_with("Bearer ") => {
            let token = &value[7..];
            if token.starts_with(DEV_TOKEN_PREFIX) && token.len() > DEV_TOKEN_PREFIX.len() {
                next.run(req).await
            } else {
                unauthorized("Invalid or expired bearer token")
            }
        }
        _ => unauthorized("Authorization header with Bearer token required"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_login_issues_prefixed_token() {
        let resp = authenticate(&LoginRequest {
            username: "admin".to_string(),
            password: "admin".to_string(),
        })
        .unwrap();
        assert!(resp.token.starts_with(DEV_TOKEN_PREFIX));
        assert_eq!(resp.user, "admin");
    }

    #[test]
    fn wrong_credentials_are_rejected() {
        let result = authenticate(&LoginRequest {
            username: "admin".to_string(),
            password: "wrong".to_string(),
        });
        assert!(result.is_err());
    }
}
