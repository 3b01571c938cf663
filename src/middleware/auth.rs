use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Authenticated actor context. Identity and role assignment live in the
/// external user directory; this service only verifies the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

fn unauthorized(code: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "message": code})),
    )
        .into_response()
}

fn decode_claims(req: &Request) -> std::result::Result<Claims, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| unauthorized("invalid_token"))
}

async fn require_roles(mut req: Request, next: Next, allowed: &[&str]) -> Response {
    match decode_claims(&req) {
        Ok(claims) => {
            let role = claims.role.clone().unwrap_or_default();
            if !allowed.iter().any(|r| r.eq_ignore_ascii_case(&role)) {
                return (
                    StatusCode::FORBIDDEN,
                    Json(json!({"success": false, "message": "forbidden"})),
                )
                    .into_response();
            }
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

/// Staff surface: any role that can author or oversee assessments.
pub async fn require_staff(req: Request, next: Next) -> Response {
    require_roles(req, next, &["superadmin", "leadmentor", "schooladmin", "mentor"]).await
}

pub async fn require_student(req: Request, next: Next) -> Response {
    require_roles(req, next, &["student"]).await
}
