use axum::{
    RequestPartsExt, async_trait,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// JWT claims issued by the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub session_id: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthClaims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// HMAC secret the provider signs tokens with. `None` rejects every token.
#[derive(Clone, Debug, Default)]
pub struct JwtSecret(pub Option<String>);

/// Rejection type returned when auth fails.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    MissingSecret,
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "missing bearer token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid token"),
            AuthError::MissingSecret => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server jwt secret not configured",
            ),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "admin role required"),
        };
        (status, msg).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthClaims
where
    JwtSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingToken)?;

        let JwtSecret(secret) = JwtSecret::from_ref(state);
        let secret = secret.ok_or(AuthError::MissingSecret)?;

        let token_data = decode::<AuthClaims>(
            bearer.token(),
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|err| {
            debug!(error = %err, "rejecting bearer token");
            AuthError::InvalidToken
        })?;

        Ok(token_data.claims)
    }
}

/// Claims of a caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminClaims(pub AuthClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AdminClaims
where
    JwtSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = AuthClaims::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            return Err(AuthError::Forbidden);
        }
        Ok(AdminClaims(claims))
    }
}

/// Signs a token the way the identity provider does. Used by tests and local tooling.
pub fn issue_token(
    secret: &str,
    sub: &str,
    role: Role,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = AuthClaims {
        sub: sub.to_string(),
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
        session_id: None,
        role,
        email: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_decode_with_role() {
        let token = issue_token("secret", "editor-1", Role::Admin, Duration::minutes(5)).unwrap();
        let data = decode::<AuthClaims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        assert!(data.claims.is_admin());
        assert_eq!(data.claims.sub, "editor-1");
    }

    #[test]
    fn role_defaults_to_user() {
        let claims: AuthClaims =
            serde_json::from_str(r#"{"sub":"u","exp":0,"iat":0,"session_id":null}"#).unwrap();
        assert_eq!(claims.role, Role::User);
    }
}
