//! Token gates for handlers.
//!
//! Handlers opt in by taking [`AuthUser`] (any valid token) or [`AdminUser`]
//! (valid token with the `admin` role) as an argument:
//!
//! ```ignore
//! async fn handler(AuthUser(identity): AuthUser) -> String {
//!     format!("hello {}", identity.username)
//! }
//! ```
//!
//! The token is read from `Authorization: Bearer <token>` first and from the
//! `token` cookie otherwise.

use std::{sync::Arc, time::Duration};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
};
use cookie::{Cookie, SameSite};

use crate::{error::AppError, models::user::Role, token::TokenService};

pub const TOKEN_COOKIE: &str = "token";

/// Who is making the request, as proven by a verified token.
///
/// Ownership is decided by `user_id`; `username` is the name the account had
/// when the token was issued and may since have changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True for the account itself or any admin.
    pub fn may_act_for(&self, user_id: i64) -> bool {
        self.is_admin() || self.user_id == user_id
    }
}

pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<TokenService>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = locate_token(&parts.headers)?;
        let tokens = Arc::<TokenService>::from_ref(state);

        let claims = tokens.verify(&token).map_err(|e| {
            tracing::debug!(error = %e, path = %parts.uri.path(), "token verification failed");
            AppError::from(e)
        })?;

        Ok(AuthUser(Identity {
            user_id: claims.uid,
            username: claims.sub,
            role: claims.role,
        }))
    }
}

pub struct AdminUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<TokenService>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;

        if !identity.is_admin() {
            tracing::debug!(
                username = %identity.username,
                path = %parts.uri.path(),
                "admin access denied"
            );
            return Err(AppError::forbidden("Access denied, administrators only"));
        }

        Ok(AdminUser(identity))
    }
}

/// Finds the raw token: bearer header, then cookie.
pub fn locate_token(headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AppError::MalformedToken)?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::MalformedToken)?;
        return Ok(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == TOKEN_COOKIE && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
        .ok_or(AppError::MissingToken)
}

/// `Set-Cookie` value carrying a freshly issued token.
pub fn token_cookie(token: &str, lifetime: Duration, secure: bool) -> String {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(cookie::time::Duration::seconds(lifetime.as_secs() as i64))
        .build()
        .to_string()
}

/// `Set-Cookie` value that removes the token cookie.
pub fn removal_cookie(secure: bool) -> String {
    let mut cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build();
    cookie.make_removal();
    cookie.to_string()
}
