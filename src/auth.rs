//! Identity forwarded by the fronting identity provider
//!
//! The provider authenticates the visitor and sets `X-User-Id`, `X-User-Email`,
//! `X-User-Name` and `X-User-Role` on every request it passes through. A request
//! without `X-User-Id` is anonymous.

use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::db::now_ms;
use crate::error::AppError;
use crate::queries::catalog as catalog_queries;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Instructor,
    Parent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Instructor => "INSTRUCTOR",
            Role::Parent => "PARENT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "INSTRUCTOR" => Ok(Role::Instructor),
            "PARENT" => Ok(Role::Parent),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

/// The visitor of the current request, possibly anonymous
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewer {
    pub identity: Option<Identity>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn with_role(user_id: &str, role: Role) -> Self {
        Self {
            identity: Some(Identity {
                user_id: user_id.to_string(),
                email: format!("{}@example.com", user_id),
                display_name: user_id.to_string(),
                role,
            }),
        }
    }

    /// Read the forwarded identity headers
    /// An unrecognised role falls back to PARENT, the least privileged one
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(user_id) = header_str(headers, USER_ID_HEADER) else {
            return Self::anonymous();
        };
        let role = header_str(headers, USER_ROLE_HEADER)
            .and_then(|r| r.parse().ok())
            .unwrap_or(Role::Parent);
        Self {
            identity: Some(Identity {
                user_id: user_id.to_string(),
                email: header_str(headers, USER_EMAIL_HEADER)
                    .unwrap_or_default()
                    .to_string(),
                display_name: header_str(headers, USER_NAME_HEADER)
                    .unwrap_or(user_id)
                    .to_string(),
                role,
            }),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|i| i.role)
    }

    /// Admins may see drafts and use the page editor
    pub fn is_editor(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn require_user(&self) -> Result<&Identity, AppError> {
        self.identity.as_ref().ok_or(AppError::Unauthenticated)
    }

    pub fn require_admin(&self) -> Result<&Identity, AppError> {
        let identity = self.require_user()?;
        if identity.role != Role::Admin {
            return Err(AppError::Forbidden("admin role required".to_string()));
        }
        Ok(identity)
    }

    pub fn require_parent(&self) -> Result<&Identity, AppError> {
        let identity = self.require_user()?;
        match identity.role {
            Role::Parent | Role::Admin => Ok(identity),
            Role::Instructor => Err(AppError::Forbidden(
                "only parents can book classes".to_string(),
            )),
        }
    }

    /// Owner of a booking, or an admin
    pub fn require_owner(&self, owner_id: &str) -> Result<&Identity, AppError> {
        let identity = self.require_user()?;
        if identity.role != Role::Admin && identity.user_id != owner_id {
            return Err(AppError::Forbidden("not your booking".to_string()));
        }
        Ok(identity)
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer::from_headers(&parts.headers))
    }
}

/// Mirror the forwarded identity into the users table
pub async fn ensure_user(pool: &SqlitePool, identity: &Identity) -> Result<(), AppError> {
    sqlx::query(&catalog_queries::upsert_user(
        &identity.user_id,
        &identity.email,
        &identity.display_name,
        identity.role.as_str(),
        now_ms(),
    ))
    .execute(pool)
    .await?;
    Ok(())
}

/// Sign-in URL carrying `return_to` so the provider can send the visitor back
pub fn sign_in_redirect(sign_in_url: &str, return_to: &str) -> String {
    if let Ok(mut url) = url::Url::parse(sign_in_url) {
        url.query_pairs_mut().append_pair("return_to", return_to);
        return url.to_string();
    }
    let separator = if sign_in_url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}return_to={}",
        sign_in_url,
        separator,
        urlencoding::encode(return_to)
    )
}
