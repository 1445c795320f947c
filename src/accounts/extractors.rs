use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::debug;

use super::{handlers::ApiError, repo_types::SessionUser};
use crate::session::session_user;

/// Requires a logged-in session and yields its [`SessionUser`].
pub struct CurrentUser(pub SessionUser);

/// Rejection when no user is logged in.
pub enum AuthRejection {
    /// HTML pages send the browser to the login form.
    RedirectToLogin,
    /// API routes answer 401 with a JSON error body.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Unauthorized => ApiError::Unauthorized.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_api = parts.uri.path().starts_with("/api/");
        let rejection = || {
            if is_api {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::RedirectToLogin
            }
        };

        let session = parts.extensions.get::<Session>().cloned().ok_or_else(rejection)?;
        match session_user(&session).await {
            Some(user) => Ok(Self(user)),
            None => {
                debug!(path = %parts.uri.path(), "no session user");
                Err(rejection())
            }
        }
    }
}

/// Yields the logged-in user if there is one; never rejects.
pub struct OptionalUser(pub Option<SessionUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>().cloned() {
            Some(session) => session_user(&session).await,
            None => None,
        };
        Ok(Self(user))
    }
}
