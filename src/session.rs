//! Cookie session configuration and helpers.
//!
//! Sessions live in an in-process store; the cookie carries only the
//! session id, signed with a key derived from `SECRET_KEY`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tower_sessions::{cookie::Key, Session};
use tracing::error;

use crate::accounts::repo_types::SessionUser;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "techstore_session";

/// Session expiry on inactivity, in seconds (7 days).
pub const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

const USER_KEY: &str = "user";
const FLASH_KEY: &str = "_flashes";

/// Derives the 64-byte cookie signing key from an arbitrary-length secret.
pub fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    /// CSS class suffix used by the templates.
    pub fn css(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// Queues a flash message for the next page.
pub async fn push_flash(session: &Session, flash: Flash) {
    let mut queue: Vec<Flash> = session.get(FLASH_KEY).await.ok().flatten().unwrap_or_default();
    queue.push(flash);
    if let Err(e) = session.insert(FLASH_KEY, queue).await {
        error!(error = %e, "failed to store flash message");
    }
}

/// Drains queued flash messages.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(FLASH_KEY).await {
        Ok(queue) => queue.unwrap_or_default(),
        Err(e) => {
            error!(error = %e, "failed to read flash messages");
            Vec::new()
        }
    }
}

pub async fn session_user(session: &Session) -> Option<SessionUser> {
    session.get(USER_KEY).await.ok().flatten()
}

/// Marks the session as logged in.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_session_user(
    session: &Session,
    user: &SessionUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(USER_KEY, user).await
}

/// Removes the logged-in user (logout) and rotates the session id, so the
/// cookie held before logout no longer names a live session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_session_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<SessionUser>(USER_KEY).await?;
    session.remove::<Vec<Flash>>(FLASH_KEY).await?;
    session.cycle_id().await
}
