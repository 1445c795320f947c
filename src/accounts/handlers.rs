use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde_json::json;
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};

use crate::{
    accounts::{
        dto::{LoginForm, RegisterForm},
        error::AccountError,
        extractors::{CurrentUser, OptionalUser},
        repo_types::{AccountSummary, SessionUser},
    },
    session::{clear_session_user, push_flash, set_session_user, take_flashes, Flash},
    state::AppState,
};

const REGISTER_FAILED: &str = "Registration failed. Please try again.";
const LOGIN_FAILED: &str = "Login failed. Please try again.";

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/profile", get(profile))
}

pub fn api_routes() -> Router<AppState> {
    Router::new().route("/api/users", get(list_users))
}

/// JSON error body for API routes: `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub current_user: Option<SessionUser>,
    pub flashes: Vec<Flash>,
    pub errors: Vec<String>,
    pub name: String,
    pub email: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub current_user: Option<SessionUser>,
    pub flashes: Vec<Flash>,
    pub errors: Vec<String>,
    pub email: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub current_user: Option<SessionUser>,
    pub flashes: Vec<Flash>,
    pub account: AccountSummary,
}

async fn render_register(
    session: &Session,
    form: &RegisterForm,
    errors: Vec<String>,
    failure: Option<Flash>,
) -> Response {
    let mut flashes = take_flashes(session).await;
    flashes.extend(failure);
    RegisterTemplate {
        current_user: None,
        flashes,
        errors,
        name: form.name.clone(),
        email: form.email.clone(),
    }
    .into_response()
}

async fn render_login(
    session: &Session,
    email: &str,
    errors: Vec<String>,
    failure: Option<Flash>,
) -> Response {
    let mut flashes = take_flashes(session).await;
    flashes.extend(failure);
    LoginTemplate {
        current_user: None,
        flashes,
        errors,
        email: email.to_string(),
    }
    .into_response()
}

#[instrument(skip_all)]
pub async fn register_page(session: Session, OptionalUser(user): OptionalUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    render_register(&session, &RegisterForm::default(), Vec::new(), None).await
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    Form(form): Form<RegisterForm>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    let form = form.normalize();
    let errors = form.validate();
    if !errors.is_empty() {
        warn!(email = %form.email, errors = errors.len(), "registration form invalid");
        return render_register(&session, &form, errors, None).await;
    }

    match state
        .accounts
        .register(&form.email, &form.name, &form.password)
        .await
    {
        Ok(()) => {
            info!(email = %form.email, "user registered");
            push_flash(&session, Flash::success("Registration successful! Please login.")).await;
            Redirect::to("/login").into_response()
        }
        Err(e @ AccountError::DuplicateAccount) => {
            info!(email = %form.email, "registration failed: email already exists");
            render_register(&session, &form, Vec::new(), Some(Flash::error(e.to_string()))).await
        }
        Err(e) => {
            error!(error = %e, email = %form.email, "registration failed");
            render_register(&session, &form, Vec::new(), Some(Flash::error(REGISTER_FAILED))).await
        }
    }
}

#[instrument(skip_all)]
pub async fn login_page(session: Session, OptionalUser(user): OptionalUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    render_login(&session, "", Vec::new(), None).await
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    Form(form): Form<LoginForm>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    let form = form.normalize();
    let errors = form.validate();
    if !errors.is_empty() {
        warn!(email = %form.email, "login form invalid");
        return render_login(&session, &form.email, errors, None).await;
    }

    match state.accounts.authenticate(&form.email, &form.password).await {
        Ok(user) => {
            if let Err(e) = set_session_user(&session, &user).await {
                error!(error = %e, "failed to store session user");
                return render_login(&session, &form.email, Vec::new(), Some(Flash::error(LOGIN_FAILED)))
                    .await;
            }
            info!(email = %user.email, "user logged in");
            push_flash(&session, Flash::success("Login successful!")).await;
            Redirect::to("/").into_response()
        }
        Err(e @ (AccountError::AccountNotFound | AccountError::InvalidCredentials)) => {
            warn!(email = %form.email, reason = %e, "login rejected");
            render_login(&session, &form.email, Vec::new(), Some(Flash::error(e.to_string()))).await
        }
        Err(e) => {
            error!(error = %e, email = %form.email, "login failed");
            render_login(&session, &form.email, Vec::new(), Some(Flash::error(LOGIN_FAILED))).await
        }
    }
}

#[instrument(skip_all)]
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_session_user(&session).await {
        error!(error = %e, "failed to clear session");
    }
    push_flash(&session, Flash::info("You have been logged out.")).await;
    Redirect::to("/")
}

#[instrument(skip_all, fields(email = %user.email))]
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(user): CurrentUser,
) -> Response {
    match state.accounts.profile(&user).await {
        Ok(Some(account)) => ProfileTemplate {
            flashes: take_flashes(&session).await,
            current_user: Some(user),
            account,
        }
        .into_response(),
        Ok(None) => {
            warn!("session user has no account record");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            error!(error = %e, "error loading profile");
            push_flash(&session, Flash::error("Error loading profile.")).await;
            Redirect::to("/").into_response()
        }
    }
}

#[instrument(skip_all, fields(viewer = %user.email))]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<AccountSummary>>, ApiError> {
    state.accounts.list_accounts(&user).await.map(Json).map_err(|e| {
        error!(error = %e, "error fetching users");
        ApiError::Internal(e.to_string())
    })
}
