//! Admin panel
//!
//! Server-rendered pages for signing in and managing relay keys. Every route
//! except the login page and logout requires an [`AdminSession`].

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    middleware::{from_fn, from_fn_with_state},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    db::ApiKeyRepository,
    middleware::{
        admin_headers_middleware, login_rate_limit_middleware, removal_cookie, session_cookie,
        AdminSession, LoginRateLimit, LOGIN_PATH, SESSION_COOKIE,
    },
    models::{ApiKey, CreateKeyForm, KeySearchQuery, KeyStats, LoginForm},
    services::{AdminService, KeyError},
    utils::{AppError, AppResult},
    AppState,
};

/// Landing page after login and after every key mutation
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

/// Fresh tokens tried before giving up on a create request
const ISSUE_ATTEMPTS: u32 = 3;

/// Admin routes, mounted under `/admin`
pub fn routes(login_limit: LoginRateLimit) -> Router<AppState> {
    let login = Router::new()
        .route("/login", post(login))
        .route_layer(from_fn_with_state(login_limit, login_rate_limit_middleware));

    Router::new()
        .route("/", get(login_page))
        .merge(login)
        .route("/dashboard", get(dashboard))
        .route("/keys/create", post(create_key))
        .route("/keys/search", get(search_keys))
        .route("/keys/{id}/toggle", post(toggle_key))
        .route("/keys/{id}/delete", post(delete_key))
        .route("/logout", get(logout))
        .layer(from_fn(admin_headers_middleware))
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate<'a> {
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "admin.html")]
struct DashboardTemplate<'a> {
    username: &'a str,
    stats: KeyStats,
    keys: Vec<KeyRow>,
}

/// Display-ready dashboard table row
struct KeyRow {
    id: i64,
    owner_label: String,
    token: String,
    created: String,
    requests: i64,
    last_used: String,
    is_active: bool,
}

impl From<ApiKey> for KeyRow {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            created: key.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            last_used: key
                .last_used_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "Never".to_string()),
            requests: key.request_count,
            is_active: key.is_active,
            owner_label: key.owner_label,
            token: key.token,
        }
    }
}

fn render_login(error: Option<&str>) -> AppResult<Html<String>> {
    Ok(Html(LoginTemplate { error }.render()?))
}

/// `GET /admin`
async fn login_page() -> AppResult<Html<String>> {
    render_login(None)
}

/// `POST /admin/login`
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let admins = AdminService::new(state.db.clone());
    let Some(admin) = admins.authenticate(form.username.trim(), &form.password).await? else {
        warn!(username = %form.username, "Failed admin login");
        return Ok(render_login(Some("Invalid credentials"))?.into_response());
    };

    let session = state.sessions.create(&admin).await;
    info!(username = %admin.username, "Admin logged in");

    Ok((jar.add(session_cookie(session.id)), Redirect::to(DASHBOARD_PATH)).into_response())
}

/// `GET /admin/dashboard`
async fn dashboard(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
) -> AppResult<Html<String>> {
    let repo = ApiKeyRepository::new(&state.db);
    let stats = repo.stats().await?;
    let keys = repo.list().await?;

    let page = DashboardTemplate {
        username: &session.username,
        stats,
        keys: keys.into_iter().map(KeyRow::from).collect(),
    };
    Ok(Html(page.render()?))
}

/// `POST /admin/keys/create`
async fn create_key(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Form(form): Form<CreateKeyForm>,
) -> AppResult<Redirect> {
    let form = CreateKeyForm {
        name: form.name.trim().to_string(),
    };
    form.validate()?;

    for attempt in 1..=ISSUE_ATTEMPTS {
        match state.keys.issue(&form.name).await {
            Ok(key) => {
                info!(admin = %session.username, key_id = key.id, "Key created");
                return Ok(Redirect::to(DASHBOARD_PATH));
            }
            Err(KeyError::Conflict) => {
                warn!(attempt = attempt, "Generated token collided with an existing key");
            }
            Err(KeyError::Database(e)) => return Err(e.into()),
        }
    }

    Err(AppError::conflict("Could not generate a unique key, try again"))
}

/// `POST /admin/keys/{id}/toggle`
async fn toggle_key(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let active = ApiKeyRepository::new(&state.db)
        .toggle(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("API key {} not found", id)))?;

    info!(admin = %session.username, key_id = id, active = active, "Key toggled");
    Ok(Redirect::to(DASHBOARD_PATH))
}

/// `POST /admin/keys/{id}/delete`
async fn delete_key(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let repo = ApiKeyRepository::new(&state.db);
    if let Some(key) = repo.get_by_id(id).await? {
        if state.keys.delete(id).await? {
            state.rate_limiter.reset(&key.token).await;
            info!(admin = %session.username, key_id = id, "Key deleted");
        }
    }

    Ok(Redirect::to(DASHBOARD_PATH))
}

/// `GET /admin/keys/search?q=`
async fn search_keys(
    State(state): State<AppState>,
    AdminSession(_): AdminSession,
    Query(query): Query<KeySearchQuery>,
) -> AppResult<Json<Vec<ApiKey>>> {
    let keys = ApiKeyRepository::new(&state.db)
        .search(query.q.trim())
        .await?;
    Ok(Json(keys))
}

/// `GET /admin/logout`
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.invalidate(cookie.value()).await;
    }
    (jar.remove(removal_cookie()), Redirect::to(LOGIN_PATH))
}
