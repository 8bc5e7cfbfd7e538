use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, MeResponse, Profile, PublicUser, RegisterRequest,
            RegisterResponse, SessionResponse,
        },
        extractors::AuthUser,
        password::{hash_password, MIN_PASSWORD_LEN},
        services::{authorize, is_valid_email, JwtKeys, LoginOutcome},
    },
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/session", get(session))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn required(field: Option<String>) -> Option<String> {
    field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    state.db.ensure_configured()?;

    let (Some(email), Some(username), Some(password)) = (
        required(payload.email),
        required(payload.username),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation("email, username and password are required".into()));
    };

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("invalid email".into()));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if state.db.get_user_by_email(&email).await.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("email already registered".into()));
    }

    if state.db.get_user_by_username(&username).await.is_some() {
        warn!(username = %username, "username already taken");
        return Err(AppError::Conflict("username already taken".into()));
    }

    let hash = hash_password(&password)?;
    // The unique constraints still catch a concurrent registration that slipped past the checks.
    let user = state.db.create_user(&email, &username, &hash).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            user: PublicUser {
                id: user.id,
                email: user.email,
                username: user.username,
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    match authorize(&state.db, payload.email.as_deref(), payload.password.as_deref()).await {
        LoginOutcome::Authenticated(user) => {
            let token = JwtKeys::from_ref(&state).sign(&user)?;
            Ok(Json(LoginResponse { token, user }))
        }
        LoginOutcome::Rejected(reason) => {
            warn!(?reason, "login rejected");
            Err(AppError::Auth("invalid credentials".into()))
        }
    }
}

#[instrument(skip_all)]
pub async fn session(AuthUser(user): AuthUser) -> Json<SessionResponse> {
    Json(SessionResponse { user })
}

/// Sessions are stateless tokens; signing out means the client drops its token.
pub async fn logout() -> Json<Value> {
    Json(json!({ "success": true }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<MeResponse>> {
    let record = state
        .db
        .get_user_by_id(user.id)
        .await
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;
    let favorite_count = state.db.get_favorite_count(user.id).await;

    Ok(Json(MeResponse {
        user: Profile {
            id: record.id,
            email: record.email,
            username: record.username,
            created_at: record.created_at,
        },
        favorite_count,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::{
        app::testing::{bearer_for, send, send_raw},
        auth::password::verify_password,
        db::Database,
        state::AppState,
    };

    fn register_body(email: &str, username: &str, password: &str) -> serde_json::Value {
        json!({ "email": email, "username": username, "password": password })
    }

    #[tokio::test]
    async fn register_stores_a_verifiable_hash() {
        let state = AppState::fake();
        let (status, body) = send(
            &state,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("ana@example.com", "ana", "secreto1")),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "ana@example.com");
        assert_eq!(body["user"]["username"], "ana");
        assert!(body["user"].get("password_hash").is_none());

        let user = state.db.get_user_by_email("ana@example.com").await.unwrap();
        assert_ne!(user.password_hash, "secreto1");
        assert!(verify_password("secreto1", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_or_username_is_a_400_conflict() {
        let state = AppState::fake();
        let first = register_body("ana@example.com", "ana", "secreto1");
        let (status, _) = send(&state, Method::POST, "/api/auth/register", None, Some(first)).await;
        assert_eq!(status, StatusCode::CREATED);

        let same_email = register_body("ana@example.com", "otra", "secreto1");
        let (status, body) =
            send(&state, Method::POST, "/api/auth/register", None, Some(same_email)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "email already registered");

        let same_username = register_body("otra@example.com", "ana", "secreto1");
        let (status, body) =
            send(&state, Method::POST, "/api/auth/register", None, Some(same_username)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "username already taken");
    }

    #[tokio::test]
    async fn register_rejects_missing_and_weak_fields() {
        let state = AppState::fake();
        for body in [
            json!({ "email": "ana@example.com", "password": "secreto1" }),
            json!({ "email": "ana@example.com", "username": "  ", "password": "secreto1" }),
            register_body("ana@example.com", "ana", "12345"),
            register_body("not-an-email", "ana", "secreto1"),
        ] {
            let (status, _) =
                send(&state, Method::POST, "/api/auth/register", None, Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn register_without_database_is_a_500() {
        let mut state = AppState::fake();
        state.db = Database::unconfigured();
        let (status, _) = send(
            &state,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("ana@example.com", "ana", "secreto1")),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn login_then_read_session_and_profile() {
        let state = AppState::fake();
        send(
            &state,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("ana@example.com", "ana", "secreto1")),
        )
        .await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "secreto1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();
        assert_eq!(body["user"]["name"], "ana");

        let (status, body) = send(&state, Method::GET, "/api/auth/session", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "ana@example.com");

        let (status, body) = send(&state, Method::GET, "/api/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "ana");
        assert_eq!(body["favoriteCount"], 0);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_401() {
        let state = AppState::fake();
        send(
            &state,
            Method::POST,
            "/api/auth/register",
            None,
            Some(register_body("ana@example.com", "ana", "secreto1")),
        )
        .await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "nope-nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid credentials");
    }

    #[tokio::test]
    async fn session_requires_a_valid_token() {
        let state = AppState::fake();
        let (status, _) = send(&state, Method::GET, "/api/auth/session", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(&state, Method::GET, "/api/auth/session", Some("forged"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_for_a_deleted_user_is_404() {
        let state = AppState::fake();
        let token = bearer_for(&state, uuid::Uuid::new_v4(), "ghost@example.com", "ghost");
        let (status, _) = send(&state, Method::GET, "/api/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreadable_bodies_are_json_400s() {
        let state = AppState::fake();
        let cases = [
            ("/api/auth/register", None, r#"{"email":"a@b.co","username":"a","password":"secreto1"}"#),
            ("/api/auth/register", Some("application/json"), ""),
            ("/api/auth/register", Some("application/json"), "{not json"),
            ("/api/auth/login", Some("text/plain"), r#"{"email":"a@b.co","password":"x"}"#),
            ("/api/auth/login", Some("application/json"), r#"{"email":["a@b.co"]}"#),
        ];
        for (uri, content_type, body) in cases {
            let (status, json) = send_raw(&state, Method::POST, uri, content_type, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {content_type:?} {body}");
            assert!(json["error"].is_string(), "{uri} {content_type:?} {body}");
        }
    }

    #[tokio::test]
    async fn logout_acknowledges() {
        let state = AppState::fake();
        let (status, body) = send(&state, Method::POST, "/api/auth/logout", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }
}
