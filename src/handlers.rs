use crate::errors::AppError;
use crate::models::{
    AdminLoginRequest, AdminLoginResponse, AttemptResponse, AttemptsNumberRequest,
    DiscountRangesRequest, ExportQuery, GameSettings, HistoryResponse, LoginRequest,
    RegisterRequest, SessionResponse, StatsResponse, User, UserSearchQuery,
};
use crate::state::AppState;
use crate::timing::Reading;
use crate::ui::{render_admin, render_index};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use uuid::Uuid;

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let settings = state.game.settings().await?;
    Ok(Html(render_index(&settings)))
}

pub async fn admin_page() -> Html<String> {
    Html(render_admin())
}

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<GameSettings>, AppError> {
    Ok(Json(state.game.settings().await?))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(state.game.register(&payload.name, &payload.phone).await?))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(state.game.login(&payload.phone).await?))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, AppError> {
    let token = bearer_token(&headers)?;
    state.game.logout(token).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let token = bearer_token(&headers)?;
    Ok(Json(state.game.session(token).await?))
}

pub async fn get_timer(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Reading>, AppError> {
    let token = bearer_token(&headers)?;
    Ok(Json(state.game.reading(token).await?))
}

pub async fn start_timer(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let token = bearer_token(&headers)?;
    Ok(Json(state.game.start_timer(token).await?))
}

pub async fn stop_timer(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let token = bearer_token(&headers)?;
    Ok(Json(state.game.stop_timer(token).await?))
}

pub async fn reset_timer(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let token = bearer_token(&headers)?;
    Ok(Json(state.game.reset_timer(token).await?))
}

pub async fn attempt(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AttemptResponse>, AppError> {
    let token = bearer_token(&headers)?;
    Ok(Json(state.game.press(token).await?))
}

pub async fn get_attempts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse>, AppError> {
    let token = bearer_token(&headers)?;
    Ok(Json(state.game.history(token).await?))
}

pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, AppError> {
    let token = state.admin.login(&payload.password).await?;
    Ok(Json(AdminLoginResponse { token }))
}

pub async fn admin_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    authorize_admin(&state, &headers).await?;
    Ok(Json(state.admin.list_users(query.search.as_deref()).await?))
}

pub async fn admin_reset_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    authorize_admin(&state, &headers).await?;
    Ok(Json(state.admin.reset_user_attempts(user_id).await?))
}

pub async fn admin_attempts_number(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AttemptsNumberRequest>,
) -> Result<Json<GameSettings>, AppError> {
    authorize_admin(&state, &headers).await?;
    Ok(Json(state.admin.change_attempts_number(payload.attempts_number).await?))
}

pub async fn admin_discount_ranges(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DiscountRangesRequest>,
) -> Result<Json<GameSettings>, AppError> {
    authorize_admin(&state, &headers).await?;
    let settings = state
        .admin
        .change_discount_ranges(payload.discount_ranges, payload.fallback_discount)
        .await?;
    Ok(Json(settings))
}

pub async fn admin_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    authorize_admin(&state, &headers).await?;
    let csv = state.admin.export_users_csv(query.from, query.to).await?;
    let disposition = format!("attachment; filename=\"users_{}_{}.csv\"", query.from, query.to);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

pub async fn admin_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    authorize_admin(&state, &headers).await?;
    Ok(Json(state.admin.stats().await?))
}

async fn authorize_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let token = bearer_token(headers)?;
    state.admin.authorize(token).await?;
    Ok(())
}

fn bearer_token(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;
    Uuid::parse_str(token.trim()).map_err(|_| AppError::unauthorized("malformed bearer token"))
}
