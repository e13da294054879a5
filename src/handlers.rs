use crate::errors::{AppError, TrackerError};
use crate::models::{
    ApiSettingsForm, ContentForm, ContentItem, EngagementForm, EngagementRecord, LoginForm,
    ProfileForm, RegisterForm, SessionResponse, StatsResponse, User,
};
use crate::state::AppState;
use crate::tracker::AuthTab;
use crate::ui::render_index;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Redirect},
    Form, Json,
};
use tracing::debug;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let mut tracker = state.tracker.lock().await;
    let notification = tracker.take_notification();
    Html(render_index(&tracker, notification.as_ref()))
}

// Form posts keep their outcome in the view state and always land back on `/`.

fn log_rejected<T>(action: &str, result: Result<T, TrackerError>) {
    if let Err(err) = result {
        debug!("{action} rejected: {err}");
    }
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Redirect {
    let result = state.tracker.lock().await.login(&form.email, &form.password).await;
    log_rejected("login", result);
    Redirect::to("/")
}

pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Redirect {
    let result = state.tracker.lock().await.register(form).await;
    log_rejected("registration", result);
    Redirect::to("/")
}

pub async fn logout(State(state): State<AppState>) -> Redirect {
    state.tracker.lock().await.logout().await;
    Redirect::to("/")
}

pub async fn select_tab(
    State(state): State<AppState>,
    Path(tab): Path<String>,
) -> Result<Redirect, AppError> {
    let tab = match tab.as_str() {
        "login" => AuthTab::Login,
        "register" => AuthTab::Register,
        other => return Err(AppError::bad_request(format!("unknown tab '{other}'"))),
    };
    state.tracker.lock().await.select_auth_tab(tab);
    Ok(Redirect::to("/"))
}

pub async fn add_content(State(state): State<AppState>, Form(form): Form<ContentForm>) -> Redirect {
    let result = state.tracker.lock().await.add_content(form).await;
    log_rejected("add content", result);
    Redirect::to("/")
}

pub async fn delete_content(State(state): State<AppState>, Path(id): Path<String>) -> Redirect {
    let result = state.tracker.lock().await.delete_content(&id).await;
    log_rejected("delete content", result);
    Redirect::to("/")
}

pub async fn record_engagement(
    State(state): State<AppState>,
    Form(form): Form<EngagementForm>,
) -> Redirect {
    let result = state.tracker.lock().await.record_engagement(form).await;
    log_rejected("record engagement", result);
    Redirect::to("/")
}

pub async fn refresh_metrics(State(state): State<AppState>) -> Redirect {
    let result = state.tracker.lock().await.refresh_metrics().await;
    log_rejected("refresh metrics", result);
    Redirect::to("/")
}

pub async fn reload_data(State(state): State<AppState>) -> Redirect {
    let result = state.tracker.lock().await.reload().await;
    log_rejected("reload", result);
    Redirect::to("/")
}

pub async fn save_api_settings(
    State(state): State<AppState>,
    Form(form): Form<ApiSettingsForm>,
) -> Redirect {
    let result = state
        .tracker
        .lock()
        .await
        .save_api_config(form.into_config())
        .await;
    log_rejected("save api settings", result);
    Redirect::to("/")
}

pub async fn update_profile(State(state): State<AppState>, Form(form): Form<ProfileForm>) -> Redirect {
    let result = state.tracker.lock().await.update_profile(&form.name).await;
    log_rejected("update profile", result);
    Redirect::to("/#profile-modal")
}

pub async fn toggle_dark_mode(State(state): State<AppState>) -> Redirect {
    state.tracker.lock().await.toggle_dark_mode();
    Redirect::to("/")
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let tracker = state.tracker.lock().await;
    let user = tracker.user().cloned();
    Json(SessionResponse {
        signed_in: user.is_some(),
        user,
        dark_mode: tracker.view().dark_mode,
    })
}

pub async fn api_login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> Result<Json<User>, AppError> {
    let mut tracker = state.tracker.lock().await;
    let user = tracker.login(&form.email, &form.password).await?;
    Ok(Json(user))
}

pub async fn api_logout(State(state): State<AppState>) -> StatusCode {
    state.tracker.lock().await.logout().await;
    StatusCode::NO_CONTENT
}

pub async fn get_content(State(state): State<AppState>) -> Result<Json<Vec<ContentItem>>, AppError> {
    let tracker = state.tracker.lock().await;
    tracker.require_user()?;
    Ok(Json(tracker.content().to_vec()))
}

pub async fn api_add_content(
    State(state): State<AppState>,
    Json(form): Json<ContentForm>,
) -> Result<(StatusCode, Json<ContentItem>), AppError> {
    let mut tracker = state.tracker.lock().await;
    let item = tracker.add_content(form).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn api_delete_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.tracker.lock().await.delete_content(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_engagement(
    State(state): State<AppState>,
) -> Result<Json<Vec<EngagementRecord>>, AppError> {
    let tracker = state.tracker.lock().await;
    tracker.require_user()?;
    Ok(Json(tracker.engagement().to_vec()))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let tracker = state.tracker.lock().await;
    tracker.require_user()?;
    Ok(Json(tracker.stats().clone()))
}
