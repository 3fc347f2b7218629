use crate::dates::{parse_day, today_local};
use crate::errors::AppError;
use crate::models::{
    Activity, ActivityForm, ActivityKind, ActivityLog, ActivityUpdate, Category, Goal, GoalUnit,
    LogForm, NewActivity, NewLog, RecentLog, RemoteRow, StatsQuery, StatsResponse, TimeRange,
};
use crate::progress::GoalProgress;
use crate::state::AppState;
use crate::stats::{RECENT_LOG_LIMIT, activity_progress, build_stats, recent_logs};
use crate::ui::render_index;
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use chrono::Local;
use tracing::warn;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let store = state.store.lock().await;
    Html(render_index(&Local::now(), store.activities(), store.logs()))
}

pub async fn list_activities(State(state): State<AppState>) -> Json<Vec<Activity>> {
    let store = state.store.lock().await;
    Json(store.activities().to_vec())
}

pub async fn create_activity(
    State(state): State<AppState>,
    Json(payload): Json<NewActivity>,
) -> Result<(StatusCode, Json<Activity>), AppError> {
    let mut store = state.store.lock().await;
    let activity = store.add_activity(payload, today_local())?;
    Ok((StatusCode::CREATED, Json(activity)))
}

pub async fn update_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ActivityUpdate>,
) -> Result<Json<Activity>, AppError> {
    let mut store = state.store.lock().await;
    Ok(Json(store.update_activity(&id, payload)?))
}

pub async fn delete_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    store.remove_activity(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `null` for side quests and campaigns without a goal.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<GoalProgress>>, AppError> {
    let store = state.store.lock().await;
    let activity = store
        .activity(&id)
        .ok_or_else(|| AppError::not_found(format!("activity {id} not found")))?;
    Ok(Json(activity_progress(&Local::now(), activity, store.logs())))
}

pub async fn list_logs(State(state): State<AppState>) -> Json<Vec<RecentLog>> {
    let store = state.store.lock().await;
    Json(recent_logs(
        store.activities(),
        store.logs(),
        &Local,
        RECENT_LOG_LIMIT,
    ))
}

pub async fn create_log(
    State(state): State<AppState>,
    Json(payload): Json<NewLog>,
) -> Result<(StatusCode, Json<ActivityLog>), AppError> {
    let mut store = state.store.lock().await;
    let log = store.add_log(payload, &Local::now())?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn delete_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    store.delete_log(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let range = match query.range.as_deref().map(str::trim) {
        None | Some("") => TimeRange::Week,
        Some(value) => TimeRange::parse(value)
            .ok_or_else(|| AppError::bad_request("range must be day, week, month or year"))?,
    };
    let store = state.store.lock().await;
    Ok(Json(build_stats(store.activities(), store.logs(), range)))
}

pub async fn get_remote(State(state): State<AppState>) -> Result<Json<Vec<RemoteRow>>, AppError> {
    let remote = state
        .remote
        .as_ref()
        .ok_or_else(|| AppError::unavailable("remote table is not configured"))?;
    match remote.fetch_rows().await {
        Ok(rows) => Ok(Json(rows)),
        Err(err) => {
            warn!(table = remote.table(), "remote fetch failed: {err}");
            Err(AppError::bad_gateway(format!(
                "Failed to load {}: {err}",
                remote.table()
            )))
        }
    }
}

pub async fn log_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<LogForm>,
) -> Result<Redirect, AppError> {
    let hours = match form.hours.trim() {
        "" => None,
        value => Some(
            value
                .parse::<f64>()
                .map_err(|_| AppError::bad_request("hours must be a number"))?,
        ),
    };
    let date = match form.date.trim() {
        "" => None,
        value => {
            Some(parse_day(value).ok_or_else(|| AppError::bad_request("date must be YYYY-MM-DD"))?)
        }
    };

    let mut store = state.store.lock().await;
    store.add_log(
        NewLog {
            activity_id: id,
            hours,
            title: Some(form.title),
            notes: None,
            submitted_at: None,
            date,
        },
        &Local::now(),
    )?;
    Ok(Redirect::to("/"))
}

pub async fn delete_log_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let mut store = state.store.lock().await;
    store.delete_log(&id)?;
    Ok(Redirect::to("/"))
}

pub async fn create_activity_form(
    State(state): State<AppState>,
    Form(form): Form<ActivityForm>,
) -> Result<Redirect, AppError> {
    let new = activity_from_form(form)?;
    let mut store = state.store.lock().await;
    store.add_activity(new, today_local())?;
    Ok(Redirect::to("/"))
}

pub async fn delete_activity_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let mut store = state.store.lock().await;
    store.remove_activity(&id)?;
    Ok(Redirect::to("/"))
}

fn activity_from_form(form: ActivityForm) -> Result<NewActivity, AppError> {
    let kind = match form.kind.trim() {
        "" | "campaign" => ActivityKind::Campaign,
        "sideQuest" => ActivityKind::SideQuest,
        _ => return Err(AppError::bad_request("kind must be campaign or sideQuest")),
    };
    let goals = match form.goal_amount.trim() {
        "" => Vec::new(),
        _ if kind == ActivityKind::SideQuest => Vec::new(),
        value => {
            let amount = value
                .parse::<f64>()
                .map_err(|_| AppError::bad_request("goal amount must be a number"))?;
            let unit = GoalUnit::parse(form.goal_unit.trim())
                .ok_or_else(|| AppError::bad_request("goal unit must be hours or sessions"))?;
            let time_range = TimeRange::parse(form.goal_range.trim()).ok_or_else(|| {
                AppError::bad_request("goal range must be day, week, month or year")
            })?;
            vec![Goal {
                amount,
                unit,
                time_range,
            }]
        }
    };
    let category = match form.category.trim() {
        "" => None,
        value => Some(
            Category::parse(value).ok_or_else(|| AppError::bad_request("unknown category"))?,
        ),
    };

    Ok(NewActivity {
        name: form.name,
        color: Some(form.color),
        goals,
        start_date: Some(form.start_date),
        end_date: Some(form.end_date),
        kind: Some(kind),
        notes: Some(form.notes),
        category,
    })
}
