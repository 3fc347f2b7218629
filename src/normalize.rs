//! Coercion of stored records, possibly written by an older schema, into the
//! current typed model. Every function here is total.

use crate::dates::{day_string, local_noon, parse_day};
use crate::models::{
    Activity, ActivityKind, ActivityLog, Category, FALLBACK_ACTIVITY_COLOR, Goal, GoalUnit,
    TimeRange,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use tracing::warn;

pub fn normalize_activity(raw: &Value, today: NaiveDate) -> Activity {
    let kind = match raw.get("kind").and_then(Value::as_str) {
        Some("sideQuest") => ActivityKind::SideQuest,
        _ => ActivityKind::Campaign,
    };

    let goals = raw
        .get("goals")
        .and_then(Value::as_array)
        .and_then(|entries| entries.iter().find_map(normalize_goal))
        .into_iter()
        .collect();

    let start_date = raw
        .get("startDate")
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| day_string(today));

    let category = raw
        .get("category")
        .or_else(|| raw.get("archetype"))
        .and_then(Value::as_str)
        .and_then(Category::parse)
        .unwrap_or_default();

    Activity {
        id: id_field(raw, "id"),
        name: string_field(raw, "name").unwrap_or_default(),
        color: string_field(raw, "color").unwrap_or_else(|| FALLBACK_ACTIVITY_COLOR.to_string()),
        goals,
        start_date,
        end_date: string_field(raw, "endDate"),
        kind,
        notes: string_field(raw, "notes"),
        category,
    }
}

/// Entries with a non-numeric amount or an unknown unit or range are dropped.
pub fn normalize_goal(raw: &Value) -> Option<Goal> {
    let amount = raw.get("amount").and_then(Value::as_f64)?;
    if !amount.is_finite() {
        return None;
    }
    let unit = raw.get("unit").and_then(Value::as_str).and_then(GoalUnit::parse)?;
    let time_range = raw
        .get("timeRange")
        .and_then(Value::as_str)
        .and_then(TimeRange::parse)?;

    Some(Goal {
        amount: amount.max(1.0),
        unit,
        time_range,
    })
}

/// Timestamp precedence: `submittedAt`, then the legacy `date` at local noon,
/// then local noon of `now`'s day.
pub fn normalize_log<Tz: TimeZone>(raw: &Value, now: &DateTime<Tz>) -> ActivityLog {
    let tz = now.timezone();
    let hours = match raw.get("hours") {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|hours| hours.is_finite());

    let id = id_field(raw, "id");
    let submitted_at = raw
        .get("submittedAt")
        .and_then(Value::as_str)
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|instant| instant.with_timezone(&Utc))
        .or_else(|| {
            raw.get("date")
                .and_then(Value::as_str)
                .and_then(parse_day)
                .map(|day| local_noon(day, &tz))
        })
        .unwrap_or_else(|| {
            warn!(log_id = %id, "log has no usable timestamp, using today");
            local_noon(now.date_naive(), &tz)
        });

    ActivityLog {
        activity_id: id_field(raw, "activityId"),
        id,
        hours,
        title: non_empty_field(raw, "title"),
        notes: non_empty_field(raw, "notes"),
        submitted_at,
    }
}

/// `None` when the payload is not a JSON array, so callers can pick their
/// own default collection.
pub fn normalize_activities(payload: &str, today: NaiveDate) -> Option<Vec<Activity>> {
    let entries = parse_array(payload)?;
    Some(
        entries
            .iter()
            .map(|raw| normalize_activity(raw, today))
            .collect(),
    )
}

pub fn normalize_logs<Tz: TimeZone>(
    payload: &str,
    now: &DateTime<Tz>,
) -> Option<Vec<ActivityLog>> {
    let entries = parse_array(payload)?;
    Some(entries.iter().map(|raw| normalize_log(raw, now)).collect())
}

fn parse_array(payload: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(entries)) => Some(entries),
        Ok(_) => {
            warn!("stored payload is not an array");
            None
        }
        Err(err) => {
            warn!("failed to parse stored payload: {err}");
            None
        }
    }
}

fn id_field(raw: &Value, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

fn non_empty_field(raw: &Value, key: &str) -> Option<String> {
    string_field(raw, key).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn missing_goals_yield_empty_list() {
        let activity = normalize_activity(&json!({ "id": "1", "name": "Exercise" }), today());
        assert!(activity.goals.is_empty());
        assert_eq!(activity.kind, ActivityKind::Campaign);
        assert_eq!(activity.color, FALLBACK_ACTIVITY_COLOR);
        assert_eq!(activity.start_date, "2026-10-19");
        assert_eq!(activity.end_date, None);
        assert_eq!(activity.category, Category::Warrior);
    }

    #[test]
    fn keeps_only_the_first_valid_goal() {
        let raw = json!({
            "id": "q",
            "goals": [
                { "amount": "3", "unit": "hours", "timeRange": "week" },
                { "amount": 2, "unit": "minutes", "timeRange": "week" },
                { "amount": 3, "unit": "occurrences", "timeRange": "month" },
                { "amount": 9, "unit": "hours", "timeRange": "day" }
            ]
        });
        let activity = normalize_activity(&raw, today());
        assert_eq!(
            activity.goals,
            vec![Goal {
                amount: 3.0,
                unit: GoalUnit::Sessions,
                time_range: TimeRange::Month,
            }]
        );
    }

    #[test]
    fn goal_amount_is_raised_to_one() {
        let goal = normalize_goal(&json!({ "amount": 0, "unit": "hours", "timeRange": "day" }));
        assert_eq!(goal.map(|goal| goal.amount), Some(1.0));
        assert!(normalize_goal(&json!({ "unit": "hours", "timeRange": "day" })).is_none());
        assert!(normalize_goal(&json!({ "amount": 1, "unit": "hours", "timeRange": "decade" })).is_none());
    }

    #[test]
    fn legacy_categories_are_mapped() {
        let alchemist = normalize_activity(&json!({ "category": "alchemist" }), today());
        assert_eq!(alchemist.category, Category::Craftsman);
        let archetype = normalize_activity(&json!({ "archetype": "scholar" }), today());
        assert_eq!(archetype.category, Category::Scholar);
        let unknown = normalize_activity(&json!({ "category": "bard" }), today());
        assert_eq!(unknown.category, Category::Warrior);
    }

    #[test]
    fn wrong_types_fall_back_to_defaults() {
        let raw = json!({
            "id": 42,
            "name": ["x"],
            "color": 7,
            "kind": "chore",
            "startDate": "",
            "endDate": 5,
            "notes": "keep going",
            "goals": "lots"
        });
        let activity = normalize_activity(&raw, today());
        assert_eq!(activity.id, "42");
        assert_eq!(activity.name, "");
        assert_eq!(activity.color, FALLBACK_ACTIVITY_COLOR);
        assert_eq!(activity.kind, ActivityKind::Campaign);
        assert_eq!(activity.start_date, "2026-10-19");
        assert_eq!(activity.end_date, None);
        assert_eq!(activity.notes.as_deref(), Some("keep going"));
        assert!(activity.goals.is_empty());
    }

    #[test]
    fn legacy_log_date_becomes_local_noon() {
        let tz = FixedOffset::west_opt(4 * 3600).unwrap();
        let raw = json!({ "id": "l1", "activityId": 3, "hours": "1.5", "date": "2026-10-18", "title": "" });
        let now = tz.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        let log = normalize_log(&raw, &now);
        assert_eq!(log.activity_id, "3");
        assert_eq!(log.hours, Some(1.5));
        assert_eq!(log.title, None);
        assert_eq!(
            log.submitted_at,
            Utc.with_ymd_and_hms(2026, 10, 18, 16, 0, 0).unwrap()
        );
    }

    #[test]
    fn submitted_at_wins_over_legacy_date() {
        let raw = json!({
            "id": "l2",
            "activityId": "a",
            "date": "2020-01-01",
            "submittedAt": "2026-10-19T08:30:00.000Z",
            "notes": "felt good"
        });
        let log = normalize_log(&raw, &Utc::now());
        assert_eq!(
            log.submitted_at,
            Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
        );
        assert_eq!(log.notes.as_deref(), Some("felt good"));
        assert_eq!(log.hours, None);
    }

    #[test]
    fn log_without_timestamp_lands_on_local_noon_today() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 10, 20, 1, 30, 0).unwrap();
        let log = normalize_log(&json!({ "id": "l3", "date": "someday" }), &now);
        assert_eq!(
            log.submitted_at,
            Utc.with_ymd_and_hms(2026, 10, 20, 3, 0, 0).unwrap()
        );
        assert_eq!(log.activity_id, "");
    }

    #[test]
    fn non_array_payloads_are_rejected() {
        assert!(normalize_activities("{\"id\":1}", today()).is_none());
        assert!(normalize_activities("not json", today()).is_none());
        assert!(normalize_logs("null", &Utc::now()).is_none());
        let parsed = normalize_activities("[{\"id\":\"a\"},{}]", today()).unwrap();
        assert_eq!(parsed.len(), 2);
    }
}
