use crate::dates::{day_string, local_noon, parse_day};
use crate::errors::StoreError;
use crate::models::{
    Activity, ActivityKind, ActivityLog, ActivityUpdate, Category, DEFAULT_ACTIVITY_COLOR, Goal,
    GoalUnit, NewActivity, NewLog,
};
use crate::normalize::{normalize_activities, normalize_logs};
use crate::storage::{ACTIVITIES_KEY, LOGS_KEY, Persistence};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Canonical lists of activities and logs. Every mutation builds the next
/// list, writes it through the persistence adapter and only then replaces the
/// in-memory copy.
pub struct QuestStore {
    activities: Vec<Activity>,
    logs: Vec<ActivityLog>,
    storage: Box<dyn Persistence>,
}

impl std::fmt::Debug for QuestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestStore")
            .field("activities", &self.activities.len())
            .field("logs", &self.logs.len())
            .finish()
    }
}

impl QuestStore {
    pub fn load<P, Tz>(storage: P, now: &DateTime<Tz>) -> Self
    where
        P: Persistence + 'static,
        Tz: TimeZone,
    {
        let today = now.date_naive();

        let activities = read_key(&storage, ACTIVITIES_KEY)
            .and_then(|payload| normalize_activities(&payload, today))
            .unwrap_or_else(|| default_activities(today));
        let logs = read_key(&storage, LOGS_KEY)
            .and_then(|payload| normalize_logs(&payload, now))
            .unwrap_or_default();

        info!(
            activities = activities.len(),
            logs = logs.len(),
            "loaded quest data"
        );

        Self {
            activities,
            logs,
            storage: Box::new(storage),
        }
    }

    pub fn load_local<P: Persistence + 'static>(storage: P) -> Self {
        Self::load(storage, &Local::now())
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn logs(&self) -> &[ActivityLog] {
        &self.logs
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|activity| activity.id == id)
    }

    pub fn logs_for(&self, activity_id: &str) -> Vec<&ActivityLog> {
        self.logs
            .iter()
            .filter(|log| log.activity_id == activity_id)
            .collect()
    }

    /// Logs paired with their activity; logs whose activity is gone are skipped.
    pub fn resolved_logs(&self) -> Vec<(&ActivityLog, &Activity)> {
        self.logs
            .iter()
            .filter_map(|log| self.activity(&log.activity_id).map(|activity| (log, activity)))
            .collect()
    }

    pub fn add_activity(
        &mut self,
        new: NewActivity,
        today: NaiveDate,
    ) -> Result<Activity, StoreError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(StoreError::validation("name must not be empty"));
        }
        let kind = new.kind.unwrap_or_default();
        let start_date = match new.start_date.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => checked_day(value, "startDate")?,
            _ => day_string(today),
        };
        let end_date = match new.end_date.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => Some(checked_day(value, "endDate")?),
            _ => None,
        };

        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            color: sanitize_color(
                new.color.as_deref().unwrap_or_default(),
                DEFAULT_ACTIVITY_COLOR,
            ),
            goals: checked_goals(new.goals, kind)?,
            start_date,
            end_date,
            kind,
            notes: trimmed(new.notes),
            category: new.category.unwrap_or(Category::Warrior),
        };

        let mut next = self.activities.clone();
        next.push(activity.clone());
        self.commit_activities(next)?;

        info!(id = %activity.id, name = %activity.name, "added activity");
        Ok(activity)
    }

    /// Shallow merge of the provided fields into an existing activity.
    pub fn update_activity(
        &mut self,
        id: &str,
        update: ActivityUpdate,
    ) -> Result<Activity, StoreError> {
        let index = self
            .activities
            .iter()
            .position(|activity| activity.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("activity {id}")))?;
        let mut activity = self.activities[index].clone();

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(StoreError::validation("name must not be empty"));
            }
            activity.name = name.to_string();
        }
        if let Some(color) = update.color {
            let input = color.trim();
            if !input.is_empty() && !is_hex_color(input) {
                warn!(id, color = %input, "ignoring invalid color");
            }
            activity.color = sanitize_color(input, &activity.color);
        }
        if let Some(kind) = update.kind {
            activity.kind = kind;
        }
        if let Some(goals) = update.goals {
            activity.goals = checked_goals(goals, activity.kind)?;
        } else if activity.is_side_quest() {
            activity.goals.clear();
        }
        if let Some(start_date) = update.start_date {
            activity.start_date = checked_day(start_date.trim(), "startDate")?;
        }
        if let Some(end_date) = update.end_date {
            activity.end_date = match end_date.as_deref().map(str::trim) {
                Some(value) if !value.is_empty() => Some(checked_day(value, "endDate")?),
                _ => None,
            };
        }
        if let Some(notes) = update.notes {
            activity.notes = trimmed(notes);
        }
        if let Some(category) = update.category {
            activity.category = category;
        }

        let mut next = self.activities.clone();
        next[index] = activity.clone();
        self.commit_activities(next)?;

        info!(id, "updated activity");
        Ok(activity)
    }

    /// Removes only the activity; its logs stay and are filtered out at read time.
    pub fn remove_activity(&mut self, id: &str) -> Result<Activity, StoreError> {
        let removed = self
            .activity(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("activity {id}")))?;
        let next = self
            .activities
            .iter()
            .filter(|activity| activity.id != id)
            .cloned()
            .collect();
        self.commit_activities(next)?;

        info!(id, "removed activity");
        Ok(removed)
    }

    pub fn add_log<Tz: TimeZone>(
        &mut self,
        new: NewLog,
        now: &DateTime<Tz>,
    ) -> Result<ActivityLog, StoreError> {
        let activity = self
            .activity(&new.activity_id)
            .ok_or_else(|| StoreError::NotFound(format!("activity {}", new.activity_id)))?;

        if let Some(hours) = new.hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(StoreError::validation("hours must be a non-negative number"));
            }
        } else if activity.goal().is_some_and(|goal| goal.unit == GoalUnit::Hours) {
            return Err(StoreError::validation("hours are required for this campaign"));
        }

        let submitted_at = match (new.submitted_at, new.date) {
            (Some(at), _) => at,
            (None, Some(day)) => local_noon(day, &now.timezone()),
            (None, None) => now.with_timezone(&Utc),
        };

        let log = ActivityLog {
            id: Uuid::new_v4().to_string(),
            activity_id: new.activity_id,
            hours: new.hours,
            title: trimmed(new.title),
            notes: trimmed(new.notes),
            submitted_at,
        };

        let mut next = self.logs.clone();
        next.push(log.clone());
        self.commit_logs(next)?;

        info!(id = %log.id, activity_id = %log.activity_id, "added log");
        Ok(log)
    }

    pub fn delete_log(&mut self, id: &str) -> Result<ActivityLog, StoreError> {
        let removed = self
            .logs
            .iter()
            .find(|log| log.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("log {id}")))?;
        let next = self.logs.iter().filter(|log| log.id != id).cloned().collect();
        self.commit_logs(next)?;

        info!(id, "deleted log");
        Ok(removed)
    }

    fn commit_activities(&mut self, next: Vec<Activity>) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&next)?;
        self.storage.save(ACTIVITIES_KEY, &payload).inspect_err(|err| {
            error!("failed to persist activities: {err}");
        })?;
        self.activities = next;
        Ok(())
    }

    fn commit_logs(&mut self, next: Vec<ActivityLog>) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&next)?;
        self.storage.save(LOGS_KEY, &payload).inspect_err(|err| {
            error!("failed to persist logs: {err}");
        })?;
        self.logs = next;
        Ok(())
    }
}

pub fn default_activities(today: NaiveDate) -> Vec<Activity> {
    [
        ("1", "Exercise", "#10b981"),
        ("2", "Reading", "#3b82f6"),
        ("3", "Work", "#8b5cf6"),
        ("4", "Study", "#f59e0b"),
    ]
    .into_iter()
    .map(|(id, name, color)| Activity {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
        goals: Vec::new(),
        start_date: day_string(today),
        end_date: None,
        kind: ActivityKind::Campaign,
        notes: None,
        category: Category::Warrior,
    })
    .collect()
}

pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Accepts `#RRGGBB`; blank or malformed input keeps `prior`.
pub fn sanitize_color(input: &str, prior: &str) -> String {
    let input = input.trim();
    if is_hex_color(input) {
        input.to_string()
    } else {
        prior.to_string()
    }
}

fn read_key(storage: &dyn Persistence, key: &str) -> Option<String> {
    match storage.load(key) {
        Ok(payload) => payload,
        Err(err) => {
            error!(key, "failed to read stored data: {err}");
            None
        }
    }
}

fn checked_goals(goals: Vec<Goal>, kind: ActivityKind) -> Result<Vec<Goal>, StoreError> {
    if kind == ActivityKind::SideQuest {
        return Ok(Vec::new());
    }
    let goal = goals.into_iter().next();
    if let Some(goal) = &goal {
        if !goal.amount.is_finite() || goal.amount < 1.0 {
            return Err(StoreError::validation("goal amount must be at least 1"));
        }
    }
    Ok(goal.into_iter().collect())
}

fn checked_day(value: &str, field: &str) -> Result<String, StoreError> {
    parse_day(value)
        .map(day_string)
        .ok_or_else(|| StoreError::validation(format!("{field} must be YYYY-MM-DD")))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
