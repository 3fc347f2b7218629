use crate::dates::Period;
use crate::progress::GoalProgress;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_ACTIVITY_COLOR: &str = "#3b82f6";
pub const FALLBACK_ACTIVITY_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    #[default]
    Campaign,
    SideQuest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Warrior,
    Scholar,
    Adventurer,
    Craftsman,
}

impl Category {
    /// Accepts current names and the retired `alchemist`/`artisan` archetypes.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "warrior" => Some(Self::Warrior),
            "scholar" => Some(Self::Scholar),
            "adventurer" => Some(Self::Adventurer),
            "craftsman" | "alchemist" | "artisan" => Some(Self::Craftsman),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warrior => "warrior",
            Self::Scholar => "scholar",
            Self::Adventurer => "adventurer",
            Self::Craftsman => "craftsman",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalUnit {
    Hours,
    #[serde(alias = "occurrences")]
    Sessions,
}

impl GoalUnit {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "hours" => Some(Self::Hours),
            "sessions" | "occurrences" => Some(Self::Sessions),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
}

impl TimeRange {
    pub const ALL: [TimeRange; 4] = [Self::Day, Self::Week, Self::Month, Self::Year];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    pub fn tab_label(self) -> &'static str {
        match self {
            Self::Day => "Daily",
            Self::Week => "Weekly",
            Self::Month => "Monthly",
            Self::Year => "Yearly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub amount: f64,
    pub unit: GoalUnit,
    pub time_range: TimeRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub goals: Vec<Goal>,
    pub start_date: String,
    pub end_date: Option<String>,
    #[serde(default)]
    pub kind: ActivityKind,
    pub notes: Option<String>,
    #[serde(default)]
    pub category: Category,
}

impl Activity {
    /// The goal that drives progress; later entries are never consulted.
    pub fn goal(&self) -> Option<&Goal> {
        self.goals.first()
    }

    pub fn is_side_quest(&self) -> bool {
        self.kind == ActivityKind::SideQuest
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    /// Weak reference; the activity may no longer exist.
    pub activity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub kind: Option<ActivityKind>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
}

/// Partial edit. `Some(None)` clears a nullable field, `None` leaves it alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub goals: Option<Vec<Goal>>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub end_date: Option<Option<String>>,
    #[serde(default)]
    pub kind: Option<ActivityKind>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<Category>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLog {
    pub activity_id: String,
    #[serde(default)]
    pub hours: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    /// Day the progress was accomplished; stored as local noon of that day.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct LogForm {
    #[serde(default)]
    pub hours: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
}

/// Fields of the page's new-quest form; blank strings mean "not given".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActivityForm {
    pub name: String,
    pub kind: String,
    pub goal_amount: String,
    pub goal_unit: String,
    pub goal_range: String,
    pub category: String,
    pub color: String,
    pub start_date: String,
    pub end_date: String,
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub range: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityProgress {
    pub activity: Activity,
    pub goal_label: String,
    pub progress: GoalProgress,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeStats {
    pub range: TimeRange,
    pub period: Period,
    pub current: Vec<ActivityProgress>,
    pub completed: Vec<ActivityProgress>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideQuestStats {
    pub open: Vec<Activity>,
    pub completed: Vec<Activity>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub campaigns: RangeStats,
    pub side_quests: SideQuestStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentLog {
    pub log: ActivityLog,
    pub activity_name: String,
    pub activity_color: String,
    pub day: NaiveDate,
    pub achieved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRow {
    pub id: i64,
    #[serde(default)]
    pub title: String,
}
