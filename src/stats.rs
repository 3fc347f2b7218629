use crate::dates::{local_day, period_bounds};
use crate::models::{
    Activity, ActivityKind, ActivityLog, ActivityProgress, Goal, GoalUnit, RangeStats, RecentLog,
    SideQuestStats, StatsResponse, TimeRange,
};
use crate::progress::{GoalProgress, goal_progress, is_achieving_log, side_quest_completed};
use chrono::{DateTime, Local, TimeZone};
use std::cmp::Ordering;

pub const RECENT_LOG_LIMIT: usize = 50;

pub fn build_stats(activities: &[Activity], logs: &[ActivityLog], range: TimeRange) -> StatsResponse {
    build_stats_at(&Local::now(), activities, logs, range)
}

pub fn build_stats_at<Tz: TimeZone>(
    now: &DateTime<Tz>,
    activities: &[Activity],
    logs: &[ActivityLog],
    range: TimeRange,
) -> StatsResponse {
    StatsResponse {
        campaigns: range_stats(now, activities, logs, range),
        side_quests: side_quest_stats(activities, logs),
    }
}

/// Campaigns whose goal is measured over `range`, split by whether the
/// current period's target is met.
pub fn range_stats<Tz: TimeZone>(
    now: &DateTime<Tz>,
    activities: &[Activity],
    logs: &[ActivityLog],
    range: TimeRange,
) -> RangeStats {
    let mut current = Vec::new();
    let mut completed = Vec::new();

    for activity in sorted_campaigns(activities) {
        let Some(goal) = activity.goal().filter(|goal| goal.time_range == range) else {
            continue;
        };
        let entry = ActivityProgress {
            activity: activity.clone(),
            goal_label: goal_label(goal),
            progress: goal_progress(&activity.id, goal, logs, now),
        };
        if entry.progress.completed {
            completed.push(entry);
        } else {
            current.push(entry);
        }
    }

    RangeStats {
        range,
        period: period_bounds(range, now.date_naive()),
        current,
        completed,
    }
}

pub fn side_quest_stats(activities: &[Activity], logs: &[ActivityLog]) -> SideQuestStats {
    let (completed, open): (Vec<&Activity>, Vec<&Activity>) = sorted_side_quests(activities)
        .into_iter()
        .partition(|quest| side_quest_completed(&quest.id, logs));

    SideQuestStats {
        open: open.into_iter().cloned().collect(),
        completed: completed.into_iter().cloned().collect(),
    }
}

pub fn activity_progress<Tz: TimeZone>(
    now: &DateTime<Tz>,
    activity: &Activity,
    logs: &[ActivityLog],
) -> Option<GoalProgress> {
    if activity.is_side_quest() {
        return None;
    }
    activity
        .goal()
        .map(|goal| goal_progress(&activity.id, goal, logs, now))
}

/// Newest logs first, ties by id descending. Logs whose activity no longer
/// exists are left out.
pub fn recent_logs<Tz: TimeZone>(
    activities: &[Activity],
    logs: &[ActivityLog],
    tz: &Tz,
    limit: usize,
) -> Vec<RecentLog> {
    let mut ordered: Vec<&ActivityLog> = logs.iter().collect();
    ordered.sort_by(|a, b| {
        b.submitted_at
            .cmp(&a.submitted_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    ordered
        .into_iter()
        .filter_map(|log| {
            let activity = activities.iter().find(|a| a.id == log.activity_id)?;
            let achieved = match (activity.kind, activity.goal()) {
                (ActivityKind::Campaign, Some(goal)) => is_achieving_log(goal, log, logs, tz),
                _ => false,
            };
            Some(RecentLog {
                log: log.clone(),
                activity_name: activity.name.clone(),
                activity_color: activity.color.clone(),
                day: local_day(&log.submitted_at, tz),
                achieved,
            })
        })
        .take(limit)
        .collect()
}

/// Campaigns ordered by goal range (day first, goal-less last), then name.
pub fn sorted_campaigns(activities: &[Activity]) -> Vec<&Activity> {
    let mut campaigns: Vec<&Activity> = activities
        .iter()
        .filter(|activity| activity.kind == ActivityKind::Campaign)
        .collect();
    campaigns.sort_by(|a, b| {
        let rank = |activity: &Activity| activity.goal().map(|goal| goal.time_range);
        match (rank(*a), rank(*b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| compare_names(a, b))
    });
    campaigns
}

pub fn sorted_side_quests(activities: &[Activity]) -> Vec<&Activity> {
    let mut quests: Vec<&Activity> = activities
        .iter()
        .filter(|activity| activity.is_side_quest())
        .collect();
    quests.sort_by(|a, b| compare_names(a, b));
    quests
}

pub fn goal_label(goal: &Goal) -> String {
    let singular = goal.amount == 1.0;
    let unit = match (goal.unit, singular) {
        (GoalUnit::Hours, true) => "hour",
        (GoalUnit::Hours, false) => "hours",
        (GoalUnit::Sessions, true) => "session",
        (GoalUnit::Sessions, false) => "sessions",
    };
    format!("{} {unit} / {}", goal.amount, goal.time_range.as_str())
}

pub fn unit_short(unit: GoalUnit) -> &'static str {
    match unit {
        GoalUnit::Hours => "hrs",
        GoalUnit::Sessions => "sessions",
    }
}

fn compare_names(a: &Activity, b: &Activity) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}
