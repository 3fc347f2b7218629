//! Goal-period progress: which logs fall into the current period, how much
//! they contribute, and which single log completed the period's target.

use crate::dates::{Period, local_day, period_bounds};
use crate::models::{ActivityLog, Goal, GoalUnit};
use chrono::{DateTime, TimeZone};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub period: Period,
    pub logged: f64,
    pub target: f64,
    pub percent: f64,
    pub completed: bool,
}

/// Logs of `activity_id` whose local submission day lies inside `period`.
pub fn logs_in_period<'a, Tz: TimeZone>(
    activity_id: &str,
    logs: &'a [ActivityLog],
    period: &Period,
    tz: &Tz,
) -> Vec<&'a ActivityLog> {
    logs.iter()
        .filter(|log| log.activity_id == activity_id)
        .filter(|log| period.contains(local_day(&log.submitted_at, tz)))
        .collect()
}

pub fn log_contribution(unit: GoalUnit, log: &ActivityLog) -> f64 {
    match unit {
        GoalUnit::Hours => log.hours.unwrap_or(0.0),
        GoalUnit::Sessions => 1.0,
    }
}

pub fn contribution(unit: GoalUnit, logs: &[&ActivityLog]) -> f64 {
    logs.iter().map(|log| log_contribution(unit, log)).sum()
}

pub fn percent_complete(logged: f64, target: f64) -> f64 {
    if target > 0.0 {
        (logged / target * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Progress toward `goal` in the period containing `now`, evaluated in
/// `now`'s time zone.
pub fn goal_progress<Tz: TimeZone>(
    activity_id: &str,
    goal: &Goal,
    logs: &[ActivityLog],
    now: &DateTime<Tz>,
) -> GoalProgress {
    let period = period_bounds(goal.time_range, now.date_naive());
    progress_in_period(activity_id, goal, logs, period, &now.timezone())
}

pub fn progress_in_period<Tz: TimeZone>(
    activity_id: &str,
    goal: &Goal,
    logs: &[ActivityLog],
    period: Period,
    tz: &Tz,
) -> GoalProgress {
    let in_period = logs_in_period(activity_id, logs, &period, tz);
    let logged = contribution(goal.unit, &in_period);
    GoalProgress {
        period,
        logged,
        target: goal.amount,
        percent: percent_complete(logged, goal.amount),
        completed: logged >= goal.amount,
    }
}

/// The log whose contribution first lifted the period total to the target.
///
/// Logs are replayed in submission order with ties broken by id, so a period
/// has at most one achieving log no matter how many logs individually cover
/// the remainder.
pub fn achieving_log<'a, Tz: TimeZone>(
    activity_id: &str,
    goal: &Goal,
    logs: &'a [ActivityLog],
    period: &Period,
    tz: &Tz,
) -> Option<&'a ActivityLog> {
    let mut in_period = logs_in_period(activity_id, logs, period, tz);
    in_period.sort_by(|a, b| {
        a.submitted_at
            .cmp(&b.submitted_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut total = 0.0;
    for log in in_period {
        let before = total;
        total += log_contribution(goal.unit, log);
        if before < goal.amount && total >= goal.amount {
            return Some(log);
        }
    }
    None
}

/// Whether `log` completed the goal for the period that contains its own day.
pub fn is_achieving_log<Tz: TimeZone>(
    goal: &Goal,
    log: &ActivityLog,
    logs: &[ActivityLog],
    tz: &Tz,
) -> bool {
    let period = period_bounds(goal.time_range, local_day(&log.submitted_at, tz));
    achieving_log(&log.activity_id, goal, logs, &period, tz)
        .is_some_and(|achiever| achiever.id == log.id)
}

/// Side quests have no target; one log completes them.
pub fn side_quest_completed(activity_id: &str, logs: &[ActivityLog]) -> bool {
    logs.iter().any(|log| log.activity_id == activity_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeRange;
    use chrono::{Duration, FixedOffset, NaiveDate, Utc};

    fn log(id: &str, activity: &str, hours: Option<f64>, at: DateTime<Utc>) -> ActivityLog {
        ActivityLog {
            id: id.to_string(),
            activity_id: activity.to_string(),
            hours,
            title: None,
            notes: None,
            submitted_at: at,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn sessions(amount: f64, time_range: TimeRange) -> Goal {
        Goal {
            amount,
            unit: GoalUnit::Sessions,
            time_range,
        }
    }

    fn hours(amount: f64, time_range: TimeRange) -> Goal {
        Goal {
            amount,
            unit: GoalUnit::Hours,
            time_range,
        }
    }

    #[test]
    fn three_sessions_in_the_current_week_complete_the_goal() {
        let now = at(2026, 10, 22, 18);
        let goal = sessions(3.0, TimeRange::Week);
        let logs = vec![
            log("a", "run", None, at(2026, 10, 18, 9)),
            log("b", "run", None, at(2026, 10, 20, 9)),
            log("c", "run", None, at(2026, 10, 22, 9)),
        ];

        let progress = goal_progress("run", &goal, &logs, &now);
        assert_eq!(progress.logged, 3.0);
        assert!(progress.completed);
        assert_eq!(progress.percent, 100.0);
        assert_eq!(
            progress.period.start,
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
        );

        let mut shifted = logs.clone();
        shifted[0].submitted_at = at(2026, 10, 17, 9);
        let progress = goal_progress("run", &goal, &shifted, &now);
        assert_eq!(progress.logged, 2.0);
        assert!(!progress.completed);
    }

    #[test]
    fn hours_on_the_same_day_sum_and_flag_only_the_completing_log() {
        let now = at(2026, 10, 19, 21);
        let goal = hours(5.0, TimeRange::Day);
        let logs = vec![
            log("first", "read", Some(2.5), at(2026, 10, 19, 8)),
            log("second", "read", Some(2.5), at(2026, 10, 19, 20)),
        ];

        let progress = goal_progress("read", &goal, &logs, &now);
        assert_eq!(progress.logged, 5.0);
        assert!(progress.completed);

        assert!(!is_achieving_log(&goal, &logs[0], &logs, &Utc));
        assert!(is_achieving_log(&goal, &logs[1], &logs, &Utc));

        let before_second = goal_progress("read", &goal, &logs[..1], &now);
        assert!(!before_second.completed);
        assert_eq!(before_second.percent, 50.0);
    }

    #[test]
    fn only_one_log_per_period_is_flagged() {
        let goal = hours(2.0, TimeRange::Week);
        let logs = vec![
            log("x", "q", Some(3.0), at(2026, 10, 19, 10)),
            log("y", "q", Some(3.0), at(2026, 10, 20, 10)),
            log("z", "q", Some(4.0), at(2026, 10, 21, 10)),
        ];
        let flagged: Vec<_> = logs
            .iter()
            .filter(|entry| is_achieving_log(&goal, entry, &logs, &Utc))
            .map(|entry| entry.id.as_str())
            .collect();
        assert_eq!(flagged, vec!["x"]);
    }

    #[test]
    fn each_period_gets_its_own_achiever() {
        let goal = sessions(1.0, TimeRange::Day);
        let logs = vec![
            log("mon", "q", None, at(2026, 10, 19, 10)),
            log("mon-2", "q", None, at(2026, 10, 19, 11)),
            log("tue", "q", None, at(2026, 10, 20, 10)),
        ];
        assert!(is_achieving_log(&goal, &logs[0], &logs, &Utc));
        assert!(!is_achieving_log(&goal, &logs[1], &logs, &Utc));
        assert!(is_achieving_log(&goal, &logs[2], &logs, &Utc));
    }

    #[test]
    fn equal_timestamps_are_ordered_by_id() {
        let goal = sessions(1.0, TimeRange::Day);
        let same = at(2026, 10, 19, 10);
        let logs = vec![log("b", "q", None, same), log("a", "q", None, same)];
        let period = period_bounds(TimeRange::Day, same.date_naive());
        let achiever = achieving_log("q", &goal, &logs, &period, &Utc).unwrap();
        assert_eq!(achiever.id, "a");
    }

    #[test]
    fn missing_hours_count_as_zero_and_other_activities_are_ignored() {
        let now = at(2026, 10, 19, 12);
        let goal = hours(4.0, TimeRange::Month);
        let logs = vec![
            log("a", "q", None, at(2026, 10, 2, 12)),
            log("b", "q", Some(1.0), at(2026, 10, 3, 12)),
            log("c", "other", Some(10.0), at(2026, 10, 3, 12)),
            log("d", "q", Some(8.0), at(2026, 9, 30, 12)),
        ];
        let progress = goal_progress("q", &goal, &logs, &now);
        assert_eq!(progress.logged, 1.0);
        assert_eq!(progress.percent, 25.0);
        assert_eq!(progress.period.len_days(), 31);
    }

    #[test]
    fn zero_target_reports_zero_percent() {
        assert_eq!(percent_complete(3.0, 0.0), 0.0);
        assert_eq!(percent_complete(-1.0, 2.0), 0.0);
        assert_eq!(percent_complete(9.0, 3.0), 100.0);
    }

    #[test]
    fn membership_uses_the_local_day_of_submission() {
        let tz = FixedOffset::east_opt(10 * 3600).unwrap();
        let goal = sessions(1.0, TimeRange::Day);
        // 15:00 UTC on the 18th is already the 19th in UTC+10.
        let logs = vec![log("late", "q", None, at(2026, 10, 18, 15))];
        let now = (at(2026, 10, 19, 0) + Duration::hours(2)).with_timezone(&tz);
        let progress = goal_progress("q", &goal, &logs, &now);
        assert!(progress.completed);

        let utc_now = at(2026, 10, 19, 2);
        assert!(!goal_progress("q", &goal, &logs, &utc_now).completed);
    }

    #[test]
    fn side_quest_needs_a_single_log() {
        let logs = vec![log("a", "chores", None, at(2026, 10, 19, 9))];
        assert!(side_quest_completed("chores", &logs));
        assert!(!side_quest_completed("errand", &logs));
    }
}
