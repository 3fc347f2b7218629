use crate::dates::day_string;
use crate::models::{Activity, ActivityLog, ActivityProgress, GoalUnit, RecentLog, TimeRange};
use crate::stats::{
    RECENT_LOG_LIMIT, range_stats, recent_logs, side_quest_stats, sorted_campaigns, unit_short,
};
use chrono::{DateTime, TimeZone};
use std::fmt::Write;

pub fn render_index<Tz: TimeZone>(
    now: &DateTime<Tz>,
    activities: &[Activity],
    logs: &[ActivityLog],
) -> String {
    let today = day_string(now.date_naive());
    let recent = recent_logs(activities, logs, &now.timezone(), RECENT_LOG_LIMIT);
    fill_template(
        INDEX_HTML,
        &[
            ("DATE", today.clone()),
            ("CAMPAIGNS", render_campaigns(now, activities, logs, &today)),
            ("SIDE_QUESTS", render_side_quests(activities, logs, &today)),
            ("RECENT_LOGS", render_recent_logs(&recent)),
        ],
    )
}

/// Replaces `{{KEY}}` markers in one pass; substituted text is never rescanned.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let filled = after.find("}}").and_then(|end| {
            let key = &after[..end];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (end, value))
        });
        match filled {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn render_campaigns<Tz: TimeZone>(
    now: &DateTime<Tz>,
    activities: &[Activity],
    logs: &[ActivityLog],
    today: &str,
) -> String {
    let mut html = String::new();

    for range in TimeRange::ALL {
        let stats = range_stats(now, activities, logs, range);
        if stats.current.is_empty() && stats.completed.is_empty() {
            continue;
        }
        let _ = write!(
            html,
            r#"<h3>{} objectives <span class="hint">{} to {}</span></h3><ul class="quests">"#,
            range.tab_label(),
            day_string(stats.period.start),
            day_string(stats.period.end),
        );
        for entry in stats.current.iter().chain(&stats.completed) {
            html.push_str(&render_progress(entry, today));
        }
        html.push_str("</ul>");
    }

    let aimless: Vec<&Activity> = sorted_campaigns(activities)
        .into_iter()
        .filter(|activity| activity.goal().is_none())
        .collect();
    if !aimless.is_empty() {
        html.push_str(r#"<h3>Without an objective</h3><ul class="quests">"#);
        for activity in aimless {
            let _ = write!(
                html,
                r#"<li class="quest"><div class="quest-head">{}{}</div>{}</li>"#,
                render_name(activity),
                render_delete_form(activity),
                render_log_form(activity, today),
            );
        }
        html.push_str("</ul>");
    }

    if html.is_empty() {
        html.push_str(r#"<p class="hint">No campaigns yet.</p>"#);
    }
    html
}

fn render_progress(entry: &ActivityProgress, today: &str) -> String {
    let activity = &entry.activity;
    let progress = &entry.progress;
    let unit = activity.goal().map(|goal| unit_short(goal.unit)).unwrap_or("");
    let badge = if progress.completed {
        r#"<span class="badge">Checkpoint Achieved!</span>"#
    } else {
        ""
    };

    format!(
        r#"<li class="quest{done}"><div class="quest-head">{name}<span class="meta">{logged} / {target} {unit} &middot; {label}</span>{badge}{remove}</div><div class="bar"><div class="fill" style="width:{percent:.0}%;background:{color}"></div></div>{form}</li>"#,
        done = if progress.completed { " done" } else { "" },
        name = render_name(activity),
        logged = format_amount(progress.logged),
        target = format_amount(progress.target),
        label = escape(&entry.goal_label),
        percent = progress.percent,
        color = escape(&activity.color),
        remove = render_delete_form(activity),
        form = render_log_form(activity, today),
    )
}

fn render_side_quests(activities: &[Activity], logs: &[ActivityLog], today: &str) -> String {
    let stats = side_quest_stats(activities, logs);
    if stats.open.is_empty() && stats.completed.is_empty() {
        return r#"<p class="hint">No side quests yet.</p>"#.to_string();
    }

    let mut html = String::from(r#"<ul class="quests">"#);
    for quest in &stats.open {
        let _ = write!(
            html,
            r#"<li class="quest"><div class="quest-head">{}{}</div>{}</li>"#,
            render_name(quest),
            render_delete_form(quest),
            render_log_form(quest, today),
        );
    }
    for quest in &stats.completed {
        let _ = write!(
            html,
            r#"<li class="quest done"><div class="quest-head">{}<span class="badge">Completed</span>{}</div></li>"#,
            render_name(quest),
            render_delete_form(quest),
        );
    }
    html.push_str("</ul>");
    html
}

fn render_recent_logs(entries: &[RecentLog]) -> String {
    if entries.is_empty() {
        return r#"<p class="hint">No activity logs yet. Start by logging your first activity.</p>"#
            .to_string();
    }

    let mut html = String::from(r#"<ul class="logs">"#);
    for entry in entries {
        let hours = entry
            .log
            .hours
            .map(|hours| {
                let unit = if hours == 1.0 { "hour" } else { "hours" };
                format!(" &middot; {} {unit}", format_amount(hours))
            })
            .unwrap_or_default();
        let title = entry
            .log
            .title
            .as_deref()
            .map(|title| format!(" &middot; {}", escape(title)))
            .unwrap_or_default();
        let badge = if entry.achieved {
            r#"<span class="badge">Objective achieved</span>"#
        } else {
            ""
        };
        let _ = write!(
            html,
            r#"<li><span class="dot" style="background:{color}"></span><span class="name">{name}</span><span class="meta">{day}{hours}{title}</span>{badge}<form method="post" action="/logs/{id}/delete"><button class="link" type="submit" aria-label="Delete log">Delete</button></form></li>"#,
            color = escape(&entry.activity_color),
            name = escape(&entry.activity_name),
            day = day_string(entry.day),
            id = escape(&entry.log.id),
        );
    }
    html.push_str("</ul>");
    html
}

fn render_name(activity: &Activity) -> String {
    format!(
        r#"<span class="dot" style="background:{}"></span><span class="name">{}</span><span class="tag">{}</span>"#,
        escape(&activity.color),
        escape(&activity.name),
        activity.category.as_str(),
    )
}

/// Logs of a removed quest stay stored; they just stop showing up.
fn render_delete_form(activity: &Activity) -> String {
    format!(
        r#"<form class="inline" method="post" action="/quests/{id}/delete" onsubmit="return confirm('Remove this quest? Its logs are kept.')"><button class="link" type="submit" aria-label="Remove quest">Remove</button></form>"#,
        id = escape(&activity.id),
    )
}

fn render_log_form(activity: &Activity, today: &str) -> String {
    let needs_hours = activity
        .goal()
        .is_some_and(|goal| goal.unit == GoalUnit::Hours);
    let hours_input = if needs_hours {
        r#"<input name="hours" type="number" step="0.25" min="0" placeholder="Hours" required />"#
    } else {
        r#"<input name="hours" type="number" step="0.25" min="0" placeholder="Hours (optional)" />"#
    };
    format!(
        r#"<form class="log-form" method="post" action="/quests/{id}/log">{hours_input}<input name="title" type="text" placeholder="Title" /><input name="date" type="date" value="{today}" /><button type="submit">Log Mission Report</button></form>"#,
        id = escape(&activity.id),
    )
}

fn format_amount(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}")
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Quest Tracker</title>
  <style>
    :root {
      --bg: #f4ecd8;
      --ink: #3b2410;
      --muted: #7a5a3a;
      --accent: #8b5a2b;
      --done: #2d7a4b;
      --card: rgba(255, 252, 244, 0.92);
      --shadow: 0 18px 40px rgba(59, 36, 16, 0.16);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(135deg, var(--bg), #efe0bd 70%);
      color: var(--ink);
      font-family: "Georgia", serif;
      padding: 32px 18px 48px;
    }

    main {
      width: min(900px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 24px;
    }

    .card {
      background: var(--card);
      border-radius: 18px;
      box-shadow: var(--shadow);
      padding: 24px;
    }

    h1, h2, h3 {
      margin: 0 0 12px;
    }

    .hint {
      color: var(--muted);
      font-size: 0.9rem;
      font-weight: normal;
    }

    ul {
      list-style: none;
      margin: 0 0 16px;
      padding: 0;
      display: grid;
      gap: 10px;
    }

    .quest {
      border: 1px solid rgba(139, 90, 43, 0.25);
      border-radius: 12px;
      padding: 12px;
      display: grid;
      gap: 8px;
    }

    .quest.done {
      border-color: rgba(45, 122, 75, 0.4);
      background: rgba(45, 122, 75, 0.06);
    }

    .quest-head, .logs li {
      display: flex;
      flex-wrap: wrap;
      align-items: center;
      gap: 8px;
    }

    .dot {
      width: 12px;
      height: 12px;
      border-radius: 50%;
      flex-shrink: 0;
    }

    .name {
      font-weight: 600;
    }

    .meta, .tag {
      color: var(--muted);
      font-size: 0.85rem;
    }

    .badge {
      color: var(--done);
      font-size: 0.8rem;
      font-weight: 600;
      margin-left: auto;
    }

    .bar {
      height: 10px;
      background: rgba(59, 36, 16, 0.1);
      border-radius: 999px;
      overflow: hidden;
    }

    .fill {
      height: 100%;
      border-radius: 999px;
    }

    .log-form {
      display: flex;
      flex-wrap: wrap;
      gap: 6px;
    }

    input, select, button {
      font: inherit;
      padding: 6px 10px;
      border-radius: 8px;
      border: 1px solid rgba(139, 90, 43, 0.4);
    }

    button {
      background: var(--accent);
      color: white;
      cursor: pointer;
    }

    button.link {
      background: transparent;
      color: #b3261e;
      border: none;
    }

    .new-quest {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
      gap: 8px;
    }

    .new-quest label {
      display: grid;
      gap: 4px;
      font-size: 0.85rem;
      color: var(--muted);
    }

    form.inline {
      display: inline;
    }

    #remote-status[data-type="error"] {
      color: #b3261e;
    }
  </style>
</head>
<body>
  <main>
    <header class="card">
      <h1>Quest Tracker</h1>
      <p class="hint">Today is {{DATE}}. Weeks start on Sunday.</p>
    </header>

    <section class="card">
      <h2>New Quest</h2>
      <form class="new-quest" method="post" action="/quests">
        <label>Name<input name="name" type="text" required /></label>
        <label>Kind
          <select name="kind">
            <option value="campaign">Campaign</option>
            <option value="sideQuest">Side quest</option>
          </select>
        </label>
        <label>Category
          <select name="category">
            <option value="warrior">Warrior</option>
            <option value="scholar">Scholar</option>
            <option value="adventurer">Adventurer</option>
            <option value="craftsman">Craftsman</option>
          </select>
        </label>
        <label>Color<input name="color" type="color" value="#3b82f6" /></label>
        <label>Objective<input name="goal_amount" type="number" step="0.5" min="1" placeholder="Amount (optional)" /></label>
        <label>Unit
          <select name="goal_unit">
            <option value="hours">Hours</option>
            <option value="sessions">Sessions</option>
          </select>
        </label>
        <label>Per
          <select name="goal_range">
            <option value="day">Day</option>
            <option value="week" selected>Week</option>
            <option value="month">Month</option>
            <option value="year">Year</option>
          </select>
        </label>
        <label>Starts<input name="start_date" type="date" value="{{DATE}}" /></label>
        <label>Ends<input name="end_date" type="date" /></label>
        <label>Notes<input name="notes" type="text" /></label>
        <button type="submit">Begin Quest</button>
      </form>
    </section>

    <section class="card">
      <h2>Campaign Objectives</h2>
      {{CAMPAIGNS}}
    </section>

    <section class="card">
      <h2>Side Quests</h2>
      {{SIDE_QUESTS}}
    </section>

    <section class="card">
      <h2>Recent Logs</h2>
      {{RECENT_LOGS}}
    </section>

    <section class="card">
      <h2>From the remote table</h2>
      <p class="hint" id="remote-status">Loading&hellip;</p>
      <ul id="remote-rows"></ul>
    </section>
  </main>

  <script>
    const statusEl = document.getElementById('remote-status');
    const rowsEl = document.getElementById('remote-rows');

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    fetch('/api/remote')
      .then(async (res) => {
        if (!res.ok) {
          throw new Error((await res.text()) || 'Failed to load remote table');
        }
        return res.json();
      })
      .then((rows) => {
        rows.forEach((row) => {
          const li = document.createElement('li');
          li.textContent = row.title;
          rowsEl.appendChild(li);
        });
        setStatus(rows.length === 0 ? 'No rows yet.' : '', '');
      })
      .catch((err) => setStatus(err.message, 'error'));
  </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityKind, Category, Goal};
    use chrono::Utc;

    fn activity(id: &str, name: &str, kind: ActivityKind, goal: Option<Goal>) -> Activity {
        Activity {
            id: id.to_string(),
            name: name.to_string(),
            color: "#10b981".to_string(),
            goals: goal.into_iter().collect(),
            start_date: "2026-10-01".to_string(),
            end_date: None,
            kind,
            notes: None,
            category: Category::Scholar,
        }
    }

    fn log(id: &str, activity_id: &str, hours: Option<f64>) -> ActivityLog {
        ActivityLog {
            id: id.to_string(),
            activity_id: activity_id.to_string(),
            hours,
            title: Some("<b>deep</b> work".to_string()),
            notes: None,
            submitted_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn renders_progress_and_escapes_user_text() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap();
        let activities = vec![
            activity(
                "a",
                "Read & <Write>",
                ActivityKind::Campaign,
                Some(Goal {
                    amount: 2.0,
                    unit: GoalUnit::Hours,
                    time_range: TimeRange::Day,
                }),
            ),
            activity("s", "Fix gate", ActivityKind::SideQuest, None),
        ];
        let logs = vec![log("1", "a", Some(2.0)), log("2", "gone", Some(1.0))];

        let html = render_index(&now, &activities, &logs);
        assert!(html.contains("Read &amp; &lt;Write&gt;"));
        assert!(html.contains("2 / 2 hrs"));
        assert!(html.contains("Checkpoint Achieved!"));
        assert!(html.contains("Objective achieved"));
        assert!(html.contains("&lt;b&gt;deep&lt;/b&gt; work"));
        assert!(html.contains("Fix gate"));
        assert!(!html.contains("/logs/2/delete"));
        assert!(html.contains("/logs/1/delete"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn user_text_cannot_inject_template_markers() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap();
        let activities = vec![activity(
            "a",
            "{{RECENT_LOGS}} {{DATE}}",
            ActivityKind::Campaign,
            None,
        )];

        let html = render_index(&now, &activities, &[]);
        assert!(html.contains("{{RECENT_LOGS}} {{DATE}}"));
        assert_eq!(html.matches("No activity logs yet.").count(), 1);
    }

    #[test]
    fn unknown_markers_are_left_alone() {
        let filled = fill_template(
            "{{A}}-{{B}}-{{",
            &[("A", "{{B}}".to_string()), ("B", "b".to_string())],
        );
        assert_eq!(filled, "{{B}}-b-{{");
    }

    #[test]
    fn page_offers_quest_management_forms() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap();
        let activities = vec![
            activity("c1", "Climb", ActivityKind::Campaign, None),
            activity("s1", "Mend cloak", ActivityKind::SideQuest, None),
        ];

        let html = render_index(&now, &activities, &[]);
        assert!(html.contains(r#"action="/quests""#));
        assert!(html.contains(r#"value="2026-10-19""#));
        assert!(html.contains("/quests/c1/delete"));
        assert!(html.contains("/quests/s1/delete"));
        assert!(html.contains("/quests/c1/log"));
    }

    #[test]
    fn empty_state_messages() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap();
        let html = render_index(&now, &[], &[]);
        assert!(html.contains("No campaigns yet."));
        assert!(html.contains("No side quests yet."));
        assert!(html.contains("No activity logs yet."));
    }

    #[test]
    fn amounts_are_rounded_for_display() {
        assert_eq!(format_amount(0.1 + 0.2), "0.3");
        assert_eq!(format_amount(5.0), "5");
    }
}
