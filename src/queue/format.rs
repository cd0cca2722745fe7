//! Presentation helpers for land requests
//!
//! Everything here is pure: status labels, badge appearances, durations,
//! dependency lookups and outbound links.

use chrono::{DateTime, Utc};

use super::{LandState, StatusUpdate};

/// Badge colour family, as used by the queue dashboard's lozenges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Appearance {
    Default,
    Success,
    Removed,
    InProgress,
    New,
    Moved,
}

pub fn appearance(state: LandState) -> Appearance {
    match state {
        LandState::WillQueueWhenReady => Appearance::New,
        LandState::AwaitingMerge => Appearance::New,
        LandState::Queued => Appearance::New,
        LandState::Running => Appearance::InProgress,
        LandState::Success => Appearance::Success,
        LandState::Fail => Appearance::Removed,
        LandState::Aborted => Appearance::Moved,
    }
}

/// Present tense label shown in the status lozenge
pub fn label(state: LandState) -> &'static str {
    match state {
        LandState::WillQueueWhenReady => "Waiting to Land",
        LandState::AwaitingMerge => "Awaiting Merge",
        LandState::Queued => "In Queue",
        LandState::Running => "Running",
        LandState::Success => "Succeeded",
        LandState::Fail => "Failed",
        LandState::Aborted => "Aborted",
    }
}

/// Past tense label used as the title of the "time since" slot
pub fn past_tense(state: LandState) -> &'static str {
    match state {
        LandState::WillQueueWhenReady => "Told To Land When Ready",
        LandState::AwaitingMerge => "Told to Merge",
        LandState::Queued => "Told To Land",
        LandState::Running => "Started",
        LandState::Success => "Succeeded",
        LandState::Fail => "Failed",
        LandState::Aborted => "Aborted",
    }
}

pub fn target_branch_appearance(branch: Option<&str>) -> Appearance {
    match branch {
        Some("master") => Appearance::Moved,
        Some("develop") => Appearance::New,
        _ => Appearance::Default,
    }
}

/// Format the time between two millisecond timestamps as `"{m}m {s}s"`
///
/// Minutes and seconds are floored, so a negative span stays consistent:
/// `-1000ms` is `-1m 59s`.
pub fn duration(start_ms: i64, end_ms: i64) -> String {
    let diff_ms = end_ms - start_ms;
    let minutes = diff_ms.div_euclid(60_000);
    let seconds = diff_ms.rem_euclid(60_000) / 1000;
    format!("{}m {}s", minutes, seconds)
}

/// Duration between two status updates
pub fn duration_between(from: &StatusUpdate, to: &StatusUpdate) -> String {
    duration(from.date.timestamp_millis(), to.date.timestamp_millis())
}

/// Resolve a `dependsOn` list to `#<pr>` labels, `??` for ids not in the queue
pub fn resolve_dependencies(
    depends_on: Option<&str>,
    queue: Option<&[StatusUpdate]>,
) -> Vec<String> {
    let (Some(depends_on), Some(queue)) = (depends_on, queue) else {
        return Vec::new();
    };
    if depends_on.is_empty() {
        return Vec::new();
    }

    depends_on
        .split(',')
        .map(|dep_id| match queue.iter().find(|item| item.request_id == dep_id) {
            Some(item) => format!("#{}", item.request.pull_request_id),
            None => {
                tracing::error!("Cannot find dependency PR with request id {}", dep_id);
                "??".to_string()
            }
        })
        .collect()
}

pub fn build_url(bitbucket_base_url: &str, build_id: u64) -> String {
    format!(
        "{}/addon/pipelines/home#!/results/{}",
        bitbucket_base_url.trim_end_matches('/'),
        build_id
    )
}

pub fn pr_url(bitbucket_base_url: &str, pull_request_id: u64) -> String {
    format!(
        "{}/pull-requests/{}",
        bitbucket_base_url.trim_end_matches('/'),
        pull_request_id
    )
}

const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_ALMOST_TWO_DAYS: i64 = 2520;
const MINUTES_IN_MONTH: i64 = 43200;
const MINUTES_IN_TWO_MONTHS: i64 = 86400;

/// Human readable distance between `date` and `now`, e.g. "5 minutes ago"
pub fn time_ago(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_secs = (now - date).num_seconds();
    let words = distance_in_words(diff_secs.unsigned_abs() as i64);
    if diff_secs < 0 {
        format!("in {}", words)
    } else {
        format!("{} ago", words)
    }
}

fn plural(count: i64, one: &str, many: &str) -> String {
    if count == 1 {
        format!("1 {}", one)
    } else {
        format!("{} {}", count, many)
    }
}

fn distance_in_words(secs: i64) -> String {
    let minutes = (secs + 30) / 60;

    if minutes == 0 {
        "less than a minute".to_string()
    } else if minutes < 45 {
        plural(minutes, "minute", "minutes")
    } else if minutes < 90 {
        "about 1 hour".to_string()
    } else if minutes < MINUTES_IN_DAY {
        format!("about {}", plural((minutes + 30) / 60, "hour", "hours"))
    } else if minutes < MINUTES_IN_ALMOST_TWO_DAYS {
        "1 day".to_string()
    } else if minutes < MINUTES_IN_MONTH {
        plural((minutes + MINUTES_IN_DAY / 2) / MINUTES_IN_DAY, "day", "days")
    } else if minutes < MINUTES_IN_TWO_MONTHS {
        let months = (minutes + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH;
        format!("about {}", plural(months, "month", "months"))
    } else {
        let months = minutes / MINUTES_IN_MONTH;
        if months < 12 {
            plural((minutes + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH, "month", "months")
        } else {
            let years = months / 12;
            match months % 12 {
                0..=2 => format!("about {}", plural(years, "year", "years")),
                3..=8 => format!("over {}", plural(years, "year", "years")),
                _ => format!("almost {}", plural(years + 1, "year", "years")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tests::{status, ALL_STATES};
    use chrono::Duration;

    #[test]
    fn test_mappings_cover_every_state() {
        for state in ALL_STATES {
            let _ = appearance(state);
            assert!(!label(state).is_empty());
            assert!(!past_tense(state).is_empty());
        }
        assert_eq!(appearance(LandState::Running), Appearance::InProgress);
        assert_eq!(appearance(LandState::Fail), Appearance::Removed);
        assert_eq!(label(LandState::Queued), "In Queue");
        assert_eq!(past_tense(LandState::AwaitingMerge), "Told to Merge");
    }

    #[test]
    fn test_target_branch_appearance() {
        assert_eq!(target_branch_appearance(Some("master")), Appearance::Moved);
        assert_eq!(target_branch_appearance(Some("develop")), Appearance::New);
        assert_eq!(target_branch_appearance(Some("release/1.2")), Appearance::Default);
        assert_eq!(target_branch_appearance(None), Appearance::Default);
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration(0, 125_000), "2m 5s");
        assert_eq!(duration(5_000, 5_000), "0m 0s");
        assert_eq!(duration(0, 59_999), "0m 59s");
        assert_eq!(duration(0, 3_600_000), "60m 0s");
    }

    #[test]
    fn test_duration_negative_is_floored() {
        assert_eq!(duration(1_000, 0), "-1m 59s");
        assert_eq!(duration(61_000, 0), "-2m 59s");
    }

    #[test]
    fn test_duration_between_updates() {
        let first = status("r1", 1, LandState::Queued);
        let mut second = status("r1", 1, LandState::Running);
        second.date = first.date + Duration::seconds(125);
        assert_eq!(duration_between(&first, &second), "2m 5s");
    }

    #[test]
    fn test_resolve_dependencies_preserves_order() {
        let queue = vec![status("5", 42, LandState::Queued), status("7", 43, LandState::Running)];

        assert_eq!(resolve_dependencies(Some("5,9"), Some(queue.as_slice())), vec!["#42", "??"]);
        assert_eq!(resolve_dependencies(Some("7,5"), Some(queue.as_slice())), vec!["#43", "#42"]);
    }

    #[test]
    fn test_resolve_dependencies_without_inputs() {
        let queue = vec![status("5", 42, LandState::Queued)];

        assert!(resolve_dependencies(None, Some(queue.as_slice())).is_empty());
        assert!(resolve_dependencies(Some("5"), None).is_empty());
        assert!(resolve_dependencies(Some(""), Some(queue.as_slice())).is_empty());
    }

    #[test]
    fn test_urls() {
        assert_eq!(
            build_url("https://bitbucket.org/team/repo", 123),
            "https://bitbucket.org/team/repo/addon/pipelines/home#!/results/123"
        );
        assert_eq!(
            pr_url("https://bitbucket.org/team/repo/", 42),
            "https://bitbucket.org/team/repo/pull-requests/42"
        );
    }

    #[test]
    fn test_time_ago() {
        let now = Utc::now();
        assert_eq!(time_ago(now - Duration::seconds(10), now), "less than a minute ago");
        assert_eq!(time_ago(now - Duration::seconds(60), now), "1 minute ago");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(time_ago(now - Duration::minutes(50), now), "about 1 hour ago");
        assert_eq!(time_ago(now - Duration::hours(3), now), "about 3 hours ago");
        assert_eq!(time_ago(now - Duration::hours(30), now), "1 day ago");
        assert_eq!(time_ago(now - Duration::days(4), now), "4 days ago");
        assert_eq!(time_ago(now - Duration::days(45), now), "about 2 months ago");
        assert_eq!(time_ago(now - Duration::days(120), now), "4 months ago");
        assert_eq!(time_ago(now - Duration::days(400), now), "about 1 year ago");
        assert_eq!(time_ago(now + Duration::minutes(3), now), "in 3 minutes");
    }
}
