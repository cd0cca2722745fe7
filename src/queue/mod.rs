pub mod format;
pub mod item;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Land request state as reported by the queue backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LandState {
    WillQueueWhenReady,
    AwaitingMerge,
    Queued,
    Running,
    Success,
    Fail,
    Aborted,
}

impl LandState {
    /// Finished states: the request left the queue one way or another
    pub fn is_terminal(self) -> bool {
        matches!(self, LandState::Success | LandState::Fail | LandState::Aborted)
    }

    /// States that can still be acted on (removed or cancelled)
    pub fn is_active(self) -> bool {
        matches!(self, LandState::Queued | LandState::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub title: String,
    pub author_aaid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandRequest {
    pub pull_request_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<u64>,
    /// Comma separated request ids this build waits on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    pub pull_request: PullRequest,
}

/// Snapshot of a land request at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub request_id: String,
    pub state: LandState,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub is_latest: bool,
    pub request: LandRequest,
}

/// Full status history of one request, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandRequestInfo {
    #[serde(default)]
    pub statuses: Vec<StatusUpdate>,
}

impl LandRequestInfo {
    pub fn latest(&self) -> Option<&StatusUpdate> {
        self.statuses.iter().find(|s| s.is_latest)
    }
}

/// Body returned by the remove/cancel endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The parts of `/api/current-state` the dashboard cares about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentState {
    #[serde(default)]
    pub queue: Vec<StatusUpdate>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) const ALL_STATES: [LandState; 7] = [
        LandState::WillQueueWhenReady,
        LandState::AwaitingMerge,
        LandState::Queued,
        LandState::Running,
        LandState::Success,
        LandState::Fail,
        LandState::Aborted,
    ];

    pub(crate) fn status(request_id: &str, pr: u64, state: LandState) -> StatusUpdate {
        StatusUpdate {
            request_id: request_id.to_string(),
            state,
            date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            reason: None,
            is_latest: true,
            request: LandRequest {
                pull_request_id: pr,
                build_id: None,
                depends_on: None,
                pull_request: PullRequest {
                    title: format!("Pull request {}", pr),
                    author_aaid: "aaid-1".to_string(),
                    target_branch: None,
                },
            },
        }
    }

    #[test]
    fn test_status_update_from_backend_json() {
        let json = r#"{
            "requestId": "abc",
            "state": "will-queue-when-ready",
            "date": "2024-03-01T12:00:00.000Z",
            "isLatest": true,
            "request": {
                "pullRequestId": 42,
                "buildId": 77,
                "dependsOn": "a,b",
                "pullRequest": {
                    "title": "Fix the thing",
                    "authorAaid": "557058:1234",
                    "targetBranch": "master"
                }
            }
        }"#;

        let status: StatusUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(status.state, LandState::WillQueueWhenReady);
        assert_eq!(status.request.pull_request_id, 42);
        assert_eq!(status.request.build_id, Some(77));
        assert_eq!(status.request.depends_on.as_deref(), Some("a,b"));
        assert_eq!(status.request.pull_request.target_branch.as_deref(), Some("master"));
        assert!(status.reason.is_none());
        assert!(status.is_latest);
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        let result: Result<LandState, _> = serde_json::from_str("\"exploded\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_state_groups() {
        let active: Vec<_> = ALL_STATES.iter().filter(|s| s.is_active()).collect();
        assert_eq!(active, vec![&LandState::Queued, &LandState::Running]);

        let terminal: Vec<_> = ALL_STATES.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![&LandState::Success, &LandState::Fail, &LandState::Aborted]);
    }

    #[test]
    fn test_latest_picks_flagged_entry() {
        let mut first = status("r1", 1, LandState::Queued);
        first.is_latest = false;
        let second = status("r1", 1, LandState::Running);

        let info = LandRequestInfo { statuses: vec![first, second] };
        assert_eq!(info.latest().map(|s| s.state), Some(LandState::Running));

        let empty = LandRequestInfo::default();
        assert!(empty.latest().is_none());
    }

    #[test]
    fn test_action_response_error_field() {
        let ok: ActionResponse = serde_json::from_str("{}").unwrap();
        assert!(ok.error.is_none());

        let err: ActionResponse = serde_json::from_str(r#"{"error":"Not queued"}"#).unwrap();
        assert_eq!(err.error.as_deref(), Some("Not queued"));
    }
}
