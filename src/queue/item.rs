use super::{ActionResponse, LandRequestInfo, LandState, StatusUpdate};

/// Identifies one detail fetch; only the newest ticket of an item is honoured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// Hands out fetch tickets. Shared by every item and never reset, so a
/// rebuilt item can't be handed a ticket that is still in flight.
#[derive(Debug, Default)]
pub struct TicketCounter {
    last: u64,
}

impl TicketCounter {
    pub fn issue(&mut self) -> FetchTicket {
        self.last += 1;
        FetchTicket(self.last)
    }
}

/// Local view state of the detail panel
#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    Collapsed,
    Loading { ticket: FetchTicket },
    Expanded(LandRequestInfo),
}

/// What the caller has to do after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Start `GET /api/landrequest/{id}` and report back with this ticket
    Fetch(FetchTicket),
    Collapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueAction {
    Remove,
    Cancel,
}

impl QueueAction {
    /// The action offered for a state, if any
    pub fn for_state(state: LandState) -> Option<Self> {
        match state {
            LandState::Queued => Some(QueueAction::Remove),
            LandState::Running => Some(QueueAction::Cancel),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QueueAction::Remove => "Remove",
            QueueAction::Cancel => "Cancel",
        }
    }

    pub fn path(self, request_id: &str) -> String {
        match self {
            QueueAction::Remove => format!("/api/remove/{}", request_id),
            QueueAction::Cancel => format!("/api/cancel/{}", request_id),
        }
    }
}

/// How the dashboard reacts to a remove/cancel response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Backend refused; show the message and leave everything as is
    Alert(String),
    /// Backend accepted; resync the whole queue
    Reload,
}

impl ActionResponse {
    pub fn outcome(&self) -> ActionOutcome {
        match &self.error {
            Some(error) => ActionOutcome::Alert(error.clone()),
            None => ActionOutcome::Reload,
        }
    }
}

/// A single entry of the land queue and its expand/collapse state
#[derive(Debug, Clone)]
pub struct QueueItem {
    status: StatusUpdate,
    detail: Detail,
}

impl QueueItem {
    pub fn new(status: StatusUpdate) -> Self {
        Self {
            status,
            detail: Detail::Collapsed,
        }
    }

    /// The snapshot being displayed
    pub fn status(&self) -> &StatusUpdate {
        &self.status
    }

    pub fn request_id(&self) -> &str {
        &self.status.request_id
    }

    pub fn detail(&self) -> &Detail {
        &self.detail
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self.detail, Detail::Expanded(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.detail, Detail::Loading { .. })
    }

    pub fn history(&self) -> Option<&[StatusUpdate]> {
        match &self.detail {
            Detail::Expanded(info) => Some(&info.statuses),
            _ => None,
        }
    }

    pub fn available_action(&self) -> Option<QueueAction> {
        QueueAction::for_state(self.status.state)
    }

    /// Show more / show less
    pub fn toggle(&mut self, tickets: &mut TicketCounter) -> Toggle {
        match self.detail {
            Detail::Collapsed => {
                let ticket = tickets.issue();
                self.detail = Detail::Loading { ticket };
                Toggle::Fetch(ticket)
            }
            Detail::Loading { .. } | Detail::Expanded(_) => {
                self.detail = Detail::Collapsed;
                Toggle::Collapsed
            }
        }
    }

    /// Apply a fetched history. Returns false if the response was stale.
    pub fn apply_detail(&mut self, ticket: FetchTicket, info: LandRequestInfo) -> bool {
        if self.detail != (Detail::Loading { ticket }) {
            tracing::debug!("Dropping stale detail for request {}", self.status.request_id);
            return false;
        }

        match info.latest() {
            Some(latest) => self.status = latest.clone(),
            None => tracing::warn!(
                "History for request {} has no latest status",
                self.status.request_id
            ),
        }
        self.detail = Detail::Expanded(info);
        true
    }

    /// A detail fetch failed; fall back to collapsed if it was the current one
    pub fn fetch_failed(&mut self, ticket: FetchTicket) {
        if self.detail == (Detail::Loading { ticket }) {
            self.detail = Detail::Collapsed;
        }
    }

    /// Take a newer snapshot from a periodic refresh, keeping local view state
    pub fn update_status(&mut self, status: StatusUpdate) {
        self.status = status;
    }
}
