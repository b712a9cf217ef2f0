use super::Poll;
use serde::Serialize;

/// Lifecycle announcements pushed to live observers.
///
/// These are hints to refetch. The store stays the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[serde(rename_all_fields = "camelCase")]
pub enum LiveEvent {
    PollStarted {
        poll: Poll,
    },
    PollEnded {},
    SubmissionReceived {
        username: String,
        total_voted: u64,
        total_users: u64,
    },
    UserLoggedIn {
        username: String,
    },
    UserLoggedOut {
        username: String,
    },
    ForceLogout {
        user_id: i32,
        username: String,
    },
}

impl LiveEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::PollStarted { .. } => "poll_started",
            LiveEvent::PollEnded {} => "poll_ended",
            LiveEvent::SubmissionReceived { .. } => "submission_received",
            LiveEvent::UserLoggedIn { .. } => "user_logged_in",
            LiveEvent::UserLoggedOut { .. } => "user_logged_out",
            LiveEvent::ForceLogout { .. } => "force_logout",
        }
    }
}
