use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user's ballot for one poll. Never mutated after it is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub user_id: i32,
    pub poll_id: i32,
    pub choices: Vec<String>,
    pub submitted_at: DateTime<Utc>,
}

/// A submission joined with its voter, for admin result views of non-anonymous polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterDetail {
    pub username: String,
    pub choices: Vec<String>,
    pub submitted_at: DateTime<Utc>,
}
