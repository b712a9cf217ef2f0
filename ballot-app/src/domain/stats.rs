use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participation {
    pub total_users: u64,
    pub total_voted: u64,
    pub participation_rate: f64,
}

impl Participation {
    pub fn new(total_voted: u64, total_users: u64) -> Self {
        Self {
            total_users,
            total_voted,
            participation_rate: participation_rate(total_voted, total_users),
        }
    }
}

/// Percentage of users that voted, one decimal. Zero when there are no users.
pub fn participation_rate(voted: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (voted as f64 * 1000.0 / total as f64).round() / 10.0
}
