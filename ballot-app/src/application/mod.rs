mod poll_lifecycle;
mod reports;
mod session_guard;
mod user_directory;

pub use poll_lifecycle::{PollLifecycle, VoteStatus};
pub use reports::{
    Dashboard, DashboardStats, Export, ExportFormat, OptionResult, PollResults, PollSummary,
    Reports, VoteDetails,
};
pub use session_guard::{SessionGuard, SessionInfo, SessionStatus};
pub use user_directory::{DeletedUser, UserDirectory};
