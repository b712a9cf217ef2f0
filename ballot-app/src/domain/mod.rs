mod event;
mod identity;
mod poll;
mod stats;
mod submission;
mod tally;
mod user;

pub use event::LiveEvent;
pub use identity::{Identity, Role, SessionUser};
pub use poll::{NewPoll, Poll};
pub use stats::{participation_rate, Participation};
pub use submission::{Submission, VoterDetail};
pub use tally::{OptionTally, Tally};
pub use user::{NewUser, User};
