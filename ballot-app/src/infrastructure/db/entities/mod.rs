pub mod submission;
pub mod user;
pub mod vote;

pub use submission::Entity as Submission;
pub use user::Entity as User;
pub use vote::Entity as Vote;
