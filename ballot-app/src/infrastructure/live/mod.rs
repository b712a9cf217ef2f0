mod notifier;
mod presence;

pub use notifier::Notifier;
pub use presence::{PresenceCounts, PresenceRegistry, Room};
