mod password;

pub use password::{hash_password, secrets_match, verify_password};
