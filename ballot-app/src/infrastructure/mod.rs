pub mod db;
pub mod live;
pub mod security;
