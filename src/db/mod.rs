//! Database layer (SQLite).

pub mod sqlite;

pub use sqlite::{StoreError, UserStore};

/// Table names as constants.
pub mod tables {
    pub const USERS: &str = "users";
}
