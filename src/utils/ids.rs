//! Temporary identifiers for tasks the server has not seen yet.

use uuid::Uuid;

use crate::constants::LOCAL_ID_PREFIX;

/// Build a temporary id of the form `local-<timestamp>-<random>`.
pub fn temporary_id(now_millis: i64) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}{}-{}", LOCAL_ID_PREFIX, now_millis, &random[..8])
}

/// Whether `id` was generated locally.
pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}
