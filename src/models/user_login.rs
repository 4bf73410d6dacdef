use crate::hashing::Digest;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Login event as it arrives in a queue message body.
///
/// Only lives for the duration of a transform. Keys not listed here are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginEventInput {
    pub user_id: String,
    pub device_type: String,
    pub ip: String,
    pub device_id: String,
    pub locale: String,
    pub app_version: String,
    #[serde(default)]
    pub create_date: Option<String>,
}

/// A login as stored in the `user_logins` table.
/// The raw `ip` and `device_id` never reach this type, only their digests do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedLogin {
    pub user_id: String,
    pub device_type: String,
    pub masked_ip: Digest,
    pub masked_device_id: Digest,
    pub locale: String,
    pub app_version: i32,
    pub create_date: NaiveDate,
}
