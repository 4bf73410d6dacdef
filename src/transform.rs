//! # Login Transformer
//!
//! Turns a raw queue message into a `PersistedLogin`: parses the JSON body,
//! masks `ip` and `device_id`, and re-encodes the dotted app version as an
//! integer. Pure computation, no I/O.

use crate::error::{PipelineError, PipelineResult};
use crate::hashing::digest;
use crate::models::{LoginEventInput, PersistedLogin, RawMessage};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

/// Converts queue messages into rows for the `user_logins` table
#[derive(Debug, Clone)]
pub struct Transformer {
    /// Date stamped on records whose body carries no `create_date`.
    /// `None` means the current UTC date at transform time.
    default_create_date: Option<NaiveDate>,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer {
    pub fn new() -> Self {
        Self {
            default_create_date: None,
        }
    }

    /// Pin the fallback `create_date`, mostly useful for deterministic tests
    pub fn with_default_create_date(mut self, date: NaiveDate) -> Self {
        self.default_create_date = Some(date);
        self
    }

    /// Transform one message. Errors carry the offending message id.
    pub fn transform(&self, raw: &RawMessage) -> PipelineResult<PersistedLogin> {
        self.transform_body(&raw.body)
            .map_err(|e| e.for_message(&raw.message_id))
    }

    /// Transform every message of a batch, stopping at the first failure
    pub fn transform_batch(&self, batch: &[RawMessage]) -> PipelineResult<Vec<PersistedLogin>> {
        batch.iter().map(|raw| self.transform(raw)).collect()
    }

    fn transform_body(&self, body: &[u8]) -> PipelineResult<PersistedLogin> {
        let input: LoginEventInput = serde_json::from_slice(body)?;

        let app_version = encode_app_version(&input.app_version)?;
        let create_date = match input.create_date.as_deref() {
            Some(value) => parse_create_date(value)?,
            None => self
                .default_create_date
                .unwrap_or_else(|| Utc::now().date_naive()),
        };

        let LoginEventInput {
            user_id,
            device_type,
            ip,
            device_id,
            locale,
            ..
        } = input;

        debug!(user_id = %user_id, app_version, "Transformed login event");

        Ok(PersistedLogin {
            user_id,
            device_type,
            masked_ip: digest(ip.as_bytes()),
            masked_device_id: digest(device_id.as_bytes()),
            locale,
            app_version,
            create_date,
        })
    }
}

/// Re-encode a dotted version as an integer by dropping the separators.
///
/// `"1.2.3"` becomes `123` and `"10.0.1"` becomes `1001`. The encoding is only
/// unambiguous while every component after the first is a single digit; it
/// is kept for compatibility with the `INTEGER` column. Empty components
/// (`"1..2"`, `".5"`, `"1."`) are rejected.
pub fn encode_app_version(version: &str) -> PipelineResult<i32> {
    let components: Vec<&str> = version.split('.').collect();

    if components.iter().any(|part| part.is_empty()) {
        return Err(PipelineError::validation(format!(
            "app_version '{version}' has an empty component"
        )));
    }
    if !components
        .iter()
        .all(|part| part.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(PipelineError::validation(format!(
            "app_version '{version}' is not a dotted numeric version"
        )));
    }

    components.concat().parse::<i32>().map_err(|_| {
        PipelineError::validation(format!(
            "app_version '{version}' does not fit in an integer column"
        ))
    })
}

/// Accept either a plain `YYYY-MM-DD` date or an RFC 3339 timestamp
fn parse_create_date(value: &str) -> PipelineResult<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| {
            PipelineError::validation(format!(
                "create_date '{value}' is neither a date nor an RFC 3339 timestamp"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn message(id: &str, body: &str) -> RawMessage {
        RawMessage::new(id, format!("rh-{id}"), body.as_bytes().to_vec())
    }

    #[test]
    fn test_app_version_encoding() {
        assert_eq!(encode_app_version("1.2.3").unwrap(), 123);
        assert_eq!(encode_app_version("10.0.1").unwrap(), 1001);
        assert_eq!(encode_app_version("2.1.0").unwrap(), 210);
        assert_eq!(encode_app_version("7").unwrap(), 7);
    }

    #[test]
    fn test_app_version_rejects_malformed() {
        for bad in [
            "", "...", "1.a.3", "v1.2", "1-2-3", "+1.2", " 1.2", "1.2.3-beta", "1..2", ".5", "1.",
            "..1..", "1...2.3",
        ] {
            let err = encode_app_version(bad).unwrap_err();
            assert!(
                matches!(err, PipelineError::Validation { .. }),
                "expected validation error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_app_version_overflow_is_rejected() {
        assert!(encode_app_version("99999.99999.99999").is_err());
    }

    #[test]
    fn test_transform_masks_fields() {
        let raw = message(
            "m-1",
            r#"{"user_id":"u1","device_type":"ios","ip":"1.2.3.4","device_id":"abc","locale":"en-US","app_version":"2.1.0"}"#,
        );

        let login = Transformer::new()
            .with_default_create_date(fixed_date())
            .transform(&raw)
            .unwrap();

        assert_eq!(login.user_id, "u1");
        assert_eq!(login.device_type, "ios");
        assert_eq!(login.masked_ip, digest(b"1.2.3.4"));
        assert_eq!(login.masked_device_id, digest(b"abc"));
        assert_eq!(login.locale, "en-US");
        assert_eq!(login.app_version, 210);
        assert_eq!(login.create_date, fixed_date());

        let serialized = serde_json::to_string(&login).unwrap();
        assert!(!serialized.contains("1.2.3.4"));
        assert!(!serialized.contains("\"abc\""));
    }

    #[test]
    fn test_transform_uses_body_create_date() {
        let raw = message(
            "m-2",
            r#"{"user_id":"u2","device_type":"android","ip":"10.0.0.1","device_id":"d","locale":"de-DE","app_version":"1.0.0","create_date":"2023-12-31"}"#,
        );
        let login = Transformer::new().transform(&raw).unwrap();
        assert_eq!(login.create_date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        let raw = message(
            "m-3",
            r#"{"user_id":"u3","device_type":"android","ip":"10.0.0.1","device_id":"d","locale":"de-DE","app_version":"1.0.0","create_date":"2023-06-15T23:30:00-02:00"}"#,
        );
        let login = Transformer::new().transform(&raw).unwrap();
        assert_eq!(login.create_date, NaiveDate::from_ymd_opt(2023, 6, 16).unwrap());
    }

    #[test]
    fn test_transform_rejects_missing_field() {
        let raw = message(
            "m-4",
            r#"{"user_id":"u1","device_type":"ios","device_id":"abc","locale":"en-US","app_version":"2.1.0"}"#,
        );
        let err = Transformer::new().transform(&raw).unwrap_err();
        match err {
            PipelineError::Validation { message_id, reason } => {
                assert_eq!(message_id.as_deref(), Some("m-4"));
                assert!(reason.contains("ip"), "reason should name the field: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_transform_rejects_null_and_malformed_bodies() {
        let transformer = Transformer::new();
        for body in [
            "not json",
            "[]",
            r#"{"user_id":null,"device_type":"ios","ip":"1","device_id":"a","locale":"en","app_version":"1"}"#,
            r#"{"user_id":"u","device_type":"ios","ip":"1","device_id":"a","locale":"en","app_version":"x.y"}"#,
            r#"{"user_id":"u","device_type":"ios","ip":"1","device_id":"a","locale":"en","app_version":"1","create_date":"yesterday"}"#,
        ] {
            let err = transformer.transform(&message("bad", body)).unwrap_err();
            assert!(matches!(err, PipelineError::Validation { .. }), "body: {body}");
        }
    }

    #[test]
    fn test_transform_batch_stops_at_first_failure() {
        let good = r#"{"user_id":"u1","device_type":"ios","ip":"1","device_id":"a","locale":"en","app_version":"1.0"}"#;
        let batch = vec![message("a", good), message("b", "{}"), message("c", good)];
        let err = Transformer::new().transform_batch(&batch).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation { message_id: Some(ref id), .. } if id == "b"
        ));
    }
}
