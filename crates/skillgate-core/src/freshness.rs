//! Replay window and application identity checks on the decoded payload.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Timelike, Utc};
use std::time::Duration;

use crate::error::{AuthError, AuthResult, RejectionKind};
use crate::request::SkillRequest;

/// Platform timestamp format (UTC, `Z` suffix). Fractional seconds are
/// tolerated when present.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Accept iff the declared timestamp is at most `max_age` old at `now`.
pub fn check_timestamp(
    raw: Option<&str>,
    max_age: Duration,
    now: DateTime<Utc>,
) -> AuthResult<()> {
    let raw = raw.ok_or_else(|| stale("timestamp missing"))?;
    let declared =
        parse_timestamp(raw).ok_or_else(|| stale(format!("unparseable timestamp {raw:?}")))?;

    let max_age = chrono::Duration::from_std(max_age)
        .map_err(|_| stale("configured max age out of range"))?;
    // Whole-second stamps are compared against a whole-second clock.
    let now = if declared.nanosecond() == 0 {
        now.trunc_subsecs(0)
    } else {
        now
    };
    let age = now.signed_duration_since(declared);

    if age > max_age {
        return Err(stale(format!(
            "request is {}s old (limit {}s)",
            age.num_seconds(),
            max_age.num_seconds()
        )));
    }
    Ok(())
}

/// The payload must name the configured application.
///
/// The identifier may sit under `session.application` or
/// `context.System.application`. At least one must be present, and every
/// present one must equal `expected`.
pub fn check_application_id(payload: &SkillRequest, expected: &str) -> AuthResult<()> {
    let (session, context) = payload.application_ids();
    let declared: Vec<&str> = [session, context].into_iter().flatten().collect();

    if declared.is_empty() {
        return Err(AuthError::new(
            RejectionKind::ApplicationIdentityMismatch,
            "no application identifier in payload",
        ));
    }

    if let Some(other) = declared.iter().find(|id| **id != expected) {
        return Err(AuthError::new(
            RejectionKind::ApplicationIdentityMismatch,
            format!("application identifier {other:?} does not match"),
        ));
    }
    Ok(())
}

fn stale(detail: impl Into<String>) -> AuthError {
    AuthError::new(RejectionKind::RequestStale, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MAX_AGE: Duration = Duration::from_secs(150);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn ts(offset_secs: i64) -> String {
        (now() - chrono::Duration::seconds(offset_secs))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string()
    }

    #[test]
    fn test_age_boundary() {
        assert!(check_timestamp(Some(&ts(0)), MAX_AGE, now()).is_ok());
        assert!(check_timestamp(Some(&ts(5)), MAX_AGE, now()).is_ok());
        assert!(check_timestamp(Some(&ts(150)), MAX_AGE, now()).is_ok());

        let err = check_timestamp(Some(&ts(151)), MAX_AGE, now()).unwrap_err();
        assert_eq!(err.kind, RejectionKind::RequestStale);
    }

    #[test]
    fn test_age_boundary_with_subsecond_clock() {
        let now = now() + chrono::Duration::milliseconds(999);
        assert!(check_timestamp(Some(&ts(150)), MAX_AGE, now).is_ok());

        let err = check_timestamp(Some(&ts(151)), MAX_AGE, now).unwrap_err();
        assert_eq!(err.kind, RejectionKind::RequestStale);
    }

    #[test]
    fn test_fractional_seconds_accepted() {
        assert_eq!(
            parse_timestamp("2026-10-18T11:59:58.250Z"),
            Some(Utc.with_ymd_and_hms(2026, 10, 18, 11, 59, 58).unwrap()
                + chrono::Duration::milliseconds(250))
        );
        assert!(check_timestamp(Some("2026-10-18T11:59:58.250Z"), MAX_AGE, now()).is_ok());
    }

    #[test]
    fn test_unparseable_or_missing_is_stale() {
        for raw in [
            None,
            Some(""),
            Some("yesterday"),
            Some("2026-10-18 12:00:00"),
            Some("2026-10-18T12:00:00+02:00"),
            Some("1760788800"),
        ] {
            let err = check_timestamp(raw, MAX_AGE, now()).unwrap_err();
            assert_eq!(err.kind, RejectionKind::RequestStale, "{raw:?}");
        }
    }

    fn payload(session: Option<&str>, context: Option<&str>) -> SkillRequest {
        let mut body = serde_json::json!({ "request": { "type": "LaunchRequest" } });
        if let Some(id) = session {
            body["session"] = serde_json::json!({ "application": { "applicationId": id } });
        }
        if let Some(id) = context {
            body["context"] =
                serde_json::json!({ "System": { "application": { "applicationId": id } } });
        }
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_application_id_either_location() {
        assert!(check_application_id(&payload(Some("app"), None), "app").is_ok());
        assert!(check_application_id(&payload(None, Some("app")), "app").is_ok());
        assert!(check_application_id(&payload(Some("app"), Some("app")), "app").is_ok());
    }

    #[test]
    fn test_application_id_mismatch() {
        for p in [
            payload(None, None),
            payload(Some("other"), None),
            payload(None, Some("other")),
            payload(Some("app"), Some("other")),
            payload(Some("other"), Some("app")),
        ] {
            let err = check_application_id(&p, "app").unwrap_err();
            assert_eq!(err.kind, RejectionKind::ApplicationIdentityMismatch);
        }
    }
}
