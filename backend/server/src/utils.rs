use axum::{Json, extract::rejection::JsonRejection};
use catalog::activities::ActivityPayload;
use chrono::{DateTime, Utc};
use elapsed::parse_instant;

use crate::error::AppError::{self, InvalidInstant, MalformedPayload};

/// Turns axum's JSON rejection into the API's 400 body instead of its plain-text default.
pub fn get_payload(
    body: Result<Json<ActivityPayload>, JsonRejection>,
) -> Result<ActivityPayload, AppError> {
    body.map(|Json(payload)| payload)
        .map_err(|rejection| MalformedPayload(rejection.body_text()))
}

pub fn instant_param(name: &str, value: Option<&str>) -> Result<DateTime<Utc>, AppError> {
    let value = value.ok_or_else(|| InvalidInstant(format!("missing '{name}'")))?;

    parse_instant(value)
        .map_err(|e| InvalidInstant(format!("'{name}' is not an RFC 3339 timestamp: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::instant_param;
    use crate::error::AppError;

    #[test]
    fn test_instant_param() {
        let parsed = instant_param("from", Some("2026-01-15T02:15:30+02:00")).unwrap();

        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 1, 15, 0, 15, 30).unwrap());
    }

    #[test]
    fn test_instant_param_rejects() {
        assert!(matches!(
            instant_param("from", None),
            Err(AppError::InvalidInstant(message)) if message == "missing 'from'"
        ));
        assert!(matches!(
            instant_param("to", Some("yesterday")),
            Err(AppError::InvalidInstant(_))
        ));
        assert!(matches!(
            instant_param("to", Some("2026-02-30T00:00:00Z")),
            Err(AppError::InvalidInstant(_))
        ));
    }
}
