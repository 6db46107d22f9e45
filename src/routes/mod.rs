use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub mod admin;
pub mod jobs;
pub mod misc;
pub mod profile;
pub mod users;

/// Lowers a raw JSON body into one controller's typed action enum.
/// A missing tag is a validation failure; a tag outside the controller's
/// repertoire is 404, like the original dispatchers; anything else wrong
/// with the payload is a validation failure with the serde detail.
pub(crate) fn parse_action<T: DeserializeOwned>(
    value: serde_json::Value,
    known: &[&str],
) -> Result<T, ApiError> {
    let action = match value.get("action").and_then(|a| a.as_str()) {
        Some(a) => a.to_string(),
        None => return Err(ApiError::validation("Action parameter is missing.")),
    };
    if !known.contains(&action.as_str()) {
        return Err(ApiError::not_found(format!("Action '{action}' not found.")));
    }
    serde_json::from_value(value).map_err(|e| ApiError::validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(tag = "action")]
    enum Probe {
        #[serde(rename = "ping")]
        Ping { value: i64 },
    }

    #[test]
    fn known_action_parses() {
        let probe: Probe =
            parse_action(serde_json::json!({"action": "ping", "value": 7}), &["ping"]).unwrap();
        let Probe::Ping { value } = probe;
        assert_eq!(value, 7);
    }

    #[test]
    fn unknown_action_is_not_found() {
        let err = parse_action::<Probe>(serde_json::json!({"action": "nope"}), &["ping"])
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn missing_action_is_validation() {
        let err = parse_action::<Probe>(serde_json::json!({"value": 7}), &["ping"]).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn malformed_payload_is_validation() {
        let err = parse_action::<Probe>(
            serde_json::json!({"action": "ping", "value": "seven"}),
            &["ping"],
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
