//! Request/response bodies and the loose JSON coercions the clients rely on.
//!
//! Clients send Telegram ids as either numbers or strings, and balances as
//! numbers or numeric strings, so fields are taken as raw `Value`s and
//! normalised here. Bodies must be JSON objects; fields are looked up by name.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{Points, UserId};

use super::error::ApiError;

// ============================================================================
// Requests
// ============================================================================

/// A request body. Arrays, scalars and `null` are rejected by the extractor.
pub type JsonObject = Map<String, Value>;

#[derive(Debug)]
pub struct GetBalanceRequest {
    pub telegram_id: Option<Value>,
}

impl From<JsonObject> for GetBalanceRequest {
    fn from(mut body: JsonObject) -> Self {
        Self {
            telegram_id: body.remove("telegram_id"),
        }
    }
}

#[derive(Debug)]
pub struct UpdateBalanceRequest {
    pub telegram_id: Option<Value>,
    pub balance: Option<Value>,
}

impl From<JsonObject> for UpdateBalanceRequest {
    fn from(mut body: JsonObject) -> Self {
        Self {
            telegram_id: body.remove("telegram_id"),
            balance: body.remove("balance"),
        }
    }
}

#[derive(Debug)]
pub struct ReferralRequest {
    pub new_user_id: Option<Value>,
    pub referrer_id: Option<Value>,
}

impl From<JsonObject> for ReferralRequest {
    fn from(mut body: JsonObject) -> Self {
        Self {
            new_user_id: body.remove("new_user_id"),
            referrer_id: body.remove("referrer_id"),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: Points,
}

#[derive(Debug, Serialize)]
pub struct UpdateBalanceResponse {
    pub success: bool,
    pub new_balance: Points,
}

/// `{status, message}` body used by the referral endpoint and all errors.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", message)
    }
}

// ============================================================================
// Coercion
// ============================================================================

/// Read a user identifier: strings verbatim, numbers as their JSON text.
///
/// Booleans become `"True"`/`"False"`, the keys existing deployments stored for them.
pub fn coerce_user_id(field: &'static str, value: Option<&Value>) -> Result<UserId, ApiError> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(true)) => Ok("True".to_string()),
        Some(Value::Bool(false)) => Ok("False".to_string()),
        Some(Value::Null) | None => Err(ApiError::invalid_field(field, "is required")),
        Some(_) => Err(ApiError::invalid_field(
            field,
            "must be a string or number",
        )),
    }
}

/// Read a point amount. Missing or null means 0; floats truncate toward zero.
pub fn coerce_points(field: &'static str, value: Option<&Value>) -> Result<Points, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            let truncated = n.as_f64().map(f64::trunc).unwrap_or(f64::NAN);
            // i64::MAX as f64 rounds up to 2^63, which is itself out of range
            if truncated >= Points::MIN as f64 && truncated < Points::MAX as f64 {
                Ok(truncated as Points)
            } else {
                Err(ApiError::invalid_field(field, "is out of range"))
            }
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<Points>()
            .map_err(|_| ApiError::invalid_field(field, format!("'{}' is not an integer", s))),
        Some(Value::Bool(b)) => Ok(Points::from(*b)),
        Some(_) => Err(ApiError::invalid_field(field, "must be an integer")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_user_id_from_string_and_number() {
        assert_eq!(
            coerce_user_id("telegram_id", Some(&json!("123456"))).unwrap(),
            "123456"
        );
        assert_eq!(
            coerce_user_id("telegram_id", Some(&json!(123456))).unwrap(),
            "123456"
        );
    }

    #[test]
    fn test_numeric_and_string_ids_match() {
        let from_number = coerce_user_id("telegram_id", Some(&json!(42))).unwrap();
        let from_string = coerce_user_id("telegram_id", Some(&json!("42"))).unwrap();
        assert_eq!(from_number, from_string);
    }

    #[test]
    fn test_boolean_ids_use_stored_spelling() {
        assert_eq!(
            coerce_user_id("telegram_id", Some(&json!(true))).unwrap(),
            "True"
        );
        assert_eq!(
            coerce_user_id("referrer_id", Some(&json!(false))).unwrap(),
            "False"
        );
    }

    #[test]
    fn test_request_fields_read_by_name() {
        let body = json!({"referrer_id": 7, "new_user_id": "8", "extra": true});
        let Value::Object(body) = body else {
            unreachable!()
        };
        let req = ReferralRequest::from(body);
        assert_eq!(req.new_user_id, Some(json!("8")));
        assert_eq!(req.referrer_id, Some(json!(7)));

        let req = UpdateBalanceRequest::from(JsonObject::new());
        assert!(req.telegram_id.is_none());
        assert!(req.balance.is_none());
    }

    #[test]
    fn test_user_id_required() {
        assert!(coerce_user_id("telegram_id", None).is_err());
        assert!(coerce_user_id("telegram_id", Some(&Value::Null)).is_err());
        assert!(coerce_user_id("telegram_id", Some(&json!([1, 2]))).is_err());
        assert!(coerce_user_id("telegram_id", Some(&json!({"id": 1}))).is_err());
    }

    #[test]
    fn test_points_defaults_to_zero() {
        assert_eq!(coerce_points("balance", None).unwrap(), 0);
        assert_eq!(coerce_points("balance", Some(&Value::Null)).unwrap(), 0);
    }

    #[test]
    fn test_points_accepts_loose_numbers() {
        assert_eq!(coerce_points("balance", Some(&json!(750))).unwrap(), 750);
        assert_eq!(coerce_points("balance", Some(&json!(-20))).unwrap(), -20);
        assert_eq!(coerce_points("balance", Some(&json!(12.9))).unwrap(), 12);
        assert_eq!(coerce_points("balance", Some(&json!(-12.9))).unwrap(), -12);
        assert_eq!(coerce_points("balance", Some(&json!(" 300 "))).unwrap(), 300);
        assert_eq!(coerce_points("balance", Some(&json!(true))).unwrap(), 1);
    }

    #[test]
    fn test_points_rejects_garbage() {
        assert!(coerce_points("balance", Some(&json!("lots"))).is_err());
        assert!(coerce_points("balance", Some(&json!("1.5"))).is_err());
        assert!(coerce_points("balance", Some(&json!(1e30))).is_err());
        assert!(coerce_points("balance", Some(&json!(u64::MAX))).is_err());
        assert!(coerce_points("balance", Some(&json!([500]))).is_err());
    }
}
