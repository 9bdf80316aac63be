use axum::{extract::rejection::JsonRejection, Json};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::api::error::ApiError;

/// A JSON object body read one named field at a time, so a missing or
/// mistyped field is reported by name.
#[derive(Debug, Default)]
pub struct RequestFields(Map<String, Value>);

impl RequestFields {
    pub fn from_json(payload: Result<Json<Value>, JsonRejection>) -> Result<Self, ApiError> {
        let Json(body) = payload?;
        match body {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ApiError::BadRequest(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// `null` counts as absent
    pub fn optional<T: DeserializeOwned>(&mut self, field: &str) -> Result<Option<T>, ApiError> {
        match self.0.remove(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ApiError::invalid(field, format!("Invalid value for {field}: {e}"))),
        }
    }

    pub fn required<T: DeserializeOwned>(&mut self, field: &str) -> Result<T, ApiError> {
        self.optional(field)?.ok_or_else(|| ApiError::missing(field))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(body: Value) -> RequestFields {
        RequestFields::from_json(Ok(Json(body))).unwrap()
    }

    fn field_of(error: ApiError) -> String {
        match error {
            ApiError::Validation { field, .. } => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_type_names_field() {
        let mut body = fields(json!({"current_load": "abc"}));
        let error = body.required::<f64>("current_load").unwrap_err();
        assert_eq!(field_of(error), "current_load");
    }

    #[test]
    fn test_null_and_absent_are_missing() {
        let mut body = fields(json!({"current_load": null}));
        assert_eq!(body.optional::<f64>("current_load").unwrap(), None);
        let error = body.required::<f64>("actual_load").unwrap_err();
        assert!(error.to_string().contains("Missing required field: actual_load"));
    }

    #[test]
    fn test_non_object_body_is_bad_request() {
        let error = RequestFields::from_json(Ok(Json(json!([1, 2])))).unwrap_err();
        assert!(matches!(error, ApiError::BadRequest(_)));
    }
}
