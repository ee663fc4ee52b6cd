//! Request and response shapes for a uniqueness check.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Opaque textual fingerprint (e.g. a hex-encoded SimHash).
pub type Fingerprint = String;

/// Default upper bound on fingerprints per request.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100_000;

/// A request payload that failed shape or limit checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Path of the offending field, e.g. `fingerprints[3]`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Limits applied to an inbound batch before it reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum fingerprints per request. `0` disables the bound.
    pub max_batch_size: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Ordered batch of fingerprints submitted by one caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniquenessRequest {
    pub fingerprints: Vec<Fingerprint>,
}

impl UniquenessRequest {
    pub fn new<I, S>(fingerprints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Fingerprint>,
    {
        Self {
            fingerprints: fingerprints.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a JSON body of the form `{"fingerprints": ["...", ...]}`.
    ///
    /// Errors name the offending field, so a caller sending
    /// `{"fingerprints": ["a", 7]}` learns that `fingerprints[1]` is a number.
    /// Unknown top-level fields are ignored.
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ValidationError::new("body", format!("invalid JSON: {e}")))?;

        let Value::Object(mut object) = value else {
            return Err(ValidationError::new(
                "body",
                format!("expected an object, found {}", json_kind(&value)),
            ));
        };

        let items = match object.remove("fingerprints") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ValidationError::new(
                    "fingerprints",
                    format!("expected an array, found {}", json_kind(&other)),
                ));
            }
            None => return Err(ValidationError::new("fingerprints", "field required")),
        };

        let fingerprints = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(fp) => Ok(fp),
                other => Err(ValidationError::new(
                    format!("fingerprints[{i}]"),
                    format!("expected a string, found {}", json_kind(&other)),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { fingerprints })
    }

    /// Check the batch against `limits` and reject empty fingerprints.
    pub fn validate(&self, limits: &BatchLimits) -> Result<(), ValidationError> {
        if limits.max_batch_size > 0 && self.fingerprints.len() > limits.max_batch_size {
            return Err(ValidationError::new(
                "fingerprints",
                format!(
                    "batch of {} exceeds the limit of {}",
                    self.fingerprints.len(),
                    limits.max_batch_size
                ),
            ));
        }
        if let Some(i) = self.fingerprints.iter().position(String::is_empty) {
            return Err(ValidationError::new(
                format!("fingerprints[{i}]"),
                "fingerprint must not be empty",
            ));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

/// Outcome of one uniqueness check.
///
/// `total_fingerprints_received == new_fingerprints_found + duplicate_fingerprints_found`
/// always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniquenessResult {
    pub total_fingerprints_received: usize,
    pub new_fingerprints_found: usize,
    pub duplicate_fingerprints_found: usize,
    /// `new / total`, or `0.0` for an empty batch.
    pub global_uniqueness_score: f64,
    /// The fingerprints recorded by this call, in input order.
    #[serde(skip)]
    pub new_fingerprints: Vec<Fingerprint>,
}

impl UniquenessResult {
    /// Result for an empty batch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the result for a batch of `total` fingerprints of which
    /// `new_fingerprints` were not yet stored.
    pub fn from_new(total: usize, new_fingerprints: Vec<Fingerprint>) -> Self {
        let new = new_fingerprints.len();
        debug_assert!(new <= total);
        let score = if total > 0 {
            new as f64 / total as f64
        } else {
            0.0
        };
        Self {
            total_fingerprints_received: total,
            new_fingerprints_found: new,
            duplicate_fingerprints_found: total - new,
            global_uniqueness_score: score,
            new_fingerprints,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_body() {
        let req = UniquenessRequest::from_json(br#"{"fingerprints": ["a1", "b2"], "extra": 1}"#)
            .unwrap();
        assert_eq!(req, UniquenessRequest::new(["a1", "b2"]));
    }

    #[test]
    fn empty_list_is_legal() {
        let req = UniquenessRequest::from_json(br#"{"fingerprints": []}"#).unwrap();
        assert!(req.is_empty());
        assert!(req.validate(&BatchLimits::default()).is_ok());
    }

    #[test]
    fn numeric_member_names_its_index() {
        let err = UniquenessRequest::from_json(br#"{"fingerprints": ["a", 7, "c"]}"#).unwrap_err();
        assert_eq!(err.field, "fingerprints[1]");
        assert!(err.message.contains("number"));
    }

    #[test]
    fn null_member_is_rejected() {
        let err = UniquenessRequest::from_json(br#"{"fingerprints": [null]}"#).unwrap_err();
        assert_eq!(err.field, "fingerprints[0]");
        assert!(err.message.contains("null"));
    }

    #[test]
    fn missing_or_mistyped_field() {
        let err = UniquenessRequest::from_json(br#"{}"#).unwrap_err();
        assert_eq!(err, ValidationError::new("fingerprints", "field required"));

        let err = UniquenessRequest::from_json(br#"{"fingerprints": "abc"}"#).unwrap_err();
        assert_eq!(err.field, "fingerprints");
        assert!(err.message.contains("string"));

        let err = UniquenessRequest::from_json(br#"["abc"]"#).unwrap_err();
        assert_eq!(err.field, "body");
    }

    #[test]
    fn broken_json_is_a_body_error() {
        let err = UniquenessRequest::from_json(br#"{"fingerprints": ["#).unwrap_err();
        assert_eq!(err.field, "body");
        assert!(err.to_string().starts_with("body: invalid JSON"));
    }

    #[test]
    fn validate_enforces_batch_limit() {
        let req = UniquenessRequest::new(["a", "b", "c"]);
        let tight = BatchLimits { max_batch_size: 2 };
        assert_eq!(req.validate(&tight).unwrap_err().field, "fingerprints");

        let unbounded = BatchLimits { max_batch_size: 0 };
        assert!(req.validate(&unbounded).is_ok());
    }

    #[test]
    fn validate_rejects_empty_fingerprint() {
        let req = UniquenessRequest::new(["a", ""]);
        let err = req.validate(&BatchLimits::default()).unwrap_err();
        assert_eq!(err.field, "fingerprints[1]");
    }

    #[test]
    fn result_serializes_public_fields_only() {
        let result = UniquenessResult::from_new(2, vec!["h4".into()]);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "total_fingerprints_received": 2,
                "new_fingerprints_found": 1,
                "duplicate_fingerprints_found": 1,
                "global_uniqueness_score": 0.5,
            })
        );
    }

    #[test]
    fn empty_result_scores_zero() {
        let result = UniquenessResult::empty();
        assert_eq!(result.total_fingerprints_received, 0);
        assert_eq!(result.global_uniqueness_score, 0.0);
    }
}
