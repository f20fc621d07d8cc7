use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Registered and custom claims of a bearer token
///
/// `aud` is accepted as a single string or an array of strings and written
/// back as a string when it holds exactly one member. Custom claims are kept
/// in a sorted map so the encoded claims are stable for the same input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "serialize_audience",
        deserialize_with = "deserialize_audience"
    )]
    pub aud: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    #[serde(flatten)]
    pub custom: BTreeMap<String, serde_json::Value>,
}

impl Claims {
    /// Claims for `subject` valid over `[issued_at, issued_at + ttl_seconds)`.
    pub fn new(subject: impl Into<String>, issued_at: i64, ttl_seconds: i64) -> Self {
        Self {
            sub: Some(subject.into()),
            iat: Some(issued_at),
            exp: Some(issued_at.saturating_add(ttl_seconds)),
            ..Self::default()
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }

    pub fn with_audience<I, S>(mut self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aud = audience.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(name.into(), value);
        self
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn serialize_audience<S: Serializer>(aud: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    match aud {
        [single] => serializer.serialize_str(single),
        many => many.serialize(serializer),
    }
}

fn deserialize_audience<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(single) => vec![single],
        OneOrMany::Many(many) => many,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_audience_accepts_string_or_array() {
        let single: Claims = serde_json::from_value(json!({ "aud": "svc" })).unwrap();
        assert_eq!(single.aud, vec!["svc"]);

        let many: Claims = serde_json::from_value(json!({ "aud": ["a", "b"] })).unwrap();
        assert_eq!(many.aud, vec!["a", "b"]);

        assert!(serde_json::from_value::<Claims>(json!({ "aud": 7 })).is_err());
    }

    #[test]
    fn test_single_audience_serializes_as_string() {
        let claims = Claims::new("spiffe://example.org/a", 100, 60).with_audience(["svc"]);
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["aud"], json!("svc"));
        assert_eq!(value["exp"], json!(160));
        assert!(value.get("nbf").is_none());
    }

    #[test]
    fn test_custom_claims_are_flattened() {
        let claims: Claims =
            serde_json::from_value(json!({ "sub": "a", "exp": 5, "role": "admin", "n": [1, 2] }))
                .unwrap();
        assert_eq!(claims.custom.get("role"), Some(&json!("admin")));
        assert_eq!(claims.custom.len(), 2);

        let back = serde_json::to_value(&claims).unwrap();
        assert_eq!(back["role"], json!("admin"));
    }
}
