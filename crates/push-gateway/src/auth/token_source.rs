//! Bearer-token extraction from handshake data.
//!
//! Client libraries present the token in one of several shapes; extraction
//! is an ordered fallback over them:
//!
//! 1. an `Authorization` HTTP header on the upgrade request
//! 2. an `Authorization` field inside an object-shaped auth payload
//! 3. the auth payload itself when it is a plain string
//! 4. otherwise the token is absent
//!
//! The decoder is a plain function of [`Handshake`] so it is testable
//! without any transport.

use crate::transport::Handshake;

/// Name of the header / auth-payload field carrying the bearer token.
pub const AUTH_HEADER: &str = "Authorization";

/// Where (and whether) the handshake carried a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// `Authorization` HTTP header.
    Header(String),
    /// `Authorization` field of an object-shaped auth payload.
    MapPayload(String),
    /// The auth payload itself was a plain string.
    RawString(String),
    /// No token in any recognized position.
    Absent,
}

impl TokenSource {
    /// Decode the token from handshake data with ordered fallback.
    #[must_use]
    pub fn from_handshake(handshake: &Handshake) -> Self {
        if let Some(value) = handshake.header(AUTH_HEADER) {
            return TokenSource::Header(value.to_string());
        }

        match handshake.auth() {
            Some(serde_json::Value::Object(map)) => map
                .get(AUTH_HEADER)
                .and_then(|v| v.as_str())
                .map_or(TokenSource::Absent, |v| {
                    TokenSource::MapPayload(v.to_string())
                }),
            Some(serde_json::Value::String(raw)) => TokenSource::RawString(raw.clone()),
            _ => TokenSource::Absent,
        }
    }

    /// The extracted token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            TokenSource::Header(t) | TokenSource::MapPayload(t) | TokenSource::RawString(t) => {
                Some(t)
            }
            TokenSource::Absent => None,
        }
    }

    /// Short label for structured log fields.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            TokenSource::Header(_) => "header",
            TokenSource::MapPayload(_) => "auth_map",
            TokenSource::RawString(_) => "auth_raw",
            TokenSource::Absent => "absent",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_header_token() {
        let handshake = Handshake::new(headers(&[("Authorization", "tok-1")]), None, None);

        let source = TokenSource::from_handshake(&handshake);
        assert_eq!(source, TokenSource::Header("tok-1".to_string()));
        assert_eq!(source.token(), Some("tok-1"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let handshake = Handshake::new(headers(&[("authorization", "tok-1")]), None, None);

        assert_eq!(
            TokenSource::from_handshake(&handshake),
            TokenSource::Header("tok-1".to_string())
        );
    }

    #[test]
    fn test_header_wins_over_auth_payload() {
        let handshake = Handshake::new(
            headers(&[("Authorization", "from-header")]),
            Some(json!({ "Authorization": "from-map" })),
            None,
        );

        assert_eq!(
            TokenSource::from_handshake(&handshake),
            TokenSource::Header("from-header".to_string())
        );
    }

    #[test]
    fn test_map_payload_token() {
        let handshake = Handshake::new(
            HashMap::new(),
            Some(json!({ "Authorization": "tok-2" })),
            None,
        );

        let source = TokenSource::from_handshake(&handshake);
        assert_eq!(source, TokenSource::MapPayload("tok-2".to_string()));
    }

    #[test]
    fn test_map_payload_wins_over_raw_shape() {
        // An object payload is never treated as a raw string.
        let handshake = Handshake::new(
            HashMap::new(),
            Some(json!({ "Authorization": "tok-2", "other": "x" })),
            None,
        );

        assert_eq!(
            TokenSource::from_handshake(&handshake),
            TokenSource::MapPayload("tok-2".to_string())
        );
    }

    #[test]
    fn test_raw_string_token() {
        let handshake = Handshake::new(HashMap::new(), Some(json!("tok-3")), None);

        let source = TokenSource::from_handshake(&handshake);
        assert_eq!(source, TokenSource::RawString("tok-3".to_string()));
    }

    #[test]
    fn test_absent_when_no_token_anywhere() {
        let handshake = Handshake::new(headers(&[("X-Other", "x")]), None, None);

        let source = TokenSource::from_handshake(&handshake);
        assert_eq!(source, TokenSource::Absent);
        assert_eq!(source.token(), None);
    }

    #[test]
    fn test_map_without_authorization_field_is_absent() {
        let handshake = Handshake::new(HashMap::new(), Some(json!({ "token": "tok" })), None);

        assert_eq!(TokenSource::from_handshake(&handshake), TokenSource::Absent);
    }

    #[test]
    fn test_non_string_map_value_is_absent() {
        let handshake = Handshake::new(
            HashMap::new(),
            Some(json!({ "Authorization": 12345 })),
            None,
        );

        assert_eq!(TokenSource::from_handshake(&handshake), TokenSource::Absent);
    }

    #[test]
    fn test_non_string_non_object_payload_is_absent() {
        for payload in [json!(42), json!(["tok"]), json!(null), json!(true)] {
            let handshake = Handshake::new(HashMap::new(), Some(payload), None);
            assert_eq!(TokenSource::from_handshake(&handshake), TokenSource::Absent);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(TokenSource::Header("t".into()).label(), "header");
        assert_eq!(TokenSource::MapPayload("t".into()).label(), "auth_map");
        assert_eq!(TokenSource::RawString("t".into()).label(), "auth_raw");
        assert_eq!(TokenSource::Absent.label(), "absent");
    }
}
