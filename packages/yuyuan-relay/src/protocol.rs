//! Relay wire shapes.
//!
//! Everything here lives for exactly one request/response cycle. The relay
//! never stores or logs these payloads.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current time as an ISO-8601 UTC string with millisecond precision,
/// e.g. `2025-03-01T08:15:30.123Z`.
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ── Inbound ───────────────────────────────────────────────────────────────────

/// Query parameters for `GET /api/baidu/oauth/2.0/token`.
///
/// Both fields are optional: validity is decided by the upstream provider,
/// and an absent credential is simply not forwarded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenQuery {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Body of `POST /api/baidu/rest/2.0/face/v3/detect`.
///
/// Field values are forwarded as-is, whatever their JSON type; the upstream
/// decides what is valid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaceDetectRequest {
    /// Token from a prior token call; sent upstream as a query parameter.
    pub access_token: Option<Value>,
    pub image: Option<Value>,
    /// `BASE64`, `URL` or `FACE_TOKEN`.
    pub image_type: Option<Value>,
    pub face_field: Option<Value>,
    pub face_type: Option<Value>,
}

impl FaceDetectRequest {
    /// Read a request body the way a lenient JSON body parser would.
    ///
    /// A non-JSON content type, an empty body or a JSON value that is not an
    /// object all yield an empty request, which is still forwarded. Only
    /// syntactically broken JSON is an error.
    pub fn from_body(is_json: bool, body: &[u8]) -> Result<Self, serde_json::Error> {
        if !is_json || body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice::<Value>(body)? {
            object @ Value::Object(_) => serde_json::from_value(object),
            _ => Ok(Self::default()),
        }
    }

    /// Split into the upstream query token and the upstream JSON body.
    pub fn into_parts(self) -> (Option<String>, FaceDetectPayload) {
        let access_token = self.access_token.map(|token| match token {
            Value::String(token) => token,
            other => other.to_string(),
        });
        let payload = FaceDetectPayload {
            image: self.image,
            image_type: self.image_type,
            face_field: self.face_field,
            face_type: self.face_type,
        };
        (access_token, payload)
    }
}

// ── Outbound (relay → Baidu) ──────────────────────────────────────────────────

/// Query string of the upstream token call.
#[derive(Debug, Serialize)]
pub struct TokenParams<'a> {
    pub grant_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<&'a str>,
}

impl<'a> TokenParams<'a> {
    pub fn client_credentials(query: &'a TokenQuery) -> Self {
        Self {
            grant_type: "client_credentials",
            client_id: query.client_id.as_deref(),
            client_secret: query.client_secret.as_deref(),
        }
    }
}

/// JSON body of the upstream face-detection call.
#[derive(Debug, Clone, Serialize)]
pub struct FaceDetectPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_field: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_type: Option<Value>,
}

// ── Relay → Caller ────────────────────────────────────────────────────────────

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
            timestamp: iso_timestamp(),
        }
    }
}

/// Uniform error body returned for every failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Fixed, human-readable category label.
    pub error: String,
    /// Description of the underlying failure.
    pub message: String,
    pub timestamp: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            timestamp: iso_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_iso_timestamp_is_rfc3339_with_millis() {
        let ts = iso_timestamp();
        assert!(ts.ends_with('Z'), "expected UTC designator: {ts}");
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
        // 2025-03-01T08:15:30.123Z
        assert_eq!(ts.len(), 24);
    }

    #[test]
    fn test_face_detect_request_tolerates_missing_fields() {
        let req: FaceDetectRequest =
            serde_json::from_str(r#"{"image":"aGVsbG8=","image_type":"BASE64"}"#).unwrap();
        assert!(req.access_token.is_none());

        let (token, payload) = req.into_parts();
        assert!(token.is_none());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "image": "aGVsbG8=", "image_type": "BASE64" })
        );
    }

    #[test]
    fn test_face_detect_split_keeps_token_out_of_body() {
        let req = FaceDetectRequest {
            access_token: Some(Value::from("24.abc")),
            image: Some(Value::from("img")),
            image_type: Some(Value::from("BASE64")),
            face_field: Some(Value::from("age,beauty")),
            face_type: Some(Value::from("LIVE")),
        };
        let (token, payload) = req.into_parts();
        assert_eq!(token.as_deref(), Some("24.abc"));

        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("access_token"));
        assert!(json.contains("\"face_field\":\"age,beauty\""));
    }

    #[test]
    fn test_face_detect_forwards_non_string_values() {
        let req = FaceDetectRequest::from_body(
            true,
            br#"{"access_token":12345,"image":"x","image_type":1,"face_field":["age"]}"#,
        )
        .unwrap();
        let (token, payload) = req.into_parts();
        assert_eq!(token.as_deref(), Some("12345"));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["image_type"], 1);
        assert_eq!(json["face_field"], serde_json::json!(["age"]));
    }

    #[test]
    fn test_face_detect_from_body_is_lenient() {
        let empty = FaceDetectRequest::from_body(false, br#"{"image":"x"}"#).unwrap();
        assert!(empty.image.is_none());

        let blank = FaceDetectRequest::from_body(true, b"  ").unwrap();
        assert!(blank.access_token.is_none());

        let array = FaceDetectRequest::from_body(true, b"[1,2]").unwrap();
        assert!(array.image.is_none());

        assert!(FaceDetectRequest::from_body(true, b"{not json").is_err());
    }

    #[test]
    fn test_token_params_always_carry_grant_type() {
        let query = TokenQuery {
            client_id: Some("X".to_string()),
            client_secret: None,
        };
        let params = serde_json::to_value(TokenParams::client_credentials(&query)).unwrap();
        assert_eq!(params["grant_type"], "client_credentials");
        assert_eq!(params["client_id"], "X");
        assert!(params.get("client_secret").is_none());
    }

    #[test]
    fn test_error_envelope_shape() {
        let envelope = ErrorEnvelope::new("获取token失败", "timeout of 10000ms exceeded");
        let json = serde_json::to_value(&envelope).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(json["error"], "获取token失败");
        assert_eq!(json["message"], "timeout of 10000ms exceeded");
        assert!(json["timestamp"].is_string());
    }
}
