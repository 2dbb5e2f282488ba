use asc_core::{AuthError, ClientError, QueryParams};
use serde_json::{Map, Value, json};

/// A tool-level failure, reported to the agent as an `isError` tool result.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ToolError {
    pub code: String,
    pub message: String,
    pub field: Option<String>,
    pub details: Option<Value>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_failed", message)
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn to_value(&self) -> Value {
        let mut payload = json!({
            "error": self.code,
            "message": self.message
        });
        if let Some(field) = &self.field {
            payload["field"] = Value::String(field.clone());
        }
        if let Some(details) = &self.details {
            payload["details"] = details.clone();
        }
        payload
    }
}

impl From<ClientError> for ToolError {
    fn from(err: ClientError) -> Self {
        let message = err.to_string();
        match err {
            ClientError::Auth(AuthError::MissingConfig { .. }) => {
                ToolError::new("auth_configuration_error", message)
            }
            ClientError::Auth(_) => ToolError::new("auth_error", message),
            ClientError::Api { status, errors, .. } => {
                let entries: Vec<Value> = errors
                    .iter()
                    .map(|entry| {
                        json!({
                            "status": entry.status,
                            "code": entry.code,
                            "title": entry.title,
                            "detail": entry.detail
                        })
                    })
                    .collect();
                ToolError::new("api_error", message)
                    .with_details(json!({ "status": status, "errors": entries }))
            }
            ClientError::InvalidUrl(_) => ToolError::validation(message).with_field("path"),
            ClientError::Transport(_) => ToolError::new("transport_error", message),
            ClientError::Decode { .. } => ToolError::new("decode_error", message),
        }
    }
}

pub(crate) fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    let value = args.get(key).ok_or_else(|| {
        ToolError::validation(format!("Missing required field '{key}'")).with_field(key)
    })?;
    match value {
        Value::String(v) if !v.trim().is_empty() => Ok(v.clone()),
        Value::String(_) => {
            Err(ToolError::validation(format!("'{key}' must not be empty")).with_field(key))
        }
        _ => Err(ToolError::validation(format!("'{key}' must be a string")).with_field(key)),
    }
}

/// A required resource id that is interpolated into a request path.
pub(crate) fn required_id(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    let id = required_string(args, key)?;
    if id.contains(['/', '?', '#']) {
        return Err(ToolError::validation(format!(
            "'{key}' must be a single resource id, not a path"
        ))
        .with_field(key));
    }
    Ok(id.trim().to_string())
}

/// Optional string where blank counts as absent.
pub(crate) fn arg_optional_string(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(ToolError::validation(format!("'{key}' must be a string")).with_field(key)),
    }
}

/// Optional string that keeps empty values, for attributes an update may clear.
pub(crate) fn arg_present_string(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(ToolError::validation(format!("'{key}' must be a string")).with_field(key)),
    }
}

pub(crate) fn arg_bool(args: &Map<String, Value>, key: &str, default: bool) -> Result<bool, ToolError> {
    Ok(arg_optional_bool(args, key)?.unwrap_or(default))
}

pub(crate) fn arg_optional_bool(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<bool>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(v)) => Ok(Some(*v)),
        Some(_) => Err(ToolError::validation(format!("'{key}' must be a boolean")).with_field(key)),
    }
}

pub(crate) fn arg_optional_u64(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<u64>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| {
                ToolError::validation(format!("'{key}' must be an unsigned integer"))
                    .with_field(key)
            })
            .map(Some),
        Some(_) => Err(
            ToolError::validation(format!("'{key}' must be an unsigned integer")).with_field(key),
        ),
    }
}

pub(crate) fn arg_bounded_u64(
    args: &Map<String, Value>,
    key: &str,
    min: u64,
    max: u64,
) -> Result<Option<u64>, ToolError> {
    match arg_optional_u64(args, key)? {
        Some(value) if !(min..=max).contains(&value) => Err(ToolError::validation(format!(
            "'{key}' must be between {min} and {max}"
        ))
        .with_field(key)),
        other => Ok(other),
    }
}

pub(crate) fn arg_optional_enum(
    args: &Map<String, Value>,
    key: &str,
    allowed: &[&str],
) -> Result<Option<String>, ToolError> {
    let Some(raw) = arg_optional_string(args, key)? else {
        return Ok(None);
    };
    if allowed.contains(&raw.as_str()) {
        Ok(Some(raw))
    } else {
        Err(ToolError::validation(format!(
            "'{key}' must be one of: {}",
            allowed.join(", ")
        ))
        .with_field(key)
        .with_details(json!({ "received": raw })))
    }
}

pub(crate) fn required_enum(
    args: &Map<String, Value>,
    key: &str,
    allowed: &[&str],
) -> Result<String, ToolError> {
    arg_optional_enum(args, key, allowed)?.ok_or_else(|| {
        ToolError::validation(format!("Missing required field '{key}'")).with_field(key)
    })
}

pub(crate) fn required_string_array(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Vec<String>, ToolError> {
    let items = args.get(key).and_then(Value::as_array).ok_or_else(|| {
        ToolError::validation(format!("'{key}' must be an array of strings")).with_field(key)
    })?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let text = item.as_str().map(str::trim).ok_or_else(|| {
            ToolError::validation(format!("'{key}' items must be strings")).with_field(key)
        })?;
        if !text.is_empty() {
            out.push(text.to_string());
        }
    }
    if out.is_empty() {
        return Err(
            ToolError::validation(format!("'{key}' must contain at least one id")).with_field(key),
        );
    }
    Ok(out)
}

/// Reads a query map given as `{name: value}` or as `[{key, value}]`.
/// Null values are dropped; scalars are stringified.
pub(crate) fn parse_query_params(
    query_value: Option<&Value>,
    field: &str,
) -> Result<QueryParams, ToolError> {
    let mut params = QueryParams::new();
    match query_value {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (key, value) in map {
                if !value.is_null() {
                    params.set(key.clone(), scalar_to_string(value, field)?);
                }
            }
        }
        Some(Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                let obj = item.as_object().ok_or_else(|| {
                    ToolError::validation(format!(
                        "{field}[{index}] must be an object with key/value"
                    ))
                    .with_field(field)
                })?;
                let key = obj
                    .get("key")
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| {
                        ToolError::validation(format!(
                            "{field}[{index}].key must be a non-empty string"
                        ))
                        .with_field(field)
                    })?;
                match obj.get("value") {
                    Some(Value::Null) | None => {}
                    Some(value) => {
                        params.set(key, scalar_to_string(value, field)?);
                    }
                }
            }
        }
        Some(_) => {
            return Err(ToolError::validation(format!(
                "'{field}' must be an object map or [{{key,value}}] array"
            ))
            .with_field(field));
        }
    }
    Ok(params)
}

pub(crate) fn scalar_to_string(value: &Value, field: &str) -> Result<String, ToolError> {
    match value {
        Value::String(v) => Ok(v.clone()),
        Value::Number(v) => Ok(v.to_string()),
        Value::Bool(v) => Ok(v.to_string()),
        _ => Err(ToolError::validation(format!(
            "'{field}' values must be scalar (string/number/bool)"
        ))
        .with_field(field)),
    }
}

pub(crate) fn normalize_api_path(raw: &str) -> Result<String, ToolError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ToolError::validation("API path must not be empty").with_field("path"));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Err(
            ToolError::validation("Pass API path only (e.g. /v1/apps), not full URL")
                .with_field("path"),
        );
    }
    if trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("test args must be an object, got {other}"),
        }
    }

    #[test]
    fn required_string_rejects_missing_blank_and_non_string() {
        let input = args(json!({ "blank": "  ", "number": 7, "ok": "123" }));
        assert_eq!(required_string(&input, "ok").unwrap(), "123");
        assert_eq!(
            required_string(&input, "missing").unwrap_err().field.as_deref(),
            Some("missing")
        );
        assert!(required_string(&input, "blank").unwrap_err().message.contains("empty"));
        assert!(required_string(&input, "number").unwrap_err().message.contains("string"));
    }

    #[test]
    fn required_id_rejects_path_fragments() {
        let input = args(json!({ "app_id": "123/../users", "version_id": "abc" }));
        assert!(required_id(&input, "app_id").is_err());
        assert_eq!(required_id(&input, "version_id").unwrap(), "abc");
    }

    #[test]
    fn optional_and_present_strings_differ_on_empty() {
        let input = args(json!({ "keywords": "", "copyright": null }));
        assert_eq!(arg_optional_string(&input, "keywords").unwrap(), None);
        assert_eq!(
            arg_present_string(&input, "keywords").unwrap(),
            Some(String::new())
        );
        assert_eq!(arg_present_string(&input, "copyright").unwrap(), None);
    }

    #[test]
    fn bounded_u64_enforces_range() {
        let input = args(json!({ "low": 0, "high": 201, "ok": 200, "neg": -1 }));
        assert!(arg_bounded_u64(&input, "low", 1, 200).is_err());
        assert!(arg_bounded_u64(&input, "high", 1, 200).is_err());
        assert!(arg_bounded_u64(&input, "neg", 1, 200).is_err());
        assert_eq!(arg_bounded_u64(&input, "ok", 1, 200).unwrap(), Some(200));
        assert_eq!(arg_bounded_u64(&input, "absent", 1, 200).unwrap(), None);
    }

    #[test]
    fn enum_arguments_must_be_in_the_allowed_set() {
        let input = args(json!({ "platform": "ANDROID", "state": "VALID" }));
        let err = arg_optional_enum(&input, "platform", &["IOS", "MAC_OS"]).unwrap_err();
        assert_eq!(err.message, "'platform' must be one of: IOS, MAC_OS");
        assert_eq!(
            arg_optional_enum(&input, "state", &["VALID", "INVALID"]).unwrap(),
            Some("VALID".to_string())
        );
        assert!(required_enum(&input, "missing", &["IOS"]).is_err());
    }

    #[test]
    fn string_array_drops_blanks_but_requires_one_item() {
        let input = args(json!({ "ids": ["b1", " ", "b2"], "empty": [], "mixed": ["b1", 2] }));
        assert_eq!(required_string_array(&input, "ids").unwrap(), vec!["b1", "b2"]);
        assert!(required_string_array(&input, "empty").is_err());
        assert!(required_string_array(&input, "mixed").is_err());
        assert!(required_string_array(&input, "missing").is_err());
    }

    #[test]
    fn query_params_accept_object_and_array() {
        let from_object = parse_query_params(
            Some(&json!({ "limit": 5, "filter[expired]": false, "skip": null })),
            "params",
        )
        .unwrap();
        assert_eq!(from_object.get("limit"), Some("5"));
        assert_eq!(from_object.get("filter[expired]"), Some("false"));
        assert_eq!(from_object.get("skip"), None);

        let from_array = parse_query_params(
            Some(&json!([{ "key": "include", "value": "builds" }])),
            "params",
        )
        .unwrap();
        assert_eq!(from_array.get("include"), Some("builds"));

        assert!(parse_query_params(Some(&json!("limit=5")), "params").is_err());
        assert!(parse_query_params(Some(&json!({ "nested": {} })), "params").is_err());
    }

    #[test]
    fn normalize_api_path_adds_leading_slash_and_rejects_urls() {
        assert_eq!(normalize_api_path("v1/apps").unwrap(), "/v1/apps");
        assert_eq!(normalize_api_path(" /v2/inAppPurchases ").unwrap(), "/v2/inAppPurchases");
        assert!(normalize_api_path("").is_err());
        assert!(normalize_api_path("https://api.appstoreconnect.apple.com/v1/apps").is_err());
    }

    #[test]
    fn api_failures_keep_status_and_entries() {
        let err = ClientError::from_failed_response(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"errors":[{"status":"404","code":"NOT_FOUND","title":"Missing","detail":"No app"}]}"#,
        );
        let tool_error = ToolError::from(err);
        assert_eq!(tool_error.code, "api_error");
        assert!(tool_error.message.contains("404 NOT_FOUND: Missing - No app"));
        let details = tool_error.details.expect("details should be attached");
        assert_eq!(details["status"], 404);
        assert_eq!(details["errors"][0]["code"], "NOT_FOUND");
    }

    #[test]
    fn missing_configuration_maps_to_its_own_code() {
        let err = ClientError::Auth(AuthError::MissingConfig {
            missing: vec!["APP_STORE_CONNECT_KEY_ID"],
        });
        let tool_error = ToolError::from(err);
        assert_eq!(tool_error.code, "auth_configuration_error");
        assert_eq!(
            tool_error.to_value(),
            json!({
                "error": "auth_configuration_error",
                "message": "Missing required environment variables: APP_STORE_CONNECT_KEY_ID"
            })
        );
    }
}
