//! Parameter extraction and error sanitizing.

use podium_core::SongRef;
use serde_json::Value;

use super::errors::RpcError;

/// Sanitize an error message for client consumption.
///
/// Domain and parameter messages pass through; internal details do not.
pub fn sanitize_error_message(err: &RpcError) -> String {
    match err {
        RpcError::Internal { .. } => "Internal error".to_string(),
        other => other.to_string(),
    }
}

/// Params as an object, treating absent params as empty.
pub fn params_object(params: Option<&Value>) -> Result<Option<&serde_json::Map<String, Value>>, RpcError> {
    match params {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(RpcError::invalid_params("params must be an object")),
    }
}

/// Optional song reference. Integer IDs are accepted and stringified.
pub fn opt_song_ref(params: Option<&Value>, key: &str) -> Result<Option<SongRef>, RpcError> {
    let Some(map) = params_object(params)? else {
        return Ok(None);
    };
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(SongRef::from(s.as_str()))),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Some(SongRef::from(n.to_string()))),
        Some(_) => Err(RpcError::invalid_params(format!("'{key}' must be a string"))),
    }
}

/// Required song reference.
pub fn require_song_ref(params: Option<&Value>, key: &str) -> Result<SongRef, RpcError> {
    opt_song_ref(params, key)?
        .ok_or_else(|| RpcError::invalid_params(format!("Missing required parameter '{key}'")))
}

/// Optional integer page number.
pub fn opt_page_number(params: Option<&Value>, key: &str) -> Result<Option<i64>, RpcError> {
    let Some(map) = params_object(params)? else {
        return Ok(None);
    };
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| RpcError::invalid_params(format!("'{key}' must be an integer"))),
    }
}

/// Required integer page number.
pub fn require_page_number(params: Option<&Value>, key: &str) -> Result<i64, RpcError> {
    opt_page_number(params, key)?
        .ok_or_else(|| RpcError::invalid_params(format!("Missing required parameter '{key}'")))
}
