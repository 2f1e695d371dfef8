//! Reversible text wrapping for the store file.
//!
//! The JSON document is base64 encoded so the file stays plain ASCII. This is
//! not encryption: anyone can decode it, and nothing secret is stored.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value;
use thiserror::Error;

use super::document::SessionDocument;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Store content is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Decoded store content is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Store content is not a valid session document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Store content is not a JSON object")]
    NotAnObject,
}

/// Serialize `document` to compact JSON and wrap it as base64 text.
pub fn encode(document: &SessionDocument) -> Result<String, CodecError> {
    let json = serde_json::to_vec(document)?;
    Ok(STANDARD.encode(json))
}

/// Unwrap base64 text into the JSON value it carries.
///
/// Surrounding whitespace, such as a trailing newline added by an editor, is
/// tolerated.
pub fn decode_value(encoded: &[u8]) -> Result<Value, CodecError> {
    let trimmed = encoded.trim_ascii();
    let json = String::from_utf8(STANDARD.decode(trimmed)?)?;
    let value: Value = serde_json::from_str(&json)?;
    if !value.is_object() {
        return Err(CodecError::NotAnObject);
    }
    Ok(value)
}
