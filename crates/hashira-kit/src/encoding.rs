use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
	#[error("invalid base64: {0}")]
	Base64(#[from] base64::DecodeError),
	#[error("decoded bytes are not valid utf-8: {0}")]
	Utf8(#[from] std::string::FromUtf8Error),
	#[error("serialization failed: {0}")]
	Serde(#[from] serde_json::Error),
}

pub fn base64_encode(data: &[u8]) -> Vec<u8> {
	STANDARD.encode(data).into_bytes()
}

pub fn base64_decode(data: &[u8]) -> Result<Vec<u8>, EncodingError> {
	Ok(STANDARD.decode(data)?)
}

pub fn base64_encode_string(s: &str) -> String {
	STANDARD.encode(s)
}

pub fn base64_decode_string(s: &str) -> Result<String, EncodingError> {
	let bytes = STANDARD.decode(s)?;
	Ok(String::from_utf8(bytes)?)
}

/// Serializes any serde value into a self-describing byte buffer.
pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodingError> {
	Ok(serde_json::to_vec(value)?)
}

/// Inverse of [`serialize`].
pub fn deserialize<T: DeserializeOwned>(data: &[u8]) -> Result<T, EncodingError> {
	Ok(serde_json::from_slice(data)?)
}
