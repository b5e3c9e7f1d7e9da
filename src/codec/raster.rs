//! Base64 payload decoding and PNG data URI encoding.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbImage};
use serde_json::Value;

use crate::error::CodecError;

/// Prefix of every data URI produced by [`encode`].
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// JSON object key that carries the base64 payload.
const IMAGE_FIELD: &str = "image";

// =============================================================================
// Decoding
// =============================================================================

/// Decode an image payload into an RGB raster.
///
/// `payload` is either a JSON string or an object holding the string under
/// `"image"`. Anything else (numbers, arrays, null, empty or blank strings)
/// is rejected with [`CodecError::InvalidInput`].
pub fn decode(payload: &Value) -> Result<RgbImage, CodecError> {
    let resolved = match payload {
        Value::Object(map) => map.get(IMAGE_FIELD).unwrap_or(&Value::Null),
        other => other,
    };

    match resolved {
        Value::String(text) => decode_str(text),
        _ => Err(invalid_input()),
    }
}

/// Decode a base64 string, with or without a data URI prefix, into an RGB raster.
///
/// # Errors
///
/// - [`CodecError::InvalidInput`] if the string is empty or only whitespace
/// - [`CodecError::Decode`] if the base64 or the image bytes are malformed
pub fn decode_str(encoded: &str) -> Result<RgbImage, CodecError> {
    if encoded.trim().is_empty() {
        return Err(invalid_input());
    }

    let body = strip_data_uri_prefix(encoded);

    // Line-wrapped payloads are common; whitespace is not part of the alphabet.
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CodecError::Decode(e.to_string()))?;

    let img = image::load_from_memory(&bytes).map_err(|e| CodecError::Decode(e.to_string()))?;

    Ok(img.to_rgb8())
}

/// Strip a leading `data:image/<type>;base64,` header, if present.
///
/// `<type>` must be one or more ASCII letters. Strings without a matching
/// header are returned unchanged.
pub fn strip_data_uri_prefix(encoded: &str) -> &str {
    let Some(rest) = encoded.strip_prefix("data:image/") else {
        return encoded;
    };
    let Some((subtype, body)) = rest.split_once(";base64,") else {
        return encoded;
    };

    if !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphabetic()) {
        body
    } else {
        encoded
    }
}

fn invalid_input() -> CodecError {
    CodecError::InvalidInput("must be a non-empty string".to_string())
}

// =============================================================================
// Encoding
// =============================================================================

/// Serialize an RGB raster as a `data:image/png;base64,...` URI.
pub fn encode(raster: &RgbImage) -> Result<String, CodecError> {
    let mut buf = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| CodecError::Encode(e.to_string()))?;

    let mut uri = String::with_capacity(PNG_DATA_URI_PREFIX.len() + buf.len() * 4 / 3 + 4);
    uri.push_str(PNG_DATA_URI_PREFIX);
    STANDARD.encode_string(&buf, &mut uri);
    Ok(uri)
}

// =============================================================================
// Tests
// =============================================================================
