use encoding_rs::GBK;

use crate::errors::{ApiError, ApiResult};

/// Decode an uploaded file: UTF-8 first, then GBK. Bytes valid in neither
/// are rejected rather than replaced.
pub fn decode_upload(bytes: &[u8]) -> ApiResult<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    GBK.decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| {
            tracing::debug!("Upload decoded as GBK");
            text.into_owned()
        })
        .ok_or_else(|| ApiError::Validation("File content is neither valid UTF-8 nor GBK".to_string()))
}
