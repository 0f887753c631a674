//! Parsing and validation of caller-supplied query descriptions

use serde::Deserialize;

use crate::error::{FindError, Result};
use crate::types::{EchoRequest, Endpoint, QueryRequest, QueryTag};

/// Wire shape of a query description as submitted by the caller
#[derive(Debug, Default, Deserialize)]
struct RawQuery {
    #[serde(default)]
    tags: Vec<QueryTag>,
    #[serde(default)]
    source: Endpoint,
    #[serde(default)]
    target: Endpoint,
}

/// Parse a raw JSON query description into a validated [`QueryRequest`].
///
/// Checks run in a fixed order and short-circuit on the first violation:
/// tags, then source, then target. No side effects; parsing the same input
/// twice yields structurally equal requests.
pub fn parse_request(raw: &str) -> Result<QueryRequest> {
    let raw: RawQuery = serde_json::from_str(raw)
        .map_err(|e| FindError::validation(format!("Invalid query description: {}", e)))?;

    if raw.tags.is_empty() {
        return Err(FindError::validation("Tags not set"));
    }
    if !raw.source.is_valid_source() {
        return Err(FindError::validation("Source not set"));
    }
    if !raw.target.is_valid_target() {
        return Err(FindError::validation("Target not set"));
    }
    for tag in &raw.tags {
        parse_tag_key(&tag.key)?;
    }

    Ok(QueryRequest {
        source: raw.source,
        target: raw.target,
        tags: raw.tags,
    })
}

/// Parse a raw JSON description for a verification request. Same endpoint
/// rules as a query, without the tag requirement.
pub fn parse_echo_request(raw: &str) -> Result<EchoRequest> {
    let raw: RawQuery = serde_json::from_str(raw)
        .map_err(|e| FindError::validation(format!("Invalid query description: {}", e)))?;

    if !raw.source.is_valid_source() {
        return Err(FindError::validation("Source not set"));
    }
    if !raw.target.is_valid_target() {
        return Err(FindError::validation("Target not set"));
    }

    Ok(EchoRequest {
        source: raw.source,
        target: raw.target,
    })
}

/// Parse an up-to-8-hex-digit group+element key into its numeric form
pub fn parse_tag_key(key: &str) -> Result<dicom_core::Tag> {
    if key.is_empty() || key.len() > 8 {
        return Err(FindError::validation(format!("Invalid tag key '{}'", key)));
    }
    let combined = u32::from_str_radix(key, 16)
        .map_err(|_| FindError::validation(format!("Invalid tag key '{}'", key)))?;
    Ok(dicom_core::Tag((combined >> 16) as u16, combined as u16))
}
