// Authentication module
//
// Static bearer token check: the Authorization header must carry
// `Bearer <token>` with the configured API token.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

// Helper function to get header value with case-insensitive matching
fn get_header_case_insensitive(
    headers: &HashMap<String, String>,
    header_name: &str,
) -> Option<String> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(header_name))
        .map(|(_, value)| value.to_string())
}

/// Token is the first space-delimited word after `Bearer `
pub fn extract_bearer_token(headers: &HashMap<String, String>) -> Option<String> {
    let value = get_header_case_insensitive(headers, "Authorization")?;
    value
        .strip_prefix("Bearer ")
        .and_then(|rest| rest.split(' ').next())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
}

/// Compare a presented token against the configured one
///
/// Both sides are hashed first so the comparison time does not depend on
/// how many leading bytes match. An empty configured token matches nothing.
pub fn compare(presented: &str, configured: &str) -> bool {
    if configured.is_empty() {
        return false;
    }

    Sha256::digest(presented.as_bytes()) == Sha256::digest(configured.as_bytes())
}

/// Check the request headers against the configured API token
pub fn authenticate(headers: &HashMap<String, String>, api_token: &str) -> bool {
    match extract_bearer_token(headers) {
        Some(token) => compare(&token, api_token),
        None => false,
    }
}
