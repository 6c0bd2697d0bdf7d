use crate::error::{AppError, AppResult};
use sha2::{Digest, Sha256};

/// Compare two secrets through their SHA-256 digests so the comparison time
/// does not depend on where the inputs first differ
fn digests_match(a: &str, b: &str) -> bool {
    let left = Sha256::digest(a.as_bytes());
    let right = Sha256::digest(b.as_bytes());

    left.iter()
        .zip(right.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Verify the `Authorization` header of a scheduled-job request
///
/// # Arguments
/// * `configured_secret` - `CRON_SECRET`; when unset every caller is accepted
/// * `authorization` - Raw `Authorization` header value, if any
///
/// # Returns
/// * `Ok(())` if no secret is configured or the header is `Bearer <secret>`
/// * `Err(AppError::Unauthorized)` otherwise
pub fn verify_cron_secret(
    configured_secret: Option<&str>,
    authorization: Option<&str>,
) -> AppResult<()> {
    let secret = match configured_secret {
        Some(secret) => secret,
        None => return Ok(()),
    };

    let presented = authorization
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if digests_match(presented, secret) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid cron secret".to_string()))
    }
}
