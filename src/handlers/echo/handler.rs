//! Echo handler for the axum router.

use bytes::Bytes;
use tracing::info;

/// Body returned for every request.
pub const RESPONSE_BODY: &str = "Hello world";

/// Handle an echo request.
///
/// The body is read to completion and logged as lossy UTF-8, so any payload
/// (including an empty one) is accepted.
pub async fn handle_request(body: Bytes) -> &'static str {
    info!(body = %String::from_utf8_lossy(&body), "got request");
    RESPONSE_BODY
}
