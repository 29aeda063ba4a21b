//! GraphQL gateway handler for the axum router.

use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use super::executor::Executor;
use super::request::OperationRequest;

/// Handle a GraphQL operation request.
///
/// Every executed request is answered with 200 and the JSON envelope, even
/// when it carries GraphQL errors. Bodies that are not operation requests
/// get a 400 envelope and never reach the executor. Bodies that cannot be
/// read at all (e.g. over the size limit) get the envelope with the
/// rejection's status.
pub async fn handle_request(
    State(executor): State<Arc<dyn Executor>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(status = %rejection.status(), error = %rejection.body_text(), "Rejecting request body");
            return error_envelope(rejection.status(), rejection.body_text());
        }
    };

    let request = match OperationRequest::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejecting request");
            return error_envelope(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    debug!(operation = ?request.operation, "Executing operation");
    let result = executor.execute(request).await;

    (StatusCode::OK, Json(result)).into_response()
}

fn error_envelope(status: StatusCode, message: String) -> Response {
    let body = json!({
        "errors": [{ "message": message }]
    });
    (status, Json(body)).into_response()
}
