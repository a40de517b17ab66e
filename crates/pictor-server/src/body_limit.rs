use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::CONTENT_LENGTH;
use pictor_imagegen::ImageGenError;

/// Reject requests whose declared `Content-Length` exceeds `limit`
///
/// Runs before the body is read. Bodies without a declared length are left
/// to the extractor limit.
pub async fn content_length_guard(limit: u64, request: Request, next: Next) -> Response {
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    if let Some(declared) = declared
        && declared > limit
    {
        tracing::debug!(declared, limit, "rejecting oversized request body");
        return ImageGenError::PayloadTooLarge(format!(
            "declared {declared} bytes, the limit is {limit} bytes"
        ))
        .into_response();
    }

    next.run(request).await
}
