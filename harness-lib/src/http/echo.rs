use rama::http::{
    Body, HeaderValue, Response, StatusCode,
    header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE},
    service::web::response::IntoResponse,
};

use crate::payload;

use super::EchoParams;

/// Create the echo response for the given (validated) params:
/// exactly `size` random ASCII letters.
///
/// The caller is responsible for honouring the requested sleep.
pub fn echo_response(params: &EchoParams) -> Response {
    // params are bounded by the server limits, which fit in memory
    let body = payload::random_ascii_letters(params.size as usize);
    text_response(StatusCode::OK, HeaderValue::from_static("text/html"), body)
}

/// Create an error response with a short plain text reason.
pub fn error_response(status: StatusCode, reason: impl Into<String>) -> Response {
    let mut reason = reason.into();
    reason.push('\n');
    text_response(
        status,
        HeaderValue::from_static("text/plain; charset=utf-8"),
        reason,
    )
}

fn text_response(status: StatusCode, content_type: HeaderValue, body: String) -> Response {
    (
        status,
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_LENGTH, HeaderValue::from(body.len())),
            (CONNECTION, HeaderValue::from_static("close")),
        ],
        Body::from(body),
    )
        .into_response()
}
