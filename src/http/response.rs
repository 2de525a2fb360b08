//! Mapping relay rejections to HTTP responses.
//!
//! Every rejection is counted under its reason label. A 426 carries the
//! `Upgrade: websocket` header the client was expected to send.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::observability::metrics;
use crate::relay::error::RelayError;

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        metrics::record_rejection(self.reason());

        let mut response = (status, self.to_string()).into_response();
        if status == StatusCode::UPGRADE_REQUIRED {
            let headers = response.headers_mut();
            headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
            headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
        }
        response
    }
}
