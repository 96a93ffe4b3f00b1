//! Response writer contract (§4.1): a status is written exactly once, a
//! body at most once. A second write attempt is a programming error —
//! detected and suppressed rather than panicking or corrupting the wire.

use crate::types::JsonRpcResponse;
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct ResponseWriter {
    written: AtomicBool,
}

impl ResponseWriter {
    pub fn new() -> Self {
        ResponseWriter {
            written: AtomicBool::new(false),
        }
    }

    pub fn write_json(&self, status: StatusCode, body: JsonRpcResponse) -> Response {
        self.write(status, Some(body))
    }

    pub fn write_empty(&self, status: StatusCode) -> Response {
        self.write(status, None)
    }

    fn write(&self, status: StatusCode, body: Option<JsonRpcResponse>) -> Response {
        if self.written.swap(true, Ordering::SeqCst) {
            tracing::error!("response writer: second write attempted on this request, suppressing");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }

        match body {
            Some(envelope) => {
                let bytes = serde_json::to_vec(&envelope).unwrap_or_default();
                Response::builder()
                    .status(status)
                    .header("Content-Type", "application/json")
                    .body(Body::from(bytes))
                    .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
            }
            None => Response::builder()
                .status(status)
                .body(Body::empty())
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        }
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn first_write_succeeds() {
        let writer = ResponseWriter::new();
        let resp = writer.write_json(
            StatusCode::OK,
            JsonRpcResponse::success(Value::from(1), Value::from("1")),
        );
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn second_write_is_suppressed() {
        let writer = ResponseWriter::new();
        let _first = writer.write_empty(StatusCode::OK);
        let second = writer.write_empty(StatusCode::UNAUTHORIZED);
        assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
