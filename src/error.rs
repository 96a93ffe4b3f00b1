//! Typed error-table dispositions (§7). Each variant maps to exactly one
//! empty-body HTTP status; the non-error dispositions (blacklisted raw
//! tx, forwarded upstream error envelope) carry a body and are
//! constructed directly as [`crate::pipeline`]'s success path, since
//! they are not failures from the gateway's own point of view.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("policy denied: {0}")]
    PolicyDenied(&'static str),

    #[error("client fault: {0}")]
    ClientFault(&'static str),

    #[error("upstream failure: {0}")]
    UpstreamFailure(&'static str),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::PolicyDenied(_) => StatusCode::UNAUTHORIZED,
            GatewayError::ClientFault(_) => StatusCode::BAD_REQUEST,
            GatewayError::UpstreamFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
