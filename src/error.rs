use http::StatusCode;
use std::fmt;

/// Failure of one request inside the routing/dispatch pipeline.
///
/// Every variant is local to the request that produced it and maps onto exactly one
/// HTTP status via [`DispatchError::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Unknown path, or no route on the bound group for the request verb
    NotFound {
        /// Method name (route path) that was looked up
        path: String,
        /// Request verb
        method: String,
    },
    /// The principal lacks the role the matched route requires
    Unauthorized {
        /// Route path
        path: String,
        /// Role the route requires
        required_role: String,
    },
    /// Missing or unconvertible parameter, or a malformed structured body
    BadRequest(String),
    /// The handler returned an error or panicked
    Internal(String),
}

impl DispatchError {
    /// HTTP status for this failure
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        DispatchError::BadRequest(message.into())
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NotFound { path, method } => {
                write!(f, "no route for {method} {path}")
            }
            DispatchError::Unauthorized {
                path,
                required_role,
            } => write!(f, "route {path} requires role '{required_role}'"),
            DispatchError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            DispatchError::Internal(msg) => write!(f, "handler failed: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {}
