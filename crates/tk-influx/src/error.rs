use std::fmt;

/// Errors returned by a [`crate::Gateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport failure: the backend could not be reached.
    Connection(String),
    /// Non-success HTTP status.
    Http { status: u16, body: String },
    /// The backend accepted the request but rejected the statement.
    Statement { statement: String, message: String },
    /// A response payload could not be decoded.
    Decode(String),
}

impl GatewayError {
    pub fn is_connection(&self) -> bool {
        matches!(self, GatewayError::Connection(_))
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Connection(msg) => write!(f, "BACKEND_CONNECTION: {msg}"),
            GatewayError::Http { status, body } => {
                write!(f, "BACKEND_HTTP status={status}: {}", body.trim())
            }
            GatewayError::Statement { statement, message } => {
                write!(f, "BACKEND_STATEMENT: {message} (statement: {statement})")
            }
            GatewayError::Decode(msg) => write!(f, "BACKEND_DECODE: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}
