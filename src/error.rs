use std::fmt;

/// Main error type for the Ellis server
#[derive(Debug)]
pub enum EllisError {
    /// Configuration or CLI argument errors
    Config(String),

    /// Upstream reported that the requested entity does not exist
    NotFound(String),

    /// Network or HTTP failure talking to the upstream directory
    Transport(String),

    /// Upstream answered with a shape we do not understand
    ProtocolViolation(String),

    /// Malformed or unacceptable request from a protocol client
    Client(String),

    /// System I/O errors
    Io(std::io::Error),

    /// Serialization/deserialization errors
    Serialization(SerializationError),
}

/// Serialization related errors
#[derive(Debug)]
pub enum SerializationError {
    /// JSON serialization/deserialization errors
    Json(serde_json::Error),
}

impl fmt::Display for EllisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EllisError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EllisError::NotFound(msg) => write!(f, "Not found: {}", msg),
            EllisError::Transport(msg) => write!(f, "Transport error: {}", msg),
            EllisError::ProtocolViolation(msg) => write!(f, "Protocol violation: {}", msg),
            EllisError::Client(msg) => write!(f, "Client error: {}", msg),
            EllisError::Io(err) => write!(f, "I/O error: {}", err),
            EllisError::Serialization(err) => write!(f, "Serialization error: {}", err),
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::Json(err) => write!(f, "JSON: {}", err),
        }
    }
}

impl std::error::Error for EllisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EllisError::Io(err) => Some(err),
            EllisError::Serialization(SerializationError::Json(err)) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializationError::Json(err) => Some(err),
        }
    }
}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, EllisError>;

impl EllisError {
    /// Whether this error means upstream has no such entity
    pub fn is_not_found(&self) -> bool {
        matches!(self, EllisError::NotFound(_))
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            EllisError::Config(_) => "configuration_error",
            EllisError::NotFound(_) => "not_found",
            EllisError::Transport(_) => "transport_error",
            EllisError::ProtocolViolation(_) => "protocol_violation",
            EllisError::Client(_) => "client_error",
            EllisError::Io(_) => "io_error",
            EllisError::Serialization(_) => "serialization_error",
        }
    }
}

// Conversions from common error types
impl From<std::io::Error> for EllisError {
    fn from(err: std::io::Error) -> Self {
        EllisError::Io(err)
    }
}

impl From<serde_json::Error> for EllisError {
    fn from(err: serde_json::Error) -> Self {
        EllisError::Serialization(SerializationError::Json(err))
    }
}

impl From<SerializationError> for EllisError {
    fn from(err: SerializationError) -> Self {
        EllisError::Serialization(err)
    }
}

impl From<reqwest::Error> for EllisError {
    fn from(err: reqwest::Error) -> Self {
        EllisError::Transport(err.to_string())
    }
}

impl From<roxmltree::Error> for EllisError {
    fn from(err: roxmltree::Error) -> Self {
        EllisError::ProtocolViolation(format!("unparseable XML: {}", err))
    }
}

// Helper macros for common error construction patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::EllisError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::EllisError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! transport_error {
    ($msg:expr) => {
        $crate::error::EllisError::Transport($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::EllisError::Transport(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! protocol_violation {
    ($msg:expr) => {
        $crate::error::EllisError::ProtocolViolation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::EllisError::ProtocolViolation(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! client_error {
    ($msg:expr) => {
        $crate::error::EllisError::Client($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::EllisError::Client(format!($fmt, $($arg)*))
    };
}
