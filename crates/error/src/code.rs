use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following MUX-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Directory and backend connection errors
/// - **2000-2999**: Query errors
/// - **5000-5999**: Backend payload errors
///
/// Codes are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Connection Errors (1000-1999) ===
    /// MUX-1001: Backend directory could not be consulted
    DirectoryUnavailable = 1001,
    /// MUX-1002: Connection or protocol failure talking to a backend
    TransportFailure = 1002,
    /// MUX-1003: Backend call exceeded the request timeout
    Timeout = 1003,

    // === Query Errors (2000-2999) ===
    /// MUX-2001: CQL syntax error
    SyntaxError = 2001,
    /// MUX-2002: Sort index not supported for the entity type
    UnsupportedSortField = 2002,
    /// MUX-2003: More than one sort key requested
    MultipleSortKeys = 2003,

    // === Payload Errors (5000-5999) ===
    /// MUX-5002: A 200 response body could not be decoded
    MalformedPayload = 5002,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "MUX-2002")
    pub fn as_str(&self) -> String {
        format!("MUX-{:04}", self.as_u16())
    }

    /// Response class at the HTTP boundary.
    ///
    /// A failed directory lookup is reported as 401 because the directory is
    /// only reachable with a valid tenant routing context.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::DirectoryUnavailable => 401,
            Self::SyntaxError | Self::UnsupportedSortField | Self::MultipleSortKeys => 400,
            _ => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let num: u16 = s
            .strip_prefix("MUX-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::DirectoryUnavailable),
            1002 => Ok(Self::TransportFailure),
            1003 => Ok(Self::Timeout),
            2001 => Ok(Self::SyntaxError),
            2002 => Ok(Self::UnsupportedSortField),
            2003 => Ok(Self::MultipleSortKeys),
            5002 => Ok(Self::MalformedPayload),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}
