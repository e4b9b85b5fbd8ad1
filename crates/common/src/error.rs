//! Common error types.

use thiserror::Error;

/// Main error type for the location core.
///
/// Variants that surface to script map onto a DOMException name or a
/// JavaScript error type through [`BrowserError::dom_exception_name`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    #[error("TypeError: {0}")]
    TypeError(String),

    #[error("SyntaxError: {0}")]
    Syntax(String),

    #[error("SecurityError: {0}")]
    Security(String),

    #[error("InvalidStateError: {0}")]
    InvalidState(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;

impl BrowserError {
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    pub fn security(msg: impl Into<String>) -> Self {
        Self::Security(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Name used when the error crosses into script as an exception.
    pub fn dom_exception_name(&self) -> &'static str {
        match self {
            Self::TypeError(_) | Self::UrlParse(_) => "TypeError",
            Self::Syntax(_) => "SyntaxError",
            Self::Security(_) => "SecurityError",
            Self::InvalidState(_) => "InvalidStateError",
            Self::Internal(_) => "Error",
        }
    }

    /// Check if this error is a cross-origin policy violation.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Security(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_names() {
        assert_eq!(BrowserError::type_error("x").dom_exception_name(), "TypeError");
        assert_eq!(BrowserError::syntax("x").dom_exception_name(), "SyntaxError");
        assert_eq!(BrowserError::security("x").dom_exception_name(), "SecurityError");

        let parse: BrowserError = url::Url::parse("no scheme").unwrap_err().into();
        assert_eq!(parse.dom_exception_name(), "TypeError");
    }

    #[test]
    fn test_display_carries_message() {
        let err = BrowserError::security("cross-origin access to \"hash\"");
        assert_eq!(err.to_string(), "SecurityError: cross-origin access to \"hash\"");
        assert!(err.is_security());
    }
}
