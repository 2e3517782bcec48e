//! Error types for model building, parsing and handler application.
//!
//! Every failure is fatal to the current call. Each error carries a technical
//! message (its `Display`) and a localized message that differs only when a
//! [`MessageCatalog`] translates the underlying template.

use thiserror::Error;

use crate::i18n::{Message, MessageCatalog};

/// Classifies a [`CmdlineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An option or the parameter matched, but too few tokens followed it.
    MissingArguments,
    /// No option, command or parameter accepts the token.
    UnsupportedToken,
    /// An option or the parameter occurred too few or too many times.
    CardinalityViolation,
    /// A matched option requires another option that was not given.
    MissingRequiredOption,
    /// Two options that conflict with each other were both given.
    ConflictingOptions,
    /// A conversion handler rejected its arguments.
    HandlerApplicationFailure,
    /// The configured default command does not exist.
    UnknownDefaultCommand,
    /// The declared model is inconsistent (duplicate names, bad counts,
    /// dangling references, no suitable handler, ...).
    ModelInconsistency,
    /// An argument file could not be found or read.
    ArgumentFile,
}

/// The single error type surfaced by the parser.
///
/// # Examples
///
/// ```
/// use optbind_core::{CmdlineError, ErrorKind, Message, MessageCatalog};
///
/// let err = CmdlineError::new(
///     ErrorKind::UnsupportedToken,
///     Message::new("Unsupported option or parameter found: {0}").arg("-x"),
///     &MessageCatalog::default(),
/// );
/// assert_eq!(err.kind(), ErrorKind::UnsupportedToken);
/// assert_eq!(err.to_string(), "Unsupported option or parameter found: -x");
/// assert_eq!(err.localized_message(), err.to_string());
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CmdlineError {
    kind: ErrorKind,
    message: String,
    localized: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl CmdlineError {
    /// Builds an error from a prepared message.
    pub fn new(kind: ErrorKind, message: Message, catalog: &MessageCatalog) -> Self {
        Self {
            kind,
            message: message.render(),
            localized: message.translate(catalog),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Wraps a handler failure, keeping both of its messages.
    pub(crate) fn from_handler(err: HandlerError, catalog: &MessageCatalog) -> Self {
        Self {
            kind: ErrorKind::HandlerApplicationFailure,
            message: err.message.render(),
            localized: err.message.translate(catalog),
            source: Some(Box::new(err)),
        }
    }

    /// The error classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The technical message (same as `Display`).
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The user-facing, possibly translated message.
    pub fn localized_message(&self) -> &str {
        &self.localized
    }
}

/// Convenience alias for results with [`CmdlineError`].
pub type Result<T, E = CmdlineError> = std::result::Result<T, E>;

/// Error raised by an [`OptionHandler`](crate::OptionHandler).
///
/// # Examples
///
/// ```
/// use optbind_core::HandlerError;
///
/// let err = HandlerError::invalid_value("abc", "i64");
/// assert_eq!(err.to_string(), "Could not parse argument \"abc\" as i64.");
/// ```
#[derive(Debug, Error)]
#[error("{}", .message.render())]
pub struct HandlerError {
    message: Message,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl HandlerError {
    /// Builds a handler error from a prepared message.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            source: None,
        }
    }

    /// Builds a handler error from free text.
    pub fn msg(text: impl Into<String>) -> Self {
        Self::new(Message::new(text))
    }

    /// The argument could not be converted to the expected type.
    pub fn invalid_value(value: &str, expected: &str) -> Self {
        Self::new(
            Message::new("Could not parse argument \"{0}\" as {1}.")
                .arg(value)
                .arg(expected),
        )
    }

    /// The handler was asked to apply arguments to a target it cannot write.
    pub fn unsupported_target(args: &[String], target: &str) -> Self {
        Self::new(
            Message::new("Could not apply parameters {0} to {1}")
                .arg(format!("{args:?}"))
                .arg(target),
        )
    }

    /// Attaches the underlying cause.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The prepared message.
    pub fn message(&self) -> &Message {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_localized_message_uses_catalog() {
        let mut catalog = MessageCatalog::default();
        catalog.insert(
            "Unsupported option or parameter found: {0}",
            "Unbekannt: {0}",
        );
        let err = CmdlineError::new(
            ErrorKind::UnsupportedToken,
            Message::new("Unsupported option or parameter found: {0}").arg("-q"),
            &catalog,
        );
        assert_eq!(err.message(), "Unsupported option or parameter found: -q");
        assert_eq!(err.localized_message(), "Unbekannt: -q");
    }

    #[test]
    fn test_handler_error_is_preserved_as_source() {
        let err = CmdlineError::from_handler(
            HandlerError::invalid_value("x", "u8"),
            &MessageCatalog::default(),
        );
        assert_eq!(err.kind(), ErrorKind::HandlerApplicationFailure);
        assert_eq!(err.message(), "Could not parse argument \"x\" as u8.");
        assert!(err.source().is_some());
    }
}
