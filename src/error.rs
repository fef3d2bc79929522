use serde::{Deserialize, Serialize};

/// The machine readable category of a `ContextError`, so that callers can branch on the failure
/// without having to parse the message.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Either the front or the back cover page is missing from the page set.
    IncompleteCoverSet,
    /// No page of type `interior` was supplied for the interior document.
    NoInteriorPages,
    /// A color string could not be parsed as six hexadecimal digits.
    InvalidColor,
    /// A trim size string could not be parsed as `W x H inches`.
    InvalidTrimSize,
    /// The interior page count is not a multiple of four and strict parity was requested.
    InteriorParity,
    /// An illustration could not be fetched, sniffed or decoded.
    Image,
    /// A network transport failure, possibly transient.
    Transport,
    /// The PDF document could not be assembled or serialized.
    Pdf,
    /// The configuration file could not be read or parsed.
    Configuration,
    /// The vendor catalogue could not be reached or understood.
    Catalogue,
    #[default]
    Other,
}

/// A struct that represents an error with a context and possibly the propagated source error.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContextError {
    pub kind: ErrorKind,
    pub context: String,
    pub source_error: Option<String>,
    /// The transport error code (such as `ECONNRESET`) when the error comes from the network.
    pub code: Option<String>,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_error {
            Some(source_error) => write!(
                formatter,
                "{}: {}",
                self.context,
                minimize_first_letter(source_error.to_string()),
            ),
            None => write!(formatter, "{}", self.context),
        }
    }
}

impl std::error::Error for ContextError {}

/// Message fragments which identify a transport failure worth retrying, for errors that carry no code.
const TRANSIENT_MESSAGE_FRAGMENTS: [&str; 4] = [
    "socket hang up",
    "broken pipe",
    "connection reset",
    "connection aborted",
];

/// Transport error codes which identify a failure worth retrying.
const TRANSIENT_CODES: [&str; 3] = ["ECONNRESET", "EPIPE", "ECONNABORTED"];

impl ContextError {
    /// Create a new `ContextError` with the given context.
    pub fn with_context<S: Into<String>>(context: S) -> ContextError {
        ContextError {
            kind: ErrorKind::Other,
            context: context.into(),
            source_error: None,
            code: None,
        }
    }

    /// Create a new `ContextError` with the given context and source error.
    pub fn with_error<S: Into<String>>(context: S, error: &dyn std::error::Error) -> ContextError {
        ContextError {
            kind: ErrorKind::Other,
            context: context.into(),
            source_error: Some(error.to_string()),
            code: None,
        }
    }

    /// Create a new `ContextError` of the given kind.
    pub fn with_kind<S: Into<String>>(kind: ErrorKind, context: S) -> ContextError {
        ContextError {
            kind,
            context: context.into(),
            source_error: None,
            code: None,
        }
    }

    /// Replace the kind of the error, keeping the rest of it.
    pub fn kind(mut self, kind: ErrorKind) -> ContextError {
        self.kind = kind;
        self
    }

    /// Attach a transport error code, which also marks the error as a transport error.
    pub fn with_code<S: Into<String>>(mut self, code: S) -> ContextError {
        self.kind = ErrorKind::Transport;
        self.code = Some(code.into());
        self
    }

    /// Whether the error is a transport failure that is worth retrying: either its code is one of the
    /// known transient codes, or its message mentions a reset or broken connection.
    pub fn is_transient_transport(&self) -> bool {
        if let Some(code) = &self.code {
            if TRANSIENT_CODES.contains(&code.as_str()) {
                return true;
            }
        }
        let message = self.to_string().to_lowercase();
        TRANSIENT_MESSAGE_FRAGMENTS
            .iter()
            .any(|fragment| message.contains(fragment))
    }
}

/// Minimizes the first letter of a string, it is used for standardizing the error message.
fn minimize_first_letter(string: String) -> String {
    let mut characters = string.chars();
    match characters.next() {
        None => String::new(),
        Some(character) => character.to_lowercase().chain(characters).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_context_and_source() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "Disk is full");
        let error = ContextError::with_error("Failed to write the cover", &source);
        assert_eq!(error.to_string(), "Failed to write the cover: disk is full");
    }

    #[test]
    fn transient_errors_are_recognized_by_code_and_message() {
        assert!(ContextError::with_context("Upload failed")
            .with_code("ECONNRESET")
            .is_transient_transport());
        assert!(ContextError::with_context("Upload failed: socket hang up").is_transient_transport());
        assert!(!ContextError::with_context("Upload failed")
            .with_code("EACCES")
            .is_transient_transport());
        assert!(!ContextError::with_kind(ErrorKind::Pdf, "Bad PDF").is_transient_transport());
    }
}
