use std::fmt;
use thiserror::Error;

/// Structural failures of a `DocumentStore` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("no bridge at position {0}")]
    BridgeIndex(usize),
    #[error("bridge {bridge} has no target at position {target}")]
    TargetIndex { bridge: usize, target: usize },
    #[error("auth account '{0}' does not exist")]
    AuthMissing(String),
    #[error("auth account '{0}' already exists")]
    AuthExists(String),
    /// Bridges or targets moved since the form was opened.
    #[error("the control data changed while this form was open, please reopen it")]
    Moved,
}

/// Required fields missing on a staged entity.
///
/// The flags double as form hints: the edit form highlights every field whose flag is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub label_missing: bool,
    pub type_missing: bool,
    /// `type` is absent altogether, not just empty.
    pub type_undefined: bool,
    pub account_missing: bool,
}

impl ValidationError {
    pub fn is_empty(&self) -> bool {
        !(self.label_missing || self.type_missing || self.account_missing)
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        use crate::statics;

        let mut fields = Vec::new();
        if self.account_missing {
            fields.push(statics::EN_HINT_ACCOUNT_REQUIRED);
        }
        if self.type_missing {
            fields.push(statics::EN_HINT_TYPE_REQUIRED);
        }
        if self.label_missing {
            fields.push(statics::EN_HINT_LABEL_REQUIRED);
        }
        fields
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "required fields missing: {}", self.missing_fields().join(", "))
    }
}

impl std::error::Error for ValidationError {}

/// Network or server failure below the HTTP status level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Everything an editor operation can report back to the user.
/// None of these are fatal; the editor stays usable after each one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid control data: {0}")]
    Parse(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("edit session is closed")]
    SessionClosed,
    #[error("field '{0}' cannot be edited in this form")]
    ReservedField(String),
    #[error("field '{0}' only takes text, number or true/false values")]
    NotScalar(String),
    #[error("field name must not be empty")]
    EmptyFieldName,
    #[error("expert mode was not confirmed")]
    ConfirmationDeclined,
}

#[cfg(test)]
mod tests {
    use super::{DocumentError, EditorError, ValidationError};

    #[test]
    fn validation_error_lists_missing_fields_in_form_order() {
        let err = ValidationError {
            label_missing: true,
            type_missing: true,
            type_undefined: true,
            account_missing: false,
        };
        assert_eq!(err.to_string(), "required fields missing: type, label");
        assert!(!err.is_empty());
        assert!(ValidationError::default().is_empty());
    }

    #[test]
    fn document_errors_convert_into_editor_errors() {
        let err: EditorError = DocumentError::AuthExists("svc1".to_string()).into();
        assert_eq!(err.to_string(), "auth account 'svc1' already exists");
    }
}
