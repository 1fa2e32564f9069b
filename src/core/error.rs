use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Payload carried by configuration and validation errors.
///
/// Mirrors the three shapes a validation failure can take: one message, an
/// ordered list of unrelated messages, or messages grouped by the field (or
/// configuration attribute) they concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetail {
    Message(String),
    List(Vec<String>),
    Fields(BTreeMap<String, Vec<String>>),
}

impl ErrorDetail {
    /// Returns every message, flattened in field order.
    pub fn messages(&self) -> Vec<&str> {
        match self {
            Self::Message(message) => vec![message.as_str()],
            Self::List(messages) => messages.iter().map(String::as_str).collect(),
            Self::Fields(fields) => fields
                .values()
                .flat_map(|messages| messages.iter().map(String::as_str))
                .collect(),
        }
    }

    /// Returns the messages recorded for `field`, if the payload is keyed.
    pub fn field_messages(&self, field: &str) -> Option<&[String]> {
        match self {
            Self::Fields(fields) => fields.get(field).map(Vec::as_slice),
            _ => None,
        }
    }

    /// Returns the keys of a field-keyed payload, sorted.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Fields(fields) => fields.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message) => f.write_str(message),
            Self::List(messages) => f.write_str(&messages.join("; ")),
            Self::Fields(fields) => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                    .collect();
                f.write_str(&rendered.join("; "))
            }
        }
    }
}

/// Accumulates field-keyed messages so a check can report every violation
/// in one pass.
#[derive(Debug, Default)]
pub struct FieldErrors {
    entries: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.entries
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_detail(self) -> ErrorDetail {
        ErrorDetail::Fields(self.entries)
    }

    /// Returns `Ok(())` when nothing was recorded, otherwise wraps the
    /// collected payload with `wrap`.
    pub fn into_result(self, wrap: fn(ErrorDetail) -> FreezeError) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        Err(wrap(self.into_detail()))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FreezeError {
    /// Setup mistake: broken field resolution, unknown allow-list field,
    /// invalid delegation or an unsupported bypass argument.
    #[error("Freeze configuration error: {0}")]
    Configuration(ErrorDetail),

    /// Runtime policy violation on a frozen entity.
    #[error("Freeze validation error: {0}")]
    Validation(ErrorDetail),

    #[error("Record '{1}' not found in '{0}'")]
    NotFound(String, String),

    #[error("Record '{1}' already exists in '{0}'")]
    AlreadyExists(String, String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),
}

impl FreezeError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(ErrorDetail::Message(message.into()))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ErrorDetail::Message(message.into()))
    }

    /// Returns the structured payload of configuration and validation errors.
    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            Self::Configuration(detail) | Self::Validation(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<serde_json::Error> for FreezeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FreezeError>;
