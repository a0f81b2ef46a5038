use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot set both a mapping file and a store directory")]
    BothRuleSources,

    #[error("must set exactly one of mapping file or store directory")]
    NoRuleSource,

    #[error("invalid property mapping for rule {rule}: {reason}")]
    InvalidPropertyMapping { rule: String, reason: &'static str },

    #[error("unsupported derived attribute: {0}")]
    UnsupportedAttribute(String),

    #[error("invalid time zone offset {0:?}, expected +HH:MM or -HH:MM")]
    InvalidTimeZone(String),

    #[error("no container URI found in {0}")]
    UnresolvedDocumentUri(String),

    #[error("document {0} has no source URL")]
    MissingSourceUrl(String),

    #[error("rule {0} has no subject mapping")]
    UnknownRule(String),

    #[error("feature {feature} on annotation #{annotation} does not reference an annotation")]
    UnresolvedReference { annotation: u64, feature: String },

    #[error("not a valid IRI: {0:?}")]
    InvalidIri(String),

    #[error("transaction error: {0}")]
    Transaction(&'static str),

    #[error("store error: {0}")]
    Store(String),

    #[error("cannot parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Configuration errors stop the exporter before any document is touched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ExportError::BothRuleSources
                | ExportError::NoRuleSource
                | ExportError::InvalidPropertyMapping { .. }
                | ExportError::UnsupportedAttribute(_)
                | ExportError::InvalidTimeZone(_)
        )
    }
}

pub type ExportResult<T> = Result<T, ExportError>;
