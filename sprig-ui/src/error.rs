use thiserror::Error;

/// Failure reported by a [`Host`](crate::host::Host).
///
/// Hosts only know what went wrong on their side; the core attaches the tag
/// or key the failure belongs to when it wraps this into an [`Error`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not create <{tag}>: {source}")]
    Creation {
        tag: String,
        #[source]
        source: HostError,
    },

    #[error("could not register element type <{tag}>: {source}")]
    Registration {
        tag: String,
        #[source]
        source: HostError,
    },

    #[error("invalid lookup pattern `{pattern}`: {source}")]
    LookupPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("<{name}> is already being materialized")]
    MaterializationInProgress { name: String },

    #[error("binding `{key}` has no setter")]
    ReadOnlyBinding { key: String },

    #[error("field `{key}` expects {expected}")]
    FieldType { key: String, expected: &'static str },

    #[error("invalid descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error raised inside a binding getter or setter.
///
/// Returned to the caller of the property access as-is.
pub type BindingError = Box<dyn std::error::Error + 'static>;
