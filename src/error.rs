//! Error types
//!
//! Every fallible operation in the library returns [`Error`]. ID parsing and
//! validation errors are surfaced verbatim; remote failures carry the
//! operation name and the identifier they were issued for.

use std::fmt;

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The ID is not a well-formed ARM path (odd segment count, missing scope)
    #[error("parsing {input:?}: {reason}")]
    MalformedId { input: String, reason: String },

    /// A segment required by the ID type is absent or empty
    #[error("ID {input:?} was missing the '{segment}' element")]
    MissingSegment { input: String, segment: String },

    /// Segments were left over after every expected segment was consumed
    #[error("ID contained more segments than required: {input:?}, {remaining:?}")]
    UnexpectedSegments {
        input: String,
        remaining: Vec<String>,
    },

    /// The credential file could not be read, decrypted or understood
    #[error("decoding pkcs12 certificate {path:?}: {reason}")]
    CredentialDecode { path: String, reason: String },

    /// The token endpoint rejected the exchange
    #[error("acquiring token from {endpoint}: {reason}")]
    TokenAcquisition {
        endpoint: String,
        status: Option<u16>,
        reason: String,
    },

    /// One or more validation failures, collected rather than reported one at a time
    #[error("{}", ValidationList(.0))]
    Validation(Vec<String>),

    /// The remote API answered with a status the operation does not accept
    #[error("{operation} for {id}: unexpected status {status}: {message}")]
    Api {
        operation: String,
        id: String,
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response
    #[error("{operation} for {id}: {source}")]
    Transport {
        operation: String,
        id: String,
        #[source]
        source: reqwest::Error,
    },

    /// A response or state value did not have the expected shape
    #[error("decoding {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Fields that can only be set at creation time were changed
    #[error("changing {fields:?} on {resource} requires replacing the resource")]
    RequiresReplacement {
        resource: String,
        fields: Vec<String>,
    },

    #[error("configuration: {0}")]
    Config(String),
}

impl Error {
    /// True when the remote object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }

    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Error::MalformedId {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Renders aggregated validation messages the way multi-error lists usually read
struct ValidationList<'a>(&'a [String]);

impl fmt::Display for ValidationList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            [] => write!(f, "validation failed"),
            [single] => write!(f, "1 error occurred:\n\t* {}", single),
            many => {
                write!(f, "{} errors occurred:", many.len())?;
                for message in many {
                    write!(f, "\n\t* {}", message)?;
                }
                Ok(())
            },
        }
    }
}

/// Collects validation messages and turns them into a single error
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self.0))
        }
    }
}
