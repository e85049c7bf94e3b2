use thiserror::Error;

use crate::ledger::LedgerError;

/// Rejected user input. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("maturity should be an integer, got {0:?}")]
    MaturityNotInteger(String),
    #[error("maturity must be between 1 and 364, got {0}")]
    MaturityOutOfRange(i64),
    #[error("par should be an integer, got {0:?}")]
    ParNotInteger(String),
    #[error("par must be at least 1, got {0}")]
    ParOutOfRange(i64),
    #[error("discount should be an integer, got {0:?}")]
    DiscountNotInteger(String),
}

/// Canonical error type exposed by the registry core.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed or out-of-range input.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The ledger refused to build a key for this identifier.
    #[error("failed to generate key for {object_type} {id}")]
    KeyGeneration {
        object_type: String,
        id: String,
        #[source]
        source: LedgerError,
    },

    /// No entry at the derived key.
    #[error("{object_type} {id} does not exist")]
    NotFound { object_type: String, id: String },

    /// The world state read itself failed.
    #[error("failed to read world state")]
    Read(#[source] LedgerError),

    /// The world state write itself failed.
    #[error("failed to write world state")]
    Write(#[source] LedgerError),

    /// Writing back a market after appending listings failed.
    #[error("failed to update market {market_id}")]
    Update {
        market_id: String,
        #[source]
        source: LedgerError,
    },

    #[error("failed to serialize {shape}: {reason}")]
    Serialization { shape: &'static str, reason: String },

    /// `payload` is the raw stored value, for diagnosis.
    #[error("failed to deserialize {shape}: {payload}")]
    Deserialization {
        shape: &'static str,
        payload: String,
        reason: String,
    },

    #[error("unknown contract function {0}")]
    UnknownFunction(String),

    #[error("{function} expects {expected} arguments, got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;
