use crate::contract::ContractStatus;
use sled::transaction::TransactionError;

/// Broad category of a [`ContractError`], used by callers that only care
/// about how to react (retry, fix input, give up).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Parse,
    NotFound,
    BusinessRule,
    Store,
}

#[derive(thiserror::Error, Debug)]
pub enum ContractError {
    #[error("Incorrect number of arguments. Expecting {expected}, got {actual}")]
    ArgumentCount { expected: String, actual: usize },
    #[error("{0} must be a non-empty")]
    EmptyField(&'static str),
    #[error("Composite key part {0:?} contains a reserved NUL byte")]
    InvalidKeyPart(String),
    #[error("Received unknown function invocation: {0}")]
    UnknownFunction(String),
    #[error("Expected {kind} value for {field}")]
    Parse {
        field: &'static str,
        kind: &'static str,
    },
    #[error("Contract {0} not found")]
    NotFound(String),
    #[error("No entries found for index {0}")]
    IndexNotFound(String),
    #[error("Contract {contract_id} is not confirmed (status {status})")]
    NotConfirmed {
        contract_id: String,
        status: ContractStatus,
    },
    #[error("Contract {contract_id} can no longer be signed (status {status})")]
    SigningClosed {
        contract_id: String,
        status: ContractStatus,
    },
    #[error("Contract {0} already exists")]
    AlreadyExists(String),
    #[error(transparent)]
    Store(#[from] sled::Error),
    #[error("Failed to decode stored value: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("Failed to encode value: {0}")]
    Encode(String),
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ArgumentCount { .. }
            | Self::EmptyField(_)
            | Self::InvalidKeyPart(_)
            | Self::UnknownFunction(_) => ErrorKind::Validation,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::NotFound(_) | Self::IndexNotFound(_) => ErrorKind::NotFound,
            Self::NotConfirmed { .. } | Self::SigningClosed { .. } | Self::AlreadyExists(_) => {
                ErrorKind::BusinessRule
            }
            Self::Store(_) | Self::Decode(_) | Self::Encode(_) => ErrorKind::Store,
        }
    }
}

// Aborts raised inside a sled transaction carry our own error back out.
impl From<TransactionError<ContractError>> for ContractError {
    fn from(value: TransactionError<ContractError>) -> Self {
        match value {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => ContractError::Store(e),
        }
    }
}

impl<E: std::fmt::Display> From<minicbor::encode::Error<E>> for ContractError {
    fn from(value: minicbor::encode::Error<E>) -> Self {
        ContractError::Encode(value.to_string())
    }
}
