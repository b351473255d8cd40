use miette::Diagnostic;
use thiserror::Error;

/// Stable, machine-readable classification of a [`VendingError`].
///
/// The request layer maps these to its own status codes; the string form
/// returned by [`ErrorKind::as_str`] never changes between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Forbidden,
    Unauthorized,
    Conflict,
    NotEnoughDeposit,
    NotEnoughStock,
    Infeasible,
    StorageFailure,
    Inconsistent,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotEnoughDeposit => "not_enough_deposit",
            ErrorKind::NotEnoughStock => "not_enough_stock",
            ErrorKind::Infeasible => "infeasible",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::Inconsistent => "inconsistent",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum VendingError {
    #[error("{0} not found")]
    #[diagnostic(code(vending::not_found))]
    NotFound(String),

    #[error("invalid coin value {0}, accepted coins are 5, 10, 20, 50 and 100")]
    #[diagnostic(code(vending::invalid_input))]
    InvalidCoin(u64),

    #[error("invalid input: {0}")]
    #[diagnostic(code(vending::invalid_input))]
    InvalidInput(String),

    #[error("forbidden: {0}")]
    #[diagnostic(code(vending::forbidden))]
    Forbidden(String),

    #[error("not authorized")]
    #[diagnostic(code(vending::unauthorized))]
    Unauthorized,

    #[error("there is already an active session using this account")]
    #[diagnostic(code(vending::conflict))]
    ActiveSessionExists,

    #[error("an account named {0:?} already exists")]
    #[diagnostic(code(vending::conflict))]
    DuplicateName(String),

    #[error("identity {0} is already taken")]
    #[diagnostic(code(vending::conflict))]
    DuplicateId(String),

    #[error("conflict: {0}")]
    #[diagnostic(code(vending::conflict))]
    Conflict(String),

    #[error("not enough deposit: {deposit} available, {required} required")]
    #[diagnostic(code(vending::not_enough_deposit))]
    NotEnoughDeposit { deposit: u64, required: u64 },

    #[error("not enough items to buy: {available} available, {requested} requested")]
    #[diagnostic(code(vending::not_enough_stock))]
    NotEnoughStock { available: u32, requested: u32 },

    #[error("amount {0} cannot be paid out with the accepted coins")]
    #[diagnostic(
        code(vending::infeasible),
        help("every balance and price must be a multiple of 5")
    )]
    ChangeNotRepresentable(u64),

    #[error("storage error: {0}")]
    #[diagnostic(code(vending::storage_failure))]
    Storage(String),

    #[error("inconsistent state after partial write: {0}")]
    #[diagnostic(code(vending::inconsistent))]
    Inconsistent(String),

    #[error(transparent)]
    #[diagnostic(code(vending::invalid_input))]
    Config(#[from] crate::config::ConfigError),

    #[error("CSV error: {0}")]
    #[diagnostic(code(vending::invalid_input))]
    Csv(#[from] csv::Error),
}

impl VendingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VendingError::NotFound(_) => ErrorKind::NotFound,
            VendingError::InvalidCoin(_)
            | VendingError::InvalidInput(_)
            | VendingError::Config(_)
            | VendingError::Csv(_) => ErrorKind::InvalidInput,
            VendingError::Forbidden(_) => ErrorKind::Forbidden,
            VendingError::Unauthorized => ErrorKind::Unauthorized,
            VendingError::ActiveSessionExists
            | VendingError::DuplicateName(_)
            | VendingError::DuplicateId(_)
            | VendingError::Conflict(_) => ErrorKind::Conflict,
            VendingError::NotEnoughDeposit { .. } => ErrorKind::NotEnoughDeposit,
            VendingError::NotEnoughStock { .. } => ErrorKind::NotEnoughStock,
            VendingError::ChangeNotRepresentable(_) => ErrorKind::Infeasible,
            VendingError::Storage(_) => ErrorKind::StorageFailure,
            VendingError::Inconsistent(_) => ErrorKind::Inconsistent,
        }
    }

    /// True for failures that signal a broken invariant rather than a rejected request.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Infeasible | ErrorKind::Inconsistent)
    }
}

pub type Result<T> = std::result::Result<T, VendingError>;
