use std::fmt;

use thiserror::Error;

use crate::state::{HolderId, PositionId};

/// Vault error types
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Amount must be greater than zero (got {amount})")]
    InvalidAmount { amount: u64 },

    #[error("Insufficient shares: {owner} holds {available}, needs {requested}")]
    InsufficientShares {
        owner: HolderId,
        requested: u64,
        available: u64,
    },

    #[error("Insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: u64, available: u64 },

    #[error("Position {id} is locked until {unlocks_at}")]
    PositionLocked { id: PositionId, unlocks_at: i64 },

    #[error("Slippage tolerance exceeded: limit {limit}, actual {actual}")]
    SlippageExceeded { limit: u64, actual: u64 },

    #[error("Unknown position {0}")]
    UnknownPosition(PositionId),

    #[error("{collaborator} failed: {reason:#}")]
    ExternalCollaboratorFailure {
        collaborator: Collaborator,
        reason: anyhow::Error,
    },

    #[error("Vault is paused")]
    VaultPaused,

    #[error("Unauthorized - caller is not vault authority")]
    Unauthorized,

    #[error("Deposit amount below minimum threshold of {minimum}")]
    DepositTooSmall { minimum: u64 },

    #[error("Arithmetic overflow")]
    MathOverflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl VaultError {
    pub(crate) fn collaborator(collaborator: Collaborator) -> impl FnOnce(anyhow::Error) -> Self {
        move |reason| VaultError::ExternalCollaboratorFailure {
            collaborator,
            reason,
        }
    }
}

/// Which injected collaborator produced a failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collaborator {
    AssetConverter,
    StakingVenue,
    Custody,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collaborator::AssetConverter => "asset converter",
            Collaborator::StakingVenue => "staking venue",
            Collaborator::Custody => "custody",
        };
        f.write_str(name)
    }
}

/// Typed causes a collaborator may report through `anyhow`.
///
/// Adapters return these so callers can `downcast_ref` the reason carried by
/// [`VaultError::ExternalCollaboratorFailure`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("conversion output {amount_out} below minimum {min_out}")]
    SlippageExceeded { min_out: u64, amount_out: u64 },

    #[error("deadline {deadline} passed")]
    Expired { deadline: i64 },

    #[error("stake is still locked")]
    StillLocked,

    #[error("liquidity unavailable")]
    Unavailable,
}

/// Result type alias for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Early-return with the given error unless the condition holds.
macro_rules! require {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err);
        }
    };
}

pub(crate) use require;
