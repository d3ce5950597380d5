use covenant_types::{ContractError, Value};
use thiserror::Error;

/// Why a wrapped call rejected.
///
/// This is a sum type that structurally separates contract violations from
/// the implementation's own rejections, so callers cannot mistake one for the
/// other.
#[derive(Debug, Clone, Error)]
pub enum Rejection {
    /// A declared shape was violated (arguments, result, or rejection reason).
    #[error(transparent)]
    Contract(#[from] ContractError),
    /// The implementation rejected with a reason that satisfied the error
    /// contract. The reason is passed through untouched.
    #[error("rejected with {0}")]
    Raised(Value),
}

impl Rejection {
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract(_))
    }

    #[must_use]
    pub fn contract_error(&self) -> Option<&ContractError> {
        match self {
            Self::Contract(err) => Some(err),
            Self::Raised(_) => None,
        }
    }

    /// The implementation's reason, if this is not a contract violation.
    #[must_use]
    pub fn reason(&self) -> Option<&Value> {
        match self {
            Self::Raised(reason) => Some(reason),
            Self::Contract(_) => None,
        }
    }

    #[must_use]
    pub fn into_reason(self) -> Option<Value> {
        match self {
            Self::Raised(reason) => Some(reason),
            Self::Contract(_) => None,
        }
    }
}
