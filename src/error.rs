use primitive_types::{H160, U256};
use thiserror::Error;

/// User-visible failures of state database and keeper operations.
///
/// Failures surfaced by EVM-facing write methods are not returned to
/// the interpreter; the state database records the first of them and
/// `commit` returns it without persisting anything. Invariant
/// violations (revert to an unknown snapshot, refund underflow,
/// out-of-range ephemeral revert index) panic instead.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
	#[error("invalid account type at {0}: {1} account cannot hold contract code")]
	InvalidAccountType(H160, &'static str),

	#[error("insufficient funds at {address}: balance {balance}, need {needed}")]
	InsufficientFunds {
		address: H160,
		balance: U256,
		needed: U256,
	},

	#[error("account number mismatch: expected {expected}, got {got}")]
	AccountNumberGap { expected: u64, got: u64 },

	#[error("account not found: {0}")]
	AccountNotFound(H160),

	#[error(transparent)]
	Precompile(#[from] PrecompileError),
}

/// Rejections raised while validating or applying an enabled
/// precompile set.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PrecompileError {
	#[error("invalid precompile address {0:?}")]
	InvalidAddress(String),

	#[error("precompile addresses not sorted: {0} before {1}")]
	Unsorted(H160, H160),

	#[error("duplicate precompile address {0}")]
	Duplicate(H160),

	#[error("precompile address {0} is not registered")]
	Unregistered(H160),

	#[error("precompile {0} is not initialized")]
	NotInitialized(H160),

	#[error("precompile {0} is already initialized")]
	AlreadyInitialized(H160),
}
