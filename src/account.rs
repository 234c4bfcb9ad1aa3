use primitive_types::{H256, U256};
use sha3::{Digest, Keccak256};

/// Keccak-256 of the empty byte string.
///
/// An account whose code hash equals this value holds no contract
/// code. It is never a valid key in the code store.
pub const KECCAK_EMPTY: H256 = H256([
	0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03,
	0xc0, 0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85,
	0xa4, 0x70,
]);

pub fn keccak256(bytes: &[u8]) -> H256 {
	H256::from_slice(Keccak256::digest(bytes).as_slice())
}

/// The Ethereum consensus representation of an account as seen by the
/// EVM. The balance is not stored alongside the record; it is derived
/// from the coin ledger on every read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
	pub nonce: u64,
	pub balance: U256,
	pub code_hash: H256,
}

impl Account {
	/// An account with zero nonce, zero balance and the empty code
	/// hash. Note the code hash is the Keccak-256 of the empty byte
	/// string, never the all-zero placeholder.
	pub fn new_empty() -> Self {
		Self {
			nonce: 0,
			balance: U256::zero(),
			code_hash: KECCAK_EMPTY,
		}
	}

	/// Whether the account carries contract code.
	pub fn is_contract(&self) -> bool {
		self.code_hash != KECCAK_EMPTY
	}

	/// Empty according to EIP-161: zero nonce, zero balance, no code.
	pub fn is_empty(&self) -> bool {
		self.nonce == 0 && self.balance.is_zero() && self.code_hash == KECCAK_EMPTY
	}
}
