//! Account records of the host's auth module: every address known to
//! the chain owns one, tagged by kind and carrying the monotonically
//! assigned account number. Records are RLP lists.

use primitive_types::{H160, H256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

use crate::account::KECCAK_EMPTY;
use crate::store::{StoreCtx, StoreKey};

const ACCOUNT_PREFIX: u8 = 0x01;
const NEXT_ACCOUNT_NUMBER_KEY: &[u8] = &[0x02];

const KIND_BASE: u8 = 0;
const KIND_ETH: u8 = 1;
const KIND_MODULE: u8 = 2;

pub fn account_key(addr: H160) -> Vec<u8> {
	let mut key = Vec::with_capacity(1 + 20);
	key.push(ACCOUNT_PREFIX);
	key.extend_from_slice(addr.as_bytes());
	key
}

/// Host-side account record. Only `Eth` accounts can hold contract
/// code; `Module` accounts belong to the host application and can
/// never be upgraded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthAccount {
	Base {
		number: u64,
		sequence: u64,
	},
	Eth {
		number: u64,
		sequence: u64,
		code_hash: H256,
	},
	Module {
		number: u64,
		name: String,
	},
}

impl AuthAccount {
	pub fn number(&self) -> u64 {
		match self {
			AuthAccount::Base { number, .. } => *number,
			AuthAccount::Eth { number, .. } => *number,
			AuthAccount::Module { number, .. } => *number,
		}
	}

	pub fn set_number(&mut self, n: u64) {
		match self {
			AuthAccount::Base { number, .. } => *number = n,
			AuthAccount::Eth { number, .. } => *number = n,
			AuthAccount::Module { number, .. } => *number = n,
		}
	}

	pub fn sequence(&self) -> u64 {
		match self {
			AuthAccount::Base { sequence, .. } => *sequence,
			AuthAccount::Eth { sequence, .. } => *sequence,
			AuthAccount::Module { .. } => 0,
		}
	}

	pub fn set_sequence(&mut self, seq: u64) {
		match self {
			AuthAccount::Base { sequence, .. } => *sequence = seq,
			AuthAccount::Eth { sequence, .. } => *sequence = seq,
			AuthAccount::Module { .. } => {}
		}
	}

	/// The code hash the record implies; non-contract kinds map to
	/// the empty code hash.
	pub fn code_hash(&self) -> H256 {
		match self {
			AuthAccount::Eth { code_hash, .. } => *code_hash,
			AuthAccount::Base { .. } | AuthAccount::Module { .. } => KECCAK_EMPTY,
		}
	}

	pub fn kind_name(&self) -> &'static str {
		match self {
			AuthAccount::Base { .. } => "base",
			AuthAccount::Eth { .. } => "eth",
			AuthAccount::Module { .. } => "module",
		}
	}
}

impl Encodable for AuthAccount {
	fn rlp_append(&self, s: &mut RlpStream) {
		match self {
			AuthAccount::Base { number, sequence } => {
				s.begin_list(3);
				s.append(&KIND_BASE);
				s.append(number);
				s.append(sequence);
			}
			AuthAccount::Eth {
				number,
				sequence,
				code_hash,
			} => {
				s.begin_list(4);
				s.append(&KIND_ETH);
				s.append(number);
				s.append(sequence);
				s.append(code_hash);
			}
			AuthAccount::Module { number, name } => {
				s.begin_list(3);
				s.append(&KIND_MODULE);
				s.append(number);
				s.append(name);
			}
		}
	}
}

impl Decodable for AuthAccount {
	fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
		match rlp.val_at::<u8>(0)? {
			KIND_BASE => Ok(AuthAccount::Base {
				number: rlp.val_at(1)?,
				sequence: rlp.val_at(2)?,
			}),
			KIND_ETH => Ok(AuthAccount::Eth {
				number: rlp.val_at(1)?,
				sequence: rlp.val_at(2)?,
				code_hash: rlp.val_at(3)?,
			}),
			KIND_MODULE => Ok(AuthAccount::Module {
				number: rlp.val_at(1)?,
				name: rlp.val_at(2)?,
			}),
			_ => Err(DecoderError::Custom("unknown account kind")),
		}
	}
}

pub fn get_auth_account(ctx: &StoreCtx, addr: H160) -> Option<AuthAccount> {
	ctx.get(StoreKey::Auth, &account_key(addr)).map(|raw| {
		rlp::decode(&raw).expect("auth account records are written by this module")
	})
}

pub fn set_auth_account(ctx: &StoreCtx, addr: H160, account: &AuthAccount) {
	ctx.set(StoreKey::Auth, &account_key(addr), &rlp::encode(account));
}

pub fn remove_auth_account(ctx: &StoreCtx, addr: H160) {
	ctx.delete(StoreKey::Auth, &account_key(addr));
}

/// Claim the next free account number, advancing the counter. The
/// counter lives in the auth keyspace, so claims made under a branch
/// that is later dropped are rolled back with it.
pub fn next_account_number(ctx: &StoreCtx) -> u64 {
	let current = ctx
		.get(StoreKey::Auth, NEXT_ACCOUNT_NUMBER_KEY)
		.map(|raw| {
			u64::from_be_bytes(
				raw.as_slice()
					.try_into()
					.expect("account number counter is 8 bytes"),
			)
		})
		.unwrap_or(0);
	ctx.set(
		StoreKey::Auth,
		NEXT_ACCOUNT_NUMBER_KEY,
		&(current + 1).to_be_bytes(),
	);
	current
}
