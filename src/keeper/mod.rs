//! # Keeper: the capability boundary to the host chain
//!
//! The state database never touches raw keyspaces itself; everything
//! it needs from the outside world is expressed by the
//! [`StateDBKeeper`] trait. [`Keeper`] is the concrete implementation
//! over the auth account records, the coin ledger and the EVM
//! keyspace of the multi-store. All methods take a [`StoreCtx`]
//! handle, so the same keeper serves reads from any branch layer as
//! well as direct access to the committed root.

pub mod auth;
mod bank;

use primitive_types::{H160, H256, U256};

use crate::account::{Account, KECCAK_EMPTY};
use crate::error::Error;
use crate::snapshot::SnapshotCtx;
use crate::store::{StoreCtx, StoreKey};

use self::auth::AuthAccount;

mod keys {
	use primitive_types::{H160, H256};

	pub const CODE_PREFIX: u8 = 0x01;
	pub const STORAGE_PREFIX: u8 = 0x02;
	pub const CREATED_PREFIX: u8 = 0x01;

	pub fn code_key(code_hash: H256) -> Vec<u8> {
		let mut key = Vec::with_capacity(1 + 32);
		key.push(CODE_PREFIX);
		key.extend_from_slice(code_hash.as_bytes());
		key
	}

	pub fn storage_prefix(addr: H160) -> Vec<u8> {
		let mut key = Vec::with_capacity(1 + 20);
		key.push(STORAGE_PREFIX);
		key.extend_from_slice(addr.as_bytes());
		key
	}

	pub fn storage_key(addr: H160, slot: H256) -> Vec<u8> {
		let mut key = storage_prefix(addr);
		key.extend_from_slice(slot.as_bytes());
		key
	}

	pub fn created_key(addr: H160) -> Vec<u8> {
		let mut key = Vec::with_capacity(1 + 20);
		key.push(CREATED_PREFIX);
		key.extend_from_slice(addr.as_bytes());
		key
	}
}

/// Everything the state database requires of the host.
pub trait StateDBKeeper {
	/// The account at `addr`, or `None` when the chain does not know
	/// the address. The balance is reconstructed from the coin
	/// ledger.
	fn get_account(&self, ctx: &StoreCtx, addr: H160) -> Option<Account>;

	/// Stored value of a contract storage slot; zero when absent.
	fn get_state(&self, ctx: &StoreCtx, addr: H160, key: H256) -> H256;

	/// Contract code by its hash; empty when absent.
	fn get_code(&self, ctx: &StoreCtx, code_hash: H256) -> Vec<u8>;

	/// Iterate the contract storage of `addr` in the given context.
	/// The callback returns `false` to stop early.
	fn for_each_storage(
		&self,
		ctx: &StoreCtx,
		addr: H160,
		cb: &mut dyn FnMut(H256, H256) -> bool,
	);

	/// Create or update the account record: sequence, code hash, and
	/// the kind upgrade of plain accounts that become contracts.
	/// Rejects account kinds that cannot hold code.
	fn set_account(&self, ctx: &StoreCtx, addr: H160, account: &Account) -> Result<(), Error>;

	/// Write a storage slot; an all-zero value deletes it.
	fn set_state(&self, ctx: &StoreCtx, addr: H160, key: H256, value: H256);

	/// Store code under its hash; empty code deletes the entry. The
	/// empty code hash is never a key in the code store.
	fn set_code(&self, ctx: &StoreCtx, code_hash: H256, code: &[u8]);

	/// Mint or burn in the EVM denom so the ledger balance of `addr`
	/// reaches `amount`.
	fn set_balance(&self, ctx: &StoreCtx, addr: H160, amount: U256) -> Result<(), Error>;

	/// Remove a contract account entirely: balance, storage and the
	/// account record. Only permitted on accounts that hold code.
	fn delete_account(&self, ctx: &StoreCtx, addr: H160) -> Result<(), Error>;

	/// Drop the buffered write of a storage slot from every live
	/// branch layer, leaving the committed value visible. Commit's
	/// no-op-change suppression is the only caller.
	fn unset_state(&self, ctx: &SnapshotCtx, addr: H160, key: H256);

	/// The keyspace for per-transaction bookkeeping that must never
	/// reach the committed store.
	fn transient_store_key(&self) -> StoreKey;

	/// Addresses of accounts created through this keeper in the
	/// current transaction, as visible from `ctx`.
	fn created_accounts(&self, ctx: &StoreCtx) -> Vec<H160>;

	/// Rewrite the account numbers of `addrs` so they ascend by
	/// address with no gaps, keeping the same number range.
	fn reassign_account_numbers(&self, ctx: &StoreCtx, addrs: &[H160]) -> Result<(), Error>;
}

/// The concrete keeper over the multi-store keyspaces.
pub struct Keeper {
	evm_denom: String,
}

impl Keeper {
	pub fn new(evm_denom: impl Into<String>) -> Self {
		Self {
			evm_denom: evm_denom.into(),
		}
	}

	pub fn evm_denom(&self) -> &str {
		&self.evm_denom
	}

	/// The account number currently assigned to `addr`, if any.
	pub fn account_number(&self, ctx: &StoreCtx, addr: H160) -> Option<u64> {
		auth::get_auth_account(ctx, addr).map(|record| record.number())
	}
}

impl StateDBKeeper for Keeper {
	fn get_account(&self, ctx: &StoreCtx, addr: H160) -> Option<Account> {
		let record = auth::get_auth_account(ctx, addr)?;
		Some(Account {
			nonce: record.sequence(),
			balance: bank::get_balance(ctx, addr, &self.evm_denom),
			code_hash: record.code_hash(),
		})
	}

	fn get_state(&self, ctx: &StoreCtx, addr: H160, key: H256) -> H256 {
		ctx.get(StoreKey::Evm, &keys::storage_key(addr, key))
			.map(|raw| H256::from_slice(&raw))
			.unwrap_or_default()
	}

	fn get_code(&self, ctx: &StoreCtx, code_hash: H256) -> Vec<u8> {
		ctx.get(StoreKey::Evm, &keys::code_key(code_hash))
			.unwrap_or_default()
	}

	fn for_each_storage(
		&self,
		ctx: &StoreCtx,
		addr: H160,
		cb: &mut dyn FnMut(H256, H256) -> bool,
	) {
		let prefix = keys::storage_prefix(addr);
		ctx.for_each_prefix(StoreKey::Evm, &prefix, &mut |key, value| {
			cb(
				H256::from_slice(&key[prefix.len()..]),
				H256::from_slice(value),
			)
		});
	}

	fn set_account(&self, ctx: &StoreCtx, addr: H160, account: &Account) -> Result<(), Error> {
		let mut record = match auth::get_auth_account(ctx, addr) {
			Some(record) => record,
			None => {
				let number = auth::next_account_number(ctx);
				ctx.set(
					self.transient_store_key(),
					&keys::created_key(addr),
					&[],
				);
				AuthAccount::Base {
					number,
					sequence: 0,
				}
			}
		};

		record.set_sequence(account.nonce);

		let record = match record {
			AuthAccount::Eth {
				number, sequence, ..
			} => AuthAccount::Eth {
				number,
				sequence,
				code_hash: account.code_hash,
			},
			AuthAccount::Base { number, sequence } if account.is_contract() => {
				AuthAccount::Eth {
					number,
					sequence,
					code_hash: account.code_hash,
				}
			}
			AuthAccount::Module { .. } if account.is_contract() => {
				return Err(Error::InvalidAccountType(addr, "module"));
			}
			record => record,
		};

		auth::set_auth_account(ctx, addr, &record);
		log::debug!(
			target: "statedb",
			"account updated address={:?} nonce={} code_hash={:?}",
			addr,
			account.nonce,
			account.code_hash,
		);
		Ok(())
	}

	fn set_state(&self, ctx: &StoreCtx, addr: H160, key: H256, value: H256) {
		let raw = keys::storage_key(addr, key);
		if value == H256::zero() {
			ctx.delete(StoreKey::Evm, &raw);
			log::trace!(target: "statedb", "state deleted address={:?} key={:?}", addr, key);
		} else {
			ctx.set(StoreKey::Evm, &raw, value.as_bytes());
			log::trace!(target: "statedb", "state updated address={:?} key={:?}", addr, key);
		}
	}

	fn set_code(&self, ctx: &StoreCtx, code_hash: H256, code: &[u8]) {
		let raw = keys::code_key(code_hash);
		if code.is_empty() || code_hash == KECCAK_EMPTY {
			ctx.delete(StoreKey::Evm, &raw);
			log::trace!(target: "statedb", "code deleted code_hash={:?}", code_hash);
		} else {
			ctx.set(StoreKey::Evm, &raw, code);
			log::trace!(target: "statedb", "code updated code_hash={:?}", code_hash);
		}
	}

	fn set_balance(&self, ctx: &StoreCtx, addr: H160, amount: U256) -> Result<(), Error> {
		let balance = bank::get_balance(ctx, addr, &self.evm_denom);
		if amount > balance {
			bank::mint(ctx, addr, &self.evm_denom, amount - balance);
		} else if amount < balance {
			bank::burn(ctx, addr, &self.evm_denom, balance - amount)?;
		}
		Ok(())
	}

	fn delete_account(&self, ctx: &StoreCtx, addr: H160) -> Result<(), Error> {
		let record = match auth::get_auth_account(ctx, addr) {
			Some(record) => record,
			None => return Ok(()),
		};
		if !matches!(record, AuthAccount::Eth { .. }) {
			return Err(Error::InvalidAccountType(addr, record.kind_name()));
		}

		self.set_balance(ctx, addr, U256::zero())?;

		let mut slots = Vec::new();
		self.for_each_storage(ctx, addr, &mut |key, _| {
			slots.push(key);
			true
		});
		for key in slots {
			self.set_state(ctx, addr, key, H256::zero());
		}

		auth::remove_auth_account(ctx, addr);
		ctx.delete(self.transient_store_key(), &keys::created_key(addr));

		log::debug!(target: "statedb", "account deleted address={:?}", addr);
		Ok(())
	}

	fn unset_state(&self, ctx: &SnapshotCtx, addr: H160, key: H256) {
		let raw = keys::storage_key(addr, key);
		ctx.for_each_layer(|layer| layer.unset(StoreKey::Evm, &raw));
	}

	fn transient_store_key(&self) -> StoreKey {
		StoreKey::Transient
	}

	fn created_accounts(&self, ctx: &StoreCtx) -> Vec<H160> {
		let mut addrs = Vec::new();
		ctx.for_each_prefix(
			self.transient_store_key(),
			&[keys::CREATED_PREFIX],
			&mut |key, _| {
				addrs.push(H160::from_slice(&key[1..]));
				true
			},
		);
		addrs
	}

	fn reassign_account_numbers(&self, ctx: &StoreCtx, addrs: &[H160]) -> Result<(), Error> {
		if addrs.is_empty() {
			return Ok(());
		}

		let mut accounts = Vec::with_capacity(addrs.len());
		for addr in addrs {
			let record =
				auth::get_auth_account(ctx, *addr).ok_or(Error::AccountNotFound(*addr))?;
			accounts.push((*addr, record));
		}

		// The claimed numbers must form a contiguous range; a gap
		// means an account was created behind the keeper's back.
		accounts.sort_by_key(|(_, record)| record.number());
		let start = accounts[0].1.number();
		for (i, (_, record)) in accounts.iter().enumerate() {
			let expected = start + i as u64;
			if record.number() != expected {
				return Err(Error::AccountNumberGap {
					expected,
					got: record.number(),
				});
			}
		}

		accounts.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));
		for (i, (addr, record)) in accounts.iter_mut().enumerate() {
			record.set_number(start + i as u64);
			auth::set_auth_account(ctx, *addr, record);
		}

		log::debug!(
			target: "statedb",
			"account numbers reassigned start={} count={}",
			start,
			accounts.len(),
		);
		Ok(())
	}
}
