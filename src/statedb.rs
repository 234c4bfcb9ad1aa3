//! # The EVM-facing state database
//!
//! One `StateDB` lives for exactly one transaction: the host creates
//! it over the committed context, the interpreter drives it, and the
//! host either commits once or drops it. Key/value state rides on
//! branched store snapshots; refunds, logs, suicides, the touched
//! set and dirty storage keys ride on the append-only ephemeral
//! store; the access list keeps its own undo journal. Snapshot and
//! revert move all three in lockstep.
//!
//! Write methods never return errors to the interpreter. The first
//! failure a write encounters is recorded and surfaced by `commit`,
//! which then persists nothing, keeping transactions all-or-nothing.

use primitive_types::{H160, H256, U256};

use crate::access_list::{AccessList, Journal, JournalEntry};
use crate::account::{keccak256, Account, KECCAK_EMPTY};
use crate::ephemeral::EphemeralStore;
use crate::error::Error;
use crate::keeper::StateDBKeeper;
use crate::snapshot::SnapshotCtx;
use crate::store::StoreCtx;
use crate::types::{Log, TxConfig};

pub struct StateDB<'a, K> {
	keeper: &'a K,
	ctx: SnapshotCtx,
	tx_config: TxConfig,

	ephemeral: EphemeralStore,
	access_list: AccessList,
	journal: Journal,

	/// First error a write path ran into; commit surfaces it.
	err: Option<Error>,
}

impl<'a, K: StateDBKeeper> StateDB<'a, K> {
	pub fn new(root: StoreCtx, keeper: &'a K, tx_config: TxConfig) -> Self {
		Self {
			keeper,
			ctx: SnapshotCtx::new(root),
			tx_config,
			ephemeral: EphemeralStore::new(),
			access_list: AccessList::new(),
			journal: Journal::new(),
			err: None,
		}
	}

	pub fn keeper(&self) -> &K {
		self.keeper
	}

	pub fn tx_config(&self) -> &TxConfig {
		&self.tx_config
	}

	fn record_err(&mut self, err: Error) {
		if self.err.is_none() {
			self.err = Some(err);
		}
	}

	fn get_or_new_account(&self, addr: H160) -> Account {
		self.keeper
			.get_account(&self.ctx.current(), addr)
			.unwrap_or_else(Account::new_empty)
	}

	// ------------------------------------------------------------------
	// Reads

	/// Whether the account exists. Suicided accounts still exist
	/// until commit.
	pub fn exist(&self, addr: H160) -> bool {
		self.keeper.get_account(&self.ctx.current(), addr).is_some()
	}

	/// Non-existent or empty per EIP-161.
	pub fn empty(&self, addr: H160) -> bool {
		match self.keeper.get_account(&self.ctx.current(), addr) {
			Some(account) => account.is_empty(),
			None => true,
		}
	}

	pub fn get_balance(&self, addr: H160) -> U256 {
		self.keeper
			.get_account(&self.ctx.current(), addr)
			.map(|account| account.balance)
			.unwrap_or_default()
	}

	pub fn get_nonce(&self, addr: H160) -> u64 {
		self.keeper
			.get_account(&self.ctx.current(), addr)
			.map(|account| account.nonce)
			.unwrap_or_default()
	}

	pub fn get_code_hash(&self, addr: H160) -> H256 {
		self.keeper
			.get_account(&self.ctx.current(), addr)
			.map(|account| account.code_hash)
			.unwrap_or_default()
	}

	pub fn get_code(&self, addr: H160) -> Vec<u8> {
		let ctx = self.ctx.current();
		match self.keeper.get_account(&ctx, addr) {
			Some(account) if account.code_hash != KECCAK_EMPTY => {
				self.keeper.get_code(&ctx, account.code_hash)
			}
			_ => Vec::new(),
		}
	}

	pub fn get_code_size(&self, addr: H160) -> usize {
		self.get_code(addr).len()
	}

	/// Storage slot as visible to the running transaction.
	pub fn get_state(&self, addr: H160, key: H256) -> H256 {
		self.keeper.get_state(&self.ctx.current(), addr, key)
	}

	/// Storage slot as of the last commit, bypassing every in-flight
	/// snapshot.
	pub fn get_committed_state(&self, addr: H160, key: H256) -> H256 {
		self.keeper.get_state(self.ctx.root(), addr, key)
	}

	pub fn get_refund(&self) -> u64 {
		self.ephemeral.current_refund()
	}

	pub fn has_suicided(&self, addr: H160) -> bool {
		self.ephemeral.is_suicided(addr)
	}

	/// Logs recorded so far, already stamped.
	pub fn logs(&self) -> &[Log] {
		self.ephemeral.all_logs()
	}

	/// Accounts touched by balance changes or suicide. EIP-161
	/// cleanup of the empty ones is the transaction executor's job.
	pub fn touched_accounts(&self) -> &[H160] {
		self.ephemeral.all_touched()
	}

	/// Iterate the committed storage of `addr`; in-flight dirty state
	/// is not visited. The callback returns `false` to stop.
	pub fn for_each_storage(&self, addr: H160, cb: &mut dyn FnMut(H256, H256) -> bool) {
		self.keeper.for_each_storage(self.ctx.root(), addr, cb);
	}

	// ------------------------------------------------------------------
	// Writes

	/// Create the account, or reset an existing one to empty. The
	/// balance is carried over either way: it lives in the coin
	/// ledger, which the account record reset does not touch.
	pub fn create_account(&mut self, addr: H160) {
		let ctx = self.ctx.current();
		if let Err(err) = self.keeper.set_account(&ctx, addr, &Account::new_empty()) {
			self.record_err(err);
		}
	}

	pub fn add_balance(&mut self, addr: H160, amount: U256) {
		self.ephemeral.set_touched(addr);
		if amount.is_zero() {
			return;
		}

		let ctx = self.ctx.current();
		let account = self.get_or_new_account(addr);
		let balance = account.balance.saturating_add(amount);

		if let Err(err) = self.keeper.set_account(&ctx, addr, &account) {
			self.record_err(err);
			return;
		}
		if let Err(err) = self.keeper.set_balance(&ctx, addr, balance) {
			self.record_err(err);
		}
	}

	pub fn sub_balance(&mut self, addr: H160, amount: U256) {
		self.ephemeral.set_touched(addr);
		if amount.is_zero() {
			return;
		}

		let ctx = self.ctx.current();
		let account = self.get_or_new_account(addr);
		let balance = match account.balance.checked_sub(amount) {
			Some(balance) => balance,
			None => {
				self.record_err(Error::InsufficientFunds {
					address: addr,
					balance: account.balance,
					needed: amount,
				});
				return;
			}
		};

		if let Err(err) = self.keeper.set_account(&ctx, addr, &account) {
			self.record_err(err);
			return;
		}
		if let Err(err) = self.keeper.set_balance(&ctx, addr, balance) {
			self.record_err(err);
		}
	}

	pub fn set_nonce(&mut self, addr: H160, nonce: u64) {
		let ctx = self.ctx.current();
		let mut account = self.get_or_new_account(addr);
		account.nonce = nonce;
		if let Err(err) = self.keeper.set_account(&ctx, addr, &account) {
			self.record_err(err);
		}
	}

	/// Store `code` content-addressed and re-stamp the account's code
	/// hash.
	pub fn set_code(&mut self, addr: H160, code: Vec<u8>) {
		let ctx = self.ctx.current();
		let mut account = self.get_or_new_account(addr);
		account.code_hash = keccak256(&code);
		if let Err(err) = self.keeper.set_account(&ctx, addr, &account) {
			self.record_err(err);
			return;
		}
		self.keeper.set_code(&ctx, account.code_hash, &code);
	}

	/// Write a storage slot. The value is always written, even when
	/// it equals what is already there: commit decides on the final
	/// values whether a slot changed at all, so intermediate
	/// same-value writes must stay visible to the branch layers in
	/// between.
	pub fn set_state(&mut self, addr: H160, key: H256, value: H256) {
		self.ephemeral.add_dirty_storage_key(addr, key);
		self.keeper.set_state(&self.ctx.current(), addr, key, value);
	}

	/// Mark the account for deletion at commit and clear its balance
	/// now. Code and storage stay readable until commit. Returns
	/// whether the account existed.
	pub fn suicide(&mut self, addr: H160) -> bool {
		let ctx = self.ctx.current();
		if self.keeper.get_account(&ctx, addr).is_none() {
			return false;
		}

		self.ephemeral.set_touched(addr);
		if let Err(err) = self.keeper.set_balance(&ctx, addr, U256::zero()) {
			self.record_err(err);
		}
		self.ephemeral.set_suicided(addr);
		true
	}

	/// Record a log, stamping it with the transaction context and the
	/// next block-scoped log index.
	pub fn add_log(&mut self, mut log: Log) {
		log.block_hash = self.tx_config.block_hash;
		log.tx_hash = self.tx_config.tx_hash;
		log.tx_index = self.tx_config.tx_index;
		log.log_index = self.tx_config.log_index + self.ephemeral.all_logs().len() as u64;
		self.ephemeral.add_log(log);
	}

	pub fn add_refund(&mut self, gas: u64) {
		self.ephemeral.add_refund(gas);
	}

	/// Panics when `gas` exceeds the current refund counter.
	pub fn sub_refund(&mut self, gas: u64) {
		self.ephemeral.sub_refund(gas);
	}

	/// SHA3 preimage recording is disabled; this is a no-op.
	pub fn add_preimage(&mut self, _hash: H256, _preimage: &[u8]) {}

	// ------------------------------------------------------------------
	// Access list

	/// Warm up sender, destination, precompiles and the optional
	/// EIP-2930 transaction access list.
	pub fn prepare_access_list(
		&mut self,
		sender: H160,
		dest: Option<H160>,
		precompiles: &[H160],
		tx_access_list: &[(H160, Vec<H256>)],
	) {
		self.add_address_to_access_list(sender);
		if let Some(dest) = dest {
			// For a create, the interpreter warms the new address
			// itself once it is derived.
			self.add_address_to_access_list(dest);
		}
		for addr in precompiles {
			self.add_address_to_access_list(*addr);
		}
		for (addr, slots) in tx_access_list {
			self.add_address_to_access_list(*addr);
			for slot in slots {
				self.add_slot_to_access_list(*addr, *slot);
			}
		}
	}

	pub fn add_address_to_access_list(&mut self, addr: H160) {
		if self.access_list.add_address(addr) {
			self.journal
				.append(JournalEntry::AccessListAddAccount { address: addr });
		}
	}

	pub fn add_slot_to_access_list(&mut self, addr: H160, slot: H256) {
		let (address_added, slot_added) = self.access_list.add_slot(addr, slot);
		if address_added {
			// Normally unreachable: entering the scope of an address
			// already warms it. Journalled anyway so revert stays
			// exact.
			self.journal
				.append(JournalEntry::AccessListAddAccount { address: addr });
		}
		if slot_added {
			self.journal
				.append(JournalEntry::AccessListAddSlot {
					address: addr,
					slot,
				});
		}
	}

	pub fn address_in_access_list(&self, addr: H160) -> bool {
		self.access_list.contains_address(addr)
	}

	pub fn slot_in_access_list(&self, addr: H160, slot: H256) -> (bool, bool) {
		self.access_list.contains(addr, slot)
	}

	// ------------------------------------------------------------------
	// Snapshot / revert / commit

	/// An identifier for the current revision of the state.
	pub fn snapshot(&mut self) -> usize {
		self.ctx
			.snapshot(self.journal.len(), self.ephemeral.revert_key())
	}

	/// Roll every kind of state back to the given revision: the store
	/// branches, the access list journal tail and the ephemeral
	/// vectors, in lockstep. Panics on an unknown id.
	pub fn revert_to_snapshot(&mut self, id: usize) {
		let (journal_index, ephemeral_key) = self.ctx.revert(id);
		self.journal.revert(&mut self.access_list, journal_index);
		self.ephemeral.revert(ephemeral_key);
	}

	/// Persist the transaction. Exactly once per `StateDB`; the
	/// database is consumed either way.
	///
	/// Surfaces the sticky error, if any, before writing anything.
	/// Otherwise: finalise suicides, drop no-op storage changes out
	/// of every branch layer, restore the address-ordered account
	/// number invariant for accounts created this transaction, and
	/// flush the branches into the root store.
	pub fn commit(mut self) -> Result<(), Error> {
		if let Some(err) = self.err.take() {
			return Err(err);
		}

		let ctx = self.ctx.current();

		for addr in self.ephemeral.all_suicided() {
			self.keeper.delete_account(&ctx, *addr)?;
		}

		// A slot whose final value equals the committed one must not
		// flow through the flush at all, or it would perturb the
		// underlying tree's node versions despite changing nothing.
		// Every layer is cleared: with an A->B->A pattern a middle
		// branch may still hold B.
		for (addr, key) in self.ephemeral.all_dirty_storage_keys() {
			let committed = self.keeper.get_state(self.ctx.root(), *addr, *key);
			let current = self.keeper.get_state(&ctx, *addr, *key);
			if committed == current {
				self.keeper.unset_state(&self.ctx, *addr, *key);
			}
		}

		let created = self.keeper.created_accounts(&ctx);
		self.keeper.reassign_account_numbers(&ctx, &created)?;

		self.ctx.commit();
		Ok(())
	}
}
