//! Per-transaction in-memory state: refund counter history, the
//! suicided and touched account sets, emitted logs and the dirty
//! storage key sequence. Everything is an append-only vector, so a
//! snapshot is a tuple of lengths and revert is truncation.

use primitive_types::{H160, H256};

use crate::types::Log;

/// Lengths of every [`EphemeralStore`] vector at the moment a
/// snapshot is taken. Reverting truncates back to these.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreRevertKey {
	pub refund_index: usize,
	pub suicided_index: usize,
	pub logs_index: usize,
	pub touched_index: usize,
	pub dirty_storage_index: usize,
}

/// In-memory transaction state with O(1) snapshot and O(truncation)
/// revert. None of it is ever persisted.
#[derive(Debug, Default)]
pub struct EphemeralStore {
	refund_states: Vec<u64>,
	suicided_accounts: Vec<H160>,
	logs: Vec<Log>,
	touched_accounts: Vec<H160>,
	dirty_storage_keys: Vec<(H160, H256)>,
}

fn check_index(idx: usize, len: usize, name: &str) {
	if idx > len {
		panic!(
			"invalid {} revert index: {} is greater than the current length {}",
			name, idx, len
		);
	}
}

impl EphemeralStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// The current state of the store as a revert key.
	pub fn revert_key(&self) -> StoreRevertKey {
		StoreRevertKey {
			refund_index: self.refund_states.len(),
			suicided_index: self.suicided_accounts.len(),
			logs_index: self.logs.len(),
			touched_index: self.touched_accounts.len(),
			dirty_storage_index: self.dirty_storage_keys.len(),
		}
	}

	/// Truncate every vector back to the lengths recorded in `key`.
	/// Panics if any recorded length exceeds the current one; that
	/// means the key was not produced by this store's timeline.
	pub fn revert(&mut self, key: StoreRevertKey) {
		check_index(key.refund_index, self.refund_states.len(), "refund");
		check_index(key.suicided_index, self.suicided_accounts.len(), "suicided");
		check_index(key.logs_index, self.logs.len(), "logs");
		check_index(key.touched_index, self.touched_accounts.len(), "touched");
		check_index(
			key.dirty_storage_index,
			self.dirty_storage_keys.len(),
			"dirty storage",
		);

		self.refund_states.truncate(key.refund_index);
		self.suicided_accounts.truncate(key.suicided_index);
		self.logs.truncate(key.logs_index);
		self.touched_accounts.truncate(key.touched_index);
		self.dirty_storage_keys.truncate(key.dirty_storage_index);
	}

	// ------------------------------------------------------------------
	// Refund counter

	/// The current refund, the last recorded state or 0.
	pub fn current_refund(&self) -> u64 {
		self.refund_states.last().copied().unwrap_or(0)
	}

	pub fn add_refund(&mut self, gas: u64) {
		let refund = self.current_refund() + gas;
		self.refund_states.push(refund);
	}

	/// Panics when `gas` exceeds the current refund; the interpreter
	/// never subtracts more than it added.
	pub fn sub_refund(&mut self, gas: u64) {
		let current = self.current_refund();
		if current < gas {
			panic!("refund counter below zero: {} < {}", current, gas);
		}
		self.refund_states.push(current - gas);
	}

	// ------------------------------------------------------------------
	// Suicided accounts

	pub fn set_suicided(&mut self, addr: H160) {
		if self.is_suicided(addr) {
			return;
		}
		self.suicided_accounts.push(addr);
	}

	pub fn is_suicided(&self, addr: H160) -> bool {
		self.suicided_accounts.contains(&addr)
	}

	pub fn all_suicided(&self) -> &[H160] {
		&self.suicided_accounts
	}

	// ------------------------------------------------------------------
	// Logs

	pub fn add_log(&mut self, log: Log) {
		self.logs.push(log);
	}

	pub fn all_logs(&self) -> &[Log] {
		&self.logs
	}

	// ------------------------------------------------------------------
	// Touched accounts

	pub fn set_touched(&mut self, addr: H160) {
		if self.is_touched(addr) {
			return;
		}
		self.touched_accounts.push(addr);
	}

	pub fn is_touched(&self, addr: H160) -> bool {
		self.touched_accounts.contains(&addr)
	}

	pub fn all_touched(&self) -> &[H160] {
		&self.touched_accounts
	}

	// ------------------------------------------------------------------
	// Dirty storage keys

	pub fn add_dirty_storage_key(&mut self, addr: H160, key: H256) {
		if self.contains_dirty_storage_key(addr, key) {
			return;
		}
		self.dirty_storage_keys.push((addr, key));
	}

	pub fn contains_dirty_storage_key(&self, addr: H160, key: H256) -> bool {
		self.dirty_storage_keys.contains(&(addr, key))
	}

	pub fn all_dirty_storage_keys(&self) -> &[(H160, H256)] {
		&self.dirty_storage_keys
	}
}
