//! EIP-2929/2930 access list with a small undo journal.
//!
//! The list itself supports removal, which the append-only pattern
//! used for the rest of the ephemeral state would overcomplicate, so
//! every successful add is journalled and reverting replays the
//! journal tail backwards.

use std::collections::{BTreeMap, BTreeSet};

use primitive_types::{H160, H256};

/// Two-level membership set of warm addresses and storage slots.
#[derive(Debug, Default)]
pub struct AccessList {
	addresses: BTreeMap<H160, BTreeSet<H256>>,
}

impl AccessList {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains_address(&self, address: H160) -> bool {
		self.addresses.contains_key(&address)
	}

	/// Membership of the address and of the slot, as separate flags.
	pub fn contains(&self, address: H160, slot: H256) -> (bool, bool) {
		match self.addresses.get(&address) {
			Some(slots) => (true, slots.contains(&slot)),
			None => (false, false),
		}
	}

	/// Returns true iff the address was newly added.
	pub fn add_address(&mut self, address: H160) -> bool {
		if self.contains_address(address) {
			return false;
		}
		self.addresses.insert(address, BTreeSet::new());
		true
	}

	/// Adds the slot, inserting the address first if absent. Returns
	/// (address added, slot added).
	pub fn add_slot(&mut self, address: H160, slot: H256) -> (bool, bool) {
		let address_added = self.add_address(address);
		let slots = self
			.addresses
			.get_mut(&address)
			.expect("address was just ensured present");
		let slot_added = slots.insert(slot);
		(address_added, slot_added)
	}

	fn remove_address(&mut self, address: H160) {
		self.addresses.remove(&address);
	}

	fn remove_slot(&mut self, address: H160, slot: H256) {
		if let Some(slots) = self.addresses.get_mut(&address) {
			slots.remove(&slot);
		}
	}
}

/// A recorded state change that can be undone on revert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalEntry {
	AccessListAddAccount { address: H160 },
	AccessListAddSlot { address: H160, slot: H256 },
}

/// Ordered list of [`JournalEntry`] values, revertable to any earlier
/// length.
#[derive(Debug, Default)]
pub struct Journal {
	entries: Vec<JournalEntry>,
}

impl Journal {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn append(&mut self, entry: JournalEntry) {
		self.entries.push(entry);
	}

	/// Undo every entry past `to`, newest first. An address undo
	/// drops its slot set wholesale; slots journalled after the
	/// address were already undone by the time it is reached.
	pub fn revert(&mut self, access_list: &mut AccessList, to: usize) {
		while self.entries.len() > to {
			match self.entries.pop().expect("length checked above") {
				JournalEntry::AccessListAddAccount { address } => {
					access_list.remove_address(address);
				}
				JournalEntry::AccessListAddSlot { address, slot } => {
					access_list.remove_slot(address, slot);
				}
			}
		}
	}
}
