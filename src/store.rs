//! # The branchable multi-store
//!
//! The committed chain state lives in a host store exposing plain
//! get/set/delete and prefix iteration over a handful of named
//! keyspaces. On top of it, a store handle can be branched: the child
//! buffers writes and deletions, reads fall through to the parent,
//! and the whole buffer is either flushed into the parent with
//! `write` or dropped. Branches nest arbitrarily, which is what the
//! snapshot machinery is built from.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::mem;
use std::rc::Rc;

use primitive_types::H256;
use sha3::{Digest, Keccak256};

/// Named keyspaces of the multi-store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreKey {
	/// Contract storage and code.
	Evm,
	/// Account records and the account number counter.
	Auth,
	/// Coin ledger balances and supply.
	Bank,
	/// Per-transaction bookkeeping. Branches and reverts like any
	/// other keyspace but never reaches the committed store: the
	/// flush of a branch whose parent is the root drops it.
	Transient,
}

impl StoreKey {
	pub const ALL: [StoreKey; 4] = [
		StoreKey::Evm,
		StoreKey::Auth,
		StoreKey::Bank,
		StoreKey::Transient,
	];

	pub fn is_transient(self) -> bool {
		matches!(self, StoreKey::Transient)
	}

	fn tag(self) -> u8 {
		match self {
			StoreKey::Evm => 0x01,
			StoreKey::Auth => 0x02,
			StoreKey::Bank => 0x03,
			StoreKey::Transient => 0x04,
		}
	}
}

/// The host-side committed store. Only the raw primitives appear
/// here; everything transactional is layered on top by [`StoreCtx`].
pub trait MultiStore {
	fn get(&self, space: StoreKey, key: &[u8]) -> Option<Vec<u8>>;
	fn set(&mut self, space: StoreKey, key: &[u8], value: &[u8]);
	fn delete(&mut self, space: StoreKey, key: &[u8]);
	/// Iterate entries under `prefix` in ascending byte order. The
	/// callback returns `false` to stop early.
	fn for_each_prefix(
		&self,
		space: StoreKey,
		prefix: &[u8],
		cb: &mut dyn FnMut(&[u8], &[u8]) -> bool,
	);
}

/// In-memory [`MultiStore`], the root store used in tests and
/// standalone setups.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
	spaces: BTreeMap<StoreKey, BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Deterministic digest of the committed state: Keccak-256 over
	/// every non-transient entry in keyspace and key order. Two
	/// stores hold identical committed state iff their hashes are
	/// byte-equal.
	pub fn state_hash(&self) -> H256 {
		let mut hasher = Keccak256::new();
		for space in StoreKey::ALL {
			if space.is_transient() {
				continue;
			}
			hasher.update([space.tag()]);
			if let Some(entries) = self.spaces.get(&space) {
				for (key, value) in entries {
					hasher.update((key.len() as u32).to_be_bytes());
					hasher.update(key);
					hasher.update((value.len() as u32).to_be_bytes());
					hasher.update(value);
				}
			}
		}
		H256::from_slice(hasher.finalize().as_slice())
	}
}

impl MultiStore for MemStore {
	fn get(&self, space: StoreKey, key: &[u8]) -> Option<Vec<u8>> {
		self.spaces.get(&space).and_then(|m| m.get(key).cloned())
	}

	fn set(&mut self, space: StoreKey, key: &[u8], value: &[u8]) {
		self.spaces
			.entry(space)
			.or_default()
			.insert(key.to_vec(), value.to_vec());
	}

	fn delete(&mut self, space: StoreKey, key: &[u8]) {
		if let Some(entries) = self.spaces.get_mut(&space) {
			entries.remove(key);
		}
	}

	fn for_each_prefix(
		&self,
		space: StoreKey,
		prefix: &[u8],
		cb: &mut dyn FnMut(&[u8], &[u8]) -> bool,
	) {
		if let Some(entries) = self.spaces.get(&space) {
			for (key, value) in entries.range(prefix.to_vec()..) {
				if !key.starts_with(prefix) {
					break;
				}
				if !cb(key, value) {
					return;
				}
			}
		}
	}
}

/// A single cache branch: buffered writes (`Some`) and deletions
/// (`None`) per keyspace over a parent handle.
pub struct BranchStore {
	parent: StoreCtx,
	writes: BTreeMap<StoreKey, BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
}

impl BranchStore {
	fn new(parent: StoreCtx) -> Self {
		Self {
			parent,
			writes: BTreeMap::new(),
		}
	}

	fn entry(&self, space: StoreKey, key: &[u8]) -> Option<Option<Vec<u8>>> {
		self.writes
			.get(&space)
			.and_then(|m| m.get(key))
			.cloned()
	}

	fn overlay_prefix(
		&self,
		space: StoreKey,
		prefix: &[u8],
	) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
		let mut out = Vec::new();
		if let Some(entries) = self.writes.get(&space) {
			for (key, value) in entries.range(prefix.to_vec()..) {
				if !key.starts_with(prefix) {
					break;
				}
				out.push((key.clone(), value.clone()));
			}
		}
		out
	}
}

/// Cheap cloneable handle to either the root store or a branch.
///
/// All mutation goes through interior mutability so that many layers
/// of the snapshot stack can hold handles onto the same store.
#[derive(Clone)]
pub enum StoreCtx {
	Root(Rc<RefCell<dyn MultiStore>>),
	Branch(Rc<RefCell<BranchStore>>),
}

impl StoreCtx {
	pub fn root(store: Rc<RefCell<dyn MultiStore>>) -> Self {
		StoreCtx::Root(store)
	}

	/// Branch off a child buffering all writes until [`write`]
	/// flushes them into this handle.
	///
	/// [`write`]: StoreCtx::write
	pub fn branch(&self) -> StoreCtx {
		StoreCtx::Branch(Rc::new(RefCell::new(BranchStore::new(self.clone()))))
	}

	pub fn get(&self, space: StoreKey, key: &[u8]) -> Option<Vec<u8>> {
		match self {
			StoreCtx::Root(store) => store.borrow().get(space, key),
			StoreCtx::Branch(branch) => {
				let (entry, parent) = {
					let branch = branch.borrow();
					(branch.entry(space, key), branch.parent.clone())
				};
				match entry {
					Some(buffered) => buffered,
					None => parent.get(space, key),
				}
			}
		}
	}

	pub fn has(&self, space: StoreKey, key: &[u8]) -> bool {
		self.get(space, key).is_some()
	}

	pub fn set(&self, space: StoreKey, key: &[u8], value: &[u8]) {
		match self {
			StoreCtx::Root(store) => store.borrow_mut().set(space, key, value),
			StoreCtx::Branch(branch) => {
				branch
					.borrow_mut()
					.writes
					.entry(space)
					.or_default()
					.insert(key.to_vec(), Some(value.to_vec()));
			}
		}
	}

	pub fn delete(&self, space: StoreKey, key: &[u8]) {
		match self {
			StoreCtx::Root(store) => store.borrow_mut().delete(space, key),
			StoreCtx::Branch(branch) => {
				branch
					.borrow_mut()
					.writes
					.entry(space)
					.or_default()
					.insert(key.to_vec(), None);
			}
		}
	}

	/// Drop a buffered entry from this branch without writing
	/// anything, leaving whatever the parent holds visible again.
	/// Distinct from a deletion, which the flush would propagate.
	/// No-op on the root and on branches that never buffered the key.
	pub fn unset(&self, space: StoreKey, key: &[u8]) {
		if let StoreCtx::Branch(branch) = self {
			if let Some(entries) = branch.borrow_mut().writes.get_mut(&space) {
				entries.remove(key);
			}
		}
	}

	/// Iterate the merged view of `prefix` in ascending byte order,
	/// with buffered writes shadowing the parent and buffered
	/// deletions hiding parent entries.
	pub fn for_each_prefix(
		&self,
		space: StoreKey,
		prefix: &[u8],
		cb: &mut dyn FnMut(&[u8], &[u8]) -> bool,
	) {
		match self {
			StoreCtx::Root(store) => store.borrow().for_each_prefix(space, prefix, cb),
			StoreCtx::Branch(_) => {
				for (key, value) in self.collect_prefix(space, prefix) {
					if !cb(&key, &value) {
						return;
					}
				}
			}
		}
	}

	fn collect_prefix(&self, space: StoreKey, prefix: &[u8]) -> BTreeMap<Vec<u8>, Vec<u8>> {
		match self {
			StoreCtx::Root(store) => {
				let mut out = BTreeMap::new();
				store.borrow().for_each_prefix(space, prefix, &mut |key, value| {
					out.insert(key.to_vec(), value.to_vec());
					true
				});
				out
			}
			StoreCtx::Branch(branch) => {
				let (parent, overlay) = {
					let branch = branch.borrow();
					(branch.parent.clone(), branch.overlay_prefix(space, prefix))
				};
				let mut out = parent.collect_prefix(space, prefix);
				for (key, value) in overlay {
					match value {
						Some(value) => {
							out.insert(key, value);
						}
						None => {
							out.remove(&key);
						}
					}
				}
				out
			}
		}
	}

	/// Flush this branch's buffer into its parent. Transient entries
	/// are dropped when the parent is the root. No-op on the root.
	pub fn write(&self) {
		if let StoreCtx::Branch(branch) = self {
			let (parent, writes) = {
				let mut branch = branch.borrow_mut();
				(branch.parent.clone(), mem::take(&mut branch.writes))
			};
			let into_root = matches!(parent, StoreCtx::Root(_));
			for (space, entries) in writes {
				if into_root && space.is_transient() {
					continue;
				}
				for (key, value) in entries {
					match value {
						Some(value) => parent.set(space, &key, &value),
						None => parent.delete(space, &key),
					}
				}
			}
		}
	}
}
