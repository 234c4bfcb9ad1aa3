//! Snapshot stack over the branchable store.
//!
//! Every snapshot owns a fresh branch of the previous one, so
//! reverting is dropping branches and committing is flushing them
//! newest to oldest. The anchor branch created on construction keeps
//! the root store untouched until commit.

use crate::ephemeral::StoreRevertKey;
use crate::store::StoreCtx;

/// One entry of the snapshot stack: the branch taking writes made
/// after the snapshot was taken, plus the cursors needed to roll the
/// in-memory state back in lockstep.
pub struct Snapshot {
	id: usize,
	store: StoreCtx,
	journal_index: usize,
	ephemeral_key: StoreRevertKey,
}

impl Snapshot {
	pub fn id(&self) -> usize {
		self.id
	}

	pub fn store(&self) -> &StoreCtx {
		&self.store
	}
}

/// Stack of branched store handles over a root context.
pub struct SnapshotCtx {
	root: StoreCtx,
	anchor: StoreCtx,
	snapshots: Vec<Snapshot>,
	next_snapshot_id: usize,
}

impl SnapshotCtx {
	/// Branches the anchor off `root` immediately, so no write can
	/// land in the root store before [`commit`](SnapshotCtx::commit).
	pub fn new(root: StoreCtx) -> Self {
		let anchor = root.branch();
		Self {
			root,
			anchor,
			snapshots: Vec::new(),
			next_snapshot_id: 0,
		}
	}

	/// The committed state as of the last commit, bypassing every
	/// in-flight branch.
	pub fn root(&self) -> &StoreCtx {
		&self.root
	}

	/// The store handle current writes should go to: the newest
	/// snapshot's branch, or the anchor when none was taken.
	pub fn current(&self) -> StoreCtx {
		match self.snapshots.last() {
			Some(snapshot) => snapshot.store.clone(),
			None => self.anchor.clone(),
		}
	}

	/// Push a new branch and return its monotonically increasing id.
	pub fn snapshot(&mut self, journal_index: usize, ephemeral_key: StoreRevertKey) -> usize {
		let id = self.next_snapshot_id;
		self.next_snapshot_id += 1;

		let store = self.current().branch();
		self.snapshots.push(Snapshot {
			id,
			store,
			journal_index,
			ephemeral_key,
		});

		id
	}

	/// Drop the snapshot with the given id and everything taken after
	/// it, restoring the state as of when `snapshot` returned that
	/// id. Returns the journal index and ephemeral revert key it
	/// recorded so the caller can roll back non-KV state in lockstep.
	///
	/// Panics when no live snapshot carries the id; reverting to an
	/// unknown or already-reverted revision is a bug in the caller.
	pub fn revert(&mut self, id: usize) -> (usize, StoreRevertKey) {
		let idx = self
			.snapshots
			.binary_search_by_key(&id, |snapshot| snapshot.id)
			.unwrap_or_else(|_| panic!("revision id {} cannot be reverted", id));

		let snapshot = &self.snapshots[idx];
		let rollback = (snapshot.journal_index, snapshot.ephemeral_key);
		self.snapshots.truncate(idx);
		rollback
	}

	/// Flush every branch newest to oldest; the anchor goes last, so
	/// all surviving changes land in the root store in one sweep.
	pub fn commit(&mut self) {
		for snapshot in self.snapshots.drain(..).rev() {
			snapshot.store.write();
		}
		self.anchor.write();
	}

	/// Visit every live branch, newest first and the anchor last.
	/// Used by commit's no-op-change suppression, which has to clear
	/// a buffered entry out of each layer that may hold it.
	pub fn for_each_layer<F: FnMut(&StoreCtx)>(&self, mut f: F) {
		for snapshot in self.snapshots.iter().rev() {
			f(&snapshot.store);
		}
		f(&self.anchor);
	}
}
