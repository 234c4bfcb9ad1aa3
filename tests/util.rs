//! Shared setup for the integration tests: an in-memory root store
//! plus a keeper configured with a test denom.

use std::cell::RefCell;
use std::rc::Rc;

use evm_statedb::{Keeper, MemStore, StateDB, StoreCtx, TxConfig};
use primitive_types::{H160, H256};

pub const EVM_DENOM: &str = "aevm";

pub struct TestEnv {
	pub store: Rc<RefCell<MemStore>>,
	pub keeper: Keeper,
}

impl TestEnv {
	pub fn new() -> Self {
		Self {
			store: Rc::new(RefCell::new(MemStore::new())),
			keeper: Keeper::new(EVM_DENOM),
		}
	}

	pub fn root(&self) -> StoreCtx {
		StoreCtx::root(self.store.clone())
	}

	pub fn statedb(&self) -> StateDB<'_, Keeper> {
		self.statedb_with(TxConfig::new_empty(H256::zero()))
	}

	pub fn statedb_with(&self, tx_config: TxConfig) -> StateDB<'_, Keeper> {
		StateDB::new(self.root(), &self.keeper, tx_config)
	}

	pub fn state_hash(&self) -> H256 {
		self.store.borrow().state_hash()
	}
}

pub fn addr(n: u64) -> H160 {
	H160::from_low_u64_be(n)
}

pub fn hash(n: u64) -> H256 {
	H256::from_low_u64_be(n)
}
