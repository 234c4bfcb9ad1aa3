//! # Transactional Ethereum state database
//!
//! This crate sits between an EVM interpreter and a host key/value
//! store whose only primitives are get/set/delete and nested cache
//! branches. It presents the exact Ethereum account state semantics
//! the interpreter expects (balances, nonces, code, contract
//! storage, logs, the refund counter, the access list and the
//! suicide set) while every key/value mutation rides on branches of
//! the host store.
//!
//! Snapshots reuse the store's native branching instead of journaling
//! raw writes: each snapshot owns a child branch of the previous one,
//! commit flushes newest to oldest, revert drops branches. State that
//! never touches the store (refunds, logs, suicides, touched
//! accounts, dirty storage keys) lives in append-only vectors
//! reverted by truncation, and the access list keeps a small undo
//! journal of its own. The three mechanisms snapshot and revert in
//! lockstep.
//!
//! A [`StateDB`] lives for one transaction. Its write methods are
//! infallible towards the interpreter; the first underlying failure
//! is recorded and surfaced by [`StateDB::commit`], which then
//! persists nothing.

mod access_list;
mod account;
mod ephemeral;
mod error;
pub mod keeper;
pub mod precompile;
mod snapshot;
mod statedb;
pub mod store;
mod types;

pub use crate::access_list::{AccessList, Journal, JournalEntry};
pub use crate::account::{keccak256, Account, KECCAK_EMPTY};
pub use crate::ephemeral::{EphemeralStore, StoreRevertKey};
pub use crate::error::{Error, PrecompileError};
pub use crate::keeper::{Keeper, StateDBKeeper};
pub use crate::snapshot::{Snapshot, SnapshotCtx};
pub use crate::statedb::StateDB;
pub use crate::store::{MemStore, MultiStore, StoreCtx, StoreKey};
pub use crate::types::{Log, TxConfig};
