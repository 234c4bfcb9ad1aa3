//! Lifecycle of enabled precompile addresses.
//!
//! A precompile is represented on-chain as a minimal contract: nonce
//! 1 and a single sentinel code byte, enough for Solidity's
//! extcodesize check to pass before a call. Parameter updates carry
//! the enabled set as hex strings; the new set is validated (well
//! formed, ascending, unique, registered) and the diff against the
//! old set is applied through the state database.

use std::collections::BTreeSet;

use primitive_types::H160;

use crate::error::{Error, PrecompileError};
use crate::keeper::StateDBKeeper;
use crate::statedb::StateDB;

/// Nonce marking an initialised precompile, as set on contract
/// creation.
pub const PRECOMPILE_NONCE: u64 = 1;

/// Sentinel code of an initialised precompile; non-empty so that
/// Solidity's existence check before an external call succeeds.
pub const PRECOMPILE_CODE: [u8; 1] = [0x01];

fn parse_address(raw: &str) -> Result<H160, PrecompileError> {
	let invalid = || PrecompileError::InvalidAddress(raw.to_string());
	let digits = raw.strip_prefix("0x").ok_or_else(invalid)?;
	let bytes = hex::decode(digits).map_err(|_| invalid())?;
	if bytes.len() != 20 {
		return Err(invalid());
	}
	Ok(H160::from_slice(&bytes))
}

/// Parse a parameter-style list of hex addresses.
pub fn parse_precompile_addresses(raw: &[String]) -> Result<Vec<H160>, PrecompileError> {
	raw.iter().map(|s| parse_address(s)).collect()
}

/// An enabled set must be strictly ascending by address bytes (which
/// rules out duplicates) and every member must be known to the
/// precompile registry.
pub fn validate_precompile_addresses(
	addrs: &[H160],
	registered: &BTreeSet<H160>,
) -> Result<(), PrecompileError> {
	for pair in addrs.windows(2) {
		if pair[0] == pair[1] {
			return Err(PrecompileError::Duplicate(pair[0]));
		}
		if pair[0] > pair[1] {
			return Err(PrecompileError::Unsorted(pair[0], pair[1]));
		}
	}
	for addr in addrs {
		if !registered.contains(addr) {
			return Err(PrecompileError::Unregistered(*addr));
		}
	}
	Ok(())
}

fn validate_initialized<K: StateDBKeeper>(
	db: &StateDB<K>,
	addrs: &[H160],
) -> Result<(), PrecompileError> {
	for addr in addrs {
		let ok = db.get_nonce(*addr) == PRECOMPILE_NONCE && db.get_code(*addr) == PRECOMPILE_CODE;
		if !ok {
			return Err(PrecompileError::NotInitialized(*addr));
		}
	}
	Ok(())
}

fn validate_uninitialized<K: StateDBKeeper>(
	db: &StateDB<K>,
	addrs: &[H160],
) -> Result<(), PrecompileError> {
	for addr in addrs {
		let ok = db.get_nonce(*addr) == 0 && db.get_code(*addr).is_empty();
		if !ok {
			return Err(PrecompileError::AlreadyInitialized(*addr));
		}
	}
	Ok(())
}

/// Mark each address as a live minimal contract.
pub fn initialize_precompiles<K: StateDBKeeper>(db: &mut StateDB<K>, addrs: &[H160]) {
	for addr in addrs {
		db.set_nonce(*addr, PRECOMPILE_NONCE);
		db.set_code(*addr, PRECOMPILE_CODE.to_vec());
	}
}

/// Mark each address for deletion at commit, clearing the marker
/// state.
pub fn uninitialize_precompiles<K: StateDBKeeper>(db: &mut StateDB<K>, addrs: &[H160]) {
	for addr in addrs {
		db.suicide(*addr);
	}
}

fn set_difference(a: &[H160], b: &[H160]) -> Vec<H160> {
	let b: BTreeSet<_> = b.iter().collect();
	a.iter().filter(|addr| !b.contains(addr)).copied().collect()
}

/// Apply a parameter update of the enabled precompile set: validate
/// the new set, check the old set really is initialised and the
/// additions really are not, then initialise additions and
/// uninitialise removals. The caller commits the state database.
pub fn sync_enabled_precompiles<K: StateDBKeeper>(
	db: &mut StateDB<K>,
	registered: &BTreeSet<H160>,
	old: &[String],
	new: &[String],
) -> Result<(), Error> {
	let old = parse_precompile_addresses(old)?;
	let new = parse_precompile_addresses(new)?;
	validate_precompile_addresses(&new, registered)?;

	let to_initialize = set_difference(&new, &old);
	let to_uninitialize = set_difference(&old, &new);

	validate_initialized(db, &old)?;
	validate_uninitialized(db, &to_initialize)?;

	initialize_precompiles(db, &to_initialize);
	uninitialize_precompiles(db, &to_uninitialize);
	Ok(())
}
