//! Minimal coin ledger: per-address balances and total supply per
//! denom. Account balances in the EVM denom are minted and burned
//! here; a zero balance is absence, never a stored zero.

use primitive_types::{H160, U256};

use crate::error::Error;
use crate::store::{StoreCtx, StoreKey};

const BALANCE_PREFIX: u8 = 0x01;
const SUPPLY_PREFIX: u8 = 0x02;

fn balance_key(addr: H160, denom: &str) -> Vec<u8> {
	let mut key = Vec::with_capacity(1 + 20 + denom.len());
	key.push(BALANCE_PREFIX);
	key.extend_from_slice(addr.as_bytes());
	key.extend_from_slice(denom.as_bytes());
	key
}

fn supply_key(denom: &str) -> Vec<u8> {
	let mut key = Vec::with_capacity(1 + denom.len());
	key.push(SUPPLY_PREFIX);
	key.extend_from_slice(denom.as_bytes());
	key
}

fn decode_amount(raw: &[u8]) -> U256 {
	U256::from_big_endian(raw)
}

fn store_amount(ctx: &StoreCtx, key: &[u8], amount: U256) {
	if amount.is_zero() {
		ctx.delete(StoreKey::Bank, key);
	} else {
		let mut buf = [0u8; 32];
		amount.to_big_endian(&mut buf);
		ctx.set(StoreKey::Bank, key, &buf);
	}
}

pub(crate) fn get_balance(ctx: &StoreCtx, addr: H160, denom: &str) -> U256 {
	ctx.get(StoreKey::Bank, &balance_key(addr, denom))
		.map(|raw| decode_amount(&raw))
		.unwrap_or_default()
}

pub(crate) fn get_supply(ctx: &StoreCtx, denom: &str) -> U256 {
	ctx.get(StoreKey::Bank, &supply_key(denom))
		.map(|raw| decode_amount(&raw))
		.unwrap_or_default()
}

/// Create `amount` coins out of thin air on `addr`.
pub(crate) fn mint(ctx: &StoreCtx, addr: H160, denom: &str, amount: U256) {
	if amount.is_zero() {
		return;
	}
	let balance = get_balance(ctx, addr, denom).saturating_add(amount);
	store_amount(ctx, &balance_key(addr, denom), balance);
	let supply = get_supply(ctx, denom).saturating_add(amount);
	store_amount(ctx, &supply_key(denom), supply);
}

/// Destroy `amount` coins held by `addr`; errors when the balance
/// does not cover it.
pub(crate) fn burn(ctx: &StoreCtx, addr: H160, denom: &str, amount: U256) -> Result<(), Error> {
	if amount.is_zero() {
		return Ok(());
	}
	let balance = get_balance(ctx, addr, denom);
	let remaining = balance
		.checked_sub(amount)
		.ok_or(Error::InsufficientFunds {
			address: addr,
			balance,
			needed: amount,
		})?;
	store_amount(ctx, &balance_key(addr, denom), remaining);
	let supply = get_supply(ctx, denom).saturating_sub(amount);
	store_amount(ctx, &supply_key(denom), supply);
	Ok(())
}
