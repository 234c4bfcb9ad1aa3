mod util;

use evm_statedb::keeper::auth::{self, AuthAccount};
use evm_statedb::{Error, Log, TxConfig, KECCAK_EMPTY};
use primitive_types::{H256, U256};
use util::{addr, hash, TestEnv};

#[test]
fn snapshot_revert_of_storage() {
	let env = TestEnv::new();

	let mut db = env.statedb();
	db.set_state(addr(0x01), hash(0x0a), hash(0x20));

	let id1 = db.snapshot();
	db.set_state(addr(0x01), hash(0x0a), hash(0x30));
	assert_eq!(db.get_state(addr(0x01), hash(0x0a)), hash(0x30));

	db.revert_to_snapshot(id1);
	assert_eq!(db.get_state(addr(0x01), hash(0x0a)), hash(0x20));

	db.commit().unwrap();

	let db = env.statedb();
	assert_eq!(db.get_state(addr(0x01), hash(0x0a)), hash(0x20));
}

#[test]
fn noop_round_trip_leaves_state_hash_unchanged() {
	let seed = |env: &TestEnv| {
		let mut db = env.statedb();
		db.set_state(addr(1), hash(9), hash(0x20));
		db.commit().unwrap();
	};

	let busy = TestEnv::new();
	seed(&busy);
	let mut db = busy.statedb();
	db.set_state(addr(1), hash(9), hash(0x20));
	let _id1 = db.snapshot();
	db.set_state(addr(1), hash(9), hash(0x30));
	let _id2 = db.snapshot();
	db.set_state(addr(1), hash(9), hash(0x40));
	db.set_state(addr(1), hash(9), hash(0x20));
	db.commit().unwrap();

	let idle = TestEnv::new();
	seed(&idle);
	let db = idle.statedb();
	db.commit().unwrap();

	assert_eq!(busy.state_hash(), idle.state_hash());
}

#[test]
fn suicide_of_funded_contract() {
	let env = TestEnv::new();
	let a = addr(0xaa);
	let code = vec![0x60, 0x00, 0x60, 0x00, 0xf3];

	let mut db = env.statedb();
	db.set_code(a, code.clone());
	db.add_balance(a, U256::from(100));
	db.set_state(a, hash(1), hash(0x11));
	db.set_state(a, hash(2), hash(0x22));
	db.commit().unwrap();

	let mut db = env.statedb();
	assert!(db.suicide(a));
	assert!(db.has_suicided(a));
	assert_eq!(db.get_balance(a), U256::zero());
	assert_eq!(db.get_code(a), code);
	assert_eq!(db.get_state(a, hash(1)), hash(0x11));
	assert_eq!(db.get_state(a, hash(2)), hash(0x22));
	db.commit().unwrap();

	let db = env.statedb();
	assert!(!db.exist(a));
	assert_eq!(db.get_balance(a), U256::zero());
	assert_eq!(db.get_code(a), Vec::<u8>::new());
	let mut slots = 0;
	db.for_each_storage(a, &mut |_, _| {
		slots += 1;
		true
	});
	assert_eq!(slots, 0);
}

#[test]
fn suicide_of_missing_account_returns_false() {
	let env = TestEnv::new();
	let mut db = env.statedb();
	assert!(!db.suicide(addr(0xaa)));
	assert!(!db.has_suicided(addr(0xaa)));
}

#[test]
fn account_numbers_ascend_by_address_after_commit() {
	let env = TestEnv::new();
	let (a1, a2, a3) = (addr(1), addr(2), addr(3));

	let mut db = env.statedb();
	db.set_nonce(a3, 1);
	db.set_nonce(a2, 1);
	db.set_nonce(a1, 1);
	db.commit().unwrap();

	let root = env.root();
	assert_eq!(env.keeper.account_number(&root, a1), Some(0));
	assert_eq!(env.keeper.account_number(&root, a2), Some(1));
	assert_eq!(env.keeper.account_number(&root, a3), Some(2));
}

#[test]
fn access_list_rolls_back_on_revert() {
	let env = TestEnv::new();
	let mut db = env.statedb();

	let id = db.snapshot();
	db.add_address_to_access_list(addr(1));
	db.add_slot_to_access_list(addr(1), hash(2));
	assert!(db.address_in_access_list(addr(1)));
	assert_eq!(db.slot_in_access_list(addr(1), hash(2)), (true, true));

	db.revert_to_snapshot(id);
	assert!(!db.address_in_access_list(addr(1)));
	assert_eq!(db.slot_in_access_list(addr(1), hash(2)), (false, false));
}

#[test]
fn refund_counter_reads_before_underflow() {
	let env = TestEnv::new();
	let mut db = env.statedb();
	db.add_refund(5);
	assert_eq!(db.get_refund(), 5);
}

#[test]
#[should_panic(expected = "refund counter below zero")]
fn refund_underflow_panics() {
	let env = TestEnv::new();
	let mut db = env.statedb();
	db.add_refund(5);
	db.sub_refund(10);
}

#[test]
fn snapshot_revert_restores_every_kind_of_state() {
	let env = TestEnv::new();
	let a = addr(0x77);
	let b = addr(0x88);

	let mut db = env.statedb();
	db.add_balance(a, U256::from(50));
	db.set_nonce(a, 3);
	db.set_state(a, hash(1), hash(0xf0));
	db.commit().unwrap();

	let mut db = env.statedb();
	db.add_refund(7);
	let id = db.snapshot();

	db.add_balance(a, U256::from(25));
	db.sub_balance(a, U256::from(10));
	db.set_nonce(a, 9);
	db.set_code(a, vec![0x01, 0x02]);
	db.set_state(a, hash(1), hash(0x0f));
	db.add_log(Log::new(a, vec![hash(1)], vec![1, 2, 3]));
	db.add_refund(100);
	db.suicide(b);
	db.add_balance(b, U256::from(5));
	db.suicide(b);
	db.add_address_to_access_list(b);
	db.add_slot_to_access_list(b, hash(4));

	db.revert_to_snapshot(id);

	assert_eq!(db.get_balance(a), U256::from(50));
	assert_eq!(db.get_nonce(a), 3);
	assert_eq!(db.get_code_hash(a), KECCAK_EMPTY);
	assert_eq!(db.get_state(a, hash(1)), hash(0xf0));
	assert!(db.logs().is_empty());
	assert_eq!(db.get_refund(), 7);
	assert!(!db.has_suicided(b));
	assert!(!db.address_in_access_list(b));
	assert_eq!(db.slot_in_access_list(b, hash(4)), (false, false));
}

#[test]
fn revert_of_outer_snapshot_discards_inner_ones() {
	let env = TestEnv::new();
	let mut db = env.statedb();

	let id1 = db.snapshot();
	db.set_state(addr(1), hash(1), hash(0x11));
	let _id2 = db.snapshot();
	db.set_state(addr(1), hash(2), hash(0x22));

	db.revert_to_snapshot(id1);
	assert_eq!(db.get_state(addr(1), hash(1)), H256::zero());
	assert_eq!(db.get_state(addr(1), hash(2)), H256::zero());
}

#[test]
#[should_panic(expected = "cannot be reverted")]
fn inner_snapshot_is_gone_after_outer_revert() {
	let env = TestEnv::new();
	let mut db = env.statedb();

	let id1 = db.snapshot();
	let id2 = db.snapshot();
	db.revert_to_snapshot(id1);
	db.revert_to_snapshot(id2);
}

#[test]
#[should_panic(expected = "cannot be reverted")]
fn revert_to_unknown_snapshot_panics() {
	let env = TestEnv::new();
	let mut db = env.statedb();
	db.revert_to_snapshot(42);
}

#[test]
fn commit_is_deterministic_for_identical_write_sequences() {
	let run = |env: &TestEnv| {
		let mut db = env.statedb();
		db.add_balance(addr(1), U256::from(1000));
		db.set_nonce(addr(1), 1);
		db.set_code(addr(2), vec![0xfe]);
		db.set_state(addr(2), hash(1), hash(0xab));
		let id = db.snapshot();
		db.set_state(addr(2), hash(2), hash(0xcd));
		db.revert_to_snapshot(id);
		db.set_state(addr(2), hash(3), hash(0xef));
		db.commit().unwrap();
	};

	let left = TestEnv::new();
	run(&left);
	let right = TestEnv::new();
	run(&right);

	assert_eq!(left.state_hash(), right.state_hash());
}

#[test]
fn logs_are_stamped_from_tx_config() {
	let env = TestEnv::new();
	let config = TxConfig::new(hash(0xb1), hash(0x71), 4, 5);

	let mut db = env.statedb_with(config);
	db.add_log(Log::new(addr(1), vec![hash(1)], vec![1]));
	db.add_log(Log::new(addr(1), vec![hash(2)], vec![2]));
	db.add_log(Log::new(addr(2), vec![], vec![]));

	let logs = db.logs();
	assert_eq!(logs.len(), 3);
	for (i, log) in logs.iter().enumerate() {
		assert_eq!(log.block_hash, hash(0xb1));
		assert_eq!(log.tx_hash, hash(0x71));
		assert_eq!(log.tx_index, 4);
		assert_eq!(log.log_index, 5 + i as u64);
	}
}

#[test]
fn log_indices_restart_after_revert() {
	let env = TestEnv::new();
	let config = TxConfig::new(hash(0xb1), hash(0x71), 0, 10);

	let mut db = env.statedb_with(config);
	db.add_log(Log::new(addr(1), vec![], vec![]));
	let id = db.snapshot();
	db.add_log(Log::new(addr(1), vec![], vec![]));
	db.revert_to_snapshot(id);
	db.add_log(Log::new(addr(1), vec![], vec![]));

	let indices: Vec<u64> = db.logs().iter().map(|log| log.log_index).collect();
	assert_eq!(indices, vec![10, 11]);
}

#[test]
fn sub_balance_underflow_is_surfaced_at_commit_only() {
	let env = TestEnv::new();
	let hash_before = env.state_hash();

	let mut db = env.statedb();
	db.add_balance(addr(1), U256::from(5));
	db.sub_balance(addr(1), U256::from(10));
	// The interpreter saw no error; more writes are accepted.
	db.set_nonce(addr(1), 3);

	assert!(matches!(
		db.commit(),
		Err(Error::InsufficientFunds { .. })
	));
	assert_eq!(env.state_hash(), hash_before);
}

#[test]
fn first_error_wins() {
	let env = TestEnv::new();
	let mut db = env.statedb();

	db.sub_balance(addr(1), U256::from(10));
	db.sub_balance(addr(2), U256::from(99));

	match db.commit() {
		Err(Error::InsufficientFunds { address, .. }) => assert_eq!(address, addr(1)),
		other => panic!("expected insufficient funds, got {:?}", other),
	}
}

#[test]
fn get_committed_state_bypasses_snapshots() {
	let env = TestEnv::new();

	let mut db = env.statedb();
	db.set_state(addr(1), hash(1), hash(0x10));
	db.commit().unwrap();

	let mut db = env.statedb();
	db.set_state(addr(1), hash(1), hash(0x20));
	db.snapshot();
	db.set_state(addr(1), hash(1), hash(0x30));

	assert_eq!(db.get_state(addr(1), hash(1)), hash(0x30));
	assert_eq!(db.get_committed_state(addr(1), hash(1)), hash(0x10));
}

#[test]
fn create_account_resets_but_preserves_balance() {
	let env = TestEnv::new();
	let a = addr(0x42);

	let mut db = env.statedb();
	db.add_balance(a, U256::from(100));
	db.set_nonce(a, 5);
	db.set_code(a, vec![0x01]);
	db.commit().unwrap();

	let mut db = env.statedb();
	db.create_account(a);
	assert_eq!(db.get_balance(a), U256::from(100));
	assert_eq!(db.get_nonce(a), 0);
	assert_eq!(db.get_code_hash(a), KECCAK_EMPTY);
}

#[test]
fn exist_and_empty_defaults() {
	let env = TestEnv::new();
	let mut db = env.statedb();

	assert!(!db.exist(addr(9)));
	assert!(db.empty(addr(9)));
	assert_eq!(db.get_balance(addr(9)), U256::zero());
	assert_eq!(db.get_nonce(addr(9)), 0);
	assert_eq!(db.get_code_hash(addr(9)), H256::zero());
	assert_eq!(db.get_code_size(addr(9)), 0);

	db.set_nonce(addr(9), 0);
	assert!(db.exist(addr(9)));
	assert!(db.empty(addr(9)));
}

#[test]
fn balance_ops_mark_accounts_touched() {
	let env = TestEnv::new();
	let mut db = env.statedb();

	db.add_balance(addr(1), U256::zero());
	db.add_balance(addr(2), U256::from(7));
	assert_eq!(db.touched_accounts(), &[addr(1), addr(2)]);
}

#[test]
fn set_state_to_zero_deletes_the_slot() {
	let env = TestEnv::new();

	let mut db = env.statedb();
	db.set_state(addr(1), hash(1), hash(0x10));
	db.commit().unwrap();
	let hash_with_slot = env.state_hash();

	let mut db = env.statedb();
	db.set_state(addr(1), hash(1), H256::zero());
	db.commit().unwrap();

	let empty = TestEnv::new();
	{
		let db = empty.statedb();
		db.commit().unwrap();
	}
	assert_ne!(env.state_hash(), hash_with_slot);
	assert_eq!(env.state_hash(), empty.state_hash());
}

#[test]
fn writes_to_module_accounts_stick_as_errors() {
	let env = TestEnv::new();
	let a = addr(0x99);

	let root = env.root();
	let number = auth::next_account_number(&root);
	auth::set_auth_account(
		&root,
		a,
		&AuthAccount::Module {
			number,
			name: "distribution".to_string(),
		},
	);

	let mut db = env.statedb();
	db.set_code(a, vec![0x01, 0x02]);
	assert!(matches!(
		db.commit(),
		Err(Error::InvalidAccountType(address, "module")) if address == a
	));
}

#[test]
fn nested_snapshots_step_back_one_value_at_a_time() {
	let env = TestEnv::new();
	let mut db = env.statedb();

	let rev1 = db.snapshot();
	db.set_state(addr(1), hash(1), hash(0x01));

	let rev2 = db.snapshot();
	db.set_state(addr(1), hash(1), hash(0x02));
	assert_eq!(db.get_state(addr(1), hash(1)), hash(0x02));

	db.revert_to_snapshot(rev2);
	assert_eq!(db.get_state(addr(1), hash(1)), hash(0x01));

	db.revert_to_snapshot(rev1);
	assert_eq!(db.get_state(addr(1), hash(1)), H256::zero());
}

#[test]
fn balance_survives_a_revert_and_recommit() {
	let env = TestEnv::new();
	let mut db = env.statedb();

	let id = db.snapshot();
	db.add_balance(addr(1), U256::from(10));
	assert_eq!(db.get_balance(addr(1)), U256::from(10));

	db.revert_to_snapshot(id);
	assert_eq!(db.get_balance(addr(1)), U256::zero());

	db.add_balance(addr(1), U256::from(10));
	db.commit().unwrap();

	let db = env.statedb();
	assert_eq!(db.get_balance(addr(1)), U256::from(10));
}

#[test]
fn code_defaults_and_round_trip() {
	let env = TestEnv::new();
	let code = b"hello world".to_vec();
	let a = addr(5);

	// Unknown account: everything defaults.
	let db = env.statedb();
	assert_eq!(db.get_code(a), Vec::<u8>::new());
	assert_eq!(db.get_code_size(a), 0);
	assert_eq!(db.get_code_hash(a), H256::zero());

	// Known but code-less account: the code hash is the hash of
	// empty, not the zero placeholder.
	let mut db = env.statedb();
	db.create_account(a);
	assert_eq!(db.get_code(a), Vec::<u8>::new());
	assert_eq!(db.get_code_hash(a), KECCAK_EMPTY);
	db.commit().unwrap();

	let mut db = env.statedb();
	db.set_code(a, code.clone());
	assert_eq!(db.get_code(a), code);
	assert_eq!(db.get_code_size(a), code.len());
	assert_eq!(db.get_code_hash(a), evm_statedb::keccak256(&code));
	db.commit().unwrap();

	let db = env.statedb();
	assert_eq!(db.get_code(a), code);
	assert_eq!(db.get_code_hash(a), evm_statedb::keccak256(&code));
}

#[test]
fn transient_zero_write_commits_to_nothing() {
	let env = TestEnv::new();

	// Written and deleted within the same transaction.
	let mut db = env.statedb();
	db.set_state(addr(1), hash(1), hash(0x01));
	db.set_state(addr(1), hash(1), H256::zero());
	db.commit().unwrap();

	let empty = TestEnv::new();
	{
		let db = empty.statedb();
		db.commit().unwrap();
	}
	assert_eq!(env.state_hash(), empty.state_hash());
}

#[test]
fn for_each_storage_sees_committed_state_only() {
	let env = TestEnv::new();
	let a = addr(7);

	let mut db = env.statedb();
	db.set_state(a, hash(1), hash(0x11));
	db.set_state(a, hash(3), hash(0x33));

	let collect = |db: &evm_statedb::StateDB<'_, evm_statedb::Keeper>| {
		let mut storage = Vec::new();
		db.for_each_storage(a, &mut |key, value| {
			storage.push((key, value));
			true
		});
		storage
	};

	// Dirty writes are not visited.
	assert!(collect(&db).is_empty());
	db.commit().unwrap();

	let db = env.statedb();
	assert_eq!(
		collect(&db),
		vec![(hash(1), hash(0x11)), (hash(3), hash(0x33))]
	);

	// Early break stops the iteration.
	let mut first = Vec::new();
	db.for_each_storage(a, &mut |key, value| {
		first.push((key, value));
		false
	});
	assert_eq!(first, vec![(hash(1), hash(0x11))]);
}

#[test]
fn created_accounts_under_reverted_snapshot_get_no_number() {
	let env = TestEnv::new();
	let mut db = env.statedb();

	db.set_nonce(addr(1), 1);
	let id = db.snapshot();
	db.set_nonce(addr(2), 1);
	db.revert_to_snapshot(id);
	db.set_nonce(addr(3), 1);
	db.commit().unwrap();

	let root = env.root();
	assert_eq!(env.keeper.account_number(&root, addr(1)), Some(0));
	assert_eq!(env.keeper.account_number(&root, addr(2)), None);
	// The reverted claim of addr(2)'s number rolled back with its
	// branch, so addr(3) gets the next contiguous one.
	assert_eq!(env.keeper.account_number(&root, addr(3)), Some(1));
}
