use primitive_types::{H160, H256};

/// A log record emitted during contract execution.
///
/// The address, topics and data come from the LOG opcode; the
/// remaining fields are stamped by the state database when the log is
/// inserted, from the transaction context it was created with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Log {
	pub address: H160,
	pub topics: Vec<H256>,
	pub data: Vec<u8>,

	pub block_hash: H256,
	pub tx_hash: H256,
	pub tx_index: u64,
	pub log_index: u64,
}

impl Log {
	/// A log carrying only the execution payload. Positional fields
	/// are filled in on insertion.
	pub fn new(address: H160, topics: Vec<H256>, data: Vec<u8>) -> Self {
		Self {
			address,
			topics,
			data,
			..Default::default()
		}
	}
}

/// Read-only description of the transaction a state database is
/// created for, stamped into every log it records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxConfig {
	/// Hash of the block the transaction is part of.
	pub block_hash: H256,
	/// Hash of the transaction itself.
	pub tx_hash: H256,
	/// Position of the transaction within the block.
	pub tx_index: u64,
	/// Index the next emitted log takes within the block.
	pub log_index: u64,
}

impl TxConfig {
	pub fn new(block_hash: H256, tx_hash: H256, tx_index: u64, log_index: u64) -> Self {
		Self {
			block_hash,
			tx_hash,
			tx_index,
			log_index,
		}
	}

	/// A config for contexts outside transaction execution, such as
	/// parameter updates, where only the block hash is known.
	pub fn new_empty(block_hash: H256) -> Self {
		Self {
			block_hash,
			..Default::default()
		}
	}
}
