//! Solana chain access: address validation and RPC reads.

pub mod address;
pub mod client;
pub mod token_utils;

pub use address::{is_valid_address, parse_address};
pub use client::{
    ChainClient, OnChainTokenData, TokenBalance, TokenHolder, TransactionRecord, TxStatus, TxType,
};
pub use token_utils::TokenUtils;
