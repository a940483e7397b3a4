//! # Solsight
//! Solana analytics toolbox: chain data reads, market prices, aggregated
//! news and composite token risk scoring, exposed as schema-validated tools
//! that can be sequenced into workflows.

pub use crate::utils::error::{Error, Result};

pub mod blockchain;
pub mod config;
pub mod market;
pub mod metrics;
pub mod news;
pub mod risk;
pub mod tools;
pub mod utils;
pub mod workflow;
