//! YieldSense Whirlpool Liquidity API
//!
//! Builds unsigned Orca Whirlpools transactions for client-side signing:
//! opening or topping up concentrated-liquidity positions, and exact-in swaps
//! with dynamic slippage. Every request reads a fresh snapshot of on-chain
//! state through a [`ChainReader`]; nothing is cached between requests.

pub mod api;
pub mod config;
pub mod core;
pub mod math;
pub mod pool;
pub mod portfolio;
pub mod position;
pub mod rpc_client;
pub mod swap;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod tokens;
pub mod transaction;
pub mod whirlpool;

// Re-export commonly used types
pub use crate::core::{ChainReader, ServiceError, ServiceResult};
pub use config::ServiceConfig;
pub use rpc_client::LightRpcClient;
