//! Core domain abstractions and types
//!
//! The foundational types, the ledger read port and the error taxonomy shared
//! by the position, swap and portfolio services. Independent of the RPC
//! transport and the HTTP layer.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use error::{DepositError, NetworkError, ServiceError, ServiceResult};
pub use traits::ChainReader;
pub use types::{
    BundleSlot, LatestBlockhash, PoolSnapshot, PoolState, PositionState, TickRange, TokenInfo,
    TokenSide,
};
