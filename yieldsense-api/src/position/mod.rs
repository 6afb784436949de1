//! Position management: discovery, range resolution, deposit planning and
//! transaction building for the create-or-deposit flow.

pub mod builder;
pub mod deposit;
pub mod discovery;
pub mod resolver;
pub mod service;

pub use builder::{BuiltPositionTransaction, PositionTransactionBuilder};
pub use deposit::{plan_deposit, DepositPlan, RangePosition};
pub use discovery::fetch_owned_positions;
pub use resolver::PositionIndex;
pub use service::{CreateOrDepositRequest, CreateOrDepositResponse, PositionService};
