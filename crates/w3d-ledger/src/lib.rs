//! w3d-ledger: the ledger seam of w3drive
//!
//! - `ledger`: the `Ledger` trait the engines are written against
//! - `cost`: per-chunk payment schedule
//! - `store`: `OperatorLedger`, a local ledger emulating the file contract on
//!   any OpenDAL operator (memory, fs, s3)
//! - `operator`: operator factory from config
//! - `health`: backend reachability check

pub mod cost;
pub mod health;
pub mod ledger;
pub mod operator;
pub mod store;

pub use cost::CostSchedule;
pub use health::check_health;
pub use ledger::Ledger;
pub use operator::build_operator;
pub use store::OperatorLedger;
