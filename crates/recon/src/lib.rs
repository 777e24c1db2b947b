//! `ledgercheck-recon`: journal vs. trial-balance reconciliation engine.
//!
//! Pure engine crate: receives already-tabular source data, returns the
//! classified reconciliation plus voucher sequence and balance checks.
//! No CLI or filesystem dependencies.

pub mod amount;
pub mod balance;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod fields;
pub mod gaps;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod source;
pub mod voucher;

pub use config::ReconConfig;
pub use engine::{run, ReconInput};
pub use error::ReconError;
pub use model::{RawEntry, ReconResult, Side};
pub use source::SourceTable;
