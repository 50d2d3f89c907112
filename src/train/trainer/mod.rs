//! Trainer: construction and checkpoint wiring (`core`), per-epoch
//! drivers (`epoch`), the multi-epoch loop (`fit`), and the run
//! summary type (`result`).

mod core;
mod epoch;
mod fit;
mod result;

pub use core::Trainer;
pub use result::FitResult;
