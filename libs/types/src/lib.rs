//! Types library for the fee-diverting token ledger
//!
//! Shared type definitions used by the token contract and the simulation
//! tooling, kept free of ledger state so both sides agree on the arithmetic.
//!
//! # Modules
//! - `ids`: 20-byte account addresses, including the zero and dead addresses
//! - `numeric`: token/currency amount aliases and floor-rounded pro-rata math
//! - `fee`: per-direction fee rate sets and fee breakdowns
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod fee;
pub mod errors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::fee::*;
    pub use crate::errors::*;
}
