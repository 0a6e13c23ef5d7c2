//! Simulated market participants

pub mod trader;
