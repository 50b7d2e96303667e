//! rebal: portfolio rebalancing engine.
//!
//! Given a list of assets (current value + target allocation percentage),
//! computes what it takes to move the portfolio back to its targets:
//! immediate buy/sell trades, a one-time lump-sum contribution (fixed or
//! solved for the minimum), or a periodic contribution plan. Pure,
//! synchronous calculation; the CLI in `main.rs` is the only I/O surface.

pub mod asset;
pub mod config;
pub mod error;
pub mod immediate;
pub mod lump_sum;
pub mod periodic;
pub mod snapshot;
pub mod store;
