//! # ippool
//!
//! An in-memory IPv4 address pool that leases and reclaims individual
//! addresses from a contiguous range.
//!
//! ## Features
//!
//! - No address is handed out twice while it is outstanding
//! - Released addresses are reused lowest-first, before untouched ones
//! - One bit of state per address, whatever the churn
//! - Range arithmetic: split, trim, pop, overlap, CIDR parsing
//! - Optional looping and reserved-suffix (`.0`/`.255`) skipping
//!
//! ## Quick Start
//!
//! ```
//! use ippool::{AddressPool, AddressRange};
//!
//! # fn main() -> ippool::Result<()> {
//! let range = AddressRange::from_cidr("10.8.0.0/24")?;
//! let pool = AddressPool::new(range)?;
//!
//! let peer = pool.acquire_addr()?;
//! pool.release_addr(peer)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`AddressPool`] - Thread-safe allocator: cursor plus recycle bit set
//! - [`AddressRange`] - Inclusive `[begin, end]` value type
//! - [`bitset::BitSet`] - Packed bit set tracking released offsets
//! - [`codec`] - Address text conversions and CIDR parsing
//! - [`Config`] - JSON configuration for a pool deployment

pub mod bitset;
pub mod codec;
pub mod config;
pub mod error;
pub mod pool;
pub mod range;

pub use codec::{AddressCodec, Ipv4Codec};
pub use config::Config;
pub use error::{Error, Result};
pub use pool::{AddressPool, PoolOptions, PoolStats};
pub use range::AddressRange;
