//! Error types for the address pool.
//!
//! All fallible operations in this crate return [`Result<T>`], which uses
//! the [`Error`] enum for error variants. A failed call never leaves a
//! pool or range partially mutated.

use std::net::Ipv4Addr;

/// Errors that can occur while building ranges or leasing addresses.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system I/O error (config files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (config files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A range would have begin > end, or a split/trim/pop would empty it.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// The range holds more addresses than the pool is allowed to track.
    ///
    /// The recycle set costs one bit per address, so the ceiling bounds
    /// memory. Split the range and build several pools instead.
    #[error("Pool of {size} addresses exceeds the maximum of {max}")]
    PoolTooLarge { size: u64, max: u64 },

    /// No recycled address is available and the cursor reached the end.
    #[error("No available IP addresses in pool")]
    Exhausted,

    /// Released address is outside the pool's range.
    #[error("Address {0} is outside the pool range")]
    OutOfRange(Ipv4Addr),

    /// Released address was never handed out by the pool.
    #[error("Address {0} was never allocated")]
    NotAllocated(Ipv4Addr),

    /// Released address is already in the recycle set.
    #[error("Address {0} was already released")]
    AlreadyRecycled(Ipv4Addr),

    /// Address or CIDR text could not be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid pool configuration.
    ///
    /// Returned by [`Config::validate`](crate::Config::validate).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A specialized Result type for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
