//! Address pool: recycle-first leasing over a fixed range.
//!
//! The pool hands out addresses from an [`AddressRange`] using two pieces of
//! state:
//!
//! - a cursor counting how many offsets were ever drawn sequentially, and
//! - a [`BitSet`] of offsets that were released and may be reused.
//!
//! [`AddressPool::acquire`] prefers the lowest released offset and only then
//! advances the cursor. [`AddressPool::release`] refuses addresses that are
//! outside the range, were never drawn, or are already released, so the
//! recycle set can never hold an address that is still in use.
//!
//! # Thread Safety
//!
//! All operations are thread-safe. Cursor, recycle set and loop flag live
//! behind a single [`Mutex`], held for the whole check-and-update of each
//! call and never across I/O.

use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bitset::BitSet;
use crate::codec::is_reserved_suffix;
use crate::error::{Error, Result};
use crate::range::AddressRange;

/// Largest pool accepted by default: one /8, 2 MiB of recycle bits.
pub const DEFAULT_MAX_POOL_SIZE: u64 = 1 << 24;

/// Per-pool policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolOptions {
    /// Ranges holding more addresses than this are rejected.
    pub max_size: u64,

    /// Restart the cursor at the first address once the range is used up.
    ///
    /// Only safe when every address from the previous pass is known to be
    /// back, since the pool can no longer tell old holders from new ones.
    pub looping: bool,

    /// Never hand out addresses whose low octet is 0 or 255.
    ///
    /// Off by default: /31 and /32 pools need those addresses.
    pub skip_reserved: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_POOL_SIZE,
            looping: false,
            skip_reserved: false,
        }
    }
}

/// Point-in-time counters for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Addresses in the range.
    pub size: u64,
    /// Offsets drawn by the cursor in the current pass.
    pub issued: u64,
    /// Released addresses waiting for reuse.
    pub recycled: u64,
    /// Addresses currently held by callers.
    pub outstanding: u64,
    pub looping: bool,
}

#[derive(Debug)]
struct PoolState {
    next_offset: u64,
    recycled: BitSet,
    looping: bool,
}

/// Thread-safe IPv4 address pool.
///
/// # Example
///
/// ```
/// use ippool::{AddressPool, AddressRange, Error};
///
/// let pool = AddressPool::new(AddressRange::new(0, 2)?)?;
/// assert_eq!(pool.acquire()?, 0);
/// assert_eq!(pool.acquire()?, 1);
/// assert_eq!(pool.acquire()?, 2);
/// assert!(matches!(pool.acquire(), Err(Error::Exhausted)));
///
/// pool.release(1)?;
/// assert_eq!(pool.acquire()?, 1);
/// # Ok::<(), ippool::Error>(())
/// ```
#[derive(Debug)]
pub struct AddressPool {
    range: AddressRange,
    skip_reserved: bool,
    state: Mutex<PoolState>,
}

impl AddressPool {
    /// Creates a pool over `range` with [`PoolOptions::default`].
    pub fn new(range: AddressRange) -> Result<Self> {
        Self::with_options(range, PoolOptions::default())
    }

    /// Creates a pool over `range`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolTooLarge`] if the range holds more than
    /// `options.max_size` addresses.
    pub fn with_options(range: AddressRange, options: PoolOptions) -> Result<Self> {
        let size = range.size();
        if size > options.max_size {
            return Err(Error::PoolTooLarge {
                size,
                max: options.max_size,
            });
        }
        let capacity = usize::try_from(size).map_err(|_| Error::PoolTooLarge {
            size,
            max: usize::MAX as u64,
        })?;

        debug!(
            "Created pool {} ({} addresses, looping: {}, skip reserved: {})",
            range, size, options.looping, options.skip_reserved
        );

        Ok(Self {
            range,
            skip_reserved: options.skip_reserved,
            state: Mutex::new(PoolState {
                next_offset: 0,
                recycled: BitSet::new(capacity),
                looping: options.looping,
            }),
        })
    }

    pub fn range(&self) -> AddressRange {
        self.range
    }

    /// Leases an address.
    ///
    /// # Allocation Order
    ///
    /// 1. The lowest released address, if any
    /// 2. The next never-issued address
    /// 3. With looping enabled, the first address again
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] when none of the above yields an address.
    pub fn acquire(&self) -> Result<u32> {
        let mut state = self.lock();

        if let Some(index) = state.recycled.lowest_set_index() {
            state.recycled.unset(index);
            let address = self.address_at(index as u64);
            debug!("Reissuing released address {}", Ipv4Addr::from(address));
            return Ok(address);
        }

        let size = self.range.size();
        let start_offset = state.next_offset;
        let mut wrapped = false;

        loop {
            if state.next_offset >= size {
                if !state.looping || wrapped {
                    state.next_offset = start_offset;
                    warn!("Pool {} exhausted", self.range);
                    return Err(Error::Exhausted);
                }
                debug!("Pool {} wrapped, restarting at the first address", self.range);
                state.next_offset = 0;
                wrapped = true;
            }

            let address = self.address_at(state.next_offset);
            state.next_offset += 1;

            if self.skip_reserved && is_reserved_suffix(address) {
                continue;
            }
            return Ok(address);
        }
    }

    /// Returns a leased address to the pool.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] if `address` is not in the pool's range
    /// - [`Error::NotAllocated`] if the pool never handed `address` out
    /// - [`Error::AlreadyRecycled`] if `address` was already released
    ///
    /// The pool is unchanged when an error is returned.
    pub fn release(&self, address: u32) -> Result<()> {
        let ip = Ipv4Addr::from(address);
        if !self.range.has(address) {
            return Err(Error::OutOfRange(ip));
        }

        let offset = self.offset_of(address);
        let mut state = self.lock();

        if offset >= state.next_offset || (self.skip_reserved && is_reserved_suffix(address)) {
            return Err(Error::NotAllocated(ip));
        }

        let index = offset as usize;
        if state.recycled.get(index) {
            return Err(Error::AlreadyRecycled(ip));
        }

        state.recycled.set(index);
        Ok(())
    }

    pub fn acquire_addr(&self) -> Result<Ipv4Addr> {
        self.acquire().map(Ipv4Addr::from)
    }

    pub fn release_addr(&self, address: Ipv4Addr) -> Result<()> {
        self.release(u32::from(address))
    }

    /// Enables or disables restarting the cursor on exhaustion.
    pub fn set_looping(&self, looping: bool) {
        self.lock().looping = looping;
    }

    pub fn is_looping(&self) -> bool {
        self.lock().looping
    }

    /// Returns true if `address` is currently held by a caller.
    pub fn is_outstanding(&self, address: u32) -> bool {
        if !self.range.has(address) || (self.skip_reserved && is_reserved_suffix(address)) {
            return false;
        }
        let offset = self.offset_of(address);
        let state = self.lock();
        offset < state.next_offset && !state.recycled.get(offset as usize)
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        let issued = state.next_offset;
        let recycled = state.recycled.count() as u64;
        let skipped = if self.skip_reserved && issued > 0 {
            reserved_between(self.range.begin(), self.address_at(issued - 1))
        } else {
            0
        };

        PoolStats {
            size: self.range.size(),
            issued,
            recycled,
            outstanding: issued - skipped - recycled,
            looping: state.looping,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // State is only written after validation, so a panicking holder
        // cannot leave it half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn address_at(&self, offset: u64) -> u32 {
        self.range.begin() + offset as u32
    }

    fn offset_of(&self, address: u32) -> u64 {
        u64::from(address - self.range.begin())
    }
}

/// Counts addresses in `[low, high]` whose low octet is 0 or 255.
fn reserved_between(low: u32, high: u32) -> u64 {
    let upto = |bound: u64, suffix: u64| {
        if bound < suffix {
            0
        } else {
            (bound - suffix) / 256 + 1
        }
    };
    let (low, high) = (u64::from(low), u64::from(high));
    [0, 255]
        .into_iter()
        .map(|suffix| {
            let below = if low == 0 { 0 } else { upto(low - 1, suffix) };
            upto(high, suffix) - below
        })
        .sum()
}
