//! Inclusive IPv4 address ranges.
//!
//! An [`AddressRange`] is a plain `Copy` value describing `[begin, end]` as
//! numeric addresses. Besides backing an [`AddressPool`](crate::AddressPool)
//! it is used on its own to carve up address space before pools are built,
//! for example splitting a block between two pools:
//!
//! ```
//! use ippool::AddressRange;
//!
//! let block = AddressRange::from_cidr("10.8.0.0/24")?;
//! let (clients, servers) = block.split(200)?;
//! assert_eq!(clients.size(), 200);
//! assert_eq!(servers.to_string(), "[10.8.0.200 - 10.8.0.255]");
//! # Ok::<(), ippool::Error>(())
//! ```

use std::fmt;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::{self, AddressCodec, Ipv4Codec};
use crate::error::{Error, Result};

/// An inclusive range of IPv4 addresses, `begin <= end` always.
///
/// Mutating operations ([`pop_left`](Self::pop_left),
/// [`trim_left`](Self::trim_left), ...) either shrink the range and succeed,
/// or fail and leave it untouched. A range never becomes empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeRepr", into = "RangeRepr")]
pub struct AddressRange {
    begin: u32,
    end: u32,
}

/// Serialized form: dotted-quad endpoints.
#[derive(Serialize, Deserialize)]
struct RangeRepr {
    begin: Ipv4Addr,
    end: Ipv4Addr,
}

impl TryFrom<RangeRepr> for AddressRange {
    type Error = Error;

    fn try_from(repr: RangeRepr) -> Result<Self> {
        Self::from_addrs(repr.begin, repr.end)
    }
}

impl From<AddressRange> for RangeRepr {
    fn from(range: AddressRange) -> Self {
        Self {
            begin: range.first(),
            end: range.last(),
        }
    }
}

impl AddressRange {
    /// Creates the range `[begin, end]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if `begin > end`.
    pub fn new(begin: u32, end: u32) -> Result<Self> {
        if begin > end {
            return Err(Error::InvalidRange(format!(
                "begin {} is after end {}",
                Ipv4Addr::from(begin),
                Ipv4Addr::from(end)
            )));
        }
        Ok(Self { begin, end })
    }

    pub fn from_addrs(begin: Ipv4Addr, end: Ipv4Addr) -> Result<Self> {
        Self::new(u32::from(begin), u32::from(end))
    }

    /// Creates the range covering the network that `address` belongs to.
    ///
    /// Host bits of `address` are cleared, so `192.168.31.123` with a mask
    /// of 24 yields `[192.168.31.0 - 192.168.31.255]`.
    pub fn from_network_mask(address: u32, mask_bits: u8) -> Result<Self> {
        if mask_bits > 32 {
            return Err(Error::InvalidRange(format!(
                "mask length {} exceeds 32",
                mask_bits
            )));
        }
        let mask = codec::netmask(mask_bits);
        let begin = address & mask;
        Self::new(begin, begin | !mask)
    }

    /// Parses CIDR text such as `10.0.0.0/8`.
    pub fn from_cidr(text: &str) -> Result<Self> {
        Self::from_cidr_with(&Ipv4Codec, text)
    }

    /// Parses CIDR text with a caller-supplied codec.
    pub fn from_cidr_with<C: AddressCodec + ?Sized>(codec: &C, text: &str) -> Result<Self> {
        let (begin, end) = codec.parse_cidr(text)?;
        Self::new(begin, end)
    }

    pub fn begin(&self) -> u32 {
        self.begin
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn first(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.begin)
    }

    pub fn last(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.end)
    }

    /// Number of addresses in the range.
    ///
    /// `0.0.0.0/0` holds 2^32 addresses, which is why this is a `u64`.
    pub fn size(&self) -> u64 {
        u64::from(self.end - self.begin) + 1
    }

    /// Returns the address at `index`.
    ///
    /// Non-negative indices count from the first address; negative indices
    /// count back from the last one, so `-1` is the last address and
    /// `-(size)` the first. Returns `None` outside those bounds.
    pub fn at(&self, index: i64) -> Option<u32> {
        let size = self.size();
        if index >= 0 {
            let offset = index as u64;
            (offset < size).then(|| self.begin + offset as u32)
        } else {
            let back = index.unsigned_abs();
            (back <= size).then(|| self.end - (back - 1) as u32)
        }
    }

    /// Inclusive membership test.
    pub fn has(&self, address: u32) -> bool {
        self.begin <= address && address <= self.end
    }

    pub fn has_overlap(&self, other: &AddressRange) -> bool {
        !(other.end < self.begin || other.begin > self.end)
    }

    /// Splits into `[begin, begin+n-1]` and `[begin+n, end]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if either half would be empty, i.e.
    /// `n == 0` or `n >= size`.
    pub fn split(&self, n: u32) -> Result<(AddressRange, AddressRange)> {
        if n == 0 || u64::from(n) >= self.size() {
            return Err(Error::InvalidRange(format!(
                "cannot split {} at {}",
                self, n
            )));
        }
        let left = Self::new(self.begin, self.begin + n - 1)?;
        let right = Self::new(self.begin + n, self.end)?;
        Ok((left, right))
    }

    /// Removes and returns the first address.
    ///
    /// # Errors
    ///
    /// Fails when only one address is left.
    pub fn pop_left(&mut self) -> Result<u32> {
        self.ensure_shrinkable()?;
        let address = self.begin;
        self.begin += 1;
        Ok(address)
    }

    /// Removes and returns the last address.
    ///
    /// # Errors
    ///
    /// Fails when only one address is left.
    pub fn pop_right(&mut self) -> Result<u32> {
        self.ensure_shrinkable()?;
        let address = self.end;
        self.end -= 1;
        Ok(address)
    }

    /// Removes `count` addresses from the front and returns them.
    pub fn trim_left(&mut self, count: u32) -> Result<AddressRange> {
        self.ensure_trimmable(count)?;
        let removed = Self::new(self.begin, self.begin + count - 1)?;
        self.begin += count;
        Ok(removed)
    }

    /// Removes `count` addresses from the back and returns them.
    pub fn trim_right(&mut self, count: u32) -> Result<AddressRange> {
        self.ensure_trimmable(count)?;
        let removed = Self::new(self.end - count + 1, self.end)?;
        self.end -= count;
        Ok(removed)
    }

    /// Returns a copy narrowed by `left` addresses at the front and `right`
    /// at the back. The receiver is not modified.
    pub fn trim(&self, left: u32, right: u32) -> Result<AddressRange> {
        let begin = self.begin.checked_add(left);
        let end = self.end.checked_sub(right);
        match (begin, end) {
            (Some(begin), Some(end)) => Self::new(begin, end),
            _ => Err(Error::InvalidRange(format!(
                "cannot trim {} by {} and {}",
                self, left, right
            ))),
        }
    }

    /// Iterates over every address in ascending order.
    pub fn iter(&self) -> RangeInclusive<u32> {
        self.begin..=self.end
    }

    fn ensure_shrinkable(&self) -> Result<()> {
        if self.begin >= self.end {
            return Err(Error::InvalidRange(format!(
                "{} holds a single address",
                self
            )));
        }
        Ok(())
    }

    fn ensure_trimmable(&self, count: u32) -> Result<()> {
        if count == 0 || u64::from(count) >= self.size() {
            return Err(Error::InvalidRange(format!(
                "cannot trim {} addresses from {}",
                count, self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {}]", self.first(), self.last())
    }
}

/// Accepts CIDR text (`10.0.0.0/24`), an explicit pair (`10.0.0.1-10.0.0.9`)
/// or a single address.
impl FromStr for AddressRange {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        if text.contains('/') {
            return Self::from_cidr(text);
        }
        match text.split_once('-') {
            Some((begin, end)) => Self::new(codec::parse_address(begin)?, codec::parse_address(end)?),
            None => {
                let address = codec::parse_address(text)?;
                Self::new(address, address)
            }
        }
    }
}
