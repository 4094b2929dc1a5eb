//! Conversions between address text and the numeric form used by ranges.
//!
//! Addresses are handled as big-endian `u32` values throughout the crate.
//! [`AddressCodec`] is the seam for alternate text formats; [`Ipv4Codec`]
//! covers dotted-quad and CIDR notation.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Private and loopback IPv4 blocks as (network, prefix length).
const PRIVATE_NETWORKS: [(u32, u8); 4] = [
    (0x7f00_0000, 8),  // 127.0.0.0/8
    (0x0a00_0000, 8),  // 10.0.0.0/8
    (0xac10_0000, 12), // 172.16.0.0/12
    (0xc0a8_0000, 16), // 192.168.0.0/16
];

/// Converts between textual and numeric address forms.
pub trait AddressCodec {
    /// Parses a single address.
    fn parse(&self, text: &str) -> Result<u32>;

    /// Formats a single address.
    fn format(&self, address: u32) -> String;

    /// Parses a network block into its first and last address.
    fn parse_cidr(&self, text: &str) -> Result<(u32, u32)>;
}

/// Dotted-quad IPv4 codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ipv4Codec;

impl AddressCodec for Ipv4Codec {
    fn parse(&self, text: &str) -> Result<u32> {
        text.trim()
            .parse::<Ipv4Addr>()
            .map(u32::from)
            .map_err(|_| Error::InvalidAddress(text.to_string()))
    }

    fn format(&self, address: u32) -> String {
        Ipv4Addr::from(address).to_string()
    }

    fn parse_cidr(&self, text: &str) -> Result<(u32, u32)> {
        let (address, prefix) = text
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::InvalidAddress(format!("{} is not in CIDR notation", text)))?;

        let address = self.parse(address)?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid prefix length in {}", text)))?;
        if prefix > 32 {
            return Err(Error::InvalidAddress(format!(
                "prefix length {} exceeds 32",
                prefix
            )));
        }

        let mask = netmask(prefix);
        let begin = address & mask;
        Ok((begin, begin | !mask))
    }
}

/// Returns the netmask with the top `prefix` bits set.
///
/// `prefix` must not exceed 32.
pub(crate) fn netmask(prefix: u8) -> u32 {
    u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0)
}

/// Parses dotted-quad text into its numeric form.
pub fn parse_address(text: &str) -> Result<u32> {
    Ipv4Codec.parse(text)
}

/// Formats a numeric address as dotted-quad text.
pub fn format_address(address: u32) -> String {
    Ipv4Codec.format(address)
}

/// Parses CIDR text into the first and last address of the block.
pub fn range_from_cidr(text: &str) -> Result<(u32, u32)> {
    Ipv4Codec.parse_cidr(text)
}

/// Returns true for loopback and RFC 1918 private addresses.
pub fn is_private(address: u32) -> bool {
    PRIVATE_NETWORKS
        .iter()
        .any(|&(network, prefix)| address & netmask(prefix) == network)
}

/// Returns true when the low octet is 0 or 255.
///
/// These are the conventional network and broadcast suffixes that some
/// deployments refuse to hand out.
pub fn is_reserved_suffix(address: u32) -> bool {
    matches!(address & 0xff, 0 | 255)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        assert_eq!(parse_address("1.1.1.1").unwrap(), 0x0101_0101);
        assert_eq!(parse_address(" 192.168.31.123 ").unwrap(), 0xc0a8_1f7b);
        assert_eq!(format_address(0x0101_0101), "1.1.1.1");
        assert_eq!(format_address(u32::MAX), "255.255.255.255");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for text in ["example.com", "2001:db8::1428:0", "l13hj41lkh34l1hj3", "1.2.3", ""] {
            assert!(
                matches!(parse_address(text), Err(Error::InvalidAddress(_))),
                "{} should not parse",
                text
            );
        }
    }

    #[test]
    fn test_range_from_cidr() {
        let (begin, end) = range_from_cidr("192.168.31.123/24").unwrap();
        assert_eq!(Ipv4Addr::from(begin), Ipv4Addr::new(192, 168, 31, 0));
        assert_eq!(Ipv4Addr::from(end), Ipv4Addr::new(192, 168, 31, 255));

        let (_, end) = range_from_cidr("172.244.0.1/13").unwrap();
        assert_eq!(Ipv4Addr::from(end), Ipv4Addr::new(172, 247, 255, 255));
    }

    #[test]
    fn test_range_from_cidr_edges() {
        assert_eq!(range_from_cidr("0.0.0.0/0").unwrap(), (0, u32::MAX));
        assert_eq!(range_from_cidr("10.0.0.7/32").unwrap(), (0x0a00_0007, 0x0a00_0007));
        assert!(range_from_cidr("10.0.0.0/33").is_err());
        assert!(range_from_cidr("10.0.0.0").is_err());
        assert!(range_from_cidr("10.0.0.0/x").is_err());
    }

    #[test]
    fn test_is_private() {
        let cases = [
            ("127.0.0.1", true),
            ("128.0.0.1", false),
            ("10.0.0.1", true),
            ("11.0.0.0", false),
            ("172.16.1.1", true),
            ("172.32.0.0", false),
            ("192.168.0.1", true),
            ("192.169.0.0", false),
        ];
        for (text, expected) in cases {
            assert_eq!(is_private(parse_address(text).unwrap()), expected, "{}", text);
        }
    }

    #[test]
    fn test_is_reserved_suffix() {
        assert!(is_reserved_suffix(parse_address("10.0.1.0").unwrap()));
        assert!(is_reserved_suffix(parse_address("10.0.0.255").unwrap()));
        assert!(!is_reserved_suffix(parse_address("10.0.0.254").unwrap()));
        assert!(!is_reserved_suffix(parse_address("10.0.1.1").unwrap()));
    }
}
