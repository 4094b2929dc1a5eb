//! Fixed-capacity packed bit set.
//!
//! Used by [`AddressPool`](crate::AddressPool) to remember which offsets
//! were released and may be handed out again. Bits are stored eight to a
//! byte, so a pool over a /8 costs 2 MiB of recycle state.

/// A fixed-capacity set of small integers stored as packed bits.
///
/// Indices at or beyond [`capacity`](Self::capacity) are never stored:
/// [`set`](Self::set) and [`unset`](Self::unset) ignore them and
/// [`get`](Self::get) reports them as absent.
///
/// # Example
///
/// ```
/// use ippool::bitset::BitSet;
///
/// let mut bits = BitSet::new(20);
/// bits.set(19);
/// bits.set(8);
/// assert_eq!(bits.lowest_set_index(), Some(8));
/// assert_eq!(bits.count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSet {
    bytes: Box<[u8]>,
    capacity: usize,
    ones: usize,
}

impl BitSet {
    /// Creates an empty set able to hold indices `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity.div_ceil(8)].into_boxed_slice(),
            capacity,
            ones: 0,
        }
    }

    /// Number of addressable bits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.ones
    }

    pub fn is_empty(&self) -> bool {
        self.ones == 0
    }

    /// Sets bit `index`. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize) {
        if index >= self.capacity {
            return;
        }
        let (byte, mask) = Self::locate(index);
        if self.bytes[byte] & mask == 0 {
            self.bytes[byte] |= mask;
            self.ones += 1;
        }
    }

    /// Clears bit `index`. Out-of-range indices are ignored.
    pub fn unset(&mut self, index: usize) {
        if index >= self.capacity {
            return;
        }
        let (byte, mask) = Self::locate(index);
        if self.bytes[byte] & mask != 0 {
            self.bytes[byte] &= !mask;
            self.ones -= 1;
        }
    }

    pub fn get(&self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        let (byte, mask) = Self::locate(index);
        self.bytes[byte] & mask != 0
    }

    /// Returns the smallest set index, or `None` when the set is empty.
    ///
    /// Empty sets answer without scanning. Otherwise bytes are scanned in
    /// ascending order and the lowest bit of the first nonzero byte wins.
    pub fn lowest_set_index(&self) -> Option<usize> {
        if self.ones == 0 {
            return None;
        }
        self.bytes
            .iter()
            .position(|&byte| byte != 0)
            .map(|position| position * 8 + self.bytes[position].trailing_zeros() as usize)
    }

    /// Iterates over set indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bytes
            .iter()
            .enumerate()
            .filter(|(_, byte)| **byte != 0)
            .flat_map(|(position, &byte)| {
                (0..8)
                    .filter(move |&bit| byte & (1u8 << bit) != 0)
                    .map(move |bit| position * 8 + bit)
            })
    }

    #[inline]
    fn locate(index: usize) -> (usize, u8) {
        (index / 8, 1u8 << (index % 8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_unset_get() {
        let mut bits = BitSet::new(8);
        bits.set(0);
        assert!(bits.get(0));
        bits.unset(0);
        assert!(!bits.get(0));

        bits.set(7);
        assert!(bits.get(7));
        bits.unset(7);
        assert!(!bits.get(7));
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut bits = BitSet::new(8);
        bits.set(8);
        assert!(!bits.get(8));
        assert_eq!(bits.count(), 0);

        bits.unset(8);
        assert_eq!(bits.count(), 0);
        assert_eq!(bits.lowest_set_index(), None);
    }

    #[test]
    fn test_capacity_not_multiple_of_eight() {
        let mut bits = BitSet::new(10);
        bits.set(9);
        bits.set(10);
        bits.set(15);
        assert!(bits.get(9));
        assert!(!bits.get(10));
        assert!(!bits.get(15));
        assert_eq!(bits.count(), 1);
    }

    #[test]
    fn test_count_tracks_transitions() {
        let mut bits = BitSet::new(8);
        assert_eq!(bits.count(), 0);

        bits.set(0);
        assert_eq!(bits.count(), 1);
        bits.set(0);
        assert_eq!(bits.count(), 1);

        bits.set(7);
        assert_eq!(bits.count(), 2);

        bits.unset(0);
        assert_eq!(bits.count(), 1);
        bits.unset(0);
        assert_eq!(bits.count(), 1);

        bits.unset(7);
        assert_eq!(bits.count(), 0);
        assert!(bits.is_empty());
    }

    #[test]
    fn test_lowest_set_index() {
        let mut bits = BitSet::new(20);
        assert_eq!(bits.lowest_set_index(), None);

        bits.set(0);
        bits.set(7);
        bits.set(8);
        bits.set(19);
        assert_eq!(bits.lowest_set_index(), Some(0));

        bits.unset(0);
        assert_eq!(bits.lowest_set_index(), Some(7));

        bits.unset(7);
        assert_eq!(bits.lowest_set_index(), Some(8));

        bits.unset(8);
        assert_eq!(bits.lowest_set_index(), Some(19));

        bits.unset(19);
        assert_eq!(bits.lowest_set_index(), None);
    }

    #[test]
    fn test_lowest_set_index_within_byte() {
        let mut bits = BitSet::new(16);
        bits.set(14);
        bits.set(11);
        assert_eq!(bits.lowest_set_index(), Some(11));
    }

    #[test]
    fn test_iter_ascending() {
        let mut bits = BitSet::new(40);
        for index in [33, 2, 17, 3, 39] {
            bits.set(index);
        }
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![2, 3, 17, 33, 39]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut bits = BitSet::new(0);
        bits.set(0);
        assert_eq!(bits.capacity(), 0);
        assert_eq!(bits.count(), 0);
        assert!(!bits.get(0));
        assert_eq!(bits.lowest_set_index(), None);
    }
}
