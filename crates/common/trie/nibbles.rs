use std::cmp;

/// Leaf terminator appended to every full key path.
pub const LEAF_FLAG: u8 = 16;

/// Sequence of half-bytes used to walk the trie.
///
/// Paths built from full keys end with [`LEAF_FLAG`], which tells leaves apart from
/// extensions once the path is compact encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nibbles {
    data: Vec<u8>,
}

impl Nibbles {
    /// Create `Nibbles` from hex-encoded nibbles
    pub fn from_hex(hex: Vec<u8>) -> Self {
        Self { data: hex }
    }

    /// Splits incoming bytes into nibbles and appends the leaf flag
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_raw(bytes, true)
    }

    /// Splits incoming bytes into nibbles, appending the leaf flag only if `is_leaf` is set
    pub fn from_raw(bytes: &[u8], is_leaf: bool) -> Self {
        let mut data: Vec<u8> = bytes
            .iter()
            .flat_map(|byte| [byte >> 4 & 0x0f, byte & 0x0f])
            .collect();
        if is_leaf {
            data.push(LEAF_FLAG);
        }
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// If `prefix` is a prefix of self, drop it and return true, otherwise return false.
    pub fn skip_prefix(&mut self, prefix: &Nibbles) -> bool {
        if self.data.starts_with(&prefix.data) {
            self.data.drain(..prefix.len());
            true
        } else {
            false
        }
    }

    /// Compares only the first `min(len)` nibbles of both sequences.
    pub fn compare_prefix(&self, prefix: &Nibbles) -> cmp::Ordering {
        let shared = self.len().min(prefix.len());
        self.data[..shared].cmp(&prefix.data[..shared])
    }

    /// Amount of leading nibbles shared with `other`
    pub fn count_prefix(&self, other: &Nibbles) -> usize {
        self.data
            .iter()
            .zip(other.data.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Removes and returns the first nibble
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<u8> {
        if self.data.is_empty() {
            None
        } else {
            Some(self.data.remove(0))
        }
    }

    /// Removes and returns the first nibble if it can index a branch choice (aka < 16)
    pub fn next_choice(&mut self) -> Option<usize> {
        self.next()
            .filter(|choice| *choice < LEAF_FLAG)
            .map(usize::from)
    }

    /// Returns the nibbles after the given offset
    pub fn offset(&self, offset: usize) -> Nibbles {
        self.slice(offset, self.len())
    }

    /// Returns the nibbles between the start and end indexes
    pub fn slice(&self, start: usize, end: usize) -> Nibbles {
        Nibbles::from_hex(self.data[start..end].to_vec())
    }

    /// Nibble at the given index. Panics if out of range.
    pub fn at(&self, i: usize) -> usize {
        self.data[i] as usize
    }

    pub fn prepend(&mut self, nibble: u8) {
        self.data.insert(0, nibble);
    }

    pub fn append(&mut self, nibble: u8) {
        self.data.push(nibble);
    }

    /// Returns a copy of self with the nibble added at the end
    pub fn append_new(&self, nibble: u8) -> Nibbles {
        let mut appended = self.clone();
        appended.append(nibble);
        appended
    }

    /// Returns true if the nibbles end with the leaf flag
    pub fn is_leaf(&self) -> bool {
        self.data.last() == Some(&LEAF_FLAG)
    }

    /// Encodes the nibbles in hex-prefix (compact) form
    pub fn encode_compact(&self) -> Vec<u8> {
        let is_leaf = self.is_leaf();
        let mut hex = if is_leaf {
            &self.data[..self.data.len() - 1]
        } else {
            &self.data[..]
        };
        // node type    path length    |    prefix    hexchar
        // --------------------------------------------------
        // extension    even           |    0000      0x0
        // extension    odd            |    0001      0x1
        // leaf         even           |    0010      0x2
        // leaf         odd            |    0011      0x3
        let flag = if is_leaf { 0x20 } else { 0x00 };
        let mut compact = Vec::with_capacity(hex.len() / 2 + 1);
        if hex.len() % 2 == 1 {
            compact.push(flag + 0x10 + hex[0]);
            hex = &hex[1..];
        } else {
            compact.push(flag);
        }
        compact.extend(hex.chunks_exact(2).map(|pair| pair[0] << 4 | pair[1]));
        compact
    }

    /// Inverse of [`Nibbles::encode_compact`]
    pub fn decode_compact(compact: &[u8]) -> Self {
        let Some((&first, rest)) = compact.split_first() else {
            return Self::default();
        };
        let mut data = Vec::with_capacity(rest.len() * 2 + 2);
        if first & 0x10 != 0 {
            data.push(first & 0x0f);
        }
        data.extend(rest.iter().flat_map(|byte| [byte >> 4, byte & 0x0f]));
        if first & 0x20 != 0 {
            data.push(LEAF_FLAG);
        }
        Self { data }
    }

    /// Combines the nibbles into bytes, trimming the leaf flag if present
    pub fn to_bytes(&self) -> Vec<u8> {
        let trimmed = if self.is_leaf() {
            &self.data[..self.data.len() - 1]
        } else {
            &self.data[..]
        };
        trimmed
            .chunks(2)
            .map(|chunk| match chunk {
                [high] => high << 4,
                [high, low, ..] => high << 4 | low,
                [] => 0,
            })
            .collect()
    }
}

impl AsRef<[u8]> for Nibbles {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_bytes_adds_leaf_flag() {
        let nibbles = Nibbles::from_bytes(&[0x81, 0x80]);
        assert_eq!(nibbles.as_ref(), &[8, 1, 8, 0, 16]);
        assert!(nibbles.is_leaf());
        assert_eq!(nibbles.to_bytes(), vec![0x81, 0x80]);
    }

    #[test]
    fn skip_prefix_true() {
        let mut a = Nibbles::from_hex(vec![1, 2, 3, 4, 5]);
        let b = Nibbles::from_hex(vec![1, 2, 3]);
        assert!(a.skip_prefix(&b));
        assert_eq!(a.as_ref(), &[4, 5])
    }

    #[test]
    fn skip_prefix_false() {
        let mut a = Nibbles::from_hex(vec![1, 2, 3, 4, 5]);
        let b = Nibbles::from_hex(vec![1, 2, 4]);
        assert!(!a.skip_prefix(&b));
        assert_eq!(a.as_ref(), &[1, 2, 3, 4, 5])
    }

    #[test]
    fn count_prefix_partial() {
        let a = Nibbles::from_hex(vec![1, 2, 3, 4, 5]);
        let b = Nibbles::from_hex(vec![1, 2, 3, 7]);
        assert_eq!(a.count_prefix(&b), 3);
        assert_eq!(b.count_prefix(&a), 3);
        assert_eq!(a.compare_prefix(&b), cmp::Ordering::Less);
    }

    #[test]
    fn next_choice_stops_at_leaf_flag() {
        let mut a = Nibbles::from_hex(vec![3, 16]);
        assert_eq!(a.next_choice(), Some(3));
        assert_eq!(a.next_choice(), None);
        assert!(a.is_empty());
    }

    #[test]
    fn compact_encoding() {
        // examples from the yellow paper appendix C
        let cases: [(Vec<u8>, Vec<u8>); 4] = [
            (vec![1, 2, 3, 4, 5], vec![0x11, 0x23, 0x45]),
            (vec![0, 1, 2, 3, 4, 5], vec![0x00, 0x01, 0x23, 0x45]),
            (vec![0, 15, 1, 12, 11, 8, 16], vec![0x20, 0x0f, 0x1c, 0xb8]),
            (vec![15, 1, 12, 11, 8, 16], vec![0x3f, 0x1c, 0xb8]),
        ];
        for (hex, compact) in cases {
            let nibbles = Nibbles::from_hex(hex);
            assert_eq!(nibbles.encode_compact(), compact);
            assert_eq!(Nibbles::decode_compact(&compact), nibbles);
        }
    }

    #[test]
    fn empty_leaf_path_is_compact_0x20() {
        assert_eq!(Nibbles::from_hex(vec![16]).encode_compact(), vec![0x20]);
    }
}
