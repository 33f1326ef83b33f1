//! Hash key types - the totally ordered positions on the ring.
//!
//! The ring never inspects the digest algorithm that produced a key; it only
//! needs a total order so the virtual-node index can be sorted and
//! binary-searched. Any type implementing [`HashKey`] can act as a position.

use crate::error::{Error, Result};

/// A totally ordered ring position constructed from raw digest bytes.
pub trait HashKey: Ord + Clone + std::fmt::Debug {
    /// Number of digest bytes required to construct one key.
    const DIGEST_BYTES: usize;

    /// Builds a key from the leading bytes of a digest.
    ///
    /// Returns [`Error::InvalidLength`] if fewer than
    /// [`Self::DIGEST_BYTES`] bytes are supplied.
    fn from_digest(digest: &[u8]) -> Result<Self>;
}

/// 32-bit key: the first 4 digest bytes read as a little-endian u32.
///
/// Fast and compact, but with a collision rate that only makes it suitable
/// when paired with last-write-wins placement (see the ring builder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Unsigned32Key(u32);

impl HashKey for Unsigned32Key {
    const DIGEST_BYTES: usize = 4;

    fn from_digest(digest: &[u8]) -> Result<Self> {
        let bytes: [u8; 4] = digest
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::InvalidLength {
                expected: Self::DIGEST_BYTES,
                got: digest.len(),
            })?;
        Ok(Self(u32::from_le_bytes(bytes)))
    }
}

/// 128-bit key: two little-endian i64s read from the first 16 digest bytes,
/// ordered lexicographically by (high, low).
///
/// Collisions are negligible for production use at the cost of a wider
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Int64PairKey {
    pub high: i64,
    pub low: i64,
}

impl HashKey for Int64PairKey {
    const DIGEST_BYTES: usize = 16;

    fn from_digest(digest: &[u8]) -> Result<Self> {
        if digest.len() < Self::DIGEST_BYTES {
            return Err(Error::InvalidLength {
                expected: Self::DIGEST_BYTES,
                got: digest.len(),
            });
        }

        // try_into can't fail after the length check above
        let high = i64::from_le_bytes(digest[..8].try_into().unwrap());
        let low = i64::from_le_bytes(digest[8..16].try_into().unwrap());
        Ok(Self { high, low })
    }
}

#[cfg(test)]
mod tests {
    use super::{HashKey, Int64PairKey, Unsigned32Key};
    use crate::error::Error;

    #[test]
    fn test_unsigned32_key_is_little_endian() {
        let key = Unsigned32Key::from_digest(&[0x01, 0x02, 0x03, 0x04]).unwrap();
        assert_eq!(key, Unsigned32Key(0x04030201));
    }

    #[test]
    fn test_unsigned32_key_ignores_trailing_bytes() {
        let short = Unsigned32Key::from_digest(&[1, 2, 3, 4]).unwrap();
        let long = Unsigned32Key::from_digest(&[1, 2, 3, 4, 0xff, 0xff]).unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn test_unsigned32_key_too_short() {
        let err = Unsigned32Key::from_digest(&[1, 2, 3]).unwrap_err();
        assert_eq!(err, Error::InvalidLength { expected: 4, got: 3 });
    }

    #[test]
    fn test_int64_pair_key_orders_by_high_then_low() {
        let low_high = Int64PairKey { high: 1, low: i64::MAX };
        let high_high = Int64PairKey { high: 2, low: i64::MIN };
        assert!(low_high < high_high);

        let a = Int64PairKey { high: 1, low: 1 };
        let b = Int64PairKey { high: 1, low: 2 };
        assert!(a < b);
    }

    #[test]
    fn test_int64_pair_key_from_digest() {
        let mut digest = [0u8; 16];
        digest[..8].copy_from_slice(&5i64.to_le_bytes());
        digest[8..].copy_from_slice(&(-7i64).to_le_bytes());
        let key = Int64PairKey::from_digest(&digest).unwrap();
        assert_eq!(key, Int64PairKey { high: 5, low: -7 });
    }

    #[test]
    fn test_int64_pair_key_too_short() {
        let err = Int64PairKey::from_digest(&[0u8; 15]).unwrap_err();
        assert_eq!(err, Error::InvalidLength { expected: 16, got: 15 });
    }
}
