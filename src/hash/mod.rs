//! Hash function adapters - the bridge between a digest algorithm and the
//! ring positions it produces.
//!
//! The ring is generic over a [`HashFunction`], which answers two questions:
//! where does a lookup key land on the ring, and which positions does a
//! virtual-node label occupy. The default [`Md5Compound`] scheme derives
//! three 32-bit positions from disjoint windows of a single MD5 digest,
//! amortizing the digest cost across three placements. Custom digests are
//! composed through [`HashSum`], which validates the digest/key pairing
//! eagerly so misconfiguration surfaces at construction instead of inside a
//! hot lookup path.

use std::marker::PhantomData;

use md5::{Digest, Md5};

use crate::error::Result;
use crate::key::{HashKey, Int64PairKey, Unsigned32Key};

/// A digest function: full digest bytes for an input.
///
/// A plain fn pointer is enough here - the inputs are small key strings and
/// virtual-node labels, so a streaming update/finalize API buys nothing.
pub type DigestFn = fn(&[u8]) -> Vec<u8>;

/// Input used to validate a digest/key pairing before the ring uses it.
const CANARY: &[u8] = b"test";

/// Maps keys and virtual-node labels to ring positions.
pub trait HashFunction: Clone {
    type Key: HashKey;

    /// Position of a lookup key on the ring.
    fn hash_key(&self, key: &[u8]) -> Self::Key;

    /// Ring positions occupied by one virtual-node label.
    ///
    /// A scheme may derive several positions from disjoint byte windows of a
    /// single digest; lookups always use [`Self::hash_key`].
    fn placements(&self, label: &[u8]) -> Vec<Self::Key>;
}

/// The default scheme: MD5 digests split into little-endian u32 windows.
///
/// Lookup keys read bytes [0:4]; each virtual-node label yields three
/// positions from bytes [0:4], [4:8] and [8:12] of its digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Compound;

/// Number of 4-byte windows consumed per label digest.
const WINDOWS_PER_DIGEST: usize = 3;

impl HashFunction for Md5Compound {
    type Key = Unsigned32Key;

    fn hash_key(&self, key: &[u8]) -> Unsigned32Key {
        let digest = Md5::digest(key);
        Unsigned32Key::from_digest(digest.as_slice()).expect("md5 digests are 16 bytes")
    }

    fn placements(&self, label: &[u8]) -> Vec<Unsigned32Key> {
        let digest = Md5::digest(label);
        (0..WINDOWS_PER_DIGEST)
            .map(|i| {
                Unsigned32Key::from_digest(&digest[i * 4..]).expect("md5 digests are 16 bytes")
            })
            .collect()
    }
}

pub fn md5_digest(input: &[u8]) -> Vec<u8> {
    Md5::digest(input).to_vec()
}

/// Builder that pairs a digest function with a key construction.
///
/// The pairing is validated by running [`CANARY`] through the whole
/// pipeline, so a digest that is too short for the requested key type fails
/// here rather than on first use.
///
/// Example: `HashSum::md5().int64_pair_hash()?`
#[derive(Debug, Clone, Copy)]
pub struct HashSum {
    digest: DigestFn,
}

impl HashSum {
    pub fn new(digest: DigestFn) -> Self {
        Self { digest }
    }

    pub fn md5() -> Self {
        Self::new(md5_digest)
    }

    /// 128-bit keys; the digest must produce at least 16 bytes.
    pub fn int64_pair_hash(self) -> Result<DigestHash<Int64PairKey>> {
        self.into_hash()
    }

    /// 32-bit keys; the digest must produce at least 4 bytes.
    pub fn unsigned32_hash(self) -> Result<DigestHash<Unsigned32Key>> {
        self.into_hash()
    }

    /// Validates the digest output against `K` and returns the adapter.
    pub fn into_hash<K: HashKey>(self) -> Result<DigestHash<K>> {
        K::from_digest(&(self.digest)(CANARY))?;
        Ok(DigestHash {
            digest: self.digest,
            _key: PhantomData,
        })
    }
}

/// A validated digest-to-key hash function. One position per label.
#[derive(Debug)]
pub struct DigestHash<K> {
    digest: DigestFn,
    _key: PhantomData<K>,
}

// manual impls so K does not need Clone/Copy for the adapter to be copied
impl<K> Clone for DigestHash<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for DigestHash<K> {}

impl<K: HashKey> HashFunction for DigestHash<K> {
    type Key = K;

    fn hash_key(&self, key: &[u8]) -> K {
        // the pairing was validated on construction; failing here means the
        // digest function changed its output length between calls
        K::from_digest(&(self.digest)(key)).expect("hash function validated at construction")
    }

    fn placements(&self, label: &[u8]) -> Vec<K> {
        vec![self.hash_key(label)]
    }
}

#[cfg(test)]
mod tests {
    use super::{md5_digest, DigestFn, HashFunction, HashSum, Md5Compound};
    use crate::error::Error;
    use crate::key::{HashKey, Int64PairKey, Unsigned32Key};

    #[test]
    fn test_md5_compound_derives_three_placements_per_label() {
        let placements = Md5Compound.placements(b"a-0");
        assert_eq!(placements.len(), 3);

        let digest = md5_digest(b"a-0");
        assert_eq!(placements[0], Unsigned32Key::from_digest(&digest[0..4]).unwrap());
        assert_eq!(placements[1], Unsigned32Key::from_digest(&digest[4..8]).unwrap());
        assert_eq!(placements[2], Unsigned32Key::from_digest(&digest[8..12]).unwrap());
    }

    #[test]
    fn test_md5_compound_lookup_uses_first_window() {
        let key = Md5Compound.hash_key(b"test");
        assert_eq!(key, Md5Compound.placements(b"test")[0]);
    }

    #[test]
    fn test_hash_sum_md5_supports_both_key_widths() {
        assert!(HashSum::md5().unsigned32_hash().is_ok());
        assert!(HashSum::md5().int64_pair_hash().is_ok());
    }

    #[test]
    fn test_hash_sum_rejects_short_digest() {
        let short: DigestFn = |input| md5_digest(input)[..4].to_vec();
        assert!(HashSum::new(short).unsigned32_hash().is_ok());

        let err = HashSum::new(short).int64_pair_hash().unwrap_err();
        assert_eq!(err, Error::InvalidLength { expected: 16, got: 4 });
    }

    #[test]
    fn test_digest_hash_matches_key_construction() {
        let hash = HashSum::md5().int64_pair_hash().unwrap();
        let key = hash.hash_key(b"key");
        assert_eq!(key, Int64PairKey::from_digest(&md5_digest(b"key")).unwrap());
        assert_eq!(hash.placements(b"key"), vec![key]);
    }
}
