//! The hash ring - a weighted consistent-hashing snapshot.
//!
//! The goal of consistent hashing is to let a client decide which node owns
//! a key while remapping only a small fraction of keys when the node set
//! changes. The hash space is fixed and circular: nodes and keys are hashed
//! into it, and the owner of a key is the node whose position is the first
//! one greater than the key's, wrapping past the largest position back to
//! the smallest.
//!
//! A small example with a hash space from 0 to 10:
//!
//! Nodes:       ['A', 'B', 'C']
//! Nodes_hash:  [ 2 ,  5 ,  8 ]
//!
//! key 'foo', hash('foo') = 4 -> owned by node B (hash 5)
//! key 'bar', hash('bar') = 7 -> owned by node C (hash 8)
//! key 'zoo', hash('zoo') = 9 -> owned by node A (hash 2, wrapped around)
//!
//! To smooth the distribution each real node is placed many times: a node's
//! virtual-node count is proportional to its weight, so a node with twice
//! the weight owns roughly twice the keyspace.
//!
//! A [`HashRing`] is an immutable point-in-time snapshot. Lookups only read
//! it, so it can be shared across threads without synchronization. The
//! mutation operations never touch the receiver - they copy the node list
//! and weight map, rebuild, and hand back a brand-new ring. Callers who want
//! a hot-swappable "current ring" publish the new reference themselves.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{event, Level};

use crate::error::Result;
use crate::hash::{DigestFn, DigestHash, HashFunction, HashSum, Md5Compound};
use crate::key::HashKey;

/// Base virtual-node count per unit of relative weight. Larger values reduce
/// load-imbalance variance at the cost of build time and memory.
const POINTS_PER_NODE: usize = 40;

/// A weighted consistent-hashing ring over string node identifiers.
///
/// Generic over the [`HashFunction`] that places keys and virtual nodes;
/// defaults to the MD5 three-window scheme of [`Md5Compound`].
#[derive(Debug, Clone)]
pub struct HashRing<H: HashFunction = Md5Compound> {
    /// Virtual-node positions, strictly ascending.
    sorted_keys: Vec<H::Key>,
    /// Owner of each virtual node, parallel to `sorted_keys`, as an index
    /// into `nodes`.
    owners: Vec<usize>,
    /// Distinct node identifiers, in first-seen order.
    nodes: Vec<String>,
    weights: HashMap<String, usize>,
    hash_fn: H,
}

impl HashRing {
    /// Builds a ring from a node list, every node with weight 1.
    ///
    /// Duplicate identifiers collapse to a single node.
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_hash_fn(nodes, Md5Compound)
    }

    /// Builds a ring from a weight map; the node set is the map's key set.
    /// Zero weights are coerced to 1.
    pub fn with_weights(weights: HashMap<String, usize>) -> Self {
        Self::with_hash_fn_and_weights(weights, Md5Compound)
    }
}

impl<K: HashKey> HashRing<DigestHash<K>> {
    /// Builds a ring that places keys with a custom digest function.
    ///
    /// One position per virtual-node label. The digest/key pairing is
    /// validated up front: a digest too short for `K` fails here, never
    /// inside a lookup.
    pub fn with_hash<I, S>(nodes: I, digest: DigestFn) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hash_fn = HashSum::new(digest).into_hash()?;
        Ok(Self::with_hash_fn(nodes, hash_fn))
    }

    /// Weighted variant of [`HashRing::with_hash`].
    pub fn with_hash_and_weights(
        weights: HashMap<String, usize>,
        digest: DigestFn,
    ) -> Result<Self> {
        let hash_fn = HashSum::new(digest).into_hash()?;
        Ok(Self::with_hash_fn_and_weights(weights, hash_fn))
    }
}

impl<H: HashFunction> HashRing<H> {
    /// Builds a ring with an explicit hash function, every node with
    /// weight 1.
    pub fn with_hash_fn<I, S>(nodes: I, hash_fn: H) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let nodes: Vec<String> = nodes.into_iter().map(Into::into).collect();
        Self::build(nodes, HashMap::new(), hash_fn)
    }

    /// Builds a ring with an explicit hash function and weight map.
    pub fn with_hash_fn_and_weights(weights: HashMap<String, usize>, hash_fn: H) -> Self {
        let nodes: Vec<String> = weights.keys().cloned().collect();
        Self::build(nodes, weights, hash_fn)
    }

    /// Normalizes the inputs and generates a fresh snapshot.
    ///
    /// Duplicate node identifiers collapse: the first occurrence fixes the
    /// node's position in iteration order, the weight map fixes its weight.
    /// Nodes missing from the map or mapped to 0 get weight 1.
    fn build(raw_nodes: Vec<String>, mut weights: HashMap<String, usize>, hash_fn: H) -> Self {
        let mut seen = HashSet::with_capacity(raw_nodes.len());
        let mut nodes = Vec::with_capacity(raw_nodes.len());
        for node in raw_nodes {
            if seen.insert(node.clone()) {
                nodes.push(node);
            }
        }

        for node in &nodes {
            let weight = weights.entry(node.clone()).or_insert(1);
            if *weight == 0 {
                *weight = 1;
            }
        }

        let (sorted_keys, owners) = Self::generate_circle(&nodes, &weights, &hash_fn);
        event!(
            Level::DEBUG,
            nodes = nodes.len(),
            virtual_nodes = sorted_keys.len(),
            "generated hash ring"
        );

        Self {
            sorted_keys,
            owners,
            nodes,
            weights,
            hash_fn,
        }
    }

    /// Places every node's virtual nodes on the circle.
    ///
    /// A node's virtual-node label count is
    /// `(POINTS_PER_NODE * node_count * weight) / total_weight` (floored),
    /// and each label `"<node>-<j>"` contributes however many positions the
    /// hash function derives from its digest. Position collisions resolve
    /// last-write-wins.
    fn generate_circle(
        nodes: &[String],
        weights: &HashMap<String, usize>,
        hash_fn: &H,
    ) -> (Vec<H::Key>, Vec<usize>) {
        if nodes.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let total_weight: usize = nodes.iter().map(|node| weights[node]).sum();

        let mut circle: BTreeMap<H::Key, usize> = BTreeMap::new();
        for (node_index, node) in nodes.iter().enumerate() {
            let factor = POINTS_PER_NODE * nodes.len() * weights[node] / total_weight;
            for j in 0..factor {
                let label = format!("{}-{}", node, j);
                for key in hash_fn.placements(label.as_bytes()) {
                    circle.insert(key, node_index);
                }
            }
        }

        circle.into_iter().unzip()
    }

    /// Returns the node that owns `key`, or `None` if the ring is empty.
    pub fn get_node(&self, key: &str) -> Option<&str> {
        let pos = self.get_node_pos(key)?;
        Some(self.nodes[self.owners[pos]].as_str())
    }

    /// Index of the first virtual node strictly greater than the key's
    /// position, wrapping past the end back to index 0.
    fn get_node_pos(&self, key: &str) -> Option<usize> {
        if self.sorted_keys.is_empty() {
            return None;
        }

        let hash = self.hash_fn.hash_key(key.as_bytes());
        let pos = self.sorted_keys.partition_point(|elem| *elem <= hash);
        Some(pos % self.sorted_keys.len())
    }

    /// Returns the `size` distinct nodes that own `key`, primary first, in
    /// the order they appear walking the ring.
    ///
    /// Returns `None` if the ring is empty, if `size` exceeds [`Self::size`],
    /// or if a full walk of the ring finds fewer than `size` distinct owners
    /// (a node can be starved of virtual nodes when its relative weight is
    /// small enough that its virtual-node count floors to zero). A partial
    /// list is never returned.
    pub fn get_nodes(&self, key: &str, size: usize) -> Option<Vec<&str>> {
        if size > self.nodes.len() {
            return None;
        }

        let start = self.get_node_pos(key)?;
        let mut result = Vec::with_capacity(size);
        let mut collected = HashSet::with_capacity(size);

        for i in 0..self.sorted_keys.len() {
            if result.len() == size {
                break;
            }
            let owner = self.owners[(start + i) % self.sorted_keys.len()];
            if collected.insert(owner) {
                result.push(self.nodes[owner].as_str());
            }
        }

        if result.len() == size {
            Some(result)
        } else {
            None
        }
    }

    /// Number of distinct nodes (not virtual nodes) on the ring.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Node identifiers in first-seen order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// The normalized weight map backing this snapshot.
    pub fn weights(&self) -> &HashMap<String, usize> {
        &self.weights
    }

    /// Returns a new ring with `node` added at weight 1, or an unchanged
    /// snapshot if the node is already present.
    pub fn add_node(&self, node: &str) -> Self {
        self.add_weighted_node(node, 1)
    }

    /// Returns a new ring with `node` added at `weight`.
    ///
    /// No-op (an unchanged snapshot) when the weight is 0 or the node is
    /// already present, so idempotent retries stay cheap for callers.
    pub fn add_weighted_node(&self, node: &str, weight: usize) -> Self {
        if weight == 0 || self.weights.contains_key(node) {
            return self.clone();
        }

        let mut nodes = self.nodes.clone();
        nodes.push(node.to_owned());
        let mut weights = self.weights.clone();
        weights.insert(node.to_owned(), weight);
        Self::build(nodes, weights, self.hash_fn.clone())
    }

    /// Returns a new ring with `node` reweighted to `weight`.
    ///
    /// No-op when the weight is 0, the node is absent, or the weight is
    /// unchanged.
    pub fn update_weighted_node(&self, node: &str, weight: usize) -> Self {
        if weight == 0 || self.weights.get(node) == Some(&weight) || !self.weights.contains_key(node)
        {
            return self.clone();
        }

        let mut weights = self.weights.clone();
        weights.insert(node.to_owned(), weight);
        Self::build(self.nodes.clone(), weights, self.hash_fn.clone())
    }

    /// Returns a new ring with `node` removed, or an unchanged snapshot if
    /// it was never present.
    pub fn remove_node(&self, node: &str) -> Self {
        if !self.weights.contains_key(node) {
            return self.clone();
        }

        let nodes = self
            .nodes
            .iter()
            .filter(|n| n.as_str() != node)
            .cloned()
            .collect();
        let mut weights = self.weights.clone();
        weights.remove(node);
        Self::build(nodes, weights, self.hash_fn.clone())
    }

    /// Replaces the full topology with `weights`, rebuilding only when the
    /// membership or any weight actually differs.
    pub fn update_with_weights(&self, weights: HashMap<String, usize>) -> Self {
        let changed = weights.len() != self.weights.len()
            || weights
                .iter()
                .any(|(node, weight)| self.weights.get(node) != Some(weight));
        if !changed {
            return self.clone();
        }

        let nodes: Vec<String> = weights.keys().cloned().collect();
        Self::build(nodes, weights, self.hash_fn.clone())
    }
}
