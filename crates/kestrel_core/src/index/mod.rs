//! # Bitmask Radix Trie
//!
//! A 16-ary tree that indexes payloads by a fixed-width bitmask key, one hex
//! nibble per level, most significant nibble at the root.
//!
//! ```text
//! key 0x00A3 (u16, 4 levels)
//!
//! root (h=4) --0--> node (h=3) --0--> node (h=2) --A--> node (h=1) --3--> bucket{0x00A3}
//! ```
//!
//! Each node records which children are built in a 16-bit occupancy mask,
//! so a query only ever visits branches that exist and that can still
//! satisfy its predicates. Cost is O(live branches) with a depth of
//! `BITS / 4` per accepted path, instead of a scan over every payload.
//!
//! Nodes live in one arena addressed by dense `u32` indices and are freed in
//! bulk with the trie. Nodes are never pruned; removal only clears buckets.

mod key;
mod query;

pub use key::{MaskKey, NIBBLE_BITS};
pub use query::MaskQuery;

use key::nibble_at;

use crate::memory::Container;

/// Branching factor: one child per nibble value.
pub const BRANCHES: usize = 16;

/// Arena index of the root node.
const ROOT: u32 = 0;

/// One trie node.
///
/// At height 1 the children are bucket indices; above that they are node
/// indices. A child slot is meaningful only when its occupancy bit is set.
#[derive(Clone, Debug)]
struct Node {
    /// Remaining nibble levels below and including this node.
    height: u32,
    /// Bit `n` set = child `n` is built.
    occupancy: u16,
    /// Node or bucket indices.
    children: [u32; BRANCHES],
}

impl Node {
    const fn new(height: u32) -> Self {
        Self {
            height,
            occupancy: 0,
            children: [0; BRANCHES],
        }
    }

    #[inline]
    const fn child(&self, nibble: usize) -> Option<u32> {
        if self.occupancy & (1 << nibble) == 0 {
            None
        } else {
            Some(self.children[nibble])
        }
    }
}

/// Every payload stored under one exact key.
#[derive(Debug)]
struct Bucket<K, P> {
    key: K,
    items: Vec<P>,
}

/// Radix trie over a [`MaskKey`] with a list of payloads per exact key.
///
/// Instantiated for live entities (`u64` component masks), draw batches
/// (`u32` material flags) and the dense registry (`u32` entity ids).
///
/// # Example
///
/// ```rust
/// use kestrel_core::index::{MaskQuery, RadixTrie};
///
/// let mut trie: RadixTrie<u32, &str> = RadixTrie::new();
/// trie.add(0b011, "a");
/// trie.add(0b110, "b");
///
/// let hits = trie.query(&MaskQuery::new().with_all(0b010));
/// assert_eq!(hits.len(), 2);
/// ```
pub struct RadixTrie<K: MaskKey, P> {
    /// Node arena. Index 0 is the root.
    nodes: Vec<Node>,
    /// Leaf buckets, referenced from height-1 nodes.
    buckets: Container<Bucket<K, P>>,
    /// Total payload count across all buckets.
    len: usize,
}

impl<K: MaskKey, P> RadixTrie<K, P> {
    /// Creates an empty trie holding only the root.
    #[must_use]
    pub fn new() -> Self {
        debug_assert!(
            K::BITS % NIBBLE_BITS == 0 && (1..=16).contains(&K::LEVELS),
            "key width must be a non-zero multiple of 4 up to 64"
        );
        Self {
            nodes: vec![Node::new(K::LEVELS)],
            buckets: Container::new(),
            len: 0,
        }
    }

    /// Number of payloads stored.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if no payload is stored.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of built nodes, root included.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct keys with at least one payload.
    #[inline]
    #[must_use]
    pub const fn key_count(&self) -> usize {
        self.buckets.len()
    }

    /// Height of the root: the number of nibble levels.
    #[inline]
    #[must_use]
    pub const fn root_height(&self) -> u32 {
        K::LEVELS
    }

    /// Appends `payload` to the bucket for `key`.
    ///
    /// Missing nodes along the path are built. Payloads under one exact key
    /// accumulate in insertion order.
    pub fn add(&mut self, key: K, payload: P) {
        let bucket = self.bucket_entry(key);
        bucket.items.push(payload);
        self.len += 1;
    }

    /// Stores `payload` under `key`, replacing the first existing payload for
    /// which `same` holds.
    ///
    /// Returns the replaced payload. Use this when a key may hold several
    /// payloads but each identity must appear at most once.
    pub fn upsert<F>(&mut self, key: K, payload: P, same: F) -> Option<P>
    where
        F: Fn(&P) -> bool,
    {
        let bucket = self.bucket_entry(key);
        if let Some(existing) = bucket.items.iter_mut().find(|p| same(p)) {
            return Some(std::mem::replace(existing, payload));
        }
        bucket.items.push(payload);
        self.len += 1;
        None
    }

    /// Clears the bucket for `key`, returning how many payloads it held.
    ///
    /// A key that was never inserted is a no-op.
    pub fn remove(&mut self, key: K) -> usize {
        let Some((leaf, nibble)) = self.locate(key) else {
            return 0;
        };
        self.free_bucket(leaf, nibble).map_or(0, |bucket| bucket.items.len())
    }

    /// Removes the first payload under `key` for which `pred` holds.
    ///
    /// Other payloads sharing the key stay in place, in order.
    pub fn remove_where<F>(&mut self, key: K, pred: F) -> Option<P>
    where
        F: Fn(&P) -> bool,
    {
        let (leaf, nibble) = self.locate(key)?;
        let index = self.nodes[leaf as usize].child(nibble)? as usize;

        let bucket = &mut self.buckets[index];
        let position = bucket.items.iter().position(pred)?;
        let removed = bucket.items.remove(position);
        let now_empty = bucket.items.is_empty();
        self.len -= 1;

        if now_empty {
            self.free_bucket(leaf, nibble);
        }
        Some(removed)
    }

    /// Payloads stored under exactly `key`.
    #[must_use]
    pub fn get(&self, key: K) -> Option<&[P]> {
        let (leaf, nibble) = self.locate(key)?;
        let index = self.nodes[leaf as usize].child(nibble)?;
        Some(self.buckets[index as usize].items.as_slice())
    }

    /// Mutable payloads stored under exactly `key`.
    pub fn get_mut(&mut self, key: K) -> Option<&mut [P]> {
        let (leaf, nibble) = self.locate(key)?;
        let index = self.nodes[leaf as usize].child(nibble)?;
        Some(self.buckets[index as usize].items.as_mut_slice())
    }

    /// Collects every payload whose key satisfies `query`.
    #[must_use]
    pub fn query(&self, query: &MaskQuery<K>) -> Vec<&P> {
        let mut hits = Vec::new();
        self.for_each_match(query, |_, payload| hits.push(payload));
        hits
    }

    /// Calls `f` with every `(key, payload)` whose key satisfies `query`.
    ///
    /// Keys are visited in ascending order.
    pub fn for_each_match<'a, F>(&'a self, query: &MaskQuery<K>, mut f: F)
    where
        F: FnMut(K, &'a P),
    {
        self.visit(ROOT, 0, false, query, &mut f);
    }

    /// Calls `f` with every stored `(key, payload)`.
    pub fn for_each<'a, F>(&'a self, f: F)
    where
        F: FnMut(K, &'a P),
    {
        self.for_each_match(&MaskQuery::new(), f);
    }

    /// Drops every node and payload, keeping a fresh root.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::new(K::LEVELS));
        self.buckets.clear();
        self.len = 0;
    }

    /// Walks the path for `key` without building anything.
    ///
    /// Returns the height-1 node and the final nibble, or `None` as soon as
    /// a branch is missing.
    fn locate(&self, key: K) -> Option<(u32, usize)> {
        let bits = key.to_bits();
        let mut node = ROOT;
        for level in (1..K::LEVELS).rev() {
            node = self.nodes[node as usize].child(nibble_at(bits, level))?;
        }
        Some((node, nibble_at(bits, 0)))
    }

    /// Walks the path for `key`, building missing nodes, and returns its
    /// bucket (created empty if the key is new).
    fn bucket_entry(&mut self, key: K) -> &mut Bucket<K, P> {
        let bits = key.to_bits();
        let mut node = ROOT;
        for level in (1..K::LEVELS).rev() {
            let nibble = nibble_at(bits, level);
            node = match self.nodes[node as usize].child(nibble) {
                Some(child) => child,
                None => self.build_child(node, nibble),
            };
        }

        let nibble = nibble_at(bits, 0);
        let index = match self.nodes[node as usize].child(nibble) {
            Some(index) => index,
            None => {
                let index = arena_index(self.buckets.insert(Bucket {
                    key,
                    items: Vec::new(),
                }));
                let leaf = &mut self.nodes[node as usize];
                leaf.occupancy |= 1 << nibble;
                leaf.children[nibble] = index;
                index
            }
        };

        debug_assert_eq!(self.buckets[index as usize].key, key, "bucket key mismatch");
        &mut self.buckets[index as usize]
    }

    /// Allocates a node one level below `parent` under `nibble`.
    fn build_child(&mut self, parent: u32, nibble: usize) -> u32 {
        let height = self.nodes[parent as usize].height - 1;
        let child = arena_index(self.nodes.len());
        self.nodes.push(Node::new(height));

        let parent = &mut self.nodes[parent as usize];
        parent.occupancy |= 1 << nibble;
        parent.children[nibble] = child;
        child
    }

    /// Unlinks and frees the bucket under a height-1 node.
    fn free_bucket(&mut self, leaf: u32, nibble: usize) -> Option<Bucket<K, P>> {
        let node = &mut self.nodes[leaf as usize];
        let index = node.child(nibble)?;
        node.occupancy &= !(1 << nibble);

        let bucket = self.buckets.remove(index as usize)?;
        self.len -= bucket.items.len();
        Some(bucket)
    }

    fn visit<'a, F>(&'a self, node: u32, prefix: u64, any_hit: bool, query: &MaskQuery<K>, f: &mut F)
    where
        F: FnMut(K, &'a P),
    {
        let node = &self.nodes[node as usize];
        let level = node.height - 1;
        let mut occupied = node.occupancy;

        while occupied != 0 {
            let nibble = occupied.trailing_zeros() as usize;
            occupied &= occupied - 1;

            let Some(hit) = query.admit(nibble, level, any_hit) else {
                continue;
            };
            let prefix = prefix | ((nibble as u64) << (level * NIBBLE_BITS));
            let child = node.children[nibble];

            if level == 0 {
                let bucket = &self.buckets[child as usize];
                debug_assert_eq!(bucket.key.to_bits(), prefix, "bucket stored off its path");
                if query.matches(bucket.key) {
                    for payload in &bucket.items {
                        f(bucket.key, payload);
                    }
                }
            } else {
                self.visit(child, prefix, hit, query, f);
            }
        }
    }
}

impl<K: MaskKey, P> Default for RadixTrie<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: MaskKey, P> std::fmt::Debug for RadixTrie<K, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadixTrie")
            .field("levels", &K::LEVELS)
            .field("nodes", &self.nodes.len())
            .field("keys", &self.buckets.len())
            .field("len", &self.len)
            .finish()
    }
}

/// Converts an arena position to a `u32` index.
fn arena_index(position: usize) -> u32 {
    u32::try_from(position)
        .unwrap_or_else(|_| panic!("radix trie arena index {position} exceeds u32 space"))
}
