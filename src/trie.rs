//! Critical-bit (PATRICIA) trie mapping byte strings to `u64`.
//!
//! Nodes live in a single arena and refer to each other by [`NodeId`]. Every
//! node except the root has exactly one parent, so splicing a branch in or
//! collapsing a cherry is a matter of rewriting one child id.
//!
//! Shape invariants, checked by the test suite after every mutation:
//!
//! - below a branch testing bit `b`, every leaf under `children[0]` has
//!   `bit(key, b) == 0` and every leaf under `children[1]` has `bit(key, b) == 1`;
//! - branch bit indices strictly increase from the root down;
//! - leaf keys are pairwise distinct;
//! - an empty trie has no root, a single entry is a root leaf, anything larger
//!   has a branch at the root.

use tracing::trace;

use crate::bits::{bit, first_differing_bit};
use crate::error::{DictError, Result};

/// Index of a node slot in the arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Leaf {
    pub(crate) key: Vec<u8>,
    pub(crate) value: u64,
}

impl Leaf {
    /// Copies `key` into a new leaf, reporting allocation failure instead of aborting.
    pub(crate) fn new(key: &[u8], value: u64) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(key.len())?;
        buf.extend_from_slice(key);
        Ok(Self { key: buf, value })
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Branch {
    pub(crate) crit_bit: u64,
    /// `children[0]` is the low side, `children[1]` the high side.
    pub(crate) children: [NodeId; 2],
}

#[derive(Clone, Debug)]
pub(crate) enum Node {
    Leaf(Leaf),
    Branch(Branch),
    /// Freed slot, parked on the free list.
    Vacant,
}

/// Node slots plus a free list of vacated ids.
#[derive(Clone)]
pub(crate) struct NodeArena {
    slots: Vec<Node>,
    free: Vec<NodeId>,
    /// Upper bound on `slots.len()`.
    limit: usize,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            limit: Self::MAX_SLOTS,
        }
    }
}

impl NodeArena {
    const MAX_SLOTS: usize = u32::MAX as usize;

    fn with_capacity(n: usize) -> Result<Self> {
        let mut arena = Self::default();
        arena.reserve(n)?;
        Ok(arena)
    }

    /// Makes sure the next `n` calls to [`NodeArena::alloc`] cannot fail.
    pub(crate) fn reserve(&mut self, n: usize) -> Result<()> {
        let fresh = n.saturating_sub(self.free.len());
        if fresh == 0 {
            return Ok(());
        }
        if fresh > self.limit.saturating_sub(self.slots.len()) {
            return Err(DictError::OutOfMemory);
        }
        self.slots.try_reserve(fresh)?;
        Ok(())
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = node;
            return id;
        }
        debug_assert!(self.slots.len() < self.limit);
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(node);
        id
    }

    fn free(&mut self, id: NodeId) {
        self.slots[id.index()] = Node::Vacant;
        self.free.push(id);
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &Node {
        &self.slots[id.index()]
    }

    fn branch(&self, id: NodeId) -> &Branch {
        match self.get(id) {
            Node::Branch(b) => b,
            other => unreachable!("node {id:?} is not a branch: {other:?}"),
        }
    }

    fn set_child(&mut self, id: NodeId, dir: usize, child: NodeId) {
        match &mut self.slots[id.index()] {
            Node::Branch(b) => b.children[dir] = child,
            other => unreachable!("node {id:?} is not a branch: {other:?}"),
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    /// Number of slots holding a live node.
    #[cfg(test)]
    fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

/// Persistent-friendly dictionary of byte-string keys to `u64` values.
///
/// ```rust
/// use patricia_dict::PatriciaTrie;
///
/// let mut dict = PatriciaTrie::new();
/// dict.insert(b"cat", 1).unwrap();
/// dict.insert(b"car", 2).unwrap();
///
/// assert_eq!(dict.get(b"cat"), Some(1));
/// assert_eq!(dict.get(b"cow"), None);
/// assert_eq!(dict.remove(b"car").unwrap(), 2);
/// ```
#[derive(Clone, Default)]
pub struct PatriciaTrie {
    pub(crate) nodes: NodeArena,
    pub(crate) root: Option<NodeId>,
    len: usize,
}

impl PatriciaTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty trie with room for about `entries` keys.
    ///
    /// Fails with [`DictError::OutOfMemory`] if that room cannot be allocated.
    pub fn with_capacity(entries: usize) -> Result<Self> {
        // n leaves need n - 1 branches
        Ok(Self {
            nodes: NodeArena::with_capacity(entries.saturating_mul(2))?,
            root: None,
            len: 0,
        })
    }

    pub(crate) fn from_parts(nodes: NodeArena, root: Option<NodeId>, len: usize) -> Self {
        Self { nodes, root, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
    }

    /// Follows the critical bits of `key` down to a leaf.
    ///
    /// Only branch bit indices are consulted on the way, so the leaf reached is
    /// the closest stored key, not necessarily `key` itself.
    fn closest_leaf(&self, key: &[u8]) -> Option<&Leaf> {
        let mut current = self.root?;
        loop {
            match self.nodes.get(current) {
                Node::Branch(b) => current = b.children[bit(key, b.crit_bit)],
                Node::Leaf(leaf) => return Some(leaf),
                Node::Vacant => unreachable!("vacant slot {current:?} reachable from root"),
            }
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<u64> {
        let leaf = self.closest_leaf(key)?;
        (leaf.key.as_slice() == key).then_some(leaf.value)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Inserts a new entry.
    ///
    /// Returns [`DictError::DuplicateKey`] if `key` is already present, in which
    /// case the stored value is left as is.
    pub fn insert(&mut self, key: &[u8], value: u64) -> Result<()> {
        let Some(root) = self.root else {
            let leaf = Leaf::new(key, value)?;
            self.nodes.reserve(1)?;
            self.root = Some(self.nodes.alloc(Node::Leaf(leaf)));
            self.len = 1;
            return Ok(());
        };

        let crit_bit = match self.closest_leaf(key) {
            Some(closest) => {
                first_differing_bit(key, &closest.key).ok_or(DictError::DuplicateKey)?
            }
            None => unreachable!("non-empty trie has a leaf"),
        };

        // Everything fallible happens before the tree is touched.
        let leaf = Leaf::new(key, value)?;
        self.nodes.reserve(2)?;

        // Second descent: stop above the first branch that tests `crit_bit` or
        // a later bit. That is where the new branch goes.
        let mut parent: Option<(NodeId, usize)> = None;
        let mut current = root;
        while let Node::Branch(b) = self.nodes.get(current) {
            if b.crit_bit >= crit_bit {
                break;
            }
            let dir = bit(key, b.crit_bit);
            parent = Some((current, dir));
            current = b.children[dir];
        }

        let dir = bit(key, crit_bit);
        let leaf_id = self.nodes.alloc(Node::Leaf(leaf));
        let mut children = [current; 2];
        children[dir] = leaf_id;
        let branch_id = self.nodes.alloc(Node::Branch(Branch { crit_bit, children }));

        match parent {
            Some((parent_id, parent_dir)) => self.nodes.set_child(parent_id, parent_dir, branch_id),
            None => self.root = Some(branch_id),
        }
        self.len += 1;

        trace!(crit_bit, at_root = parent.is_none(), "spliced branch");
        Ok(())
    }

    /// Removes `key` and returns its value, or [`DictError::KeyNotFound`].
    pub fn remove(&mut self, key: &[u8]) -> Result<u64> {
        let Some(root) = self.root else {
            return Err(DictError::KeyNotFound);
        };

        let mut grandparent: Option<(NodeId, usize)> = None;
        let mut parent: Option<(NodeId, usize)> = None;
        let mut current = root;
        while let Node::Branch(b) = self.nodes.get(current) {
            let dir = bit(key, b.crit_bit);
            grandparent = parent;
            parent = Some((current, dir));
            current = b.children[dir];
        }

        let value = match self.nodes.get(current) {
            Node::Leaf(leaf) if leaf.key.as_slice() == key => leaf.value,
            _ => return Err(DictError::KeyNotFound),
        };

        let Some((parent_id, dir)) = parent else {
            // Last entry.
            self.clear();
            return Ok(value);
        };

        // Collapse the cherry: the sibling takes the parent's place.
        let sibling = self.nodes.branch(parent_id).children[1 - dir];
        self.nodes.free(current);
        self.nodes.free(parent_id);
        match grandparent {
            Some((gp_id, gp_dir)) => self.nodes.set_child(gp_id, gp_dir, sibling),
            None => self.root = Some(sibling),
        }
        self.len -= 1;

        trace!(at_root = grandparent.is_none(), "collapsed branch");
        Ok(value)
    }

    /// Iterates over entries in lexicographic key order.
    pub fn iter(&self) -> Iter<'_> {
        let mut stack = Vec::new();
        if let Some(root) = self.root {
            stack.push(root);
        }
        Iter { trie: self, stack }
    }
}

impl std::fmt::Debug for PatriciaTrie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(k, v)| (String::from_utf8_lossy(k), v)))
            .finish()
    }
}

impl<'a> IntoIterator for &'a PatriciaTrie {
    type Item = (&'a [u8], u64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a> {
    trie: &'a PatriciaTrie,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], u64);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            match self.trie.nodes.get(id) {
                Node::Leaf(leaf) => return Some((leaf.key.as_slice(), leaf.value)),
                Node::Branch(b) => {
                    self.stack.push(b.children[1]);
                    self.stack.push(b.children[0]);
                }
                Node::Vacant => unreachable!("vacant slot {id:?} reachable from root"),
            }
        }
        None
    }
}

#[cfg(test)]
impl PatriciaTrie {
    /// Caps the arena at `slots` nodes so that exhaustion can be exercised.
    pub(crate) fn set_node_limit(&mut self, slots: usize) {
        self.nodes.limit = slots;
    }

    /// Walks the whole tree and panics on any broken shape invariant.
    pub(crate) fn assert_invariants(&self) {
        use std::collections::BTreeSet;

        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty trie must have len 0");
            assert_eq!(self.nodes.live(), 0, "empty trie must not hold nodes");
            return;
        };
        match self.nodes.get(root) {
            Node::Leaf(_) => assert_eq!(self.len, 1, "root leaf means exactly one entry"),
            Node::Branch(_) => assert!(self.len >= 2, "root branch means at least two entries"),
            Node::Vacant => panic!("root points at a vacant slot"),
        }

        // (node, path of (crit_bit, dir) taken to reach it)
        let mut stack: Vec<(NodeId, Vec<(u64, usize)>)> = vec![(root, Vec::new())];
        let mut keys = BTreeSet::new();
        let mut reachable = 0usize;
        while let Some((id, path)) = stack.pop() {
            reachable += 1;
            match self.nodes.get(id) {
                Node::Leaf(leaf) => {
                    for &(crit_bit, dir) in &path {
                        assert_eq!(
                            bit(&leaf.key, crit_bit),
                            dir,
                            "leaf {:?} on wrong side of bit {crit_bit}",
                            leaf.key
                        );
                    }
                    assert!(keys.insert(leaf.key.clone()), "duplicate key {:?}", leaf.key);
                }
                Node::Branch(b) => {
                    if let Some(&(parent_bit, _)) = path.last() {
                        assert!(
                            b.crit_bit > parent_bit,
                            "crit bits must increase: {parent_bit} then {}",
                            b.crit_bit
                        );
                    }
                    for dir in 0..2 {
                        let mut child_path = path.clone();
                        child_path.push((b.crit_bit, dir));
                        stack.push((b.children[dir], child_path));
                    }
                }
                Node::Vacant => panic!("vacant slot {id:?} reachable from root"),
            }
        }

        assert_eq!(keys.len(), self.len, "leaf count must match len");
        assert_eq!(reachable, self.nodes.live(), "arena holds unreachable nodes");
        assert_eq!(reachable, 2 * self.len - 1, "n leaves need n - 1 branches");
    }
}
